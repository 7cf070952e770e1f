//! blobkeep CLI
//!
//! Inspect, dump, re-encode and export a store.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use blobkeep::{codec, Config, LockRegistry, Ref, Store};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing_subscriber::{fmt, EnvFilter};

/// blobkeep CLI
#[derive(Parser, Debug)]
#[command(name = "blobkeep")]
#[command(about = "Append-only blob store tool")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every record with its compression ratio
    Ls {
        /// Store directory
        store: PathBuf,
    },

    /// Print the decoded blob at a reference
    Show {
        /// Store directory
        store: PathBuf,

        /// Reference, e.g. 00000:00000000
        reference: String,
    },

    /// Copy every record into another store through a codec
    Recode {
        /// Source store directory
        src: PathBuf,

        /// Destination store directory (created if missing)
        dst: PathBuf,

        /// Codec tag for the copies
        #[arg(short, long, default_value = "GZIP")]
        codec: String,
    },

    /// Export every record as one JSON object per line
    Export {
        /// Store directory
        store: PathBuf,
    },
}

/// One line of `export` output
#[derive(Serialize)]
struct ExportRecord<'a> {
    #[serde(rename = "ref")]
    reference: String,
    codec: &'a str,
    length: u32,
    compressed: u32,
    sha256: String,
    data: serde_json::Value,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,blobkeep=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> blobkeep::Result<()> {
    match command {
        Commands::Ls { store } => list(&Store::open_path(&store)?),
        Commands::Show { store, reference } => {
            let store = Store::open_path(&store)?;
            let blob = store.read(Ref::parse(&reference)?)?;
            std::io::stdout().write_all(&blob)?;
            store.close()
        }
        Commands::Recode { src, dst, codec } => recode(&src, &dst, &codec),
        Commands::Export { store } => export(&Store::open_path(&store)?),
    }
}

fn list(store: &Store) -> blobkeep::Result<()> {
    let mut out = std::io::stdout().lock();
    for info in store.cursor(Ref::NULL) {
        let info = info?;
        writeln!(
            out,
            "{} {} {}/{} {}",
            info.reference,
            info.tag,
            info.compressed,
            info.length,
            info.ratio()
        )?;
    }
    store.close()
}

fn recode(src: &Path, dst: &Path, tag: &str) -> blobkeep::Result<()> {
    let codec = codec::require_codec(tag)?;
    let source = Store::open_path(src)?;

    let registry = LockRegistry::new();
    let target = Store::open_write(Config::builder().data_dir(dst).build(), &registry)?;

    let mut copied = 0u64;
    for info in source.cursor(Ref::NULL) {
        let info = info?;
        let blob = source.read(info.reference)?;
        let new_ref = target.write_with_codec(&blob, codec)?;
        println!("{} -> {}", info.reference, new_ref);
        copied += 1;
    }

    tracing::info!(copied, codec = codec.tag(), "recode finished");
    source.close()?;
    target.close()
}

fn export(store: &Store) -> blobkeep::Result<()> {
    let mut out = std::io::stdout().lock();
    for info in store.cursor(Ref::NULL) {
        let info = info?;
        let blob = store.read(info.reference)?;

        let data = serde_json::from_slice(&blob)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&blob).into_owned()));

        let record = ExportRecord {
            reference: info.reference.to_string(),
            codec: &info.tag,
            length: info.length,
            compressed: info.compressed,
            sha256: format!("{:x}", Sha256::digest(&blob)),
            data,
        };

        let line = serde_json::to_string(&record).map_err(std::io::Error::from)?;
        writeln!(out, "{}", line)?;
    }
    store.close()
}
