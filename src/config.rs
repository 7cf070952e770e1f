//! Configuration for blobkeep
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::codec;
use crate::error::{BlobError, Result};
use crate::record::HEADER_SIZE;

/// Default segment capacity: 1 GiB
pub const DEFAULT_MAX_SEGMENT_LEN: u32 = 1024 * 1024 * 1024;

/// Main configuration for a store handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Store directory
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── _writer          (write-position journal, lock target)
    ///     ├── 00000            (segment files)
    ///     └── 00001 ...
    pub data_dir: PathBuf,

    /// Capacity of a single segment file in bytes.
    /// A single record (header + payload + padding) may not exceed this.
    pub max_segment_len: u32,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Codec tag used by `Store::write`
    pub default_codec: String,

    /// How journal updates reach the disk
    pub journal_sync: JournalSync,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSync {
    /// Leave journal writes to the OS page cache
    OsBuffered,

    /// fsync the journal after every reservation (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./blobkeep_data"),
            max_segment_len: DEFAULT_MAX_SEGMENT_LEN,
            default_codec: codec::DEFAULT_CODEC.to_string(),
            journal_sync: JournalSync::OsBuffered,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings that can be wrong
    pub fn validate(&self) -> Result<()> {
        if (self.max_segment_len as usize) <= HEADER_SIZE {
            return Err(BlobError::Config(format!(
                "max_segment_len must be larger than the {} byte header, got {}",
                HEADER_SIZE, self.max_segment_len
            )));
        }

        if codec::codec_for(&self.default_codec).is_none() {
            return Err(BlobError::Config(format!(
                "default codec {:?} is not registered",
                self.default_codec
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment capacity (in bytes)
    pub fn max_segment_len(mut self, len: u32) -> Self {
        self.config.max_segment_len = len;
        self
    }

    /// Set the codec used by plain writes
    pub fn default_codec(mut self, tag: impl Into<String>) -> Self {
        self.config.default_codec = tag.into();
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync(mut self, sync: JournalSync) -> Self {
        self.config.journal_sync = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
