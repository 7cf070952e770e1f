//! Write-position journal
//!
//! A tiny file holding exactly the 14-character text form of the next append
//! position. It is read once when a writer opens the store and rewritten on
//! every reservation, before the reserved ref is handed out. The same file is
//! the target of the single-writer lock.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::JournalSync;
use crate::error::{BlobError, Result};
use crate::reference::{Ref, REF_TEXT_LEN};
use crate::segment::{read_exact_at, write_all_at};

/// Reserved file name of the journal inside the store directory
pub const JOURNAL_FILE: &str = "_writer";

/// The persisted write position
pub struct Journal {
    path: PathBuf,
    file: File,
    sync: JournalSync,
}

impl Journal {
    /// Open or create the journal in a store directory
    pub fn open(dir: &Path, sync: JournalSync) -> Result<Self> {
        let path = dir.join(JOURNAL_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        Ok(Self { path, file, sync })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Read the stored position. An empty journal means the null ref.
    pub fn load(&self) -> Result<Ref> {
        let len = self.file.metadata()?.len();
        if len == 0 {
            return Ok(Ref::NULL);
        }
        if len < REF_TEXT_LEN as u64 {
            return Err(BlobError::Journal(format!("incomplete ref: {} bytes", len)));
        }

        let mut buf = [0u8; REF_TEXT_LEN];
        read_exact_at(&self.file, &mut buf, 0)?;

        let text = std::str::from_utf8(&buf)
            .map_err(|_| BlobError::Journal(format!("not a ref: {:?}", buf)))?;
        Ref::parse(text).map_err(|e| BlobError::Journal(e.to_string()))
    }

    /// Overwrite the stored position
    pub fn store(&self, position: Ref) -> io::Result<()> {
        let text = position.to_string();
        write_all_at(&self.file, text.as_bytes(), 0)?;
        self.file.set_len(REF_TEXT_LEN as u64)?;

        if self.sync == JournalSync::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }
}
