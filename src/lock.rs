//! Single-writer locking
//!
//! Two layers guard the journal file of a store:
//!
//! 1. `LockRegistry`: the set of journal paths locked by this process. A
//!    second acquisition of the same path fails with `AlreadyLocked` before
//!    the OS is asked, so same-process re-entrancy never depends on the
//!    platform's lock semantics.
//! 2. An exclusive advisory lock on the journal file itself (via `fs2`),
//!    which rejects writers in other processes.
//!
//! The registry is an explicit value: whoever manages store lifecycles owns
//! one and passes it to every `Store::open_write`. Clones share state.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{BlobError, Result};

/// Process-scoped registry of locked journal paths
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusively lock `file`, registered under `path`.
    ///
    /// Fails with `AlreadyLocked` if this registry already holds `path`, and
    /// with `Locked` if another process holds the OS lock.
    pub fn lock(&self, path: &Path, file: &File) -> Result<()> {
        let mut held = self.held.lock();

        if held.contains(path) {
            return Err(BlobError::AlreadyLocked(path.to_path_buf()));
        }

        file.try_lock_exclusive().map_err(|source| BlobError::Locked {
            path: path.to_path_buf(),
            source,
        })?;

        held.insert(path.to_path_buf());
        debug!(path = %path.display(), "acquired writer lock");
        Ok(())
    }

    /// Release the lock on `file` and forget `path`.
    ///
    /// The registry entry is removed even when the OS unlock fails.
    pub fn unlock(&self, path: &Path, file: &File) -> Result<()> {
        let mut held = self.held.lock();
        held.remove(path);

        file.unlock()?;
        debug!(path = %path.display(), "released writer lock");
        Ok(())
    }

    /// Whether this registry currently holds `path`
    pub fn is_locked(&self, path: &Path) -> bool {
        self.held.lock().contains(path)
    }

    /// Number of paths currently held
    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
