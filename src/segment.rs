//! Segment files
//!
//! A store directory holds up to 65536 segment files named by their
//! zero-padded decimal number (`00000`, `00001`, ...). `SegmentFiles` keeps a
//! lazily populated cache of open handles keyed by segment number; it lives
//! inside the store's mutex, so it needs no locking of its own.
//!
//! All record I/O is positional (`pread`/`pwrite` style), which lets many
//! threads share one `File` without seeking.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

/// Highest usable segment number
pub const MAX_SEGMENT: u16 = u16::MAX;

/// File name of a segment
pub fn segment_file_name(segment: u16) -> String {
    format!("{:05}", segment)
}

/// Open segment handles for one store directory
pub struct SegmentFiles {
    /// Store directory
    dir: PathBuf,
    /// Whether missing segments may be created
    writable: bool,
    /// Segment number → open handle
    open: HashMap<u16, Arc<File>>,
}

impl SegmentFiles {
    pub fn new(dir: &Path, writable: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            writable,
            open: HashMap::new(),
        }
    }

    /// Path of a segment file
    pub fn path(&self, segment: u16) -> PathBuf {
        self.dir.join(segment_file_name(segment))
    }

    /// Whether the segment file exists on disk
    pub fn exists(&self, segment: u16) -> bool {
        self.open.contains_key(&segment) || self.path(segment).is_file()
    }

    /// Return the cached handle, or open the file and cache it.
    ///
    /// With `create`, a missing file is created (writable stores only).
    pub fn get(&mut self, segment: u16, create: bool) -> io::Result<Arc<File>> {
        if let Some(file) = self.open.get(&segment) {
            return Ok(Arc::clone(file));
        }

        let path = self.path(segment);
        let create = create && self.writable;
        let file = OpenOptions::new()
            .read(true)
            .write(self.writable)
            .create(create)
            .open(&path)?;

        debug!(segment, path = %path.display(), "opened segment file");

        let file = Arc::new(file);
        self.open.insert(segment, Arc::clone(&file));
        Ok(file)
    }

    /// Number of cached handles
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Drop every cached handle, syncing writable ones first.
    ///
    /// Every handle is released; the last sync error, if any, is returned.
    pub fn close_all(&mut self) -> Option<io::Error> {
        let mut last_err = None;

        for (segment, file) in self.open.drain() {
            if self.writable {
                if let Err(e) = file.sync_all() {
                    tracing::warn!(segment, error = %e, "sync on close failed");
                    last_err = Some(e);
                }
            }
        }

        last_err
    }
}

// =============================================================================
// Positional I/O
// =============================================================================

#[cfg(unix)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(unix)]
pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
pub fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
pub fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
