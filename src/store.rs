//! Store Module
//!
//! The store handle that ties segments, journal, lock and codecs together.
//!
//! ## Responsibilities
//! - Open a store directory read-only or as the single writer
//! - Reserve disjoint byte ranges for appends and persist the write position
//! - Read records back by reference
//! - Hand out cursors for sequential scans
//! - Release every held resource on close

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::codec::{self, Codec};
use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{BlobError, Result};
use crate::journal::Journal;
use crate::lock::LockRegistry;
use crate::record::{RecordHeader, HEADER_SIZE};
use crate::reference::Ref;
use crate::segment::{read_exact_at, write_all_at, SegmentFiles, MAX_SEGMENT};

/// An open blob store
///
/// ## Concurrency Model: Single-Writer Process / Many Reader Processes
///
/// - One mutex (`inner`) covers the write position, the journal and the
///   segment handle cache. It is held only for reservations and handle
///   lookups, never for payload I/O.
/// - **Writes**: each write reserves a disjoint byte range under the mutex,
///   then writes header + payload outside it. Concurrent writers on one
///   handle proceed in parallel.
/// - **Reads**: positional reads on shared handles; no serialization beyond
///   the handle lookup.
/// - Across processes only one read-write handle may exist (see `lock`).
pub struct Store {
    /// Store configuration
    config: Config,

    /// Codec used by `write`
    default_codec: &'static Codec,

    /// Mutable state, including the writer half for read-write handles
    inner: Mutex<Inner>,
}

struct Inner {
    /// Open segment handles
    segments: SegmentFiles,

    /// Present only on read-write handles
    writer: Option<Writer>,

    /// Set by close; every later operation fails
    closed: bool,
}

/// Writer-only state
struct Writer {
    journal: Journal,

    /// Canonical journal path, the lock registry key
    lock_path: std::path::PathBuf,

    registry: LockRegistry,

    /// Next append position
    position: Ref,
}

impl Writer {
    /// Unlock and close the journal, attempting both steps
    fn release(self) -> Result<()> {
        let mut result = Ok(());

        if let Err(e) = self.registry.unlock(&self.lock_path, self.journal.file()) {
            warn!(error = %e, "unlocking journal failed");
            result = Err(e);
        }

        if let Err(e) = self.journal.file().sync_all() {
            warn!(error = %e, "closing journal failed");
            result = Err(e.into());
        }

        result
    }
}

impl Store {
    /// Open a store for reading only.
    ///
    /// The directory must exist. No lock is taken and no write position is
    /// tracked, so any number of readers may coexist with one writer.
    pub fn open_read(config: Config) -> Result<Self> {
        config.validate()?;

        if !config.data_dir.is_dir() {
            return Err(BlobError::StoreNotFound(config.data_dir.clone()));
        }

        debug!(dir = %config.data_dir.display(), "opened store read-only");

        Ok(Self {
            default_codec: codec::require_codec(&config.default_codec)?,
            inner: Mutex::new(Inner {
                segments: SegmentFiles::new(&config.data_dir, false),
                writer: None,
                closed: false,
            }),
            config,
        })
    }

    /// Open a store as its single writer.
    ///
    /// On open:
    /// 1. Create the store directory if needed
    /// 2. Open/create the journal
    /// 3. Lock the journal (in-process registry + OS lock)
    /// 4. Load the write position (empty journal = null ref)
    pub fn open_write(config: Config, registry: &LockRegistry) -> Result<Self> {
        config.validate()?;
        let default_codec = codec::require_codec(&config.default_codec)?;

        fs::create_dir_all(&config.data_dir)?;

        let journal = Journal::open(&config.data_dir, config.journal_sync)?;
        let lock_path = fs::canonicalize(journal.path())?;
        registry.lock(&lock_path, journal.file())?;

        let position = match journal.load() {
            Ok(position) => position,
            Err(e) => {
                let _ = registry.unlock(&lock_path, journal.file());
                return Err(e);
            }
        };

        let writer = Writer {
            journal,
            lock_path,
            registry: registry.clone(),
            position,
        };

        info!(
            dir = %config.data_dir.display(),
            position = %writer.position,
            "opened store for writing"
        );

        Ok(Self {
            default_codec,
            inner: Mutex::new(Inner {
                segments: SegmentFiles::new(&config.data_dir, true),
                writer: Some(writer),
                closed: false,
            }),
            config,
        })
    }

    /// Open a store read-only with the default config
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open_read(config)
    }

    /// Close the store.
    ///
    /// Releases the lock, closes the journal and every segment handle. Every
    /// step is attempted; one representative failure is returned.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock_open()?;
        let result = inner.shutdown();
        debug!(dir = %self.config.data_dir.display(), "closed store");
        result
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Write a blob with the configured default codec
    pub fn write(&self, blob: &[u8]) -> Result<Ref> {
        self.write_with_codec(blob, self.default_codec)
    }

    /// Write a blob with the codec registered under `tag`
    pub fn write_with_codec_name(&self, blob: &[u8], tag: &str) -> Result<Ref> {
        let codec = codec::require_codec(tag)?;
        self.write_with_codec(blob, codec)
    }

    /// Write a blob with an explicit codec.
    ///
    /// If the payload write fails after the reservation, the reserved range
    /// is abandoned: it is never reused and the error is returned.
    pub fn write_with_codec(&self, blob: &[u8], codec: &Codec) -> Result<Ref> {
        let limit = self.config.max_segment_len as u64;
        let too_large = |size: usize| BlobError::RecordTooLarge {
            size: size as u64,
            limit,
        };

        let length = u32::try_from(blob.len()).map_err(|_| too_large(blob.len()))?;
        let payload = codec.encode(blob)?;
        let compressed = u32::try_from(payload.len()).map_err(|_| too_large(payload.len()))?;

        let header = RecordHeader::new(codec.tag_bytes(), length, compressed);
        let (file, reference) = self.reserve(&header)?;

        let frame = header.frame(&payload);
        if let Err(source) = write_all_at(&file, &frame, reference.offset as u64) {
            warn!(%reference, span = frame.len(), error = %source, "record write failed, range abandoned");
            return Err(BlobError::Write { reference, source });
        }

        Ok(reference)
    }

    /// Reserve the byte range for one record.
    ///
    /// Rolls over to the next segment if the record does not fit, resolves
    /// the target file, and persists the advanced position to the journal
    /// before the reservation is returned.
    fn reserve(&self, header: &RecordHeader) -> Result<(Arc<File>, Ref)> {
        let mut guard = self.lock_open()?;
        let inner = &mut *guard;
        let writer = inner.writer.as_mut().ok_or(BlobError::ReadOnly)?;

        let need = header.span();
        let limit = self.config.max_segment_len as u64;
        if need > limit {
            return Err(BlobError::RecordTooLarge { size: need, limit });
        }

        let mut position = writer.position;
        if position.offset as u64 + need > limit {
            if position.segment == MAX_SEGMENT {
                return Err(BlobError::CapacityExhausted { max: MAX_SEGMENT });
            }
            position = Ref::new(position.segment + 1, 0);
            info!(segment = position.segment, "rolling over to new segment");
        }

        let file = inner
            .segments
            .get(position.segment, true)
            .map_err(|source| BlobError::Write { reference: position, source })?;

        // need <= limit - offset, so this cannot overflow
        let next = Ref::new(position.segment, position.offset + need as u32);
        writer
            .journal
            .store(next)
            .map_err(|source| BlobError::Write { reference: position, source })?;
        writer.position = next;

        Ok((file, position))
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Read and decode the blob at `reference`
    pub fn read(&self, reference: Ref) -> Result<Vec<u8>> {
        let file = self.segment_for(reference)?;
        let header = read_header(&file, reference)?;

        let codec = codec::codec_for_bytes(&header.tag).ok_or_else(|| BlobError::UnknownRecordCodec {
            tag: header.tag_str(),
            reference,
        })?;

        let start = reference.offset as u64 + HEADER_SIZE as u64;
        let file_len = file
            .metadata()
            .map_err(|source| BlobError::Read { reference, source })?
            .len();
        if start + header.compressed as u64 > file_len {
            return Err(BlobError::CorruptHeader {
                reference,
                reason: format!(
                    "{} payload bytes extend past end of segment ({} bytes)",
                    header.compressed, file_len
                ),
            });
        }

        let mut payload = vec![0u8; header.compressed as usize];
        read_exact_at(&file, &mut payload, start)
            .map_err(|source| BlobError::Read { reference, source })?;

        codec.decode(&payload)
    }

    /// Start a scan at `start`; the null ref scans from the first record
    pub fn cursor(&self, start: Ref) -> Cursor<'_> {
        Cursor::new(self, start)
    }

    // =========================================================================
    // Segment Access (shared with the cursor)
    // =========================================================================

    /// Handle of the segment named by `reference`, which must exist
    fn segment_for(&self, reference: Ref) -> Result<Arc<File>> {
        let mut inner = self.lock_open()?;
        inner
            .segments
            .get(reference.segment, false)
            .map_err(|source| BlobError::Read { reference, source })
    }

    /// Handle of `segment` for scanning; `None` if the file does not exist
    pub(crate) fn scan_segment(&self, segment: u16) -> Result<Option<Arc<File>>> {
        let mut inner = self.lock_open()?;
        match inner.segments.get(segment, false) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobError::Read {
                reference: Ref::new(segment, 0),
                source,
            }),
        }
    }

    /// Whether the segment file exists
    pub fn has_segment(&self, segment: u16) -> bool {
        let inner = self.inner.lock();
        !inner.closed && inner.segments.exists(segment)
    }

    fn lock_open(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(BlobError::Closed);
        }
        Ok(inner)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Next append position (read-write handles only)
    pub fn write_position(&self) -> Result<Ref> {
        let inner = self.lock_open()?;
        inner
            .writer
            .as_ref()
            .map(|w| w.position)
            .ok_or(BlobError::ReadOnly)
    }

    /// Whether this handle may append
    pub fn is_writable(&self) -> bool {
        self.inner.lock().writer.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of segment handles currently cached
    pub fn open_segment_count(&self) -> usize {
        self.inner.lock().segments.open_count()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_codec(&self) -> &'static Codec {
        self.default_codec
    }
}

impl Inner {
    fn shutdown(&mut self) -> Result<()> {
        self.closed = true;
        let mut result = Ok(());

        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.release() {
                result = Err(e);
            }
        }

        if let Some(e) = self.segments.close_all() {
            result = Err(e.into());
        }

        result
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.closed {
            if let Err(e) = inner.shutdown() {
                warn!(error = %e, "releasing store on drop failed");
            }
        }
    }
}

/// Read and decode the header at `reference`
pub(crate) fn read_header(file: &File, reference: Ref) -> Result<RecordHeader> {
    let mut buf = [0u8; HEADER_SIZE];
    read_exact_at(file, &mut buf, reference.offset as u64)
        .map_err(|source| BlobError::Read { reference, source })?;
    Ok(RecordHeader::decode(&buf))
}
