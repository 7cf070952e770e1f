//! Cursor
//!
//! Forward-only scan over every record header in storage order, crossing
//! segment boundaries. A cursor cannot be rewound; to rescan, start a new
//! one from a saved `Ref`.

use crate::error::{BlobError, Result};
use crate::reference::Ref;
use crate::segment::MAX_SEGMENT;
use crate::store::{read_header, Store};

/// Header information for one scanned record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    /// Where the record starts
    pub reference: Ref,
    /// Codec tag
    pub tag: String,
    /// Uncompressed length
    pub length: u32,
    /// Compressed (stored) length
    pub compressed: u32,
}

impl RecordInfo {
    /// On-disk span: header + payload + padding
    pub fn span(&self) -> u64 {
        crate::record::padded_len(self.compressed)
    }

    /// compressed / uncompressed; 1.0 for empty blobs
    pub fn ratio(&self) -> f64 {
        if self.length == 0 {
            return 1.0;
        }
        self.compressed as f64 / self.length as f64
    }
}

/// Sequential scan over a store
pub struct Cursor<'a> {
    store: &'a Store,
    /// Position of the next header to read
    next: Ref,
    /// Record produced by the last successful advance
    current: Option<RecordInfo>,
    /// Error that ended the scan, if any
    error: Option<BlobError>,
    done: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(store: &'a Store, start: Ref) -> Self {
        Self {
            store,
            next: start,
            current: None,
            error: None,
            done: false,
        }
    }

    /// Advance to the next record.
    ///
    /// Returns true if there is a current record. Returns false at the end
    /// of the store, or after an error (see `error`). Once false, it stays
    /// false.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }

        match self.step() {
            Ok(Some(info)) => {
                self.current = Some(info);
                true
            }
            Ok(None) => self.finish(None),
            Err(e) => self.finish(Some(e)),
        }
    }

    fn step(&mut self) -> Result<Option<RecordInfo>> {
        loop {
            let file = match self.store.scan_segment(self.next.segment)? {
                Some(file) => file,
                None => return Ok(None),
            };

            let reference = self.next;
            let header = match read_header(&file, reference) {
                Ok(header) => header,
                Err(BlobError::Read { source, .. })
                    if source.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    // end of this segment: continue in the next one if it exists
                    if self.next.segment < MAX_SEGMENT && self.store.has_segment(self.next.segment + 1) {
                        self.next = Ref::new(self.next.segment + 1, 0);
                        continue;
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            let next_offset = reference.offset as u64 + header.span();
            self.next.offset = u32::try_from(next_offset).map_err(|_| BlobError::CorruptHeader {
                reference,
                reason: format!("record span {} overflows the segment", header.span()),
            })?;

            return Ok(Some(RecordInfo {
                reference,
                tag: header.tag_str(),
                length: header.length,
                compressed: header.compressed,
            }));
        }
    }

    fn finish(&mut self, error: Option<BlobError>) -> bool {
        self.done = true;
        self.current = None;
        self.error = error;
        false
    }

    /// Current record, if the last advance succeeded
    pub fn current(&self) -> Option<&RecordInfo> {
        self.current.as_ref()
    }

    /// Reference of the current record
    pub fn reference(&self) -> Option<Ref> {
        self.current.as_ref().map(|c| c.reference)
    }

    /// Where the next advance will read; save this to resume a scan later
    pub fn resume_ref(&self) -> Ref {
        self.next
    }

    /// The error that ended the scan, if any
    pub fn error(&self) -> Option<&BlobError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<BlobError> {
        self.error.take()
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<RecordInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.clone().map(Ok);
        }
        self.take_error().map(Err)
    }
}
