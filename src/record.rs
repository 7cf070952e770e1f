//! Record format
//!
//! Every blob is stored as a fixed header, the codec-encoded payload and
//! zero padding up to the next multiple of 8.
//!
//! ## Header Layout (16 bytes, little-endian)
//! ```text
//! ┌──────────┬──────────────┬──────────────┬──────────────────┐
//! │ Tag (4)  │ Reserved (4) │ Length (4)   │ Compressed (4)   │
//! └──────────┴──────────────┴──────────────┴──────────────────┘
//! ```
//! - Tag: 4 ASCII bytes naming the codec (`SNAP`, `GZIP`, ...)
//! - Reserved: written as zero, ignored on read
//! - Length: uncompressed payload length
//! - Compressed: encoded payload length; the payload follows the header

use bytes::{BufMut, BytesMut};

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Records start on multiples of this
pub const RECORD_ALIGN: u64 = 8;

/// Round up to the next multiple of 8
pub fn round_up_8(n: u64) -> u64 {
    (n + RECORD_ALIGN - 1) & !(RECORD_ALIGN - 1)
}

/// Full on-disk span of a record with `compressed` payload bytes
pub fn padded_len(compressed: u32) -> u64 {
    round_up_8(HEADER_SIZE as u64 + compressed as u64)
}

/// The header preceding every stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Codec tag
    pub tag: [u8; 4],
    /// Uncompressed length
    pub length: u32,
    /// Compressed (stored) length
    pub compressed: u32,
}

impl RecordHeader {
    pub fn new(tag: [u8; 4], length: u32, compressed: u32) -> Self {
        Self { tag, length, compressed }
    }

    /// Total span of this record: header + payload + padding
    pub fn span(&self) -> u64 {
        padded_len(self.compressed)
    }

    /// Tag as text; non-UTF-8 tags are rendered lossily
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.tag);
        // bytes 4..8 stay zero
        buf[8..12].copy_from_slice(&self.length.to_le_bytes());
        buf[12..16].copy_from_slice(&self.compressed.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&buf[0..4]);
        Self {
            tag,
            length: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            compressed: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }

    /// Serialize header, payload and padding into one contiguous buffer
    pub fn frame(&self, payload: &[u8]) -> BytesMut {
        let span = self.span() as usize;
        let mut buf = BytesMut::with_capacity(span);
        buf.put_slice(&self.encode());
        buf.put_slice(payload);
        buf.put_bytes(0, span - HEADER_SIZE - payload.len());
        buf
    }
}
