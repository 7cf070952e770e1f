//! Record references
//!
//! A `Ref` addresses a record by segment number and byte offset. Its text
//! form is fixed at 14 characters: `SSSSS:OOOOOOOO`, five decimal digits for
//! the segment and eight lowercase hex digits for the offset.

use std::fmt;
use std::str::FromStr;

use crate::error::{BlobError, Result};

/// Length of the canonical text form
pub const REF_TEXT_LEN: usize = 14;

/// Location of a record: segment number + byte offset within the segment.
///
/// Derived ordering is segment major, offset minor, which is storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ref {
    /// Segment (file) number
    pub segment: u16,
    /// Byte offset within the segment
    pub offset: u32,
}

impl Ref {
    /// The null reference, also the beginning of the store
    pub const NULL: Ref = Ref { segment: 0, offset: 0 };

    pub fn new(segment: u16, offset: u32) -> Self {
        Self { segment, offset }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Parse the canonical `SSSSS:OOOOOOOO` form (hex digits case-insensitive)
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || BlobError::InvalidRef(text.to_string());

        let bytes = text.as_bytes();
        if bytes.len() != REF_TEXT_LEN || bytes[5] != b':' {
            return Err(invalid());
        }
        if !bytes[..5].iter().all(u8::is_ascii_digit) || !bytes[6..].iter().all(u8::is_ascii_hexdigit) {
            return Err(invalid());
        }

        // 99999 passes the digit check but not the range
        let segment = text[..5].parse::<u16>().map_err(|_| invalid())?;
        let offset = u32::from_str_radix(&text[6..], 16).map_err(|_| invalid())?;

        Ok(Self { segment, offset })
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}:{:08x}", self.segment, self.offset)
    }
}

impl FromStr for Ref {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self> {
        Ref::parse(s)
    }
}
