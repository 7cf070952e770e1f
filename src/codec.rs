//! Compression codecs
//!
//! A fixed, read-only table of reversible byte transforms, looked up by their
//! 4-byte tag. The tag is stored in every record header, so a tag must never
//! change meaning once records carrying it exist.
//!
//! | Tag    | Transform                       |
//! |--------|---------------------------------|
//! | `NONE` | pass-through                    |
//! | `SNAP` | raw snappy block (default)      |
//! | `GZIP` | gzip (deflate)                  |
//! | `LZ4B` | lz4 block, size prepended       |

use std::fmt;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{BlobError, Result};

/// A named, reversible byte transform
pub struct Codec {
    tag: &'static str,
    encoder: fn(&[u8]) -> Result<Vec<u8>>,
    decoder: fn(&[u8]) -> Result<Vec<u8>>,
}

impl Codec {
    /// The 4-character tag
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Tag as the raw header bytes
    pub fn tag_bytes(&self) -> [u8; 4] {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(self.tag.as_bytes());
        tag
    }

    pub fn encode(&self, src: &[u8]) -> Result<Vec<u8>> {
        (self.encoder)(src)
    }

    pub fn decode(&self, src: &[u8]) -> Result<Vec<u8>> {
        (self.decoder)(src)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("tag", &self.tag).finish()
    }
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

// =============================================================================
// Built-in Table
// =============================================================================

pub static NONE: Codec = Codec {
    tag: "NONE",
    encoder: encode_none,
    decoder: encode_none,
};

pub static SNAPPY: Codec = Codec {
    tag: "SNAP",
    encoder: encode_snappy,
    decoder: decode_snappy,
};

pub static GZIP: Codec = Codec {
    tag: "GZIP",
    encoder: encode_gzip,
    decoder: decode_gzip,
};

pub static LZ4: Codec = Codec {
    tag: "LZ4B",
    encoder: encode_lz4,
    decoder: decode_lz4,
};

static CODECS: [&Codec; 4] = [&NONE, &SNAPPY, &GZIP, &LZ4];

/// Tag used by `Store::write` unless configured otherwise
pub const DEFAULT_CODEC: &str = "SNAP";

/// Look up a codec by tag. `None` means the tag is not registered.
pub fn codec_for(tag: &str) -> Option<&'static Codec> {
    CODECS.iter().copied().find(|c| c.tag == tag)
}

/// Look up a codec by the raw tag bytes of a record header
pub fn codec_for_bytes(tag: &[u8; 4]) -> Option<&'static Codec> {
    CODECS.iter().copied().find(|c| c.tag.as_bytes() == tag)
}

/// Same as `codec_for`, but an unknown tag is an error
pub fn require_codec(tag: &str) -> Result<&'static Codec> {
    codec_for(tag).ok_or_else(|| BlobError::UnknownCodec(tag.to_string()))
}

/// All registered codecs
pub fn codecs() -> impl Iterator<Item = &'static Codec> {
    CODECS.iter().copied()
}

// =============================================================================
// Transforms
// =============================================================================

fn encode_none(src: &[u8]) -> Result<Vec<u8>> {
    Ok(src.to_vec())
}

fn encode_snappy(src: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(src)
        .map_err(|e| codec_error(&SNAPPY, e))
}

fn decode_snappy(src: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(src)
        .map_err(|e| codec_error(&SNAPPY, e))
}

fn encode_gzip(src: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(src.len() / 5), Compression::default());
    encoder.write_all(src).map_err(|e| codec_error(&GZIP, e))?;
    encoder.finish().map_err(|e| codec_error(&GZIP, e))
}

fn decode_gzip(src: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(src);
    let mut dst = Vec::new();
    decoder.read_to_end(&mut dst).map_err(|e| codec_error(&GZIP, e))?;
    Ok(dst)
}

fn encode_lz4(src: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::compress_prepend_size(src))
}

fn decode_lz4(src: &[u8]) -> Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(src).map_err(|e| codec_error(&LZ4, e))
}

fn codec_error(codec: &Codec, e: impl fmt::Display) -> BlobError {
    BlobError::Codec {
        tag: codec.tag,
        reason: e.to_string(),
    }
}
