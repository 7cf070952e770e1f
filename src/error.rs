//! Error types for blobkeep
//!
//! Provides a unified error type for all store operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::reference::Ref;

/// Result type alias using BlobError
pub type Result<T> = std::result::Result<T, BlobError>;

/// Unified error type for blobkeep operations
#[derive(Debug, Error)]
pub enum BlobError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read failed for {reference}: {source}")]
    Read {
        reference: Ref,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed for {reference}: {source}")]
    Write {
        reference: Ref,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("can not parse ref: {0:?}")]
    InvalidRef(String),

    #[error("corrupt record header at {reference}: {reason}")]
    CorruptHeader { reference: Ref, reason: String },

    #[error("journal error: {0}")]
    Journal(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("unknown codec {0:?}")]
    UnknownCodec(String),

    #[error("unknown codec {tag:?} for {reference}")]
    UnknownRecordCodec { tag: String, reference: Ref },

    #[error("{tag} codec failed: {reason}")]
    Codec { tag: &'static str, reason: String },

    // -------------------------------------------------------------------------
    // Locking Errors
    // -------------------------------------------------------------------------
    #[error("already locked in this process: {}", .0.display())]
    AlreadyLocked(PathBuf),

    #[error("locked by another process: {}", .path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("maximum number of segments already in use: {max}")]
    CapacityExhausted { max: u16 },

    #[error("record of {size} bytes exceeds segment capacity of {limit} bytes")]
    RecordTooLarge { size: u64, limit: u64 },

    // -------------------------------------------------------------------------
    // Handle Errors
    // -------------------------------------------------------------------------
    #[error("store is opened read-only")]
    ReadOnly,

    #[error("store is closed")]
    Closed,

    #[error("store directory not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlobError {
    /// True for both the in-process and the cross-process lock failures
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, BlobError::AlreadyLocked(_) | BlobError::Locked { .. })
    }
}
