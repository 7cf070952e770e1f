//! # blobkeep
//!
//! An append-only blob store for very many small-to-medium binary objects:
//! - Compressed records appended to fixed-capacity segment files
//! - A write-position journal that makes appends crash-consistent
//! - Fixed-width text references (`SSSSS:OOOOOOOO`)
//! - Single-writer/multi-reader concurrency, across threads and processes
//! - Sequential cursors over every record
//!
//! Blobs are never modified or individually deleted.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store handle                          │
//! │            (one mutex: write position + handles)             │
//! └──────┬──────────────────────┬──────────────────────┬────────┘
//!        │ write                │ read                 │ scan
//!        ▼                      ▼                      ▼
//!   ┌──────────┐          ┌──────────┐           ┌──────────┐
//!   │ Journal  │          │  Codecs  │           │  Cursor  │
//!   │ + Lock   │          │ (by tag) │           │          │
//!   └────┬─────┘          └────┬─────┘           └────┬─────┘
//!        │                     │                      │
//!        ▼                     ▼                      ▼
//!   ┌─────────────────────────────────────────────────────────┐
//!   │     Segment files 00000, 00001, ... (records, 8-aligned) │
//!   └─────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod reference;
pub mod record;
pub mod codec;
pub mod segment;
pub mod journal;
pub mod lock;
pub mod store;
pub mod cursor;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlobError, Result};
pub use config::{Config, JournalSync};
pub use reference::Ref;
pub use codec::{codec_for, Codec};
pub use lock::LockRegistry;
pub use store::Store;
pub use cursor::{Cursor, RecordInfo};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blobkeep
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
