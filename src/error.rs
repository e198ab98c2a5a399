//! Error types for archive indexing operations.
//!
//! This module provides the [`Error`] enum which represents all failure modes
//! of the indexing engine, along with a convenient [`Result<T>`] type alias.
//!
//! # Which errors reach the caller
//!
//! Only archive open failures are surfaced by the host orchestration in
//! [`Browser`](crate::browser::Browser). Cache misses, stale caches, corrupt
//! caches, failed writes and rejected tasks are resolved internally (they
//! trigger a rescan, are logged, or are retried on the next explicit request).
//!
//! ```rust,no_run
//! use datscope::{Browser, Error, IndexerConfig};
//!
//! let mut browser = Browser::new(IndexerConfig::default());
//! match browser.open("Gw2.dat") {
//!     Ok(()) => println!("indexing started"),
//!     Err(e) if e.is_open_failure() => eprintln!("cannot open archive: {}", e),
//!     Err(e) => eprintln!("unexpected: {}", e),
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The main error type for indexing operations.
///
/// # Error Categories
///
/// | Category | Variants | Handling |
/// |----------|----------|----------|
/// | Open failure | [`Io`][Self::Io], [`InvalidArchive`][Self::InvalidArchive], [`CorruptHeader`][Self::CorruptHeader] | Surfaced to the caller |
/// | Access | [`EntryOutOfRange`][Self::EntryOutOfRange] | Programming error or stale id |
/// | Cache | [`CacheMiss`][Self::CacheMiss], [`CacheStale`][Self::CacheStale], [`CorruptCache`][Self::CorruptCache] | Triggers a rescan |
/// | Persistence | [`WriteFailure`][Self::WriteFailure] | Recorded, not retried |
/// | Scheduling | [`TaskRejected`][Self::TaskRejected], [`Cancelled`][Self::Cancelled] | Retry later |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while accessing the archive or cache file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid archive.
    ///
    /// Returned when the signature is missing or the header describes a
    /// layout that cannot exist in a file of this size.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// The archive header or file table is corrupt or truncated.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// An entry id beyond the archive's file table was requested.
    #[error("Entry {entry_id} out of range (archive has {entry_count} entries)")]
    EntryOutOfRange {
        /// The requested entry id.
        entry_id: u32,
        /// Number of entries in the archive.
        entry_count: u32,
    },

    /// No index cache exists for the archive.
    ///
    /// Not a failure: the index is rebuilt by a full scan.
    #[error("No index cache at '{}'", path.display())]
    CacheMiss {
        /// The cache path that was probed.
        path: PathBuf,
    },

    /// The index cache was built from a different archive revision.
    #[error("Index cache is stale (cached timestamp {cached}, archive timestamp {current})")]
    CacheStale {
        /// Modification time recorded in the cache.
        cached: u64,
        /// Modification time of the archive on disk.
        current: u64,
    },

    /// The index cache is structurally invalid.
    ///
    /// Recovered locally by discarding the cache and rebuilding the index.
    #[error("Corrupt index cache: {reason}")]
    CorruptCache {
        /// A description of the structural violation.
        reason: String,
    },

    /// Persisting the index failed.
    ///
    /// The store stays dirty so a later explicit write can try again.
    #[error("Failed to write index cache '{}': {source}", path.display())]
    WriteFailure {
        /// The cache path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A task could not be started because the active one cannot be aborted.
    #[error("Task rejected: '{active}' is running and cannot be aborted")]
    TaskRejected {
        /// Status text of the task that kept the scheduler busy.
        active: String,
    },

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` if this error means the archive could not be opened.
    ///
    /// These are the only errors the host surfaces to the user.
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::InvalidArchive(_) | Error::CorruptHeader { .. }
        )
    }

    /// Returns `true` if this error concerns the index cache.
    ///
    /// Cache errors are never fatal: they all lead to a (partial) rescan.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            Error::CacheMiss { .. } | Error::CacheStale { .. } | Error::CorruptCache { .. }
        )
    }

    /// Returns `true` if this error might go away on a later attempt.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::TaskRejected { .. } | Error::Cancelled | Error::WriteFailure { .. } => true,
            Error::CacheMiss { .. } | Error::CacheStale { .. } | Error::CorruptCache { .. } => true,
            // Only transient I/O errors are recoverable
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the entry id associated with this error, if any.
    pub fn entry_id(&self) -> Option<u32> {
        match self {
            Error::EntryOutOfRange { entry_id, .. } => Some(*entry_id),
            _ => None,
        }
    }

    /// Creates a CorruptHeader error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates a CorruptCache error.
    pub fn corrupt_cache(reason: impl Into<String>) -> Self {
        Error::CorruptCache {
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for indexing operations.
pub type Result<T> = std::result::Result<T, Error>;
