//! # datscope
//!
//! An incremental indexer and content classifier for packed game archives.
//!
//! A game data archive holds hundreds of thousands of opaque, numbered
//! entries. This crate walks them, identifies what each entry contains from
//! its leading bytes, files it into a category tree and persists the result
//! to an on-disk cache so that the next session only has to look at entries
//! added since.
//!
//! ## Quick Start
//!
//! ### Indexing an Archive
//!
//! ```rust,no_run
//! use datscope::{Browser, IndexerConfig, NoProgress, Result};
//!
//! fn main() -> Result<()> {
//!     let mut browser = Browser::new(IndexerConfig::default());
//!     browser.open("Gw2.dat")?;
//!
//!     // Load the cached index, then scan whatever it does not cover
//!     browser.run_until_idle(&mut NoProgress);
//!     println!("{} entries indexed", browser.store().len());
//!
//!     // Persist the index on the way out
//!     browser.close(&mut NoProgress);
//!     Ok(())
//! }
//! ```
//!
//! ### Classifying Raw Bytes
//!
//! ```rust
//! use datscope::{DecoderKind, FileType, identify_file_type, resolve};
//!
//! let data = b"ATEXDXT5\x00\x01\x00\x01";
//! let file_type = identify_file_type(data);
//! assert_eq!(file_type, FileType::Atex);
//! assert_eq!(resolve(file_type, data), DecoderKind::Image);
//! ```
//!
//! ### Driving Tasks Yourself
//!
//! Indexing work runs as cooperative [`Task`]s: one step at a time, on the
//! caller's thread. A host with an event loop calls [`Browser::pump`] when
//! it is idle instead of blocking in [`Browser::run_until_idle`]:
//!
//! ```rust,no_run
//! use datscope::{Browser, IndexerConfig, StatisticsProgress};
//!
//! # fn main() -> datscope::Result<()> {
//! let mut browser = Browser::new(IndexerConfig::default());
//! browser.open("Gw2.dat")?;
//!
//! let mut progress = StatisticsProgress::new();
//! while browser.pump(&mut progress) {
//!     if let Some(status) = browser.status() {
//!         eprintln!("{} ({:.0}%)", status, progress.state().percentage());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Cache problems never surface as errors
//! from [`Browser::open`]; an unusable cache is logged and the index is
//! rebuilt:
//!
//! ```rust,no_run
//! use datscope::{Browser, Error, IndexerConfig};
//!
//! fn open(path: &str) -> datscope::Result<Browser> {
//!     let mut browser = Browser::new(IndexerConfig::default());
//!     match browser.open(path) {
//!         Ok(()) => Ok(browser),
//!         Err(Error::InvalidArchive(msg)) => {
//!             eprintln!("Not an archive: {}", msg);
//!             Err(Error::InvalidArchive(msg))
//!         }
//!         Err(e @ Error::CorruptHeader { .. }) => {
//!             eprintln!("Damaged archive: {}", e);
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Logging
//!
//! The library reports through the [`log`](https://docs.rs/log) facade:
//! archive opens, cache hits and misses and scan completion at `info`,
//! discarded caches and unreadable entries at `warn`, and decoder
//! resolution at `debug`. Install any logger to see them.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod browser;
pub mod checksum;
pub mod config;
pub mod dat;
pub mod encoding;
pub mod error;
pub mod format;
pub mod index;
pub mod progress;
pub mod session;
pub mod task;

pub use browser::Browser;
pub use config::{CacheKey, IndexerConfig};
pub use error::{Error, Result};
pub use session::Session;

// Re-export archive access at crate root for convenience
pub use dat::{DatArchive, EntrySource, MemoryArchive};

// Re-export classification API
pub use format::{DecoderKind, FileReader, FileType, identify_file_type, resolve};

// Re-export index API
pub use index::{Category, CategoryId, IndexEntry, IndexStore};

// Re-export task API
pub use task::{
    ReadIndexTask, ScanState, ScanTask, Scheduler, Task, WriteIndexTask, WriteOutcome,
};

// Re-export progress API
pub use progress::{
    AtomicProgress, NoProgress, ProgressReporter, ProgressState, StatisticsProgress,
    ThrottledProgress, progress_fn,
};
