//! Indexer configuration.
//!
//! [`IndexerConfig`] controls where index caches live, how their file names
//! are derived and how much of each entry the scanner reads.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::index::cache;

/// Default number of leading bytes peeked per entry during a scan.
pub const DEFAULT_SNIFF_LEN: usize = 256;

/// Smallest peek size; identification and validation need this much.
pub const MIN_SNIFF_LEN: usize = 64;

/// Default capacity of the raw entry cache behind `view_entry`.
pub const DEFAULT_ENTRY_CACHE_CAPACITY: usize = 32;

/// Application directory name under the user data directory.
const APP_DIR: &str = "datscope";

/// Checksum used to derive the cache file name from the archive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKey {
    /// CRC-32 of the path, eight hex digits.
    #[default]
    Crc32,
    /// CRC-64 of the path, sixteen hex digits.
    ///
    /// Makes cache slot collisions between distinct archives practically
    /// impossible.
    Crc64,
}

/// Configuration for indexing sessions.
///
/// # Example
///
/// ```rust
/// use datscope::{CacheKey, IndexerConfig};
///
/// let config = IndexerConfig::new()
///     .cache_dir("/tmp/datscope-cache")
///     .cache_key(CacheKey::Crc64)
///     .sniff_len(128);
/// assert_eq!(config.sniff_len, 128);
/// ```
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Directory holding index cache files.
    ///
    /// Default: `<user data dir>/datscope`, or the system temp directory when
    /// no data directory is known.
    pub cache_dir: PathBuf,

    /// How cache file names are derived. Default: [`CacheKey::Crc32`].
    pub cache_key: CacheKey,

    /// Leading bytes read per entry for classification.
    ///
    /// Smaller values are raised to [`MIN_SNIFF_LEN`] when entries are
    /// read. Default: 256.
    pub sniff_len: usize,

    /// Number of full entries kept in memory for repeated views. Default: 32.
    pub entry_cache_capacity: NonZeroUsize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_key: CacheKey::default(),
            sniff_len: DEFAULT_SNIFF_LEN,
            entry_cache_capacity: NonZeroUsize::new(DEFAULT_ENTRY_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl IndexerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Sets the cache key checksum.
    pub fn cache_key(mut self, key: CacheKey) -> Self {
        self.cache_key = key;
        self
    }

    /// Sets the peek size, clamped to at least [`MIN_SNIFF_LEN`].
    pub fn sniff_len(mut self, len: usize) -> Self {
        self.sniff_len = len.max(MIN_SNIFF_LEN);
        self
    }

    /// Sets the entry cache capacity; zero is treated as one.
    pub fn entry_cache_capacity(mut self, capacity: usize) -> Self {
        self.entry_cache_capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Returns the cache file path for an archive.
    ///
    /// The path is made absolute first, so relative and absolute spellings of
    /// the same archive share a cache slot.
    pub fn cache_path_for(&self, archive_path: impl AsRef<Path>) -> Result<PathBuf> {
        let name = cache::cache_file_name(archive_path.as_ref(), self.cache_key)?;
        Ok(self.cache_dir.join(name))
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}
