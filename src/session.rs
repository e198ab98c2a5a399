//! Working context shared by the indexing tasks.

use std::path::{Path, PathBuf};

use crate::config::IndexerConfig;
use crate::dat::EntrySource;
use crate::index::IndexStore;
use crate::task::WriteOutcome;

/// Close progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CloseState {
    #[default]
    Open,
    Closing,
    Closed,
}

/// The archive being indexed and its index.
///
/// The active task gets exclusive access to the session on every step; the
/// host reads it between steps.
pub struct Session {
    config: IndexerConfig,
    archive: Option<Box<dyn EntrySource>>,
    archive_path: Option<PathBuf>,
    archive_timestamp: u64,
    cache_path: Option<PathBuf>,
    store: IndexStore,
    last_write: Option<WriteOutcome>,
    pub(crate) close_state: CloseState,
    pub(crate) close_write_attempted: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("archive_path", &self.archive_path)
            .field("entry_count", &self.entry_count())
            .field("archive_timestamp", &self.archive_timestamp)
            .field("cache_path", &self.cache_path)
            .field("indexed", &self.store.len())
            .field("dirty", &self.store.is_dirty())
            .finish()
    }
}

impl Session {
    /// Creates a session with no archive.
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            config,
            archive: None,
            archive_path: None,
            archive_timestamp: 0,
            cache_path: None,
            store: IndexStore::new(),
            last_write: None,
            close_state: CloseState::Open,
            close_write_attempted: false,
        }
    }

    /// Replaces the archive and starts over with an empty index.
    pub fn attach(
        &mut self,
        archive: Box<dyn EntrySource>,
        archive_path: Option<PathBuf>,
        archive_timestamp: u64,
        cache_path: Option<PathBuf>,
    ) {
        self.archive = Some(archive);
        self.archive_path = archive_path;
        self.archive_timestamp = archive_timestamp;
        self.cache_path = cache_path;
        self.store = IndexStore::new();
        self.last_write = None;
        self.close_state = CloseState::Open;
        self.close_write_attempted = false;
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Returns the open archive, if any.
    pub fn archive_mut(&mut self) -> Option<&mut (dyn EntrySource + 'static)> {
        self.archive.as_deref_mut()
    }

    /// Returns the number of entries in the open archive, zero if none.
    pub fn entry_count(&self) -> u32 {
        self.archive.as_ref().map_or(0, |a| a.entry_count())
    }

    /// Returns the archive path.
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }

    /// Returns the archive modification time captured when it was opened.
    pub fn archive_timestamp(&self) -> u64 {
        self.archive_timestamp
    }

    /// Returns the index cache path of the open archive.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Returns the index.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Returns the index for modification.
    pub fn store_mut(&mut self) -> &mut IndexStore {
        &mut self.store
    }

    /// Splits the session into the archive and the index.
    pub fn archive_and_store(
        &mut self,
    ) -> (Option<&mut (dyn EntrySource + 'static)>, &mut IndexStore) {
        (self.archive.as_deref_mut(), &mut self.store)
    }

    /// Returns the outcome of the most recent cache write.
    pub fn last_write(&self) -> Option<&WriteOutcome> {
        self.last_write.as_ref()
    }

    pub(crate) fn record_write(&mut self, outcome: WriteOutcome) {
        self.last_write = Some(outcome);
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_closing(&self) -> bool {
        self.close_state != CloseState::Open
    }
}
