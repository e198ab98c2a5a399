//! Loading the index from its cache file.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use super::Task;
use crate::index::{IndexStore, cache};
use crate::session::Session;
use crate::Error;

/// Replaces the session's index with the contents of a cache file.
///
/// [`init`](Task::init) fails when the cache cannot be opened, which callers
/// treat as a cache miss. A corrupt cache, or one that cannot belong to the
/// open archive, leaves an empty index with a zero timestamp.
#[derive(Debug)]
pub struct ReadIndexTask {
    path: PathBuf,
    file: Option<File>,
    done: bool,
}

impl ReadIndexTask {
    /// Creates a task reading the cache at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            done: false,
        }
    }

    /// Reconciles a loaded index with the archive it is meant for.
    fn validate(mut store: IndexStore, session: &Session) -> IndexStore {
        let current = session.archive_timestamp();
        let entry_count = session.entry_count();

        if store.highest_seen() > entry_count {
            log::warn!(
                "index cache covers {} entries but the archive has {}; discarding it",
                store.highest_seen(),
                entry_count
            );
            return IndexStore::new();
        }

        match store.source_timestamp().cmp(&current) {
            Ordering::Equal => {}
            Ordering::Less => {
                let stale = Error::CacheStale {
                    cached: store.source_timestamp(),
                    current,
                };
                log::info!("{}; resuming from entry {}", stale, store.highest_seen());
                store.set_source_timestamp(current);
            }
            Ordering::Greater => {
                log::warn!(
                    "index cache is newer than the archive ({} > {}); discarding it",
                    store.source_timestamp(),
                    current
                );
                return IndexStore::new();
            }
        }
        store
    }
}

impl Task<Session> for ReadIndexTask {
    fn init(&mut self, _session: &mut Session) -> bool {
        match File::open(&self.path) {
            Ok(file) => {
                self.file = Some(file);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let miss = Error::CacheMiss {
                    path: self.path.clone(),
                };
                log::info!("{}", miss);
                false
            }
            Err(e) => {
                log::warn!("cannot open index cache '{}': {}", self.path.display(), e);
                false
            }
        }
    }

    fn perform(&mut self, session: &mut Session) {
        let Some(file) = self.file.take() else {
            self.done = true;
            return;
        };

        let store = match cache::read_index(BufReader::new(file)) {
            Ok(store) => {
                log::info!(
                    "loaded index cache '{}' ({} entries)",
                    self.path.display(),
                    store.len()
                );
                Self::validate(store, session)
            }
            Err(e) => {
                log::warn!("discarding index cache '{}': {}", self.path.display(), e);
                IndexStore::new()
            }
        };
        *session.store_mut() = store;
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn abort(&mut self, _session: &mut Session) {
        self.file = None;
        self.done = true;
    }

    fn max_progress(&self) -> u64 {
        1
    }

    fn current_progress(&self) -> u64 {
        self.done as u64
    }

    fn status_text(&self) -> String {
        "Reading index".to_string()
    }
}
