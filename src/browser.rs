//! Host orchestration for an archive browser.
//!
//! [`Browser`] ties the pieces together the way an interactive front end
//! uses them: it opens an archive, loads or rebuilds its index through
//! background tasks, serves raw entries for viewing and persists the index
//! on shutdown. It has no user interface; the caller drives it by calling
//! [`pump`](Browser::pump) whenever it has spare time.
//!
//! # Example
//!
//! ```rust,no_run
//! use datscope::progress::NoProgress;
//! use datscope::{Browser, IndexerConfig};
//!
//! let mut browser = Browser::new(IndexerConfig::default());
//! browser.open("Gw2.dat")?;
//! browser.run_until_idle(&mut NoProgress);
//! println!("{} entries indexed", browser.store().len());
//!
//! let reader = browser.view_entry(16)?;
//! println!("entry 16 decodes as {}", reader.kind());
//!
//! browser.close(&mut NoProgress);
//! # Ok::<(), datscope::Error>(())
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use crate::config::IndexerConfig;
use crate::dat::{DatArchive, EntrySource, modification_time};
use crate::format::{FileReader, identify_file_type};
use crate::index::IndexStore;
use crate::progress::{NoProgress, ProgressReporter};
use crate::session::{CloseState, Session};
use crate::task::{ReadIndexTask, ScanTask, Scheduler, Task, WriteIndexTask, WriteOutcome};
use crate::{Error, Result};

/// An archive, its index and the task scheduler that maintains it.
pub struct Browser {
    session: Session,
    scheduler: Scheduler<Session>,
    entry_cache: LruCache<u32, Vec<u8>>,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("session", &self.session)
            .field("scheduler", &self.scheduler)
            .field("cached_entries", &self.entry_cache.len())
            .finish()
    }
}

impl Browser {
    /// Creates a browser with no archive open.
    pub fn new(config: IndexerConfig) -> Self {
        let capacity: NonZeroUsize = config.entry_cache_capacity;
        Self {
            session: Session::new(config),
            scheduler: Scheduler::new(),
            entry_cache: LruCache::new(capacity),
        }
    }

    /// Opens an archive file and starts loading its index.
    ///
    /// The cached index is read in the background; if there is none, or it
    /// is unusable, a full scan follows. If it covers only part of the
    /// archive, the scan resumes after the last indexed entry.
    ///
    /// # Errors
    ///
    /// Returns an open failure if the archive cannot be read. No state
    /// changes in that case.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let archive = DatArchive::open_path(path)?;
        let timestamp = modification_time(path)?;
        self.open_source(Box::new(archive), path, timestamp)
    }

    /// Opens an already constructed entry source.
    ///
    /// `archive_path` keys the index cache and `timestamp` stands in for the
    /// archive's modification time. A previously open archive is closed
    /// first, so its index is persisted if it changed.
    pub fn open_source(
        &mut self,
        source: Box<dyn EntrySource>,
        archive_path: impl AsRef<Path>,
        timestamp: u64,
    ) -> Result<()> {
        let archive_path = archive_path.as_ref();
        let cache_path = self.session.config().cache_path_for(archive_path)?;
        self.close_previous();

        self.session.attach(
            source,
            Some(archive_path.to_path_buf()),
            timestamp,
            Some(cache_path.clone()),
        );
        self.entry_cache.clear();

        let read = ReadIndexTask::new(cache_path);
        match self.scheduler.request(Box::new(read), &mut self.session) {
            Ok(true) => {
                self.scheduler.add_on_complete(Box::new(Self::on_read_complete));
            }
            _ => {
                Self::start_reindex(&mut self.session, &mut self.scheduler, false)?;
            }
        }
        Ok(())
    }

    /// Submits a task to the scheduler.
    ///
    /// Returns `Ok(false)` if the task declined to start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskRejected`] while a task that cannot be aborted
    /// is running.
    pub fn request_task(&mut self, task: Box<dyn Task<Session>>) -> Result<bool> {
        self.scheduler.request(task, &mut self.session)
    }

    /// Clears the index and rescans the whole archive, then persists it.
    pub fn reindex(&mut self) -> Result<bool> {
        Self::ensure_open(&self.session)?;
        Self::start_reindex(&mut self.session, &mut self.scheduler, true)
    }

    /// Scans entries added since the last scan, then persists the index.
    pub fn index_more(&mut self) -> Result<bool> {
        Self::ensure_open(&self.session)?;
        Self::start_scan(&mut self.session, &mut self.scheduler, true)
    }

    /// Advances the active task by one step.
    ///
    /// Returns `true` while work remains.
    pub fn pump(&mut self, reporter: &mut dyn ProgressReporter) -> bool {
        self.scheduler.step(&mut self.session, reporter)
    }

    /// Steps until every task, including follow-up tasks, has finished.
    pub fn run_until_idle(&mut self, reporter: &mut dyn ProgressReporter) {
        self.scheduler.run_until_idle(&mut self.session, reporter);
    }

    /// Reads an entry for viewing and classifies it.
    ///
    /// The declared type comes from the index when the entry is indexed and
    /// from the entry's bytes otherwise. Recently viewed entries are served
    /// from memory.
    pub fn view_entry(&mut self, entry_id: u32) -> Result<FileReader> {
        let data = match self.entry_cache.get(&entry_id) {
            Some(data) => data.clone(),
            None => {
                let entry_count = self.session.entry_count();
                let archive = self
                    .session
                    .archive_mut()
                    .ok_or(Error::EntryOutOfRange {
                        entry_id,
                        entry_count,
                    })?;
                let data = archive.read_entry(entry_id)?;
                self.entry_cache.put(entry_id, data.clone());
                data
            }
        };

        let hint = match self.session.store().entry_by_id(entry_id) {
            Some(entry) => entry.file_type,
            None => identify_file_type(&data),
        };
        Ok(FileReader::for_data(data, hint))
    }

    /// Begins shutdown.
    ///
    /// An abortable task is aborted; a task that cannot be aborted is allowed
    /// to finish first. If the index is dirty a single write is attempted;
    /// it is never retried. Returns `true` if the browser closed right away,
    /// `false` if tasks must be pumped to finish closing.
    pub fn request_close(&mut self) -> bool {
        Self::try_close(&mut self.session, &mut self.scheduler);
        self.is_closed()
    }

    /// Shuts down, driving any remaining tasks to completion.
    ///
    /// Returns `true` if the index was persisted or had nothing to persist.
    pub fn close(&mut self, reporter: &mut dyn ProgressReporter) -> bool {
        if !self.request_close() {
            self.run_until_idle(reporter);
        }
        !self.session.store().is_dirty()
    }

    /// Returns `true` once shutdown completed.
    pub fn is_closed(&self) -> bool {
        self.session.close_state == CloseState::Closed
    }

    /// Returns `true` while a task is active.
    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    /// Returns the status text of the active task.
    pub fn status(&self) -> Option<String> {
        self.scheduler.active_status()
    }

    /// Returns the index.
    pub fn store(&self) -> &IndexStore {
        self.session.store()
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the number of entries in the open archive.
    pub fn entry_count(&self) -> u32 {
        self.session.entry_count()
    }

    /// Returns the index cache path of the open archive.
    pub fn cache_path(&self) -> Option<&Path> {
        self.session.cache_path()
    }

    /// Returns the path of the open archive.
    pub fn archive_path(&self) -> Option<PathBuf> {
        self.session.archive_path().map(Path::to_path_buf)
    }

    /// Returns the outcome of the most recent cache write.
    pub fn last_write(&self) -> Option<&WriteOutcome> {
        self.session.last_write()
    }

    fn ensure_open(session: &Session) -> Result<()> {
        if session.cache_path().is_none() {
            return Err(Error::InvalidArchive("no archive is open".into()));
        }
        Ok(())
    }

    /// Closes the previous archive and drops whatever it left running.
    fn close_previous(&mut self) {
        if self.session.cache_path().is_some() {
            self.close(&mut NoProgress);
        }
        self.discard_active_task();
    }

    fn discard_active_task(&mut self) {
        if !self.scheduler.abort_active(&mut self.session, false) && self.scheduler.is_busy() {
            // A write in flight finishes against the old archive
            self.scheduler.run_until_idle(&mut self.session, &mut NoProgress);
        }
    }

    fn on_read_complete(session: &mut Session, scheduler: &mut Scheduler<Session>) {
        if session.is_closing() {
            return;
        }
        let store = session.store();
        if store.source_timestamp() == 0 || store.is_empty() {
            log::info!("no usable index cache; rebuilding the index");
            let started = Self::start_reindex(session, scheduler, false);
            Self::check_started("rebuild", started);
        } else if store.highest_seen() != session.entry_count() {
            log::info!(
                "index cache covers {} of {} entries; resuming scan",
                store.highest_seen(),
                session.entry_count()
            );
            let started = Self::start_scan(session, scheduler, false);
            Self::check_started("resumed scan", started);
        } else {
            log::info!("index cache is complete");
        }
    }

    fn on_scan_complete(session: &mut Session, scheduler: &mut Scheduler<Session>) {
        if session.is_closing() {
            return;
        }
        let Some(path) = session.cache_path().map(Path::to_path_buf) else {
            return;
        };
        if let Err(e) = scheduler.request(Box::new(WriteIndexTask::new(path)), session) {
            log::warn!("index not persisted: {}", e);
        }
    }

    /// Logs a follow-up scan that failed to start. Returns `true` if it
    /// started.
    fn check_started(what: &str, started: Result<bool>) -> bool {
        match started {
            Ok(true) => true,
            Ok(false) => {
                log::warn!("{} did not start; index left incomplete", what);
                false
            }
            Err(e) => {
                log::warn!("{} not started: {}", what, e);
                false
            }
        }
    }

    fn start_reindex(
        session: &mut Session,
        scheduler: &mut Scheduler<Session>,
        persist: bool,
    ) -> Result<bool> {
        let timestamp = session.archive_timestamp();
        let store = session.store_mut();
        store.clear();
        store.set_source_timestamp(timestamp);
        Self::start_scan(session, scheduler, persist)
    }

    fn start_scan(
        session: &mut Session,
        scheduler: &mut Scheduler<Session>,
        persist: bool,
    ) -> Result<bool> {
        let accepted = scheduler.request(Box::new(ScanTask::new()), session)?;
        if accepted && persist {
            scheduler.add_on_complete(Box::new(Self::on_scan_complete));
        }
        Ok(accepted)
    }

    fn try_close(session: &mut Session, scheduler: &mut Scheduler<Session>) {
        if session.close_state == CloseState::Closed {
            return;
        }
        session.close_state = CloseState::Closing;

        if scheduler.is_busy() {
            if scheduler.can_abort_active() {
                scheduler.abort_active(session, true);
            } else {
                log::info!("waiting for the active task before closing");
                scheduler.add_on_complete(Box::new(Self::try_close));
                return;
            }
        }

        if !session.close_write_attempted && session.store().is_dirty() {
            if let Some(path) = session.cache_path().map(Path::to_path_buf) {
                session.close_write_attempted = true;
                let write = Box::new(WriteIndexTask::new(path));
                if let Ok(true) = scheduler.request(write, session) {
                    scheduler.add_on_complete(Box::new(Self::mark_closed));
                    return;
                }
            }
        }
        session.close_state = CloseState::Closed;
    }

    fn mark_closed(session: &mut Session, _: &mut Scheduler<Session>) {
        session.close_state = CloseState::Closed;
    }
}
