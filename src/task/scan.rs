//! Incremental archive scanning.
//!
//! A scan visits the half-open id range `[highest_seen, entry_count)`, one
//! entry per step. Each entry's leading bytes are identified, resolved to a
//! decoder and filed into the category tree. Progress is committed after
//! every entry, so an aborted scan leaves a valid index that a later scan
//! resumes from.

use super::Task;
use crate::config::MIN_SNIFF_LEN;
use crate::format::{identify_file_type, resolve};
use crate::index::categorize::{categorize, display_name};
use crate::session::Session;

/// Lifecycle of a [`ScanTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Not yet initialized.
    Pending,
    /// Visiting entries.
    Scanning,
    /// Every entry in the range was visited.
    Done,
    /// Stopped early; entries visited so far are kept.
    Aborted,
}

/// Scans archive entries into the session's index.
#[derive(Debug)]
pub struct ScanTask {
    state: ScanState,
    start: u32,
    end: u32,
    current: u32,
    indexed: u32,
}

impl Default for ScanTask {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanTask {
    /// Creates a scan that resumes where the index left off.
    pub fn new() -> Self {
        Self {
            state: ScanState::Pending,
            start: 0,
            end: 0,
            current: 0,
            indexed: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Returns the id range this scan covers.
    pub fn range(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }

    /// Returns the number of entries added to the index so far.
    pub fn indexed(&self) -> u32 {
        self.indexed
    }

    fn scan_entry(&mut self, session: &mut Session, entry_id: u32) {
        let sniff_len = session.config().sniff_len.max(MIN_SNIFF_LEN);
        let (archive, store) = session.archive_and_store();
        let Some(archive) = archive else {
            return;
        };

        let data = match archive.peek_entry(entry_id, sniff_len) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("skipping unreadable entry {}: {}", entry_id, e);
                return;
            }
        };
        if data.is_empty() {
            log::debug!("skipping empty entry {}", entry_id);
            return;
        }

        let file_type = identify_file_type(&data);
        let kind = resolve(file_type, &data);
        let path = categorize(entry_id, file_type, &data);
        let category = store.add_category_path(&path[..]);
        if store.insert(entry_id, file_type, kind, category, display_name(entry_id)) {
            self.indexed += 1;
        }
    }
}

impl Task<Session> for ScanTask {
    fn init(&mut self, session: &mut Session) -> bool {
        if session.archive_mut().is_none() {
            log::warn!("cannot scan: no archive is open");
            return false;
        }
        self.start = session.store().highest_seen();
        self.end = session.entry_count();
        if self.start > self.end {
            log::warn!(
                "index covers {} entries but the archive only has {}",
                self.start,
                self.end
            );
            return false;
        }
        self.current = self.start;
        self.state = if self.start == self.end {
            ScanState::Done
        } else {
            ScanState::Scanning
        };
        log::info!("scanning entries {}..{}", self.start, self.end);
        true
    }

    fn perform(&mut self, session: &mut Session) {
        if self.state != ScanState::Scanning {
            return;
        }
        if self.current < self.end {
            let entry_id = self.current;
            self.scan_entry(session, entry_id);
            self.current += 1;
            session.store_mut().advance_highest_seen(self.current);
        }
        if self.current >= self.end {
            session.store_mut().advance_highest_seen(self.end);
            self.state = ScanState::Done;
            log::info!(
                "scan finished: {} of {} entries indexed",
                self.indexed,
                self.end - self.start
            );
        }
    }

    fn is_done(&self) -> bool {
        matches!(self.state, ScanState::Done | ScanState::Aborted)
    }

    fn abort(&mut self, _session: &mut Session) {
        if !self.is_done() {
            log::info!("scan aborted at entry {} of {}", self.current, self.end);
            self.state = ScanState::Aborted;
        }
    }

    fn max_progress(&self) -> u64 {
        (self.end - self.start) as u64
    }

    fn current_progress(&self) -> u64 {
        (self.current - self.start) as u64
    }

    fn status_text(&self) -> String {
        match self.state {
            ScanState::Pending => "Scanning archive".to_string(),
            _ => format!("Scanning entry {} of {}", self.current, self.end),
        }
    }
}
