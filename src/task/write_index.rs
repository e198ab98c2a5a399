//! Persisting the index to its cache file.

use std::path::PathBuf;

use super::Task;
use crate::index::cache;
use crate::session::Session;

/// Result of the most recent cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The cache was written.
    Written {
        /// Cache file path.
        path: PathBuf,
        /// Number of entries persisted.
        entries: usize,
    },
    /// The cache could not be written; the index stays dirty.
    Failed {
        /// Cache file path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

impl WriteOutcome {
    /// Returns `true` for [`WriteOutcome::Written`].
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Writes the session's index to a cache file in a single step.
///
/// The task cannot be aborted once accepted: the write is a critical
/// section. Failures are recorded on the session and never retried.
#[derive(Debug)]
pub struct WriteIndexTask {
    path: PathBuf,
    in_flight: bool,
    done: bool,
}

impl WriteIndexTask {
    /// Creates a task writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            in_flight: false,
            done: false,
        }
    }
}

impl Task<Session> for WriteIndexTask {
    fn init(&mut self, _session: &mut Session) -> bool {
        self.in_flight = true;
        true
    }

    fn perform(&mut self, session: &mut Session) {
        let outcome = match cache::save(&self.path, session.store()) {
            Ok(()) => {
                session.store_mut().mark_clean();
                WriteOutcome::Written {
                    path: self.path.clone(),
                    entries: session.store().len(),
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                WriteOutcome::Failed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
            }
        };
        session.record_write(outcome);
        self.in_flight = false;
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn can_abort(&self) -> bool {
        !self.in_flight
    }

    fn abort(&mut self, _session: &mut Session) {
        self.done = true;
    }

    fn max_progress(&self) -> u64 {
        1
    }

    fn current_progress(&self) -> u64 {
        self.done as u64
    }

    fn status_text(&self) -> String {
        "Writing index".to_string()
    }
}
