//! Progress bar implementation for CLI operations.

use std::sync::Arc;

use datscope::progress::{AtomicProgress, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress display for indexing tasks
///
/// One bar is reused for every task the scheduler runs. Cancellation comes
/// from a shared [`AtomicProgress`], which the Ctrl+C handler flips.
pub struct CliProgress {
    bar: ProgressBar,
    cancel: Arc<AtomicProgress>,
    quiet: bool,
}

impl CliProgress {
    /// Creates a new progress display
    pub fn new(cancel: Arc<AtomicProgress>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        };

        Self { bar, cancel, quiet }
    }

    /// Returns `true` once Ctrl+C was pressed
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Finishes the progress display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Finishes with a custom message
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.bar.abandon_with_message(msg.into());
    }
}

impl ProgressReporter for CliProgress {
    fn on_start(&mut self, status: &str, max: u64) {
        self.cancel.on_start(status, max);
        if self.quiet {
            return;
        }
        self.bar.reset();
        self.bar.set_length(max);
        self.bar.set_message(status.to_string());
    }

    fn on_progress(&mut self, current: u64, max: u64, status: &str) -> bool {
        if !self.quiet {
            self.bar.set_length(max);
            self.bar.set_position(current);
            self.bar.set_message(status.to_string());
        }
        self.cancel.on_progress(current, max, status)
    }

    fn on_finish(&mut self, status: &str) {
        self.cancel.on_finish(status);
        if !self.quiet {
            self.bar.set_position(self.bar.length().unwrap_or(0));
        }
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}
