//! Cooperative background tasks.
//!
//! Long-running work (reading the index cache, scanning the archive, writing
//! the cache) is split into tasks that advance one bounded step per call to
//! [`Task::perform`]. A [`Scheduler`] owns at most one active task, steps it
//! whenever the host has time, and fires the task's completion handlers once
//! it is done.
//!
//! Tasks receive their working context by mutable reference on every call
//! instead of holding it, so the host can inspect the context between steps.
//!
//! # Example
//!
//! ```rust
//! use datscope::progress::NoProgress;
//! use datscope::task::{Scheduler, Task};
//!
//! struct Count {
//!     left: u32,
//! }
//!
//! impl Task<Vec<u32>> for Count {
//!     fn init(&mut self, _ctx: &mut Vec<u32>) -> bool {
//!         true
//!     }
//!     fn perform(&mut self, ctx: &mut Vec<u32>) {
//!         ctx.push(self.left);
//!         self.left -= 1;
//!     }
//!     fn is_done(&self) -> bool {
//!         self.left == 0
//!     }
//!     fn abort(&mut self, _ctx: &mut Vec<u32>) {
//!         self.left = 0;
//!     }
//!     fn max_progress(&self) -> u64 {
//!         3
//!     }
//!     fn current_progress(&self) -> u64 {
//!         3 - self.left as u64
//!     }
//!     fn status_text(&self) -> String {
//!         "Counting down".into()
//!     }
//! }
//!
//! let mut ctx = Vec::new();
//! let mut scheduler = Scheduler::new();
//! scheduler.request(Box::new(Count { left: 3 }), &mut ctx)?;
//! scheduler.run_until_idle(&mut ctx, &mut NoProgress);
//! assert_eq!(ctx, vec![3, 2, 1]);
//! # Ok::<(), datscope::Error>(())
//! ```

pub mod read_index;
pub mod scan;
pub mod scheduler;
pub mod write_index;

pub use read_index::ReadIndexTask;
pub use scan::{ScanState, ScanTask};
pub use scheduler::{Completion, Scheduler};
pub use write_index::{WriteIndexTask, WriteOutcome};

/// A unit of steppable, abortable, progress-reporting work over a context `C`.
pub trait Task<C> {
    /// Performs setup that can fail cheaply.
    ///
    /// Returning `false` rejects the task; it is discarded without ever being
    /// stepped and none of its completion handlers run.
    fn init(&mut self, ctx: &mut C) -> bool;

    /// Executes one bounded increment of work.
    ///
    /// Must return promptly regardless of the total amount of work.
    fn perform(&mut self, ctx: &mut C);

    /// Returns `true` once the task reached a terminal state.
    fn is_done(&self) -> bool;

    /// Returns `true` if [`abort`](Self::abort) may be called right now.
    ///
    /// `false` during critical sections that must not be interrupted.
    fn can_abort(&self) -> bool {
        true
    }

    /// Ends the task early. Only called while [`can_abort`](Self::can_abort)
    /// holds; afterwards [`is_done`](Self::is_done) must return `true`.
    fn abort(&mut self, ctx: &mut C);

    /// Returns the progress value at completion.
    fn max_progress(&self) -> u64;

    /// Returns the current progress value.
    fn current_progress(&self) -> u64;

    /// Returns a short description of the current activity.
    fn status_text(&self) -> String;
}
