//! Single-slot task scheduler.

use super::Task;
use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// A completion handler.
///
/// Handlers receive the context and the scheduler, so they can inspect the
/// results and request a follow-up task. The finished task has already left
/// the active slot when handlers run.
pub type Completion<C> = Box<dyn FnOnce(&mut C, &mut Scheduler<C>)>;

struct ActiveTask<C> {
    task: Box<dyn Task<C>>,
    on_complete: Vec<Completion<C>>,
    started: bool,
}

/// Owns at most one active [`Task`] and steps it to completion.
pub struct Scheduler<C> {
    active: Option<ActiveTask<C>>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("active", &self.active_status())
            .finish()
    }
}

impl<C> Scheduler<C> {
    /// Creates an idle scheduler.
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Returns `true` while a task is active.
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Returns the status text of the active task.
    pub fn active_status(&self) -> Option<String> {
        self.active.as_ref().map(|a| a.task.status_text())
    }

    /// Returns `true` if there is an active task and it can be aborted now.
    pub fn can_abort_active(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.task.can_abort())
    }

    /// Makes `task` the active task.
    ///
    /// An abortable active task is aborted and discarded first; its
    /// completion handlers do not run. Returns `Ok(false)` if the new task's
    /// [`init`](Task::init) declined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskRejected`] if the active task cannot be aborted.
    /// The active task is left untouched and `task` is dropped without its
    /// `init` being called.
    pub fn request(&mut self, mut task: Box<dyn Task<C>>, ctx: &mut C) -> Result<bool> {
        if let Some(active) = self.active.as_mut() {
            let status = active.task.status_text();
            if !active.task.can_abort() {
                log::warn!(
                    "rejected task '{}': '{}' cannot be aborted",
                    task.status_text(),
                    status
                );
                return Err(Error::TaskRejected { active: status });
            }
            active.task.abort(ctx);
            self.active = None;
            log::info!("aborted task '{}' to make room for a new one", status);
        }

        if !task.init(ctx) {
            log::info!("task '{}' declined to start", task.status_text());
            return Ok(false);
        }
        log::info!("accepted task '{}'", task.status_text());
        self.active = Some(ActiveTask {
            task,
            on_complete: Vec::new(),
            started: false,
        });
        Ok(true)
    }

    /// Registers a handler on the active task.
    ///
    /// Returns `false` (dropping the handler) when no task is active.
    pub fn add_on_complete(&mut self, handler: Completion<C>) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.on_complete.push(handler);
                true
            }
            None => false,
        }
    }

    /// Advances the active task by one step.
    ///
    /// Progress goes to `reporter`; if it asks to stop and the task can
    /// abort, the task is aborted. When the task is done its slot is cleared
    /// and its completion handlers run in registration order.
    ///
    /// Returns `true` while a task is still active afterwards.
    pub fn step(&mut self, ctx: &mut C, reporter: &mut dyn ProgressReporter) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.started {
            active.started = true;
            reporter.on_start(&active.task.status_text(), active.task.max_progress());
        }

        if !active.task.is_done() {
            active.task.perform(ctx);
            let keep_going = reporter.on_progress(
                active.task.current_progress(),
                active.task.max_progress(),
                &active.task.status_text(),
            );
            if !keep_going && !active.task.is_done() && active.task.can_abort() {
                log::info!("aborting task '{}' on request", active.task.status_text());
                active.task.abort(ctx);
            }
        }

        if active.task.is_done() {
            self.finish(ctx, reporter);
        }
        self.active.is_some()
    }

    /// Steps until no task is active, including tasks requested by
    /// completion handlers.
    pub fn run_until_idle(&mut self, ctx: &mut C, reporter: &mut dyn ProgressReporter) {
        while self.step(ctx, reporter) {}
    }

    /// Aborts the active task if it can be aborted.
    ///
    /// With `notify` the task's completion handlers run as if it had
    /// finished; otherwise they are dropped. Returns `false` if there was no
    /// task or it could not be aborted.
    pub fn abort_active(&mut self, ctx: &mut C, notify: bool) -> bool {
        if !self.can_abort_active() {
            return false;
        }
        let Some(mut active) = self.active.take() else {
            return false;
        };
        let status = active.task.status_text();
        active.task.abort(ctx);
        log::info!("aborted task '{}'", status);
        if notify {
            for handler in active.on_complete {
                handler(ctx, self);
            }
        }
        true
    }

    fn finish(&mut self, ctx: &mut C, reporter: &mut dyn ProgressReporter) {
        let Some(finished) = self.active.take() else {
            return;
        };
        let status = finished.task.status_text();
        reporter.on_finish(&status);
        log::info!("task '{}' completed", status);
        for handler in finished.on_complete {
            handler(ctx, self);
        }
    }
}
