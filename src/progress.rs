//! Progress reporting for background tasks.
//!
//! The scheduler reports every step of the active task through a
//! [`ProgressReporter`]. Reporters support:
//! - Cancellation signaling (return false to request an abort)
//! - Rate limiting callbacks to reduce overhead
//!
//! # Example
//!
//! ```rust
//! use datscope::progress::{ProgressReporter, StatisticsProgress};
//!
//! let mut progress = StatisticsProgress::new();
//! progress.on_start("Scanning archive", 100);
//! progress.on_progress(25, 100, "Scanning entry 25 of 100");
//! assert_eq!(progress.state().current, 25);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const BYTES_KIB: u64 = 1024;
const BYTES_MIB: u64 = 1024 * BYTES_KIB;
const BYTES_GIB: u64 = 1024 * BYTES_MIB;

/// Progress reporting trait for background tasks.
///
/// Returning `false` from [`on_progress`](Self::on_progress) requests that
/// the active task be aborted. The request is honoured only while the task
/// reports that it can abort.
pub trait ProgressReporter: Send {
    /// Called once when a task becomes active, with its status text and
    /// maximum progress value.
    fn on_start(&mut self, status: &str, max: u64) {
        let _ = (status, max);
    }

    /// Called after every step of the active task.
    ///
    /// Returns `true` to continue or `false` to request an abort.
    fn on_progress(&mut self, current: u64, max: u64, status: &str) -> bool {
        let _ = (current, max, status);
        true
    }

    /// Called once when the active task is done, before its completion
    /// handlers run.
    fn on_finish(&mut self, status: &str) {
        let _ = status;
    }

    /// Checks if cancellation has been requested.
    ///
    /// Default implementation returns `false` (no cancellation).
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Progress state collected by [`StatisticsProgress`].
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Maximum progress value of the current task.
    pub max: u64,
    /// Current progress value.
    pub current: u64,
    /// Status text of the current task.
    pub status: Option<String>,
    /// Number of tasks that finished.
    pub tasks_finished: usize,
    /// Start time of the current task.
    pub start_time: Instant,
    /// Time of last update.
    pub last_update: Instant,
}

impl Default for ProgressState {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            max: 0,
            current: 0,
            status: None,
            tasks_finished: 0,
            start_time: now,
            last_update: now,
        }
    }
}

impl ProgressState {
    /// Creates a new progress state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            (self.current as f64 / self.max as f64) * 100.0
        }
    }
}

/// A progress reporter that does nothing (null object pattern).
#[derive(Debug, Default, Clone)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A progress reporter that collects statistics.
#[derive(Debug, Default, Clone)]
pub struct StatisticsProgress {
    /// The progress state.
    pub state: ProgressState,
    /// Whether cancellation was requested.
    pub cancelled: bool,
    /// Number of progress callbacks received.
    pub steps: u64,
}

impl StatisticsProgress {
    /// Creates a new statistics progress reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected state.
    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

impl ProgressReporter for StatisticsProgress {
    fn on_start(&mut self, status: &str, max: u64) {
        let now = Instant::now();
        self.state.max = max;
        self.state.current = 0;
        self.state.status = Some(status.to_string());
        self.state.start_time = now;
        self.state.last_update = now;
    }

    fn on_progress(&mut self, current: u64, max: u64, status: &str) -> bool {
        self.steps += 1;
        self.state.current = current;
        self.state.max = max;
        self.state.status = Some(status.to_string());
        self.state.last_update = Instant::now();
        !self.cancelled
    }

    fn on_finish(&mut self, _status: &str) {
        self.state.tasks_finished += 1;
        self.state.status = None;
    }

    fn should_cancel(&self) -> bool {
        self.cancelled
    }
}

/// A progress reporter that rate-limits callbacks.
///
/// Useful for scans that step tens of thousands of times per second.
pub struct ThrottledProgress<P> {
    inner: P,
    min_interval: Duration,
    last_callback: Instant,
}

impl<P: ProgressReporter> ThrottledProgress<P> {
    /// Creates a new throttled progress reporter.
    ///
    /// `min_interval` is the minimum time between progress callbacks.
    pub fn new(inner: P, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_callback: Instant::now(),
        }
    }

    /// Creates with default 100ms interval.
    pub fn default_interval(inner: P) -> Self {
        Self::new(inner, Duration::from_millis(100))
    }

    /// Returns a reference to the inner reporter.
    pub fn get_ref(&self) -> &P {
        &self.inner
    }

    /// Returns the inner reporter.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: ProgressReporter> ProgressReporter for ThrottledProgress<P> {
    fn on_start(&mut self, status: &str, max: u64) {
        self.inner.on_start(status, max);
    }

    fn on_progress(&mut self, current: u64, max: u64, status: &str) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_callback);

        // Always call on completion
        if current >= max || elapsed >= self.min_interval {
            self.last_callback = now;
            self.inner.on_progress(current, max, status)
        } else {
            !self.inner.should_cancel()
        }
    }

    fn on_finish(&mut self, status: &str) {
        self.inner.on_finish(status);
    }

    fn should_cancel(&self) -> bool {
        self.inner.should_cancel()
    }
}

/// A thread-safe progress reporter using atomics.
///
/// Allows progress to be monitored, and cancellation requested, from another
/// thread such as a signal handler.
#[derive(Debug)]
pub struct AtomicProgress {
    max: AtomicU64,
    current: AtomicU64,
    cancelled: AtomicBool,
    start_time: Instant,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Creates a new atomic progress reporter.
    pub fn new() -> Self {
        Self {
            max: AtomicU64::new(0),
            current: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the maximum progress value.
    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Returns the current progress value.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns completion percentage (0.0 - 100.0).
    pub fn percentage(&self) -> f64 {
        let max = self.max();
        if max == 0 {
            0.0
        } else {
            (self.current() as f64 / max as f64) * 100.0
        }
    }

    /// Returns elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn record_start(&self, max: u64) {
        self.max.store(max, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
    }

    fn record_progress(&self, current: u64, max: u64) -> bool {
        self.current.store(current, Ordering::Relaxed);
        self.max.store(max, Ordering::Relaxed);
        !self.is_cancelled()
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_start(&mut self, _status: &str, max: u64) {
        self.record_start(max);
    }

    fn on_progress(&mut self, current: u64, max: u64, _status: &str) -> bool {
        self.record_progress(current, max)
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// Progress reporter for shared `Arc<AtomicProgress>`.
impl ProgressReporter for Arc<AtomicProgress> {
    fn on_start(&mut self, _status: &str, max: u64) {
        self.record_start(max);
    }

    fn on_progress(&mut self, current: u64, max: u64, _status: &str) -> bool {
        self.record_progress(current, max)
    }

    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    /// Creates a progress reporter from a closure.
    ///
    /// The closure receives (current, max) and returns `true` to continue or
    /// `false` to request an abort.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    fn on_progress(&mut self, current: u64, max: u64, _status: &str) -> bool {
        (self.callback)(current, max)
    }
}

/// Creates a closure-based progress reporter.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    ClosureProgress::new(f)
}

/// Formats a duration as a human-readable string.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Formats bytes as a human-readable string using IEC units (KiB, MiB, GiB).
///
/// # Examples
///
/// ```rust
/// use datscope::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(512), "512 B");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// assert_eq!(format_bytes_iec(1048576), "1.0 MiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes < BYTES_KIB {
        format!("{} B", bytes)
    } else if bytes < BYTES_MIB {
        format!("{:.1} KiB", value / BYTES_KIB as f64)
    } else if bytes < BYTES_GIB {
        format!("{:.1} MiB", value / BYTES_MIB as f64)
    } else {
        format!("{:.1} GiB", value / BYTES_GIB as f64)
    }
}
