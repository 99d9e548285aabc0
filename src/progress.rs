//! Observer trait for workflow events, and the simulated upload progress ticker.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::workflow::Workflow::with_observer`] to receive phase changes,
//! status lines and upload progress as they happen.
//!
//! # Example
//!
//! ```rust
//! use pdfer::{Phase, WorkflowObserver};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct PhaseLog(Mutex<Vec<Phase>>);
//!
//! impl WorkflowObserver for PhaseLog {
//!     fn on_phase_change(&self, _from: Phase, to: Phase) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let log: Arc<dyn WorkflowObserver> = Arc::new(PhaseLog::default());
//! log.on_phase_change(Phase::Empty, Phase::Selected);
//! ```
//!
//! # Simulated progress
//!
//! The service does not report upload progress, so [`ProgressTicker`] fakes
//! it: a `tokio` task that adds a fixed step every tick and stops at a
//! ceiling below 100%. When the request settles the ticker is aborted and the
//! observer sees exactly one final 100%. Dropping the ticker aborts the task
//! too, so an abandoned upload never leaves a periodic task running.

use crate::session::Phase;
use crate::status::Status;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Receives workflow events.
///
/// Implementations must be `Send + Sync`: upload progress is reported from
/// the ticker task. All methods default to no-ops.
pub trait WorkflowObserver: Send + Sync {
    /// Upload progress in percent, 0–100.
    fn on_upload_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// The session moved from one phase to another.
    fn on_phase_change(&self, from: Phase, to: Phase) {
        let _ = (from, to);
    }

    /// The status line was replaced.
    fn on_status(&self, status: &Status) {
        let _ = status;
    }
}

/// A no-op observer; the default when none is configured.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::workflow::Workflow`].
pub type Observer = Arc<dyn WorkflowObserver>;

/// Cancellable periodic task that simulates upload progress.
///
/// Must be started inside a Tokio runtime.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
    observer: Observer,
}

impl std::fmt::Debug for ProgressTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTicker")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl ProgressTicker {
    /// Report 0% and start ticking towards `ceiling`.
    pub fn start(observer: Observer, tick: Duration, step: u8, ceiling: u8) -> Self {
        observer.on_upload_progress(0);

        let task_observer = Arc::clone(&observer);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            let mut percent = 0u8;
            while percent < ceiling {
                interval.tick().await;
                percent = percent.saturating_add(step).min(ceiling);
                task_observer.on_upload_progress(percent);
            }
        });

        Self { handle, observer }
    }

    /// Stop ticking and snap to 100%.
    pub fn finish(self) {
        self.handle.abort();
        self.observer.on_upload_progress(100);
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        percents: Mutex<Vec<u8>>,
        statuses: AtomicUsize,
    }

    impl Recorder {
        fn percents(&self) -> Vec<u8> {
            self.percents.lock().unwrap().clone()
        }
    }

    impl WorkflowObserver for Recorder {
        fn on_upload_progress(&self, percent: u8) {
            self.percents.lock().unwrap().push(percent);
        }

        fn on_status(&self, _status: &Status) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn run_for(ms: u64) {
        for _ in 0..ms / 10 {
            tokio::time::advance(Duration::from_millis(10)).await;
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_upload_progress(50);
        o.on_phase_change(Phase::Empty, Phase::Selected);
        o.on_status(&Status::neutral("hi"));
    }

    #[test]
    fn arc_dyn_observer_works() {
        let recorder = Arc::new(Recorder::default());
        let o: Observer = recorder.clone();
        o.on_status(&Status::success("done"));
        o.on_upload_progress(10);
        assert_eq!(recorder.statuses.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.percents(), vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_ramps_but_never_passes_ceiling() {
        let recorder = Arc::new(Recorder::default());
        let ticker = ProgressTicker::start(recorder.clone(), Duration::from_millis(100), 10, 90);

        run_for(2_000).await;
        let seen = recorder.percents();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&90));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "got: {seen:?}");
        assert!(!seen.contains(&100));

        ticker.finish();
        assert_eq!(recorder.percents().last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn finish_stops_the_task() {
        let recorder = Arc::new(Recorder::default());
        let ticker = ProgressTicker::start(recorder.clone(), Duration::from_millis(100), 10, 90);

        run_for(250).await;
        ticker.finish();
        let after_finish = recorder.percents().len();

        run_for(1_000).await;
        let seen = recorder.percents();
        assert_eq!(seen.len(), after_finish, "ticker kept running: {seen:?}");
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_silently() {
        let recorder = Arc::new(Recorder::default());
        let ticker = ProgressTicker::start(recorder.clone(), Duration::from_millis(100), 10, 90);
        drop(ticker);

        run_for(1_000).await;
        assert_eq!(recorder.percents(), vec![0]);
    }
}
