//! Runs long engine calls off the UI thread.
//!
//! The UI thread blocks inside [Runner::run] (or [Runner::run_untracked])
//! while a worker does the work, polling the job on a timer so that the
//! progress display keeps updating and the user can cancel. Cancellation is
//! cooperative: the tracker's flag is raised and the runner keeps waiting for
//! the worker to notice, then throws the result away.

use std::sync;
use std::time::Duration;

use crate::engine::EngineError;
use crate::model::progress::ProgressTracker;
use crate::view::interaction::Interaction;

#[derive(Debug)]
pub enum Outcome<T> {
    Finished(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn finished(self) -> Option<T> {
        match self {
            Outcome::Finished(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }
}

/// Keeps a progress display up. Dropping it takes the display down, whichever
/// way the job ended.
struct ProgressDisplay<'a> {
    interaction: &'a dyn Interaction,
}

impl<'a> Drop for ProgressDisplay<'a> {
    fn drop(&mut self) {
        self.interaction.progress_done();
    }
}

pub struct Runner<'a> {
    handle: tokio::runtime::Handle,
    interaction: &'a dyn Interaction,
    poll: Duration,
}

impl<'a> Runner<'a> {
    pub fn new(handle: tokio::runtime::Handle, interaction: &'a dyn Interaction) -> Runner<'a> {
        Runner { handle, interaction, poll: Duration::from_millis(100) }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Runner<'a> {
        self.poll = poll;
        self
    }

    /// Runs a job that reports progress through a tracker and may be
    /// cancelled.
    pub fn run<T, F>(&self, description: &str, job: F) -> Outcome<Result<T, EngineError>>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressTracker) -> Result<T, EngineError> + Send + 'static,
    {
        let (cancelled, result) = self.drive(description, job);
        if cancelled {
            tracing::info!(job = description, "cancelled; discarding result");
            return Outcome::Cancelled;
        }
        Outcome::Finished(result)
    }

    /// Like [Runner::run], but a cancelled job's result is kept. The job
    /// must itself record how far it got.
    pub fn run_to_end<T, F>(&self, description: &str, job: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressTracker) -> Result<T, EngineError> + Send + 'static,
    {
        let (cancelled, result) = self.drive(description, job);
        if cancelled {
            tracing::info!(job = description, "cancelled; keeping the partial result");
        }
        result
    }

    fn drive<T, F>(&self, description: &str, job: F) -> (bool, Result<T, EngineError>)
    where
        T: Send + 'static,
        F: FnOnce(&ProgressTracker) -> Result<T, EngineError> + Send + 'static,
    {
        let tracker = sync::Arc::new(ProgressTracker::new());
        let worker_tracker = tracker.clone();
        tracing::info!(job = description, "starting");

        let _display = ProgressDisplay { interaction: self.interaction };
        let result = self.handle.block_on(async {
            let mut worker = tokio::task::spawn_blocking(move || {
                let result = job(&worker_tracker);
                worker_tracker.set_finished();
                result
            });
            let mut ticker = tokio::time::interval(self.poll);

            loop {
                tokio::select! {
                    joined = &mut worker => break joined,
                    _ = ticker.tick() => {
                        if !tracker.is_cancelled() && !self.interaction.progress(description, Some(tracker.fraction())) {
                            tracing::info!(job = description, "cancellation requested");
                            tracker.cancel();
                        }
                    },
                }
            }
        });

        let result = match result {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(job = description, %join_error, "worker stopped unexpectedly");
                Err(EngineError::Failed(format!("the computation stopped unexpectedly: {}", join_error)))
            },
        };
        if !tracker.is_cancelled() {
            match &result {
                Ok(_) => tracing::info!(job = description, "finished"),
                Err(error) => tracing::warn!(job = description, %error, "failed"),
            }
        }
        (tracker.is_cancelled(), result)
    }

    /// Runs a job that cannot report progress or be cancelled. The display
    /// says "please wait" and ignores requests to cancel.
    pub fn run_untracked<T, F>(&self, description: &str, job: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        tracing::info!(job = description, "starting");
        let _display = ProgressDisplay { interaction: self.interaction };
        let result = self.handle.block_on(async {
            let mut worker = tokio::task::spawn_blocking(job);
            let mut ticker = tokio::time::interval(self.poll);
            loop {
                tokio::select! {
                    joined = &mut worker => break joined,
                    _ = ticker.tick() => {
                        /* no close button: the answer is ignored */
                        let _ = self.interaction.progress(description, None);
                    },
                }
            }
        });

        let result = result.unwrap_or_else(|join_error| {
            tracing::error!(job = description, %join_error, "worker stopped unexpectedly");
            Err(EngineError::Failed(format!("the computation stopped unexpectedly: {}", join_error)))
        });
        match &result {
            Ok(_) => tracing::info!(job = description, "finished"),
            Err(error) => tracing::warn!(job = description, %error, "failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use crate::model::packet::PacketRef;
    use crate::view::interaction::{CloseChoice, MessageKind};

    #[derive(Default)]
    struct Watcher {
        calls: RefCell<Vec<Option<f64>>>,
        cancel_after: Option<usize>,
        closed: Cell<usize>,
    }

    impl Interaction for Watcher {
        fn message(&self, _: MessageKind, _: &str, _: Option<&str>) {}
        fn confirm(&self, _: &str, _: Option<&str>) -> bool { false }
        fn ask_close(&self, _: &str) -> CloseChoice { CloseChoice::Cancel }
        fn ask_text(&self, _: &str, _: &str) -> Option<String> { None }
        fn choose_packet(&self, _: &str, _: &[PacketRef]) -> Option<PacketRef> { None }
        fn choose_path(&self, _: &str, _: &str, _: bool) -> Option<PathBuf> { None }

        fn progress(&self, _description: &str, fraction: Option<f64>) -> bool {
            let mut calls = self.calls.borrow_mut();
            calls.push(fraction);
            self.cancel_after.map_or(true, |n| calls.len() < n)
        }

        fn progress_done(&self) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap()
    }

    #[test]
    fn finished_jobs_return_their_result() {
        let rt = runtime();
        let watcher = Watcher::default();
        let runner = Runner::new(rt.handle().clone(), &watcher).with_poll_interval(Duration::from_millis(1));
        let outcome = runner.run("Adding", |tracker| {
            tracker.new_stage("Adding", 1.0);
            std::thread::sleep(Duration::from_millis(20));
            tracker.set_stage_fraction(1.0);
            Ok(2 + 2)
        });
        assert_matches!(outcome, Outcome::Finished(Ok(4)));
        assert!(!watcher.calls.borrow().is_empty());
        assert!(watcher.calls.borrow().iter().all(Option::is_some));
        assert_eq!(watcher.closed.get(), 1);
    }

    #[test]
    fn cancelled_results_are_discarded() {
        let rt = runtime();
        let watcher = Watcher { cancel_after: Some(2), ..Watcher::default() };
        let runner = Runner::new(rt.handle().clone(), &watcher).with_poll_interval(Duration::from_millis(1));
        let outcome = runner.run("Enumerating", |tracker| {
            while !tracker.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok("partial")
        });
        assert_matches!(outcome, Outcome::Cancelled);
        assert_eq!(watcher.closed.get(), 1);
    }

    #[test]
    fn partial_results_can_be_kept() {
        let rt = runtime();
        let watcher = Watcher { cancel_after: Some(2), ..Watcher::default() };
        let runner = Runner::new(rt.handle().clone(), &watcher).with_poll_interval(Duration::from_millis(1));
        let result = runner.run_to_end("Searching", |tracker| {
            while !tracker.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok("partial")
        });
        assert_matches!(result, Ok("partial"));
        assert_eq!(watcher.closed.get(), 1);
    }

    #[test]
    fn untracked_jobs_cannot_be_cancelled() {
        let rt = runtime();
        let watcher = Watcher { cancel_after: Some(1), ..Watcher::default() };
        let runner = Runner::new(rt.handle().clone(), &watcher).with_poll_interval(Duration::from_millis(1));
        let result = runner.run_untracked("Waiting", || {
            std::thread::sleep(Duration::from_millis(20));
            Ok::<_, EngineError>("done")
        });
        assert_matches!(result, Ok("done"));
        assert!(watcher.calls.borrow().iter().all(Option::is_none));
        assert_eq!(watcher.closed.get(), 1);
    }

    #[test]
    fn panicking_workers_become_failures() {
        let rt = runtime();
        let watcher = Watcher::default();
        let runner = Runner::new(rt.handle().clone(), &watcher);
        let result: Result<(), EngineError> = runner.run_untracked("Crashing", || panic!("boom"));
        assert_matches!(result, Err(EngineError::Failed(_)));
    }
}
