//! Progress tracking shared between a worker running a long computation and
//! the UI thread watching it.
//!
//! The worker reports progress in stages, each carrying a weight that says
//! what share of the whole job it represents. The UI reads the overall
//! fraction and may request cancellation, which the worker polls for.

use atomig::Atomic;
use atomig::Ordering;
use parking_lot::Mutex;

struct Stage {
    description: String,
    /* overall fraction completed before this stage began */
    base: f64,
    weight: f64,
    count: usize,
}

pub struct ProgressTracker {
    fraction: Atomic<f64>,
    cancelled: Atomic<bool>,
    finished: Atomic<bool>,
    stage: Mutex<Stage>,
}

impl ProgressTracker {
    pub fn new() -> ProgressTracker {
        ProgressTracker {
            fraction: Atomic::new(0.0),
            cancelled: Atomic::new(false),
            finished: Atomic::new(false),
            stage: Mutex::new(Stage { description: String::new(), base: 0.0, weight: 1.0, count: 0 }),
        }
    }

    /// Begins a new stage worth `weight` of the whole job. The previous stage
    /// is taken to be complete.
    pub fn new_stage(&self, description: impl Into<String>, weight: f64) {
        let mut stage = self.stage.lock();
        let completed = if stage.count == 0 {
            self.fraction.load(Ordering::Acquire)
        } else {
            (stage.base + stage.weight).min(1.0)
        };
        stage.description = description.into();
        stage.base = completed;
        stage.weight = weight.clamp(0.0, 1.0 - completed);
        stage.count+= 1;
        self.fraction.store(completed, Ordering::Release);
    }

    /// Reports progress through the current stage, as a fraction in [0, 1].
    pub fn set_stage_fraction(&self, fraction: f64) {
        let stage = self.stage.lock();
        let overall = stage.base + stage.weight * fraction.clamp(0.0, 1.0);
        self.fraction.store(overall.min(1.0), Ordering::Release);
    }

    pub fn fraction(&self) -> f64 {
        self.fraction.load(Ordering::Acquire)
    }

    pub fn description(&self) -> String {
        self.stage.lock().description.clone()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn set_finished(&self) {
        self.fraction.store(1.0, Ordering::Release);
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("fraction", &self.fraction())
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_accumulate() {
        let tracker = ProgressTracker::new();
        tracker.new_stage("first", 0.25);
        tracker.set_stage_fraction(0.5);
        assert!((tracker.fraction() - 0.125).abs() < 1e-9);

        tracker.new_stage("second", 0.75);
        assert!((tracker.fraction() - 0.25).abs() < 1e-9);
        tracker.set_stage_fraction(1.0);
        assert!((tracker.fraction() - 1.0).abs() < 1e-9);
        assert_eq!(tracker.description(), "second");
        assert!(!tracker.is_finished());

        tracker.set_finished();
        assert!(tracker.is_finished());
    }

    #[test]
    fn cancellation_is_sticky() {
        let tracker = std::sync::Arc::new(ProgressTracker::new());
        let worker = {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                while !tracker.is_cancelled() {
                    std::thread::yield_now();
                }
                tracker.set_finished();
            })
        };
        tracker.cancel();
        worker.join().unwrap();
        assert!(tracker.is_cancelled());
        assert!(tracker.is_finished());
    }
}
