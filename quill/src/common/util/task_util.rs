use parking_lot::Mutex;
use std::time::Duration;
use timer::{Guard, Timer};

/// Runs jobs on a timer thread at a fixed interval.
///
/// Each database owns its own scheduler, so closing one database stops only
/// its own jobs. Dropping a [Guard] cancels the job it belongs to.
pub(crate) struct Scheduler {
    timer: Timer,
    guards: Mutex<Vec<Guard>>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler {
            timer: Timer::new(),
            guards: Mutex::from(Vec::with_capacity(2)),
        }
    }

    /// Schedules `f` to run every `interval` until [Scheduler::stop] is called.
    pub fn schedule<F>(&self, interval: Duration, f: F)
    where
        F: 'static + FnMut() + Send,
    {
        match chrono::Duration::from_std(interval) {
            Ok(chrono_duration) => {
                let guard = self.timer.schedule_repeating(chrono_duration, f);
                self.guards.lock().push(guard);
            }
            Err(e) => {
                log::error!(
                    "Failed to convert duration to chrono::Duration: {}, skipping task scheduling",
                    e
                );
            }
        }
    }

    #[cfg(test)]
    pub fn scheduled_count(&self) -> usize {
        self.guards.lock().len()
    }

    pub fn stop(&self) {
        self.guards.lock().clear();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use test_retry::retry;

    #[test]
    #[retry]
    fn test_schedule_runs_repeatedly() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        scheduler.schedule(Duration::from_millis(10), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        awaitility::at_most(Duration::from_secs(2)).until(|| counter.load(Ordering::SeqCst) >= 3);
        assert_eq!(scheduler.scheduled_count(), 1);
    }

    #[test]
    #[retry]
    fn test_stop_cancels_jobs() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        scheduler.schedule(Duration::from_millis(10), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        awaitility::at_most(Duration::from_secs(2)).until(|| counter.load(Ordering::SeqCst) >= 1);
        scheduler.stop();
        assert_eq!(scheduler.scheduled_count(), 0);

        std::thread::sleep(Duration::from_millis(50));
        let after_stop = counter.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }
}
