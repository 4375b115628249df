//! Fixed-interval job scheduling for the refresh loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::trace;

/// Runs a job at a fixed interval on a single background task until stopped.
///
/// The job executes synchronously inside the task that waits for the next
/// tick, so two executions can never overlap; when one run exceeds the
/// interval, missed ticks coalesce into a single immediate follow-up.
pub struct Scheduler {
    stop: watch::Sender<bool>,
}

impl Scheduler {
    /// Spawn the background task. Must be called within a Tokio runtime.
    pub fn start<F>(interval: Duration, mut job: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The interval yields immediately on creation; consume that tick
            // so the first run happens one interval from now.
            ticker.tick().await;
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => job(),
                }
            }
            trace!("scheduler task stopped");
        });
        Self { stop: stop_tx }
    }

    /// Request the background task to stop. Idempotent and non-blocking; an
    /// in-flight job run completes normally and the task exits on its next
    /// loop iteration. Dropping the scheduler has the same effect.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_job_runs_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = Scheduler::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(100)).await;
        assert!(runs.load(Ordering::SeqCst) >= 2);
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_the_job() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = Scheduler::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(50)).await;
        scheduler.stop();
        time::sleep(Duration::from_millis(20)).await;
        let after_stop = runs.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let scheduler = Scheduler::start(Duration::from_millis(10), || {});
        scheduler.stop();
        scheduler.stop();
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_first_run_waits_one_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = Scheduler::start(Duration::from_millis(200), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_dropping_the_scheduler_stops_the_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = Scheduler::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_millis(50)).await;
        drop(scheduler);
        time::sleep(Duration::from_millis(20)).await;
        let after_drop = runs.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_drop);
    }
}
