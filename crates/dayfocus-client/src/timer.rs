//! Timers tied to the lifetime of their owner.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Runs a callback every `period` until dropped.
///
/// The first tick fires one full period after spawning. Dropping the value
/// aborts the background task, so a routine that stops or a view that goes
/// away never leaves a ticking timer behind.
#[derive(Debug)]
pub struct ScopedInterval {
    period: Duration,
    handle: JoinHandle<()>,
}

impl ScopedInterval {
    /// Spawns the ticker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or when called outside a runtime.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle = tokio::spawn(async move {
            loop {
                interval.tick().await;
                tick();
            }
        });
        debug!(period_ms = period.as_millis() as u64, "interval started");
        Self { period, handle }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ScopedInterval {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(period_ms = self.period.as_millis() as u64, "interval stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (count, tick) = counter();
        let interval = ScopedInterval::spawn(Duration::from_secs(4), tick);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(interval.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_ticking() {
        let (count, tick) = counter();
        let interval = ScopedInterval::spawn(Duration::from_secs(1), tick);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(interval);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
