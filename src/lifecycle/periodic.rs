//! Periodic background tasks.
//!
//! A timer plus a shutdown check. The first run happens one full period after
//! start, so a freshly started process does not report on an empty window.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::Shutdown;

/// Run `task` every `period` until shutdown.
///
/// A run in progress is allowed to finish; shutdown only prevents the next one.
pub async fn run_periodic<F, Fut>(name: &'static str, period: Duration, shutdown: Shutdown, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(task = name, period_secs = period.as_secs_f64(), "Periodic task starting");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                tracing::info!(task = name, "Periodic task received shutdown signal, exiting loop");
                break;
            }
            _ = ticker.tick() => {
                task().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let shutdown = Shutdown::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let handle = tokio::spawn(run_periodic("test", Duration::from_secs(10), shutdown.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        shutdown.trigger();
        handle.await.unwrap();
    }
}
