use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::AiResultCache;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Background task that periodically purges expired cache rows.
pub struct CacheSweeper;

impl CacheSweeper {
    /// Start sweeping every `interval`, first sweep one interval from now.
    ///
    /// The task stops when the returned handle is shut down or dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn(cache: Arc<AiResultCache>, interval: Duration) -> SweeperHandle {
        let period = interval.max(MIN_INTERVAL);
        let token = CancellationToken::new();
        let child = token.child_token();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = period.as_millis() as u64, "ai cache sweeper started");

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.cleanup_expired().await;
                    }
                }
            }

            tracing::info!("ai cache sweeper stopped");
        });

        SweeperHandle {
            token,
            task: Some(task),
        }
    }
}

/// Owner of a running [`CacheSweeper`] task.
pub struct SweeperHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for an in-flight sweep to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "ai cache sweeper task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
