use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

use super::Pipeline;

/// Drives cycles for the life of the process. Idle between cycles, Running
/// while one is in flight; a failed cycle backs off and the loop carries on.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    startup_delay: Duration,
    recovery_interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: &Config) -> Self {
        Self {
            pipeline,
            startup_delay: config.startup_delay(),
            recovery_interval: config.recovery_interval(),
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Scheduler started");

        if sleep_or_cancel(self.startup_delay, &shutdown).await {
            loop {
                let wait = match self.cycle(&shutdown).await {
                    Some(wait) => wait,
                    None => break,
                };
                tracing::info!("Next cycle in {} seconds", wait.as_secs());
                if !sleep_or_cancel(wait, &shutdown).await {
                    break;
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Run one cycle on its own task so a panic inside it is contained.
    /// Returns the delay before the next cycle, or `None` on shutdown.
    async fn cycle(&self, shutdown: &CancellationToken) -> Option<Duration> {
        if self.pipeline.is_running() {
            tracing::info!("A manual refresh is in progress, queueing behind it");
        }
        let pipeline = Arc::clone(&self.pipeline);
        let mut task = tokio::spawn(async move { pipeline.run_cycle().await });

        let joined = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, abandoning in-flight cycle");
                task.abort();
                return None;
            }
            joined = &mut task => joined,
        };

        match joined {
            Ok(Ok(_)) => Some(self.refresh_interval().await),
            Ok(Err(e)) => {
                tracing::error!("Cycle abandoned: {}", e);
                Some(self.recovery_interval)
            }
            Err(e) => {
                tracing::error!("Cycle task failed: {}", e);
                Some(self.recovery_interval)
            }
        }
    }

    /// Interval from the settings row as it stands now, floor-clamped.
    async fn refresh_interval(&self) -> Duration {
        match self.pipeline.repository().settings().await {
            Ok(settings) => settings.refresh_interval(),
            Err(e) => {
                tracing::warn!("Could not read refresh interval: {}", e);
                self.recovery_interval
            }
        }
    }
}

/// Sleep for `duration`; false if shutdown arrived first.
async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
