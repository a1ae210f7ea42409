use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::services::NotificationDispatcher;

/// Runs the dispatcher on a fixed interval.
pub struct NotificationScheduler {
    dispatcher: NotificationDispatcher,
    interval: Duration,
}

impl NotificationScheduler {
    pub fn new(dispatcher: NotificationDispatcher, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Loops forever; a failed cycle is logged and the next one still runs.
    pub async fn start(self) {
        info!(
            "Starting notification scheduler (interval: {:?})",
            self.interval
        );

        loop {
            // first cycle waits a full interval
            tokio::time::sleep(self.interval).await;

            match self.dispatcher.run_once(Utc::now()).await {
                Ok(stats) if stats.due > 0 => {
                    info!(
                        "Dispatch cycle completed - Due: {}, Sent: {}, Skipped: {}, Failed: {}",
                        stats.due, stats.sent, stats.skipped, stats.failed
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Dispatch cycle failed: {}", e);
                }
            }
        }
    }
}
