use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::db::repository;
use crate::mail::{MailError, Mailer, OutgoingMail, escape_html};
use crate::models::{Event, Notification};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub due: usize,
    pub sent: usize,
    /// Already flipped by someone else between the query and our update.
    pub skipped: usize,
    pub failed: usize,
}

/// Delivers due notifications by email and marks them sent.
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
    item_delay: Duration,
}

impl NotificationDispatcher {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>, item_delay: Duration) -> Self {
        Self {
            db,
            mailer,
            item_delay,
        }
    }

    /// One pass over the due set. Only the initial query can fail the pass;
    /// each notification succeeds or fails on its own.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<DispatchStats, DispatchError> {
        let due = repository::fetch_due_notifications(&self.db, now).await?;
        let mut stats = DispatchStats {
            due: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            debug!("No due notifications found");
            return Ok(stats);
        }
        info!("Found {} due notifications", due.len());

        for (index, notification) in due.iter().enumerate() {
            match self.deliver(notification).await {
                Ok(true) => {
                    stats.sent += 1;
                    info!("Sent and marked notification {}", notification.id);
                }
                Ok(false) => {
                    stats.skipped += 1;
                    warn!(
                        "Notification {} was already marked sent; email may have gone out twice",
                        notification.id
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    error!("Error processing notification {}: {}", notification.id, e);
                }
            }

            if index + 1 < due.len() && !self.item_delay.is_zero() {
                tokio::time::sleep(self.item_delay).await;
            }
        }

        Ok(stats)
    }

    async fn deliver(&self, notification: &Notification) -> Result<bool, DispatchError> {
        let event = match &notification.event_id {
            Some(event_id) => repository::find_event_by_id(&self.db, event_id).await?,
            None => None,
        };

        let mail = compose_reminder(notification, event.as_ref());
        match self.mailer.send(&mail).await {
            Ok(()) => {}
            // no recipients configured: settle the item instead of retrying forever
            Err(MailError::NoRecipients) => warn!(
                "No recipients configured; marking notification {} sent without email",
                notification.id
            ),
            Err(e) => return Err(e.into()),
        }

        Ok(repository::mark_notification_sent(&self.db, &notification.id).await?)
    }
}

pub fn compose_reminder(notification: &Notification, event: Option<&Event>) -> OutgoingMail {
    let event_details = event
        .map(|e| format!(" related to event \"{}\" ({})", e.title, e.category))
        .unwrap_or_default();
    let scheduled = notification.notify_at.format("%Y-%m-%d %H:%M UTC");

    OutgoingMail {
        subject: format!("Upcoming Reminder{}", event_details),
        text: format!(
            "{}\n\nThis notification was scheduled for {}.",
            notification.message, scheduled
        ),
        html: format!(
            "<p>{}</p><p><small>This notification was scheduled for {}{}.</small></p>",
            escape_html(&notification.message),
            scheduled,
            escape_html(&event_details)
        ),
    }
}
