use chrono::Duration;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Event, EventCategory, Id, NewEvent, NewNotification, Notification, ReminderRequest};
use crate::uploads::UploadStore;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEventStats {
    pub resources_removed: u64,
    pub notifications_removed: u64,
}

/// Event operations that touch more than the events table.
pub struct EventService {
    db: SqlitePool,
    uploads: UploadStore,
}

impl EventService {
    pub fn new(db: SqlitePool, uploads: UploadStore) -> Self {
        Self { db, uploads }
    }

    /// Stores the event and, when asked, a reminder tied to it.
    pub async fn create(
        &self,
        new: NewEvent,
        reminder: Option<ReminderRequest>,
    ) -> Result<(Event, Option<Notification>), AppError> {
        let event = repository::insert_event(&self.db, new).await?;

        let notification = match reminder {
            Some(reminder) => Some(self.schedule_reminder(&event, reminder).await?),
            None => None,
        };

        Ok((event, notification))
    }

    async fn schedule_reminder(
        &self,
        event: &Event,
        reminder: ReminderRequest,
    ) -> Result<Notification, AppError> {
        let starts_at = event.starts_at().ok_or_else(|| {
            AppError::Internal(format!("stored event {} has an unparseable date/time", event.id))
        })?;
        let notify_at = starts_at - Duration::minutes(i64::from(reminder.minutes_before));
        let message = reminder
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_reminder_message(event));

        let notification = repository::insert_notification(
            &self.db,
            NewNotification {
                event_id: Some(event.id.clone()),
                message,
                notify_at,
            },
        )
        .await?;
        info!(
            "Scheduled reminder {} for event {} at {}",
            notification.id, event.id, notification.notify_at
        );
        Ok(notification)
    }

    /// Deletes the event with its resources (files too) and notifications.
    /// Returns `None` when there was no such event.
    pub async fn delete(&self, id: &Id) -> Result<Option<DeletedEventStats>, AppError> {
        if repository::find_event_by_id(&self.db, id).await?.is_none() {
            return Ok(None);
        }

        let resources_removed =
            repository::delete_resources_by_event_id(&self.db, &self.uploads, id).await?;
        let notifications_removed = repository::delete_notifications_by_event_id(&self.db, id).await?;

        if !repository::delete_event(&self.db, id).await? {
            warn!("Event {} disappeared while its dependents were being removed", id);
        }

        info!(
            "Deleted event {} ({} resources, {} notifications)",
            id, resources_removed, notifications_removed
        );
        Ok(Some(DeletedEventStats {
            resources_removed,
            notifications_removed,
        }))
    }
}

pub fn default_reminder_message(event: &Event) -> String {
    match event.category {
        EventCategory::Other => format!("New Event: {}", event.title),
        category => format!("New Event ({}): {}", category, event.title),
    }
}
