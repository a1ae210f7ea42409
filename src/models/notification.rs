use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Id;

/// `sent` flips false -> true exactly once, either when the dispatch loop
/// delivers it or when a client acknowledges it. `sent_at` records when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    pub event_id: Option<Id>,
    pub message: String,
    pub notify_at: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub event_id: Option<Id>,
    pub message: String,
    pub notify_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub event_id: Option<String>,
    pub message: Option<String>,
    pub notify_at: Option<DateTime<Utc>>,
}

impl CreateNotificationRequest {
    pub fn validate(self) -> Result<NewNotification, Vec<String>> {
        let mut problems = Vec::new();

        let event_id = match self.event_id.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => match Id::parse(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    problems.push(format!("eventId '{}' is not a valid identifier", raw));
                    None
                }
            },
            None => None,
        };

        let message = self.message.map(|m| m.trim().to_string()).unwrap_or_default();
        if message.is_empty() {
            problems.push("message is required".to_string());
        }

        if self.notify_at.is_none() {
            problems.push("notifyAt is required".to_string());
        }

        match self.notify_at {
            Some(notify_at) if problems.is_empty() => Ok(NewNotification {
                event_id,
                message,
                notify_at,
            }),
            _ => Err(problems),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNowRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub send_email: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNowResponse {
    pub message: String,
    pub email_attempted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub order: SortOrder,
}
