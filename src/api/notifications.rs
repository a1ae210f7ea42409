use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::info;

use super::events::require_event;
use super::extract::{AdminUser, JsonBody};
use crate::db::repository;
use crate::error::AppError;
use crate::mail::{OutgoingMail, spawn_send};
use crate::models::{
    CreateNotificationRequest, Id, MessageResponse, Notification, NotificationQuery,
    SendNowRequest, SendNowResponse,
};
use crate::state::AppState;

const SUBJECT_PREVIEW_CHARS: usize = 30;

fn parse_notification_id(raw: &str) -> Result<Id, AppError> {
    Id::parse(raw).map_err(|_| AppError::invalid_id("notification"))
}

async fn require_notification(state: &AppState, id: &Id) -> Result<Notification, AppError> {
    repository::find_notification_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}

pub fn creation_mail(notification: &Notification) -> OutgoingMail {
    let preview: String = notification
        .message
        .chars()
        .take(SUBJECT_PREVIEW_CHARS)
        .collect();
    OutgoingMail::plain(
        format!("New Notification: {}...", preview),
        format!(
            "A new notification has been created:\n\n{}\n\nScheduled for: {} UTC",
            notification.message,
            notification.notify_at.format("%Y-%m-%d %H:%M")
        ),
    )
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = repository::fetch_notifications(&state.db, params.order).await?;
    Ok(Json(notifications))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    let id = parse_notification_id(&id)?;
    Ok(Json(require_notification(&state, &id).await?))
}

pub async fn create_notification(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(req): JsonBody<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let new = req.validate().map_err(AppError::validation)?;
    if let Some(event_id) = &new.event_id {
        require_event(&state, event_id).await?;
    }

    let notification = repository::insert_notification(&state.db, new).await?;
    info!(
        "Created notification {} due at {}",
        notification.id, notification.notify_at
    );

    if state.email_enabled() {
        spawn_send(state.mailer.clone(), creation_mail(&notification));
    }
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Idempotent: marking an already-sent notification succeeds.
pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_notification_id(&id)?;
    require_notification(&state, &id).await?;

    if repository::mark_notification_sent(&state.db, &id).await? {
        info!("Notification {} marked as sent", id);
    }
    Ok(Json(MessageResponse::new("Notification marked as sent")))
}

pub async fn send_now(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(req): JsonBody<SendNowRequest>,
) -> Result<Json<SendNowResponse>, AppError> {
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Notification message is required".to_string()))?
        .to_string();

    let email_attempted = req.send_email && state.email_enabled();
    if email_attempted {
        info!("Broadcasting announcement by email");
        spawn_send(state.mailer.clone(), OutgoingMail::plain("Announcement", message));
    }

    Ok(Json(SendNowResponse {
        message: "Announcement processed.".to_string(),
        email_attempted,
    }))
}
