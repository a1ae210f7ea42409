use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use super::extract::{AdminUser, JsonBody};
use crate::db::repository;
use crate::error::AppError;
use crate::models::event::DATE_FORMAT;
use crate::models::{CreateEventRequest, Event, Id, Notification, UpcomingQuery, UpdateEventRequest};
use crate::services::DeletedEventStats;
use crate::state::AppState;

const DEFAULT_UPCOMING_LIMIT: u32 = 5;
const MAX_UPCOMING_LIMIT: u32 = 100;

#[derive(Debug, Serialize)]
pub struct CreatedEventResponse {
    #[serde(flatten)]
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

#[derive(Debug, Serialize)]
pub struct DeletedEventResponse {
    pub message: String,
    #[serde(flatten)]
    pub stats: DeletedEventStats,
}

pub(super) fn parse_event_id(raw: &str) -> Result<Id, AppError> {
    Id::parse(raw).map_err(|_| AppError::invalid_id("event"))
}

pub(super) async fn require_event(state: &AppState, id: &Id) -> Result<Event, AppError> {
    repository::find_event_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    let events = repository::fetch_events(&state.db).await?;
    Ok(Json(events))
}

pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<UpcomingQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
        .clamp(1, MAX_UPCOMING_LIMIT);
    let today = Utc::now().date_naive().format(DATE_FORMAT).to_string();
    let events = repository::fetch_upcoming_events(&state.db, &today, limit).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    let id = parse_event_id(&id)?;
    Ok(Json(require_event(&state, &id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreatedEventResponse>), AppError> {
    let (new, reminder) = req.validate(Some(admin.id)).map_err(AppError::validation)?;
    let (event, notification) = state.events().create(new, reminder).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedEventResponse {
            event,
            notification,
        }),
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let id = parse_event_id(&id)?;
    let patch = req.validate().map_err(AppError::validation)?;
    let event = repository::update_event(&state.db, &id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedEventResponse>, AppError> {
    let id = parse_event_id(&id)?;
    let stats = state
        .events()
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(Json(DeletedEventResponse {
        message: "Event deleted successfully".to_string(),
        stats,
    }))
}
