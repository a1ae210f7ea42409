use axum::Json;
use axum::extract::{Path, State};

use crate::calendar::{MonthView, grid_bounds, month_view};
use crate::db::repository;
use crate::error::AppError;
use crate::state::AppState;

pub async fn month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<MonthView>, AppError> {
    let invalid = || AppError::BadRequest(format!("Invalid month {}/{}", year, month));
    let (start, end) = grid_bounds(year, month).ok_or_else(invalid)?;
    let events = repository::fetch_events_between(&state.db, &start, &end).await?;
    let view = month_view(year, month, &events).ok_or_else(invalid)?;
    Ok(Json(view))
}
