pub mod auth;
pub mod calendar;
pub mod events;
pub mod extract;
pub mod notifications;
pub mod resources;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;
use extract::CurrentUser;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let upload_body_limit = usize::try_from(state.uploads.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let static_uploads = Router::new()
        .nest_service("/uploads", ServeDir::new(state.uploads.uploads_dir()))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/user", get(auth::current_user))
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route("/api/events/upcoming", get(events::upcoming_events))
        .route(
            "/api/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/events/{id}/resources",
            get(resources::list_resources)
                .post(resources::upload_resource)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/api/resources/{id}",
            delete(resources::delete_resource),
        )
        .route(
            "/api/resources/{id}/download",
            get(resources::download_resource),
        )
        .route(
            "/api/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/api/notifications/send-now", post(notifications::send_now))
        .route(
            "/api/notifications/{id}",
            get(notifications::get_notification),
        )
        .route(
            "/api/notifications/{id}/mark-sent",
            put(notifications::mark_sent),
        )
        .route("/api/calendar/{year}/{month}", get(calendar::month))
        .merge(static_uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn require_session(_user: CurrentUser, request: Request, next: Next) -> Response {
    next.run(request).await
}
