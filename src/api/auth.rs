use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use tracing::{info, warn};

use super::extract::{CurrentUser, JsonBody, SignupPeer};
use crate::crypto::{hash_password, verify_password};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{LoginRequest, MessageResponse, PublicUser, SignupRequest, UserResponse};
use crate::session::{SessionStore, extract_cookie};
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    SignupPeer(peer): SignupPeer,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate().map_err(AppError::validation)?;
    let username = req.username.trim();

    if repository::find_user_by_username(&state.db, username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&req.password).await?;
    let user = repository::insert_user(&state.db, username, &password_hash, req.is_admin)
        .await
        .map_err(|e| {
            // lost a race with a concurrent signup for the same name
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    info!("Registered user {} from {}", user.username, peer.ip());
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
    let user = repository::find_user_by_username(&state.db, req.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash).await? {
        warn!("Failed login for {}", user.username);
        return Err(invalid());
    }

    let public = PublicUser::from(&user);
    let cookie = state.sessions.create(public.clone()).await;
    info!("User {} logged in", user.username);

    Ok((
        AppendHeaders([(header::SET_COOKIE, state.sessions.set_cookie_header(&cookie))]),
        Json(UserResponse { user: public }),
    ))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(cookie) = extract_cookie(&headers) {
        state.sessions.destroy(&cookie).await;
    }
    (
        AppendHeaders([(header::SET_COOKIE, SessionStore::clear_cookie_header())]),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}
