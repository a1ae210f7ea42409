use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts};
use axum::http::request::Parts;
use tracing::warn;

use crate::error::AppError;
use crate::models::PublicUser;
use crate::session::extract_cookie;
use crate::state::AppState;

/// `axum::Json` whose rejections come back as our 400 body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// The logged-in user, or 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let not_authenticated = || AppError::Unauthorized("Not authenticated".to_string());
        let cookie = extract_cookie(&parts.headers).ok_or_else(not_authenticated)?;
        state
            .sessions
            .get(&cookie)
            .await
            .map(CurrentUser)
            .ok_or_else(not_authenticated)
    }
}

/// A logged-in admin: 401 without a session, 403 for everyone else.
#[derive(Debug, Clone)]
pub struct AdminUser(pub PublicUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Lets the request through only when the socket peer is the configured
/// signup address. Forwarding headers are ignored; this is a convenience
/// gate, not access control.
#[derive(Debug, Clone, Copy)]
pub struct SignupPeer(pub SocketAddr);

impl FromRequestParts<AppState> for SignupPeer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let denied =
            || AppError::Forbidden("Access denied. You are not authorized to access this resource.".to_string());

        let ConnectInfo(peer) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|_| denied())?;

        if peer.ip().to_canonical() != state.admin_signup_ip.to_canonical() {
            warn!(
                "Signup refused for {} (allowed: {})",
                peer.ip(),
                state.admin_signup_ip
            );
            return Err(denied());
        }
        Ok(SignupPeer(peer))
    }
}
