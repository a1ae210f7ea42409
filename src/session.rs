use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::PublicUser;

pub const SESSION_COOKIE: &str = "calendar.sid";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
struct SessionEntry {
    user: PublicUser,
    expires_at: DateTime<Utc>,
}

/// Server-side sessions keyed by a random id. The cookie carries
/// `<id>.<hmac>` so forged ids are rejected without a lookup.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    secret: Arc<Vec<u8>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            secret: Arc::new(secret.as_bytes().to_vec()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores the user and returns the signed cookie value.
    pub async fn create(&self, user: PublicUser) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::days(1));
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), SessionEntry { user, expires_at });
        let signature = self.sign(&session_id);
        format!("{}.{}", session_id, signature)
    }

    pub async fn get(&self, cookie_value: &str) -> Option<PublicUser> {
        let session_id = self.verify(cookie_value)?;
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            let entry = sessions.get(session_id)?;
            if entry.expires_at > now {
                return Some(entry.user.clone());
            }
        }
        self.sessions.write().await.remove(session_id);
        None
    }

    /// Returns whether a live session was removed.
    pub async fn destroy(&self, cookie_value: &str) -> bool {
        match self.verify(cookie_value) {
            Some(session_id) => self.sessions.write().await.remove(session_id).is_some(),
            None => false,
        }
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn set_cookie_header(&self, cookie_value: &str) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
            SESSION_COOKIE,
            cookie_value,
            self.ttl.as_secs()
        )
    }

    pub fn clear_cookie_header() -> String {
        format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", SESSION_COOKIE)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC takes keys of any length
        <HmacSha256 as Mac>::new_from_slice(&self.secret).expect("hmac accepts any key length")
    }

    fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (session_id, signature) = cookie_value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(session_id)
    }
}

pub fn extract_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
