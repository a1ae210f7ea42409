use std::net::IpAddr;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::mail::Mailer;
use crate::services::EventService;
use crate::session::SessionStore;
use crate::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: SessionStore,
    pub uploads: UploadStore,
    pub mailer: Arc<dyn Mailer>,
    /// Only this peer address may call signup. Not a security boundary.
    pub admin_signup_ip: IpAddr,
}

impl AppState {
    pub fn events(&self) -> EventService {
        EventService::new(self.db.clone(), self.uploads.clone())
    }

    pub fn email_enabled(&self) -> bool {
        self.mailer.is_enabled()
    }
}
