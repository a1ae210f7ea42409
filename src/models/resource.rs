use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Id;

/// A file attached to an event. `file_path` is relative to the disk mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Id,
    pub event_id: Id,
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub event_id: Id,
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_by_id: Option<Id>,
}
