use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::models::{
    Event, EventPatch, Id, NewEvent, NewNotification, NewResource, Notification, Resource,
    SortOrder, User,
};
use crate::uploads::UploadStore;

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, created_at";
const EVENT_COLUMNS: &str =
    "id, title, description, category, date, time, location, created_by_id, created_at, updated_at";
const RESOURCE_COLUMNS: &str = "id, event_id, filename, original_name, file_path, file_type, file_size, uploaded_at, uploaded_by_id";
const NOTIFICATION_COLUMNS: &str = "id, event_id, message, notify_at, sent, sent_at, created_at";

/// Fixed-width UTC text so that string comparison in SQL orders by time.
pub fn db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn trimmed_or_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---- users ----

pub async fn find_user_by_id(db: &SqlitePool, id: &Id) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(db)
    .await
}

pub async fn insert_user(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<User, sqlx::Error> {
    let id = Id::new();
    let now = db_time(Utc::now());

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, is_admin, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(username)
    .bind(password_hash)
    .bind(is_admin)
    .bind(&now)
    .execute(db)
    .await?;

    find_user_by_id(db, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn count_users(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
}

// ---- events ----

pub async fn fetch_events(db: &SqlitePool) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {} FROM events ORDER BY date ASC, time ASC",
        EVENT_COLUMNS
    ))
    .fetch_all(db)
    .await
}

/// Events whose date falls in `[start, end]`, both `YYYY-MM-DD`.
pub async fn fetch_events_between(
    db: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {} FROM events WHERE date >= ? AND date <= ? ORDER BY date ASC, time ASC",
        EVENT_COLUMNS
    ))
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn fetch_upcoming_events(
    db: &SqlitePool,
    from_date: &str,
    limit: u32,
) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {} FROM events WHERE date >= ? ORDER BY date ASC, time ASC LIMIT ?",
        EVENT_COLUMNS
    ))
    .bind(from_date)
    .bind(i64::from(limit))
    .fetch_all(db)
    .await
}

pub async fn find_event_by_id(db: &SqlitePool, id: &Id) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_event(db: &SqlitePool, new: NewEvent) -> Result<Event, sqlx::Error> {
    let id = Id::new();
    let now = db_time(Utc::now());

    sqlx::query(
        r#"
        INSERT INTO events
            (id, title, description, category, date, time, location,
            created_by_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(&id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.category)
    .bind(&new.date)
    .bind(&new.time)
    .bind(&new.location)
    .bind(new.created_by_id.as_ref())
    .bind(&now)
    .execute(db)
    .await?;

    find_event_by_id(db, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Applies the patch and returns the stored result, or `None` when the
/// event does not exist. An empty description or location clears it.
pub async fn update_event(
    db: &SqlitePool,
    id: &Id,
    patch: EventPatch,
) -> Result<Option<Event>, sqlx::Error> {
    let mut current = match find_event_by_id(db, id).await? {
        Some(event) => event,
        None => return Ok(None),
    };

    if let Some(title) = patch.title {
        current.title = title;
    }
    if let Some(description) = patch.description {
        current.description = trimmed_or_none(description);
    }
    if let Some(category) = patch.category {
        current.category = category;
    }
    if let Some(date) = patch.date {
        current.date = date;
    }
    if let Some(time) = patch.time {
        current.time = time;
    }
    if let Some(location) = patch.location {
        current.location = trimmed_or_none(location);
    }

    sqlx::query(
        r#"
        UPDATE events
        SET title = ?1,
            description = ?2,
            category = ?3,
            date = ?4,
            time = ?5,
            location = ?6,
            updated_at = ?7
        WHERE id = ?8
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.category)
    .bind(&current.date)
    .bind(&current.time)
    .bind(&current.location)
    .bind(db_time(Utc::now()))
    .bind(id)
    .execute(db)
    .await?;

    find_event_by_id(db, id).await
}

pub async fn delete_event(db: &SqlitePool, id: &Id) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// ---- resources ----

pub async fn fetch_resources_by_event_id(
    db: &SqlitePool,
    event_id: &Id,
) -> Result<Vec<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "SELECT {} FROM resources WHERE event_id = ? ORDER BY uploaded_at ASC",
        RESOURCE_COLUMNS
    ))
    .bind(event_id)
    .fetch_all(db)
    .await
}

pub async fn find_resource_by_id(
    db: &SqlitePool,
    id: &Id,
) -> Result<Option<Resource>, sqlx::Error> {
    sqlx::query_as::<_, Resource>(&format!(
        "SELECT {} FROM resources WHERE id = ?",
        RESOURCE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Callers must have checked that `new.event_id` exists; the table does not.
pub async fn insert_resource(db: &SqlitePool, new: NewResource) -> Result<Resource, sqlx::Error> {
    let id = Id::new();
    let now = db_time(Utc::now());

    sqlx::query(
        r#"
        INSERT INTO resources
            (id, event_id, filename, original_name, file_path, file_type,
            file_size, uploaded_at, uploaded_by_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.event_id)
    .bind(&new.filename)
    .bind(&new.original_name)
    .bind(&new.file_path)
    .bind(&new.file_type)
    .bind(new.file_size)
    .bind(&now)
    .bind(new.uploaded_by_id.as_ref())
    .execute(db)
    .await?;

    find_resource_by_id(db, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Removes the record only; the caller owns the file.
pub async fn delete_resource(db: &SqlitePool, id: &Id) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resources WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Deletes every resource of an event, files first. A file that cannot be
/// removed is logged and its record is deleted anyway.
pub async fn delete_resources_by_event_id(
    db: &SqlitePool,
    uploads: &UploadStore,
    event_id: &Id,
) -> Result<u64, sqlx::Error> {
    let resources = fetch_resources_by_event_id(db, event_id).await?;
    for resource in &resources {
        uploads.remove_quietly(&resource.file_path).await;
    }

    let removed = sqlx::query("DELETE FROM resources WHERE event_id = ?")
        .bind(event_id)
        .execute(db)
        .await?
        .rows_affected();

    if removed > 0 {
        info!("Deleted {} resources of event {}", removed, event_id);
    }
    Ok(removed)
}

// ---- notifications ----

pub async fn fetch_notifications(
    db: &SqlitePool,
    order: SortOrder,
) -> Result<Vec<Notification>, sqlx::Error> {
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications ORDER BY notify_at {}",
        NOTIFICATION_COLUMNS, direction
    ))
    .fetch_all(db)
    .await
}

pub async fn find_notification_by_id(
    db: &SqlitePool,
    id: &Id,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE id = ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert_notification(
    db: &SqlitePool,
    new: NewNotification,
) -> Result<Notification, sqlx::Error> {
    let id = Id::new();
    let now = db_time(Utc::now());

    sqlx::query(
        r#"
        INSERT INTO notifications (id, event_id, message, notify_at, sent, sent_at, created_at)
        VALUES (?, ?, ?, ?, 0, NULL, ?)
        "#,
    )
    .bind(&id)
    .bind(new.event_id.as_ref())
    .bind(&new.message)
    .bind(db_time(new.notify_at))
    .bind(&now)
    .execute(db)
    .await?;

    find_notification_by_id(db, &id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Every unsent notification scheduled at or before `now`, oldest first.
pub async fn fetch_due_notifications(
    db: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE sent = 0 AND notify_at <= ? ORDER BY notify_at ASC",
        NOTIFICATION_COLUMNS
    ))
    .bind(db_time(now))
    .fetch_all(db)
    .await
}

/// Flips `sent` only if it is still false. Returns whether this call did the
/// flip, so a second call (or a concurrent one) gets `false`.
pub async fn mark_notification_sent(db: &SqlitePool, id: &Id) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET sent = 1, sent_at = ? WHERE id = ? AND sent = 0")
        .bind(db_time(Utc::now()))
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_notifications_by_event_id(
    db: &SqlitePool,
    event_id: &Id,
) -> Result<u64, sqlx::Error> {
    let removed = sqlx::query("DELETE FROM notifications WHERE event_id = ?")
        .bind(event_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(removed)
}
