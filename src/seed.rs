use chrono::{Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::crypto::hash_password;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{EventCategory, NewEvent, NewNotification};

pub const DEMO_ADMIN_USERNAME: &str = "admin@example.com";
pub const DEMO_ADMIN_PASSWORD: &str = "admin123";

// (title, category, day of May, time, description, location)
const DEMO_EVENTS: [(&str, EventCategory, u32, &str, &str, &str); 10] = [
    ("Project Deadline", EventCategory::Deadline, 1, "10:00", "Submit your final project report through the online portal.", "Online Submission Portal"),
    ("Math Quiz", EventCategory::Quiz, 3, "14:00", "Quiz on chapters 1-5 covering algebra and calculus.", "Room 101"),
    ("Guest Lecture", EventCategory::Other, 6, "11:30", "Guest lecture on advanced topics by Prof. Smith.", "Main Auditorium"),
    ("Physics Quiz", EventCategory::Quiz, 8, "09:00", "Quiz on physics fundamentals and applications.", "Room 202"),
    ("Essay Submission", EventCategory::Deadline, 12, "23:59", "Submit your essay on the assigned topic.", "Online Portal"),
    ("Study Group", EventCategory::Other, 15, "15:30", "Weekly study group for exam preparation.", "Library Study Room 3"),
    ("History Quiz", EventCategory::Quiz, 17, "14:15", "Quiz on world history from 1900-1950.", "Room 305"),
    ("Final Project", EventCategory::Deadline, 23, "09:00", "Submit your final project with all required components.", "Department Office"),
    ("Department Meeting", EventCategory::Other, 25, "13:00", "End of semester department meeting.", "Main Auditorium"),
    ("Final Exam", EventCategory::Quiz, 30, "10:00", "Comprehensive final exam covering all course material.", "Exam Hall A"),
];

// (index into DEMO_EVENTS, message, day of May, hour)
const DEMO_REMINDERS: [(usize, &str, u32, u32); 3] = [
    (7, "Reminder: Final Project submission is due soon!", 22, 9),
    (9, "Don't forget your Final Exam tomorrow!", 29, 10),
    (8, "Department Meeting starts in 1 hour", 25, 12),
];

/// Populates an empty database with an admin account and a month of demo
/// events. Returns `false` without touching anything if users exist.
pub async fn seed_demo_data(db: &SqlitePool) -> Result<bool, AppError> {
    if repository::count_users(db).await? > 0 {
        info!("Database already has users; skipping demo seed");
        return Ok(false);
    }

    let password_hash = hash_password(DEMO_ADMIN_PASSWORD).await?;
    let admin = repository::insert_user(db, DEMO_ADMIN_USERNAME, &password_hash, true).await?;
    info!("Created admin user {}", admin.id);

    let year = Utc::now().year();
    let mut event_ids = Vec::with_capacity(DEMO_EVENTS.len());
    for (title, category, day, time, description, location) in DEMO_EVENTS {
        let event = repository::insert_event(
            db,
            NewEvent {
                title: title.to_string(),
                description: Some(description.to_string()),
                category,
                date: format!("{}-05-{:02}", year, day),
                time: time.to_string(),
                location: Some(location.to_string()),
                created_by_id: Some(admin.id.clone()),
            },
        )
        .await?;
        event_ids.push(event.id);
    }

    for (index, message, day, hour) in DEMO_REMINDERS {
        let notify_at = NaiveDate::from_ymd_opt(year, 5, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .ok_or_else(|| AppError::Internal("invalid demo reminder date".to_string()))?
            .and_utc();
        repository::insert_notification(
            db,
            NewNotification {
                event_id: event_ids.get(index).cloned(),
                message: message.to_string(),
                notify_at,
            },
        )
        .await?;
    }

    info!(
        "Seeded {} demo events and {} reminders",
        DEMO_EVENTS.len(),
        DEMO_REMINDERS.len()
    );
    Ok(true)
}
