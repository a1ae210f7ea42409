use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Id;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("time pattern compiles"));

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub const MAX_TITLE_LEN: usize = 200;

/// Lead times offered when scheduling an event reminder, in minutes.
pub const REMINDER_LEAD_MINUTES: [u32; 7] = [0, 15, 30, 60, 120, 1440, 2880];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventCategory {
    Deadline,
    Quiz,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [Self::Deadline, Self::Quiz, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Quiz => "quiz",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("category must be one of deadline, quiz, other (got '{}')", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Id,
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub date: String,
    pub time: String,
    pub location: Option<String>,
    pub created_by_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Date and time combined, read as UTC.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()?;
        let time = NaiveTime::parse_from_str(&self.time, TIME_FORMAT).ok()?;
        Some(NaiveDateTime::new(date, time).and_utc())
    }
}

/// A validated event ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub category: EventCategory,
    pub date: String,
    pub time: String,
    pub location: Option<String>,
    pub created_by_id: Option<Id>,
}

/// Validated partial update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub minutes_before: u32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub notify: Option<ReminderRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<u32>,
}

pub fn validate_date(value: &str) -> Result<(), String> {
    if !DATE_RE.is_match(value) {
        return Err(format!("date must match YYYY-MM-DD (got '{}')", value));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| format!("date '{}' is not a calendar date", value))
}

pub fn validate_time(value: &str) -> Result<(), String> {
    if !TIME_RE.is_match(value) {
        return Err(format!("time must match HH:MM (got '{}')", value));
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map(|_| ())
        .map_err(|_| format!("time '{}' is not a valid time of day", value))
}

fn validate_title(value: &str, problems: &mut Vec<String>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        problems.push("title is required".to_string());
    } else if trimmed.chars().count() > MAX_TITLE_LEN {
        problems.push(format!("title must be at most {} characters", MAX_TITLE_LEN));
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl CreateEventRequest {
    pub fn validate(self, created_by_id: Option<Id>) -> Result<(NewEvent, Option<ReminderRequest>), Vec<String>> {
        let mut problems = Vec::new();

        match self.title.as_deref() {
            Some(title) => validate_title(title, &mut problems),
            None => problems.push("title is required".to_string()),
        }

        let category = match self.category.as_deref() {
            Some(raw) => raw.parse::<EventCategory>().map_err(|e| problems.push(e)).ok(),
            None => {
                problems.push("category is required".to_string());
                None
            }
        };

        match self.date.as_deref() {
            Some(date) => {
                if let Err(e) = validate_date(date) {
                    problems.push(e);
                }
            }
            None => problems.push("date is required".to_string()),
        }

        match self.time.as_deref() {
            Some(time) => {
                if let Err(e) = validate_time(time) {
                    problems.push(e);
                }
            }
            None => problems.push("time is required".to_string()),
        }

        if let Some(reminder) = &self.notify {
            if !REMINDER_LEAD_MINUTES.contains(&reminder.minutes_before) {
                problems.push(format!(
                    "notify.minutesBefore must be one of {:?}",
                    REMINDER_LEAD_MINUTES
                ));
            }
        }

        match (problems.is_empty(), category) {
            (true, Some(category)) => Ok((
                NewEvent {
                    title: self.title.unwrap_or_default().trim().to_string(),
                    description: non_empty(self.description),
                    category,
                    date: self.date.unwrap_or_default(),
                    time: self.time.unwrap_or_default(),
                    location: non_empty(self.location),
                    created_by_id,
                },
                self.notify,
            )),
            _ => Err(problems),
        }
    }
}

impl UpdateEventRequest {
    pub fn validate(self) -> Result<EventPatch, Vec<String>> {
        let mut problems = Vec::new();

        if let Some(title) = self.title.as_deref() {
            validate_title(title, &mut problems);
        }
        let category = match self.category.as_deref() {
            Some(raw) => raw.parse::<EventCategory>().map_err(|e| problems.push(e)).ok(),
            None => None,
        };
        if let Some(Err(e)) = self.date.as_deref().map(validate_date) {
            problems.push(e);
        }
        if let Some(Err(e)) = self.time.as_deref().map(validate_time) {
            problems.push(e);
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        Ok(EventPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description,
            category,
            date: self.date,
            time: self.time,
            location: self.location,
        })
    }
}
