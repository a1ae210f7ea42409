use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::Event;
use crate::models::event::DATE_FORMAT;

/// One cell of a Sunday-first month grid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: String,
    pub day: u32,
    pub current_month: bool,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

/// Dates shown for `year`/`month`: trailing days of the previous month up
/// to Sunday, the month itself, then next-month days to finish the week.
/// `None` for an invalid month.
pub fn month_grid(year: i32, month: u32) -> Option<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = (next_first - first).num_days();
    let leading = i64::from(first.weekday().num_days_from_sunday());
    let total = ((leading + days_in_month + 6) / 7) * 7;

    let start = first - Duration::days(leading);
    Some((0..total).map(|offset| start + Duration::days(offset)).collect())
}

/// Places events on the grid by their date string. Events outside the grid
/// are ignored.
pub fn month_view(year: i32, month: u32, events: &[Event]) -> Option<MonthView> {
    let grid = month_grid(year, month)?;
    let days = grid
        .into_iter()
        .map(|date| {
            let key = date.format(DATE_FORMAT).to_string();
            let events = events.iter().filter(|e| e.date == key).cloned().collect();
            CalendarDay {
                day: date.day(),
                current_month: date.month() == month,
                date: key,
                events,
            }
        })
        .collect();

    Some(MonthView { year, month, days })
}

/// First and last grid dates as `YYYY-MM-DD`, for the range query.
pub fn grid_bounds(year: i32, month: u32) -> Option<(String, String)> {
    let grid = month_grid(year, month)?;
    let first = grid.first()?.format(DATE_FORMAT).to_string();
    let last = grid.last()?.format(DATE_FORMAT).to_string();
    Some((first, last))
}
