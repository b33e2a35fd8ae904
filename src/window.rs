use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ReportError;

/// Half-open timestamp range used to filter call records: a call is inside
/// the window when `start <= started_at < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| ReportError::invalid_input(format!("malformed date '{input}'")))
}

/// `[date 00:00, date + 1 day)` — the whole calendar day.
pub fn single_day(date: &str) -> Result<TimeWindow, ReportError> {
    let day = parse_date(date)?;
    let start = day.and_time(NaiveTime::MIN);
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ReportError::invalid_input(format!("date '{date}' out of range")))?;
    Ok(TimeWindow {
        start,
        end: next.and_time(NaiveTime::MIN),
    })
}

/// `[date - 1 calendar month, date 00:00)`. The upper bound is the start of
/// the target date, so same-day records fall outside the window; this keeps
/// the historical query behavior (see DESIGN.md).
pub fn trailing_month(date: &str) -> Result<TimeWindow, ReportError> {
    let day = parse_date(date)?;
    trailing_months(day, 1)
}

/// `[anchor - n calendar months, anchor 00:00)`. Month arithmetic clamps at
/// month ends (e.g. March 31 minus one month is February 28/29).
pub fn trailing_months(anchor: NaiveDate, months: u32) -> Result<TimeWindow, ReportError> {
    let start = anchor
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| ReportError::invalid_input(format!("date '{anchor}' out of range")))?;
    Ok(TimeWindow {
        start: start.and_time(NaiveTime::MIN),
        end: anchor.and_time(NaiveTime::MIN),
    })
}

/// The 5-month look-back used by the per-month duration report, anchored on
/// the current date.
pub fn trailing_five_months() -> Result<TimeWindow, ReportError> {
    trailing_months(Utc::now().date_naive(), 5)
}
