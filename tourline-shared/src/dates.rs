use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Raised when a date string is neither `YYYY-MM-DD` nor a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date format: '{input}'. Use YYYY-MM-DD or ISO format")]
pub struct DateParseError {
    pub input: String,
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a calendar date from either a plain `YYYY-MM-DD` string or a full timestamp.
///
/// Timestamps keep their own calendar day; offsets are not normalized to UTC.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|ts| ts.date())
        .ok_or_else(|| DateParseError {
            input: input.to_string(),
        })
}

/// Inclusive number of calendar days between `start` and `end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Every calendar date in `[start, end]`.
pub fn each_day(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Long form used in customer-facing emails, e.g. "March 05, 2030".
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}
