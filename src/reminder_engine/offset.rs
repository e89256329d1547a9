//! Reminder-offset grammar: `<integer> (minute|minutes|min|mins|hour|hours|hr
//! |hrs|day|days|week|weeks|wk|wks)`, case-insensitive.

use std::sync::OnceLock;

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OffsetError {
    #[error("offset does not match '<integer> <unit>'")]
    Malformed,

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*(\d+)\s*([a-z]+)\s*$").unwrap())
}

/// Parses a reminder-offset expression into a duration. A parse failure is
/// not an error condition in the caller's business logic -- it simply means
/// no reminder gets scheduled -- but the distinction is still surfaced here
/// for callers (tests, input validation) that want to know why.
pub fn parse(offset: &str) -> Result<Duration, OffsetError> {
    let captures = pattern().captures(offset).ok_or(OffsetError::Malformed)?;
    let amount: i64 = captures[1].parse().map_err(|_| OffsetError::Malformed)?;
    let unit = captures[2].to_lowercase();

    match unit.as_str() {
        "minute" | "minutes" | "min" | "mins" => Ok(Duration::minutes(amount)),
        "hour" | "hours" | "hr" | "hrs" => Ok(Duration::hours(amount)),
        "day" | "days" => Ok(Duration::days(amount)),
        "week" | "weeks" | "wk" | "wks" => Ok(Duration::weeks(amount)),
        other => Err(OffsetError::UnknownUnit(other.to_string())),
    }
}
