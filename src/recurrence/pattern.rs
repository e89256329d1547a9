use thiserror::Error;

/// Errors produced when a recurrence pattern string fails to validate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("pattern must be a non-empty string")]
    Empty,

    #[error("invalid pattern type '{0}', must be one of: daily, weekly, monthly, yearly")]
    InvalidType(String),

    #[error("daily pattern does not accept parameters")]
    DailyTakesNoParams,

    #[error("yearly pattern does not accept parameters")]
    YearlyTakesNoParams,

    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),

    #[error("monthly pattern parameters must be comma-separated numbers (e.g. '1,15,30')")]
    MonthlyParamsNotNumeric,

    #[error("invalid day-of-month '{0}', must be between 1 and 31")]
    InvalidDayOfMonth(i64),
}

/// `0 = Monday .. 6 = Sunday`, matching Python's `date.weekday()` which the
/// source's day-name table (and this implementation) is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

impl Weekday {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "monday" | "mon" => Some(Self::Monday),
            "tuesday" | "tue" => Some(Self::Tuesday),
            "wednesday" | "wed" => Some(Self::Wednesday),
            "thursday" | "thu" => Some(Self::Thursday),
            "friday" | "fri" => Some(Self::Friday),
            "saturday" | "sat" => Some(Self::Saturday),
            "sunday" | "sun" => Some(Self::Sunday),
            _ => None,
        }
    }
}

/// The recurrence family, with its pattern-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    Daily,
    /// Empty `days` means "same day next week" (the source's default-weekly
    /// branch); a populated, sorted list means "on these specific weekdays".
    Weekly { days: Vec<Weekday> },
    /// Empty `dates` means "same day-of-month next month"; a populated,
    /// sorted list means "on these specific days-of-month".
    Monthly { dates: Vec<u32> },
    Yearly,
}

/// A parsed, validated recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub kind: PatternKind,
    raw: String,
}

impl Pattern {
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// `Validate(pattern) -> (ok, msg)` from the shared recurrence utility
/// contract: cheaper than `parse` when only a yes/no answer is needed.
pub fn validate(pattern: &str) -> Result<(), RecurrenceError> {
    parse(pattern).map(|_| ())
}

/// `Parse(pattern) -> structured`.
pub fn parse(pattern: &str) -> Result<Pattern, RecurrenceError> {
    if pattern.trim().is_empty() {
        return Err(RecurrenceError::Empty);
    }
    let normalized = pattern.trim().to_lowercase();
    let mut parts = normalized.splitn(2, ':');
    let pattern_type = parts.next().unwrap_or("").trim();
    let params = parts.next().map(str::trim);

    let kind = match pattern_type {
        "daily" => {
            if params.is_some() {
                return Err(RecurrenceError::DailyTakesNoParams);
            }
            PatternKind::Daily
        }
        "weekly" => {
            let mut days = match params {
                None => Vec::new(),
                Some(params) => params
                    .split(',')
                    .map(|d| {
                        let d = d.trim();
                        Weekday::parse(d).ok_or_else(|| RecurrenceError::InvalidWeekday(d.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            days.sort_unstable();
            PatternKind::Weekly { days }
        }
        "monthly" => {
            let mut dates = match params {
                None => Vec::new(),
                Some(params) => params
                    .split(',')
                    .map(|d| {
                        let d = d.trim();
                        let day: i64 = d
                            .parse()
                            .map_err(|_| RecurrenceError::MonthlyParamsNotNumeric)?;
                        if !(1..=31).contains(&day) {
                            return Err(RecurrenceError::InvalidDayOfMonth(day));
                        }
                        Ok(day as u32)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            dates.sort_unstable();
            PatternKind::Monthly { dates }
        }
        "yearly" => {
            if params.is_some() {
                return Err(RecurrenceError::YearlyTakesNoParams);
            }
            PatternKind::Yearly
        }
        other => return Err(RecurrenceError::InvalidType(other.to_string())),
    };

    Ok(Pattern {
        kind,
        raw: normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_and_yearly_reject_parameters() {
        assert_eq!(parse("daily:1"), Err(RecurrenceError::DailyTakesNoParams));
        assert_eq!(parse("yearly:1"), Err(RecurrenceError::YearlyTakesNoParams));
    }

    #[test]
    fn weekly_accepts_short_and_long_day_names_case_insensitively() {
        let p = parse("Weekly:FRI,monday").unwrap();
        assert_eq!(
            p.kind,
            PatternKind::Weekly {
                days: vec![Weekday::Monday, Weekday::Friday]
            }
        );
    }

    #[test]
    fn weekly_rejects_unknown_day() {
        assert_eq!(
            parse("weekly:funday"),
            Err(RecurrenceError::InvalidWeekday("funday".to_string()))
        );
    }

    #[test]
    fn monthly_rejects_out_of_range_day() {
        assert_eq!(parse("monthly:32"), Err(RecurrenceError::InvalidDayOfMonth(32)));
        assert_eq!(parse("monthly:0"), Err(RecurrenceError::InvalidDayOfMonth(0)));
    }

    #[test]
    fn monthly_sorts_dates() {
        let p = parse("monthly:15,1,30").unwrap();
        assert_eq!(p.kind, PatternKind::Monthly { dates: vec![1, 15, 30] });
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(
            parse("fortnightly"),
            Err(RecurrenceError::InvalidType("fortnightly".to_string()))
        );
    }

    #[test]
    fn validate_mirrors_parse() {
        assert!(validate("daily").is_ok());
        assert!(validate("weekly:tomorrow").is_err());
    }
}
