use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

use super::pattern::{Pattern, PatternKind};

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
        .day()
}

fn with_ymd_clamped(from: DateTime<Utc>, year: i32, month: u32, day: u32) -> DateTime<Utc> {
    let day = day.min(days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid");
    let naive = date.and_hms_opt(from.hour(), from.minute(), from.second()).unwrap();
    Utc.from_utc_datetime(&naive)
}

/// Like `with_ymd_clamped`, but zeroes the time-of-day to midnight. The
/// monthly branch of `calculate_next_occurrence` in
/// `original_source/Phase-II/backend/src/utils/recurrence.py` replaces
/// `hour`/`minute`/`second`/`microsecond` with 0 -- unlike the daily/weekly
/// (timedelta-based) and yearly (`replace(year=...)`, time untouched)
/// branches, which preserve `from`'s time-of-day.
fn with_ymd_clamped_midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    let day = day.min(days_in_month(year, month));
    let date = NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid");
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    Utc.from_utc_datetime(&naive)
}

/// `NextOccurrence(parsed, from, end?)`.
///
/// Mirrors `original_source/Phase-II/backend/src/utils/recurrence.py`'s
/// `calculate_next_occurrence`: weekly/monthly "with specifics" search for
/// the next matching weekday/day-of-month *strictly after* `from`, wrapping
/// to the following week/month when none remains in the current one.
pub fn next_occurrence(
    pattern: &Pattern,
    from: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let next = match &pattern.kind {
        PatternKind::Daily => from + Duration::days(1),
        PatternKind::Weekly { days } => {
            if days.is_empty() {
                from + Duration::weeks(1)
            } else {
                let current = super::pattern::Weekday::from_chrono(from.weekday()).as_u8();
                let days_ahead = days
                    .iter()
                    .map(|d| d.as_u8())
                    .find(|&target| target > current)
                    .map(|target| i64::from(target) - i64::from(current))
                    .unwrap_or_else(|| {
                        let first = days[0].as_u8();
                        (7 - i64::from(current)) + i64::from(first)
                    });
                from + Duration::days(days_ahead)
            }
        }
        PatternKind::Monthly { dates } => {
            if dates.is_empty() {
                let (year, month) = if from.month() == 12 {
                    (from.year() + 1, 1)
                } else {
                    (from.year(), from.month() + 1)
                };
                with_ymd_clamped_midnight(year, month, from.day())
            } else {
                let current_day = from.day();
                match dates.iter().copied().find(|&d| d > current_day) {
                    Some(target) => with_ymd_clamped_midnight(from.year(), from.month(), target),
                    None => {
                        let (year, month) = if from.month() == 12 {
                            (from.year() + 1, 1)
                        } else {
                            (from.year(), from.month() + 1)
                        };
                        with_ymd_clamped_midnight(year, month, dates[0])
                    }
                }
            }
        }
        PatternKind::Yearly => with_ymd_clamped(from, from.year() + 1, from.month(), from.day()),
    };

    match end {
        Some(end) if next > end => None,
        _ => Some(next),
    }
}

/// Whether `date` is itself a recurrence day of `pattern`, anchored on the
/// template's `created_at` for the "same day" branches (empty `days`/
/// `dates`). Used by the Recurring-Task Generator's daily scan: a template
/// materializes for today only when today is actually an occurrence day,
/// not merely whenever no instance for today exists yet.
pub fn occurs_on(pattern: &Pattern, anchor: DateTime<Utc>, date: NaiveDate) -> bool {
    match &pattern.kind {
        PatternKind::Daily => true,
        PatternKind::Weekly { days } => {
            let weekday = super::pattern::Weekday::from_chrono(date.weekday());
            if days.is_empty() {
                weekday == super::pattern::Weekday::from_chrono(anchor.weekday())
            } else {
                days.contains(&weekday)
            }
        }
        PatternKind::Monthly { dates } => {
            let clamped_day = |d: u32| d.min(days_in_month(date.year(), date.month()));
            if dates.is_empty() {
                date.day() == clamped_day(anchor.day())
            } else {
                dates.iter().any(|&d| date.day() == clamped_day(d))
            }
        }
        PatternKind::Yearly => date.month() == anchor.month() && date.day() == anchor.day(),
    }
}

/// `AllOccurrences(parsed, start, end?, max)`.
pub fn all_occurrences(
    pattern: &Pattern,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    max: usize,
) -> Vec<DateTime<Utc>> {
    let mut occurrences = vec![start];
    let mut current = start;
    while occurrences.len() < max {
        match next_occurrence(pattern, current, end) {
            Some(next) => {
                occurrences.push(next);
                current = next;
            }
            None => break,
        }
    }
    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::pattern::parse;

    fn dt(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn weekly_friday_from_wednesday_is_that_friday() {
        let pattern = parse("weekly:friday").unwrap();
        // 2025-01-08 is a Wednesday.
        let next = next_occurrence(&pattern, dt("2025-01-08T00:00:00Z"), None).unwrap();
        assert_eq!(next, dt("2025-01-10T00:00:00Z"));
    }

    #[test]
    fn weekly_friday_from_saturday_is_the_following_friday() {
        let pattern = parse("weekly:friday").unwrap();
        // 2025-01-11 is a Saturday.
        let next = next_occurrence(&pattern, dt("2025-01-11T00:00:00Z"), None).unwrap();
        assert_eq!(next, dt("2025-01-17T00:00:00Z"));
    }

    #[test]
    fn monthly_31_in_february_clamps_to_28_or_29() {
        let pattern = parse("monthly:31").unwrap();
        let next = next_occurrence(&pattern, dt("2025-01-31T00:00:00Z"), None).unwrap();
        assert_eq!(next, dt("2025-02-28T00:00:00Z"));

        let next_leap = next_occurrence(&pattern, dt("2024-01-31T00:00:00Z"), None).unwrap();
        assert_eq!(next_leap, dt("2024-02-29T00:00:00Z"));
    }

    #[test]
    fn daily_advances_one_day() {
        let pattern = parse("daily").unwrap();
        let next = next_occurrence(&pattern, dt("2025-01-01T00:00:00Z"), None).unwrap();
        assert_eq!(next, dt("2025-01-02T00:00:00Z"));
    }

    #[test]
    fn next_occurrence_past_end_date_is_none() {
        let pattern = parse("daily").unwrap();
        let end = dt("2025-01-01T12:00:00Z");
        assert_eq!(next_occurrence(&pattern, dt("2025-01-01T00:00:00Z"), Some(end)), None);
    }

    #[test]
    fn all_occurrences_respects_max() {
        let pattern = parse("daily").unwrap();
        let occurrences = all_occurrences(&pattern, dt("2025-01-01T00:00:00Z"), None, 7);
        assert_eq!(occurrences.len(), 7);
        assert_eq!(occurrences[6], dt("2025-01-07T00:00:00Z"));
    }

    #[test]
    fn daily_occurs_every_day() {
        let pattern = parse("daily").unwrap();
        let anchor = dt("2025-01-01T00:00:00Z");
        assert!(occurs_on(&pattern, anchor, dt("2025-06-15T00:00:00Z").date_naive()));
    }

    #[test]
    fn weekly_with_days_only_occurs_on_those_weekdays() {
        let pattern = parse("weekly:friday").unwrap();
        let anchor = dt("2025-01-01T00:00:00Z");
        assert!(occurs_on(&pattern, anchor, dt("2025-01-10T00:00:00Z").date_naive())); // a Friday
        assert!(!occurs_on(&pattern, anchor, dt("2025-01-08T00:00:00Z").date_naive())); // a Wednesday
    }

    #[test]
    fn weekly_without_days_occurs_on_the_anchor_weekday_only() {
        let pattern = parse("weekly").unwrap();
        let anchor = dt("2025-01-08T00:00:00Z"); // Wednesday
        assert!(occurs_on(&pattern, anchor, dt("2025-01-15T00:00:00Z").date_naive()));
        assert!(!occurs_on(&pattern, anchor, dt("2025-01-10T00:00:00Z").date_naive()));
    }

    #[test]
    fn monthly_31_occurs_on_clamped_last_day_of_february() {
        let pattern = parse("monthly:31").unwrap();
        let anchor = dt("2025-01-01T00:00:00Z");
        assert!(occurs_on(&pattern, anchor, dt("2025-02-28T00:00:00Z").date_naive()));
        assert!(!occurs_on(&pattern, anchor, dt("2025-02-27T00:00:00Z").date_naive()));
    }

    #[test]
    fn monthly_next_occurrence_resets_time_of_day_to_midnight() {
        let pattern = parse("monthly:15").unwrap();
        let next = next_occurrence(&pattern, dt("2025-01-01T14:30:45Z"), None).unwrap();
        assert_eq!(next, dt("2025-01-15T00:00:00Z"));

        let default_monthly = parse("monthly").unwrap();
        let next_default = next_occurrence(&default_monthly, dt("2025-01-10T14:30:45Z"), None).unwrap();
        assert_eq!(next_default, dt("2025-02-10T00:00:00Z"));
    }

    #[test]
    fn yearly_next_occurrence_preserves_time_of_day() {
        let pattern = parse("yearly").unwrap();
        let next = next_occurrence(&pattern, dt("2025-03-10T14:30:45Z"), None).unwrap();
        assert_eq!(next, dt("2026-03-10T14:30:45Z"));
    }

    #[test]
    fn yearly_same_day_next_year() {
        let pattern = parse("yearly").unwrap();
        let next = next_occurrence(&pattern, dt("2025-03-10T00:00:00Z"), None).unwrap();
        assert_eq!(next, dt("2026-03-10T00:00:00Z"));
    }
}
