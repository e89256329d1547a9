//! Property tests for the recurrence grammar, grounded on the teacher's
//! `tests/property_dependency_resolver.rs` proptest harness.

use proptest::prelude::*;
use taskwave::recurrence::{parse as parse_pattern, validate, Weekday};

fn weekday_name(w: Weekday) -> &'static str {
    match w {
        Weekday::Monday => "monday",
        Weekday::Tuesday => "tuesday",
        Weekday::Wednesday => "wednesday",
        Weekday::Thursday => "thursday",
        Weekday::Friday => "friday",
        Weekday::Saturday => "saturday",
        Weekday::Sunday => "sunday",
    }
}

fn weekday_strategy() -> impl Strategy<Value = Weekday> {
    prop_oneof![
        Just(Weekday::Monday),
        Just(Weekday::Tuesday),
        Just(Weekday::Wednesday),
        Just(Weekday::Thursday),
        Just(Weekday::Friday),
        Just(Weekday::Saturday),
        Just(Weekday::Sunday),
    ]
}

proptest! {
    /// `Validate(p) = ok` implies `Parse(p)` succeeds, for any arbitrary
    /// non-empty subset of weekdays in a `weekly:` pattern.
    #[test]
    fn prop_valid_weekly_patterns_validate_and_parse_consistently(
        days in prop::collection::vec(weekday_strategy(), 1..7)
    ) {
        let names: Vec<&str> = days.iter().copied().map(weekday_name).collect();
        let pattern_str = format!("weekly:{}", names.join(","));
        prop_assert!(validate(&pattern_str).is_ok());
        prop_assert!(parse_pattern(&pattern_str).is_ok());
    }

    /// Re-serializing a parsed pattern's raw form and re-parsing it yields
    /// the same structured `Pattern` -- day/date order is normalized by
    /// `parse` itself (sorted), so this holds regardless of input order.
    #[test]
    fn prop_monthly_pattern_round_trips_through_raw(
        dates in prop::collection::vec(1u32..=31, 1..5)
    ) {
        let joined = dates.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        let pattern_str = format!("monthly:{joined}");
        let first = parse_pattern(&pattern_str).unwrap();
        let second = parse_pattern(first.raw()).unwrap();
        prop_assert_eq!(first.kind, second.kind);
    }
}
