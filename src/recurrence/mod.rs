//! Shared recurrence utility: grammar, parsing, and occurrence calculation
//! used by both the Recurring-Task Generator and (conceptually) the Task
//! API's input validation. Grounded on
//! `original_source/Phase-II/backend/src/utils/recurrence.py`.

mod occurrence;
mod pattern;

pub use occurrence::{all_occurrences, next_occurrence, occurs_on};
pub use pattern::{parse, validate, Pattern, PatternKind, RecurrenceError, Weekday};
