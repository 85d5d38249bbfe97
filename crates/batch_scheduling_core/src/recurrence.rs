//! crates/batch_scheduling_core/src/recurrence.rs
//!
//! Walks a lookahead window day by day and yields the dates that fall on one of
//! a batch's weekdays.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Canonical weekday names, indexed Sunday = 0 .. Saturday = 6.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Lookahead bounds enforced by callers.
pub const MIN_DAYS_AHEAD: u32 = 1;
pub const MAX_DAYS_AHEAD: u32 = 90;

/// Parses a full weekday name, ignoring case and surrounding whitespace.
pub fn parse_weekday_name(name: &str) -> Option<Weekday> {
    let name = name.trim();
    WEEKDAY_NAMES
        .iter()
        .position(|canonical| canonical.eq_ignore_ascii_case(name))
        .and_then(|idx| weekday_from_sunday_index(idx as u32))
}

pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAY_NAMES[day.num_days_from_sunday() as usize]
}

fn weekday_from_sunday_index(idx: u32) -> Option<Weekday> {
    match idx {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn clamp_days_ahead(days_ahead: u32) -> u32 {
    days_ahead.clamp(MIN_DAYS_AHEAD, MAX_DAYS_AHEAD)
}

/// Candidate dates for a weekly recurrence.
///
/// Consumed once: the iterator is not `Clone` and cannot be restarted.
#[derive(Debug)]
pub struct RecurrenceDates {
    weekdays: [bool; 7],
    current: Option<NaiveDate>,
    remaining: u32,
}

impl Iterator for RecurrenceDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while self.remaining > 0 {
            let date = self.current?;
            self.remaining -= 1;
            self.current = date.checked_add_days(Days::new(1));
            if self.weekdays[date.weekday().num_days_from_sunday() as usize] {
                return Some(date);
            }
        }
        None
    }
}

/// Yields every date among the `days_ahead` days starting at `start` (inclusive)
/// whose weekday is in `weekdays`, in chronological order.
pub fn generate_dates(weekdays: &[Weekday], start: NaiveDate, days_ahead: u32) -> RecurrenceDates {
    let mut mask = [false; 7];
    for day in weekdays {
        mask[day.num_days_from_sunday() as usize] = true;
    }
    RecurrenceDates {
        weekdays: mask,
        current: Some(start),
        remaining: days_ahead,
    }
}
