//! crates/batch_scheduling_core/src/time_range.rs
//!
//! Normalizes free-text 12-hour time ranges such as `6:00 PM - 7:00 PM`,
//! `6:00pm-7pm` or a bare `6:00 PM` into canonical start/end labels.
//!
//! Ranges are same-day only. A range whose end reads earlier than its start
//! (e.g. `11:30 PM - 12:15 AM`) is returned as written and never reordered.

use regex::Regex;
use std::sync::OnceLock;
use tracing::error;

/// End-time default used by administrative batch intake.
pub const DEFAULT_SLOT_MINUTES: u32 = 60;

/// End-time default used by the student-facing preferred-time intake.
pub const PREFERRED_SLOT_MINUTES: u32 = 45;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A canonical, parsed time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start_time: String,
    pub end_time: String,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl TimeRange {
    /// The canonical `start - end` label.
    pub fn label(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

fn time_point_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([0-9]{1,2})(?::([0-9]{2}))?\s*([ap])\.?\s*m\.?$")
            .map_err(|e| error!("Time pattern failed to compile: {}", e))
            .ok()
    })
    .as_ref()
}

/// Parses one side of a range into minutes since midnight.
///
/// Accepts `H:MM AM|PM` with H in 1..=12 and MM in 00..=59. The minutes may be
/// omitted (`7pm`).
pub fn parse_time_point(text: &str) -> Option<u32> {
    let caps = time_point_regex()?.captures(text.trim())?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }
    let is_pm = caps.get(3)?.as_str().eq_ignore_ascii_case("p");
    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Some(hour24 * 60 + minute)
}

/// Formats minutes since midnight as a canonical 12-hour label, e.g. `6:05 PM`.
pub fn format_minutes(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour24 = minutes / 60;
    let minute = minutes % 60;
    let meridiem = if hour24 >= 12 { "PM" } else { "AM" };
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", hour12, minute, meridiem)
}

/// Canonicalizes a single time label, or returns `None` if it does not parse.
pub fn canonical_time(text: &str) -> Option<String> {
    parse_time_point(text).map(format_minutes)
}

/// Parses an administrative time range. A missing end defaults to one hour later.
pub fn parse_time_range(text: &str) -> Option<TimeRange> {
    parse_time_range_with_default(text, DEFAULT_SLOT_MINUTES)
}

/// Parses a student's preferred time. A missing end defaults to 45 minutes later.
pub fn parse_preferred_time_range(text: &str) -> Option<TimeRange> {
    parse_time_range_with_default(text, PREFERRED_SLOT_MINUTES)
}

pub fn parse_time_range_with_default(text: &str, default_minutes: u32) -> Option<TimeRange> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut parts = text.split(|c: char| c == '-' || c == '\u{2013}');
    let start_part = parts.next()?;
    let end_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let start_minutes = parse_time_point(start_part)?;
    let end_minutes = match end_part {
        Some(end) => parse_time_point(end)?,
        None => (start_minutes + default_minutes) % MINUTES_PER_DAY,
    };

    Some(TimeRange {
        start_time: format_minutes(start_minutes),
        end_time: format_minutes(end_minutes),
        start_minutes,
        end_minutes,
    })
}
