//! crates/batch_scheduling_core/src/domain.rs
//!
//! Defines the pure, core data structures for the scheduling engine.
//! These structs are independent of any database or serialization format.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::time_range::canonical_time;

/// A recurring weekly class definition for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    /// Stored weekday names. Canonical values are `Sunday`..`Saturday`; anything else is
    /// ignored by the engine.
    pub days: Vec<String>,
    /// Time-range label, e.g. `6:00 PM - 7:00 PM`.
    pub time: String,
    /// Opaque timezone label. Never converted.
    pub timezone: String,
    pub meet_link: String,
}

/// The validated payload used to persist a new batch.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub name: String,
    pub level: i32,
    pub days: Vec<String>,
    pub time: String,
    pub timezone: String,
    pub meet_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a plain status update from `self` to `target` is allowed.
    ///
    /// Completed and Cancelled never move into each other directly; only a reschedule
    /// brings a session back, and it always lands on Scheduled.
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        matches!(
            (self, target),
            (SessionStatus::Scheduled, _)
                | (SessionStatus::Completed, SessionStatus::Completed)
                | (SessionStatus::Cancelled, SessionStatus::Cancelled)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" | "canceled" => Ok(SessionStatus::Cancelled),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// One concrete occurrence of a batch on a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub level: i32,
    /// Position of the session within its batch's teaching order, starting at 1.
    pub topic: i32,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: String,
    pub status: SessionStatus,
}

impl Session {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, &self.start_time)
    }

    /// The curriculum entry this session teaches.
    pub fn curriculum_key(&self) -> CurriculumKey {
        CurriculumKey {
            level: self.level,
            order_number: self.topic,
        }
    }
}

/// A session produced by the allocator that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub batch_id: Uuid,
    pub level: i32,
    pub topic: i32,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: String,
    pub status: SessionStatus,
}

impl NewSession {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, &self.start_time)
    }
}

/// The `(date, start time)` identity used to detect collisions within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub start_time: String,
}

impl SlotKey {
    /// Start times that parse as a 12-hour time are compared in canonical form.
    pub fn new(date: NaiveDate, start_time: &str) -> Self {
        Self {
            date,
            start_time: canonical_time(start_time).unwrap_or_else(|| start_time.trim().to_string()),
        }
    }
}

/// Explicit lookup key between a session and curriculum content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurriculumKey {
    pub level: i32,
    pub order_number: i32,
}

/// A learner account. Only the batch assignment matters to scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub batch_id: Option<Uuid>,
}

/// One `(weekday, start time)` entry of the weekly timetable. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySlot {
    pub weekday: String,
    /// Sunday = 0 .. Saturday = 6.
    pub weekday_index: u32,
    pub start_time: String,
    pub end_time: String,
    pub start_minutes: u32,
    pub batch_id: Uuid,
    pub batch_name: String,
    pub level: i32,
    pub meet_link: String,
    pub timezone: String,
    pub student_count: i64,
}

/// Filters accepted by session listings.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub batch_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
}
