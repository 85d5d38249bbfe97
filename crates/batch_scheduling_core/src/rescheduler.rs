//! crates/batch_scheduling_core/src/rescheduler.rs
//!
//! Validation and application of one-off date/time changes to a single session.

use chrono::{DateTime, NaiveDate};
use url::Url;

use crate::domain::{Session, SessionStatus, SlotKey};
use crate::error::{SchedulingError, SchedulingResult};
use crate::time_range::canonical_time;

/// Raw administrator input for a reschedule.
#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: Option<String>,
}

/// A reschedule whose fields have all been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReschedule {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: String,
}

impl ValidatedReschedule {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, &self.start_time)
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the calendar day.
pub fn parse_session_date(text: &str) -> SchedulingResult<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
        .map_err(|_| SchedulingError::Validation(format!("invalid date '{}'", text)))
}

/// Checks that `link` is an absolute http(s) URL and returns it trimmed.
pub fn validate_meet_link(link: &str) -> SchedulingResult<String> {
    let link = link.trim();
    let parsed = Url::parse(link)
        .map_err(|e| SchedulingError::Validation(format!("invalid meeting link '{}': {}", link, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(link.to_string()),
        _ => Err(SchedulingError::Validation(format!(
            "meeting link '{}' must be an http(s) URL",
            link
        ))),
    }
}

fn normalize_time(label: &str, field: &str) -> SchedulingResult<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(SchedulingError::Validation(format!("{} must not be empty", field)));
    }
    Ok(canonical_time(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

pub fn validate_reschedule(
    session: &Session,
    request: &RescheduleRequest,
) -> SchedulingResult<ValidatedReschedule> {
    let date = parse_session_date(&request.date)?;
    let start_time = normalize_time(&request.start_time, "start time")?;
    let end_time = normalize_time(&request.end_time, "end time")?;
    let link = request
        .meet_link
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or(session.meet_link.as_str());
    let meet_link = validate_meet_link(link)?;

    Ok(ValidatedReschedule {
        date,
        start_time,
        end_time,
        meet_link,
    })
}

/// Fails with `Conflict` when a different session of the same batch already holds
/// the target slot. The session itself may keep its own slot.
pub fn ensure_slot_free(
    session: &Session,
    occupant: Option<&Session>,
    change: &ValidatedReschedule,
) -> SchedulingResult<()> {
    match occupant {
        Some(other)
            if other.id != session.id
                && other.batch_id == session.batch_id
                && other.slot() == change.slot() =>
        {
            Err(SchedulingError::Conflict(format!(
                "batch {} already has session {} on {} at {}",
                session.batch_id, other.id, change.date, change.start_time
            )))
        }
        _ => Ok(()),
    }
}

/// The session after the change. Status always returns to Scheduled, whatever it was.
pub fn apply_reschedule(session: &Session, change: ValidatedReschedule) -> Session {
    Session {
        date: change.date,
        start_time: change.start_time,
        end_time: change.end_time,
        meet_link: change.meet_link,
        status: SessionStatus::Scheduled,
        ..session.clone()
    }
}
