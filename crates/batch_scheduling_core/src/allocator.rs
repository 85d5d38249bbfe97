//! crates/batch_scheduling_core/src/allocator.rs
//!
//! Turns a batch's weekly recurrence into concrete, non-colliding sessions.
//!
//! The allocator is pure: it receives the sessions already stored for the batch and
//! returns the new sessions to insert. Persisting them (and catching a concurrent
//! writer through the storage uniqueness constraint) is the caller's job.

use chrono::{Days, NaiveDate};
use std::collections::HashSet;

use crate::domain::{Batch, NewSession, Session, SessionStatus, SlotKey};
use crate::error::{SchedulingError, SchedulingResult};
use crate::recurrence::{clamp_days_ahead, generate_dates, parse_weekday_name};
use crate::time_range::parse_time_range;

/// Bounds for the number of sessions one generation call may emit.
pub const MIN_LIMIT: u32 = 8;
pub const MAX_LIMIT: u32 = 12;

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Topic number for the first session of a generation call: the caller's explicit
/// choice, otherwise one past the highest topic ever recorded for the batch.
pub fn first_topic(start_topic: Option<i32>, max_recorded: Option<i32>) -> SchedulingResult<i32> {
    match start_topic {
        Some(topic) => Ok(topic),
        None => max_recorded.unwrap_or(0).checked_add(1).ok_or_else(|| {
            SchedulingError::Validation("topic numbers for this batch are exhausted".to_string())
        }),
    }
}

/// The inclusive date window `[today, today + days_ahead]` after clamping.
pub fn generation_window(today: NaiveDate, days_ahead: u32) -> (NaiveDate, NaiveDate) {
    let days_ahead = clamp_days_ahead(days_ahead);
    let end = today
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .unwrap_or(NaiveDate::MAX);
    (today, end)
}

#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest {
    pub today: NaiveDate,
    pub days_ahead: u32,
    pub limit: u32,
    pub first_topic: i32,
}

#[derive(Debug, Clone)]
pub struct AllocationPlan {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub sessions: Vec<NewSession>,
    /// Candidate dates skipped because their slot was already booked.
    pub skipped: usize,
}

/// Plans the next sessions for `batch`.
///
/// Emitted sessions never collide with each other or with `existing`, and their
/// topics increase by exactly one. A fully booked window yields
/// `SchedulingError::EmptyResult`.
pub fn allocate(
    batch: &Batch,
    existing: &[Session],
    request: AllocationRequest,
) -> SchedulingResult<AllocationPlan> {
    let range = parse_time_range(&batch.time).ok_or_else(|| {
        SchedulingError::Validation(format!(
            "batch {} has an unparseable time range '{}'",
            batch.id, batch.time
        ))
    })?;

    let weekdays: Vec<_> = batch
        .days
        .iter()
        .filter_map(|d| parse_weekday_name(d))
        .collect();
    if weekdays.is_empty() {
        return Err(SchedulingError::Validation(format!(
            "batch {} has no valid weekdays",
            batch.id
        )));
    }

    let days_ahead = clamp_days_ahead(request.days_ahead);
    let limit = clamp_limit(request.limit);

    // Every topic this call could emit must fit in an i32.
    if request.first_topic < 1 || request.first_topic.checked_add(limit as i32 - 1).is_none() {
        return Err(SchedulingError::Validation(format!(
            "start topic {} leaves no room for {} sessions",
            request.first_topic, limit
        )));
    }
    let limit = limit as usize;
    let (window_start, window_end) = generation_window(request.today, days_ahead);

    let mut booked: HashSet<SlotKey> = existing
        .iter()
        .filter(|s| s.batch_id == batch.id && s.date >= window_start && s.date <= window_end)
        .map(Session::slot)
        .collect();

    let mut sessions = Vec::with_capacity(limit);
    let mut skipped = 0;

    for date in generate_dates(&weekdays, window_start, days_ahead) {
        if sessions.len() >= limit {
            break;
        }
        if !booked.insert(SlotKey::new(date, &range.start_time)) {
            skipped += 1;
            continue;
        }
        sessions.push(NewSession {
            batch_id: batch.id,
            level: batch.level,
            topic: request.first_topic + sessions.len() as i32,
            date,
            start_time: range.start_time.clone(),
            end_time: range.end_time.clone(),
            meet_link: batch.meet_link.clone(),
            status: SessionStatus::Scheduled,
        });
    }

    if sessions.is_empty() {
        return Err(SchedulingError::EmptyResult {
            batch_id: batch.id,
            from: window_start,
            to: window_end,
        });
    }

    Ok(AllocationPlan {
        window_start,
        window_end,
        sessions,
        skipped,
    })
}
