//! crates/batch_scheduling_core/src/service.rs
//!
//! The administrative operations of the scheduling engine, orchestrated over the
//! storage, roster and clock ports. Every call is a single read-then-write.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocator::{allocate, first_topic, generation_window, AllocationRequest};
use crate::domain::{Batch, NewBatch, Session, SessionFilter, SessionStatus, WeeklySlot};
use crate::error::{SchedulingError, SchedulingResult};
use crate::ports::{Clock, DatabaseService, RosterService};
use crate::recurrence::{clamp_days_ahead, parse_weekday_name, weekday_name};
use crate::rescheduler::{
    apply_reschedule, ensure_slot_free, validate_meet_link, validate_reschedule, RescheduleRequest,
};
use crate::time_range::{parse_time_point, parse_time_range};
use crate::weekly::build_weekly_view;

//=========================================================================================
// Configuration
//=========================================================================================

/// Settings injected into the service at startup.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Link used when a batch is created without one.
    pub default_meet_link: Option<String>,
    pub default_timezone: String,
    pub default_days_ahead: u32,
    pub default_limit: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_meet_link: None,
            default_timezone: "Asia/Kolkata".to_string(),
            default_days_ahead: 30,
            default_limit: 12,
        }
    }
}

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    pub name: String,
    pub level: i32,
    pub days: Vec<String>,
    pub time: String,
    pub timezone: Option<String>,
    pub meet_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateSessionsRequest {
    pub days_ahead: Option<u32>,
    pub limit: Option<u32>,
    pub start_topic: Option<i32>,
}

//=========================================================================================
// The Service
//=========================================================================================

#[derive(Clone)]
pub struct SchedulingService {
    db: Arc<dyn DatabaseService>,
    roster: Arc<dyn RosterService>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl SchedulingService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        roster: Arc<dyn RosterService>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            db,
            roster,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    // --- Batches ---

    /// Validates and stores a new batch. Day names and the time label are stored in
    /// canonical form.
    pub async fn create_batch(&self, request: CreateBatchRequest) -> SchedulingResult<Batch> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(SchedulingError::Validation("batch name must not be empty".to_string()));
        }

        let days = canonical_days(&request.days)?;

        let range = parse_time_range(&request.time).ok_or_else(|| {
            SchedulingError::Validation(format!("invalid time range '{}'", request.time))
        })?;

        let link = request
            .meet_link
            .filter(|l| !l.trim().is_empty())
            .or_else(|| self.config.default_meet_link.clone())
            .ok_or_else(|| SchedulingError::Validation("a meeting link is required".to_string()))?;
        let meet_link = validate_meet_link(&link)?;

        let timezone = request
            .timezone
            .map(|tz| tz.trim().to_string())
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(|| self.config.default_timezone.clone());

        let batch = self
            .db
            .create_batch(NewBatch {
                name,
                level: request.level,
                days,
                time: range.label(),
                timezone,
                meet_link,
            })
            .await?;

        info!(batch_id = %batch.id, days = ?batch.days, time = %batch.time, "Batch created");
        Ok(batch)
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> SchedulingResult<Batch> {
        Ok(self.db.get_batch_by_id(batch_id).await?)
    }

    pub async fn list_batches(&self) -> SchedulingResult<Vec<Batch>> {
        Ok(self.db.list_batches().await?)
    }

    /// Removes the batch and its sessions; assigned accounts keep existing without a batch.
    pub async fn delete_batch(&self, batch_id: Uuid) -> SchedulingResult<()> {
        self.db.delete_batch(batch_id).await?;
        info!(batch_id = %batch_id, "Batch deleted");
        Ok(())
    }

    // --- Sessions ---

    /// Generates the next sessions for a batch.
    ///
    /// Returns `EmptyResult` when every slot in the window is already booked, and
    /// `Conflict` when a concurrent generation stored one of the slots first.
    pub async fn generate_sessions(
        &self,
        batch_id: Uuid,
        request: GenerateSessionsRequest,
    ) -> SchedulingResult<Vec<Session>> {
        if let Some(topic) = request.start_topic {
            if topic < 1 {
                return Err(SchedulingError::Validation(format!(
                    "start topic must be at least 1, got {}",
                    topic
                )));
            }
        }

        let batch = self.db.get_batch_by_id(batch_id).await?;
        let today = self.clock.today();
        let days_ahead = clamp_days_ahead(request.days_ahead.unwrap_or(self.config.default_days_ahead));
        let limit = request.limit.unwrap_or(self.config.default_limit);
        let (from, to) = generation_window(today, days_ahead);

        let existing = self.db.get_sessions_in_window(batch_id, from, to).await?;
        let max_topic = self.db.get_max_topic(batch_id).await?;

        let plan = match allocate(
            &batch,
            &existing,
            AllocationRequest {
                today,
                days_ahead,
                limit,
                first_topic: first_topic(request.start_topic, max_topic)?,
            },
        ) {
            Ok(plan) => plan,
            Err(e @ SchedulingError::EmptyResult { .. }) => {
                info!(batch_id = %batch_id, %from, %to, "No free slots left in window");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let skipped = plan.skipped;
        let created = self.db.create_sessions(plan.sessions).await.map_err(|e| {
            warn!(batch_id = %batch_id, error = %e, "Bulk session insert failed");
            SchedulingError::from(e)
        })?;

        info!(
            batch_id = %batch_id,
            created = created.len(),
            skipped,
            "Sessions generated"
        );
        Ok(created)
    }

    /// Lists sessions ordered by date and then start time.
    pub async fn list_sessions(&self, filter: SessionFilter) -> SchedulingResult<Vec<Session>> {
        let mut sessions = self.db.list_sessions(&filter).await?;
        sessions.sort_by(compare_sessions);
        Ok(sessions)
    }

    pub async fn complete_session(&self, session_id: Uuid) -> SchedulingResult<Session> {
        self.set_status(session_id, SessionStatus::Completed).await
    }

    pub async fn cancel_session(&self, session_id: Uuid) -> SchedulingResult<Session> {
        self.set_status(session_id, SessionStatus::Cancelled).await
    }

    async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> SchedulingResult<Session> {
        let session = self.db.get_session_by_id(session_id).await?;
        if !session.status.can_transition_to(status) {
            return Err(SchedulingError::Validation(format!(
                "session {} is {} and cannot become {}",
                session_id, session.status, status
            )));
        }
        let updated = self.db.update_session(&Session { status, ..session }).await?;
        info!(session_id = %session_id, status = %status, "Session status updated");
        Ok(updated)
    }

    /// Moves one session to a new date and time. The session comes back as Scheduled
    /// whatever its previous status; a sibling already holding the slot is a conflict.
    pub async fn reschedule_session(
        &self,
        session_id: Uuid,
        request: RescheduleRequest,
    ) -> SchedulingResult<Session> {
        let session = self.db.get_session_by_id(session_id).await?;
        let change = validate_reschedule(&session, &request)?;

        let occupant = self
            .db
            .find_session_at_slot(session.batch_id, change.date, &change.start_time)
            .await?;
        if let Err(e) = ensure_slot_free(&session, occupant.as_ref(), &change) {
            warn!(session_id = %session_id, date = %change.date, start = %change.start_time, "Reschedule conflict");
            return Err(e);
        }

        let updated = self.db.update_session(&apply_reschedule(&session, change)).await?;
        info!(
            session_id = %session_id,
            date = %updated.date,
            start = %updated.start_time,
            "Session rescheduled"
        );
        Ok(updated)
    }

    // --- Timetable ---

    pub async fn weekly_timetable(&self) -> SchedulingResult<Vec<WeeklySlot>> {
        let batches = self.db.list_batches().await?;
        let counts = self.roster.student_counts_by_batch().await?;
        Ok(build_weekly_view(&batches, &counts))
    }
}

fn canonical_days(days: &[String]) -> SchedulingResult<Vec<String>> {
    if days.is_empty() {
        return Err(SchedulingError::Validation("at least one weekday is required".to_string()));
    }
    let mut canonical: Vec<String> = Vec::with_capacity(days.len());
    for day in days {
        let weekday = parse_weekday_name(day)
            .ok_or_else(|| SchedulingError::Validation(format!("unknown weekday '{}'", day)))?;
        let name = weekday_name(weekday).to_string();
        if !canonical.contains(&name) {
            canonical.push(name);
        }
    }
    Ok(canonical)
}

/// Sort key for listings: date, then parseable start times by clock order, then
/// unparseable labels by text, then topic.
fn session_order_key(s: &Session) -> (NaiveDate, Option<u32>, &str, i32) {
    match parse_time_point(&s.start_time) {
        Some(minutes) => (s.date, Some(minutes), "", s.topic),
        None => (s.date, None, s.start_time.as_str(), s.topic),
    }
}

fn compare_sessions(a: &Session, b: &Session) -> Ordering {
    // Parsed start times sort ahead of free-text labels.
    let (a_date, a_min, a_label, a_topic) = session_order_key(a);
    let (b_date, b_min, b_label, b_topic) = session_order_key(b);
    a_date
        .cmp(&b_date)
        .then_with(|| a_min.is_none().cmp(&b_min.is_none()))
        .then_with(|| a_min.cmp(&b_min))
        .then_with(|| a_label.cmp(b_label))
        .then_with(|| a_topic.cmp(&b_topic))
}
