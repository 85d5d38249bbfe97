//! crates/batch_scheduling_core/src/weekly.rs
//!
//! Projects every batch's recurrence into a sorted weekly timetable.

use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Batch, WeeklySlot};
use crate::recurrence::{parse_weekday_name, weekday_name};
use crate::time_range::parse_time_range;

/// One slot per `(batch, weekday)`, ordered by weekday (Sunday first) and then by
/// start time. Unknown weekday values are skipped.
pub fn build_weekly_view(batches: &[Batch], student_counts: &HashMap<Uuid, i64>) -> Vec<WeeklySlot> {
    let mut slots = Vec::new();

    for batch in batches {
        let Some(range) = parse_time_range(&batch.time) else {
            warn!(batch_id = %batch.id, time = %batch.time, "Skipping batch with unparseable time range");
            continue;
        };
        let student_count = student_counts.get(&batch.id).copied().unwrap_or(0);

        for day in batch.days.iter().filter_map(|d| parse_weekday_name(d)) {
            slots.push(WeeklySlot {
                weekday: weekday_name(day).to_string(),
                weekday_index: day.num_days_from_sunday(),
                start_time: range.start_time.clone(),
                end_time: range.end_time.clone(),
                start_minutes: range.start_minutes,
                batch_id: batch.id,
                batch_name: batch.name.clone(),
                level: batch.level,
                meet_link: batch.meet_link.clone(),
                timezone: batch.timezone.clone(),
                student_count,
            });
        }
    }

    slots.sort_by_key(|s| (s.weekday_index, s.start_minutes));
    slots
}
