//! crates/batch_scheduling_core/src/error.rs
//!
//! The error type returned by every scheduling operation.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// Malformed caller input: time text, day sets, links, dates.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested slot is already taken within the batch.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generation found no free slot in the window. Expected and recoverable.
    #[error("No sessions generated for batch {batch_id} between {from} and {to}: every slot is already booked")]
    EmptyResult {
        batch_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PortError> for SchedulingError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => SchedulingError::NotFound(msg),
            PortError::Conflict(msg) => SchedulingError::Conflict(msg),
            PortError::Unexpected(msg) => SchedulingError::Internal(msg),
        }
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
