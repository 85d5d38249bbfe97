//! crates/batch_scheduling_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the scheduling engine.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage or clock implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{Batch, NewBatch, NewSession, Session, SessionFilter};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A storage-level uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Batch Management ---
    async fn create_batch(&self, batch: NewBatch) -> PortResult<Batch>;

    async fn get_batch_by_id(&self, batch_id: Uuid) -> PortResult<Batch>;

    async fn list_batches(&self) -> PortResult<Vec<Batch>>;

    /// Deletes a batch together with its sessions and clears the batch reference on
    /// every assigned account.
    async fn delete_batch(&self, batch_id: Uuid) -> PortResult<()>;

    // --- Session Management ---
    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session>;

    async fn list_sessions(&self, filter: &SessionFilter) -> PortResult<Vec<Session>>;

    /// Sessions of one batch whose date lies in `[from, to]`.
    async fn get_sessions_in_window(
        &self,
        batch_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<Session>>;

    /// Highest topic ever recorded for the batch, regardless of date.
    async fn get_max_topic(&self, batch_id: Uuid) -> PortResult<Option<i32>>;

    async fn find_session_at_slot(
        &self,
        batch_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> PortResult<Option<Session>>;

    /// Stores every session or none of them. A uniqueness violation on
    /// `(batch_id, date, start_time)` yields `PortError::Conflict`.
    async fn create_sessions(&self, sessions: Vec<NewSession>) -> PortResult<Vec<Session>>;

    /// Overwrites the mutable fields of an existing session.
    async fn update_session(&self, session: &Session) -> PortResult<Session>;
}

#[async_trait]
pub trait RosterService: Send + Sync {
    /// Number of accounts currently assigned to each batch. Batches without students
    /// may be absent from the map.
    async fn student_counts_by_batch(&self) -> PortResult<HashMap<Uuid, i64>>;
}

pub trait Clock: Send + Sync {
    /// The current calendar day.
    fn today(&self) -> NaiveDate;
}
