//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `RosterService` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use batch_scheduling_core::domain::{Batch, NewBatch, NewSession, Session, SessionFilter};
use batch_scheduling_core::ports::{DatabaseService, PortError, PortResult, RosterService};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "id, batch_id, level, topic, session_date, start_time, end_time, meet_link, status";
const BATCH_COLUMNS: &str = "id, name, level, days, time_label, timezone, meet_link";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage and roster ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a `sqlx` error onto the port error, keeping uniqueness violations distinct.
fn map_db_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BatchRecord {
    id: Uuid,
    name: String,
    level: i32,
    days: Vec<String>,
    time_label: String,
    timezone: String,
    meet_link: String,
}
impl BatchRecord {
    fn to_domain(self) -> Batch {
        Batch {
            id: self.id,
            name: self.name,
            level: self.level,
            days: self.days,
            time: self.time_label,
            timezone: self.timezone,
            meet_link: self.meet_link,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    batch_id: Uuid,
    level: i32,
    topic: i32,
    session_date: NaiveDate,
    start_time: String,
    end_time: String,
    meet_link: String,
    status: String,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let status = self.status.parse().map_err(PortError::Unexpected)?;
        Ok(Session {
            id: self.id,
            batch_id: self.batch_id,
            level: self.level,
            topic: self.topic,
            date: self.session_date,
            start_time: self.start_time,
            end_time: self.end_time,
            meet_link: self.meet_link,
            status,
        })
    }
}

fn sessions_to_domain(records: Vec<SessionRecord>) -> PortResult<Vec<Session>> {
    records.into_iter().map(SessionRecord::to_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_batch(&self, batch: NewBatch) -> PortResult<Batch> {
        let sql = format!(
            "INSERT INTO batches (id, name, level, days, time_label, timezone, meet_link) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            BATCH_COLUMNS
        );
        let record = sqlx::query_as::<_, BatchRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&batch.name)
            .bind(batch.level)
            .bind(&batch.days)
            .bind(&batch.time)
            .bind(&batch.timezone)
            .bind(&batch.meet_link)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(record.to_domain())
    }

    async fn get_batch_by_id(&self, batch_id: Uuid) -> PortResult<Batch> {
        let sql = format!("SELECT {} FROM batches WHERE id = $1", BATCH_COLUMNS);
        let record = sqlx::query_as::<_, BatchRecord>(&sql)
            .bind(batch_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("Batch {} not found", batch_id)),
                _ => map_db_error(e),
            })?;
        Ok(record.to_domain())
    }

    async fn list_batches(&self) -> PortResult<Vec<Batch>> {
        let sql = format!("SELECT {} FROM batches ORDER BY created_at ASC", BATCH_COLUMNS);
        let records = sqlx::query_as::<_, BatchRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_batch(&self, batch_id: Uuid) -> PortResult<()> {
        // Sessions cascade and account assignments are cleared by the foreign keys.
        let result = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Batch {} not found", batch_id)));
        }
        Ok(())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Session {} not found", session_id))
                }
                _ => map_db_error(e),
            })?;
        record.to_domain()
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> PortResult<Vec<Session>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM sessions WHERE TRUE", SESSION_COLUMNS));
        if let Some(batch_id) = filter.batch_id {
            query.push(" AND batch_id = ").push_bind(batch_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY session_date ASC, start_time ASC");

        let records = query
            .build_query_as::<SessionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        sessions_to_domain(records)
    }

    async fn get_sessions_in_window(
        &self,
        batch_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE batch_id = $1 AND session_date BETWEEN $2 AND $3",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(batch_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        sessions_to_domain(records)
    }

    async fn get_max_topic(&self, batch_id: Uuid) -> PortResult<Option<i32>> {
        sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(topic) FROM sessions WHERE batch_id = $1")
            .bind(batch_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_session_at_slot(
        &self,
        batch_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> PortResult<Option<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE batch_id = $1 AND session_date = $2 AND start_time = $3",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(batch_id)
            .bind(date)
            .bind(start_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        record.map(SessionRecord::to_domain).transpose()
    }

    async fn create_sessions(&self, sessions: Vec<NewSession>) -> PortResult<Vec<Session>> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        // One multi-row insert inside a transaction: either every row lands or none.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO sessions \
             (id, batch_id, level, topic, session_date, start_time, end_time, meet_link, status) ",
        );
        query.push_values(sessions.iter(), |mut row, s| {
            row.push_bind(Uuid::new_v4())
                .push_bind(s.batch_id)
                .push_bind(s.level)
                .push_bind(s.topic)
                .push_bind(s.date)
                .push_bind(s.start_time.clone())
                .push_bind(s.end_time.clone())
                .push_bind(s.meet_link.clone())
                .push_bind(s.status.as_str());
        });
        query.push(format!(" RETURNING {}", SESSION_COLUMNS));

        let records = query
            .build_query_as::<SessionRecord>()
            .fetch_all(&mut *tx)
            .await
            .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;

        let mut created = sessions_to_domain(records)?;
        created.sort_by_key(|s| (s.date, s.topic));
        Ok(created)
    }

    async fn update_session(&self, session: &Session) -> PortResult<Session> {
        let sql = format!(
            "UPDATE sessions SET session_date = $2, start_time = $3, end_time = $4, \
             meet_link = $5, status = $6 WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session.id)
            .bind(session.date)
            .bind(&session.start_time)
            .bind(&session.end_time)
            .bind(&session.meet_link)
            .bind(session.status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session.id)))?;
        record.to_domain()
    }
}

//=========================================================================================
// `RosterService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RosterService for DbAdapter {
    async fn student_counts_by_batch(&self) -> PortResult<HashMap<Uuid, i64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT batch_id, COUNT(*) FROM accounts WHERE batch_id IS NOT NULL GROUP BY batch_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().collect())
    }
}
