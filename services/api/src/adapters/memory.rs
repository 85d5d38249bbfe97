//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the storage and roster ports. It enforces the same
//! `(batch_id, date, start_time)` uniqueness and cascade rules as the PostgreSQL schema,
//! which makes it suitable for tests and for running the service without a database.

use async_trait::async_trait;
use batch_scheduling_core::domain::{
    Account, Batch, NewBatch, NewSession, Session, SessionFilter, SlotKey,
};
use batch_scheduling_core::ports::{DatabaseService, PortError, PortResult, RosterService};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Store {
    batches: Vec<Batch>,
    sessions: Vec<Session>,
    accounts: Vec<Account>,
}

/// Thread-safe in-memory storage.
#[derive(Default)]
pub struct MemoryDb {
    store: Mutex<Store>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }

    /// Registers an account, optionally assigned to a batch.
    pub fn add_account(&self, name: &str, batch_id: Option<Uuid>) -> PortResult<Account> {
        let account = Account {
            id: Uuid::new_v4(),
            name: name.to_string(),
            batch_id,
        };
        self.lock()?.accounts.push(account.clone());
        Ok(account)
    }

    pub fn get_account(&self, account_id: Uuid) -> PortResult<Account> {
        self.lock()?
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", account_id)))
    }
}

fn slot_taken(sessions: &[Session], batch_id: Uuid, slot: &SlotKey, except: Option<Uuid>) -> bool {
    sessions
        .iter()
        .any(|s| s.batch_id == batch_id && Some(s.id) != except && &s.slot() == slot)
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_batch(&self, batch: NewBatch) -> PortResult<Batch> {
        let batch = Batch {
            id: Uuid::new_v4(),
            name: batch.name,
            level: batch.level,
            days: batch.days,
            time: batch.time,
            timezone: batch.timezone,
            meet_link: batch.meet_link,
        };
        self.lock()?.batches.push(batch.clone());
        Ok(batch)
    }

    async fn get_batch_by_id(&self, batch_id: Uuid) -> PortResult<Batch> {
        self.lock()?
            .batches
            .iter()
            .find(|b| b.id == batch_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Batch {} not found", batch_id)))
    }

    async fn list_batches(&self) -> PortResult<Vec<Batch>> {
        Ok(self.lock()?.batches.clone())
    }

    async fn delete_batch(&self, batch_id: Uuid) -> PortResult<()> {
        let mut store = self.lock()?;
        let before = store.batches.len();
        store.batches.retain(|b| b.id != batch_id);
        if store.batches.len() == before {
            return Err(PortError::NotFound(format!("Batch {} not found", batch_id)));
        }
        store.sessions.retain(|s| s.batch_id != batch_id);
        for account in store.accounts.iter_mut().filter(|a| a.batch_id == Some(batch_id)) {
            account.batch_id = None;
        }
        Ok(())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        self.lock()?
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> PortResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .lock()?
            .sessions
            .iter()
            .filter(|s| filter.batch_id.map_or(true, |id| s.batch_id == id))
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.start_time.cmp(&b.start_time)));
        Ok(sessions)
    }

    async fn get_sessions_in_window(
        &self,
        batch_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<Session>> {
        Ok(self
            .lock()?
            .sessions
            .iter()
            .filter(|s| s.batch_id == batch_id && s.date >= from && s.date <= to)
            .cloned()
            .collect())
    }

    async fn get_max_topic(&self, batch_id: Uuid) -> PortResult<Option<i32>> {
        Ok(self
            .lock()?
            .sessions
            .iter()
            .filter(|s| s.batch_id == batch_id)
            .map(|s| s.topic)
            .max())
    }

    async fn find_session_at_slot(
        &self,
        batch_id: Uuid,
        date: NaiveDate,
        start_time: &str,
    ) -> PortResult<Option<Session>> {
        let slot = SlotKey::new(date, start_time);
        Ok(self
            .lock()?
            .sessions
            .iter()
            .find(|s| s.batch_id == batch_id && s.slot() == slot)
            .cloned())
    }

    async fn create_sessions(&self, sessions: Vec<NewSession>) -> PortResult<Vec<Session>> {
        let mut store = self.lock()?;

        // Check every row before inserting any of them.
        let mut incoming: HashSet<(Uuid, SlotKey)> = HashSet::new();
        for s in &sessions {
            if !store.batches.iter().any(|b| b.id == s.batch_id) {
                return Err(PortError::NotFound(format!("Batch {} not found", s.batch_id)));
            }
            let slot = s.slot();
            if slot_taken(&store.sessions, s.batch_id, &slot, None)
                || !incoming.insert((s.batch_id, slot))
            {
                return Err(PortError::Conflict(format!(
                    "duplicate slot for batch {} on {} at {}",
                    s.batch_id, s.date, s.start_time
                )));
            }
        }

        let created: Vec<Session> = sessions
            .into_iter()
            .map(|s| Session {
                id: Uuid::new_v4(),
                batch_id: s.batch_id,
                level: s.level,
                topic: s.topic,
                date: s.date,
                start_time: s.start_time,
                end_time: s.end_time,
                meet_link: s.meet_link,
                status: s.status,
            })
            .collect();
        store.sessions.extend(created.iter().cloned());
        Ok(created)
    }

    async fn update_session(&self, session: &Session) -> PortResult<Session> {
        let mut store = self.lock()?;
        if slot_taken(&store.sessions, session.batch_id, &session.slot(), Some(session.id)) {
            return Err(PortError::Conflict(format!(
                "duplicate slot for batch {} on {} at {}",
                session.batch_id, session.date, session.start_time
            )));
        }
        let stored = store
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session.id)))?;
        stored.date = session.date;
        stored.start_time = session.start_time.clone();
        stored.end_time = session.end_time.clone();
        stored.meet_link = session.meet_link.clone();
        stored.status = session.status;
        Ok(stored.clone())
    }
}

#[async_trait]
impl RosterService for MemoryDb {
    async fn student_counts_by_batch(&self) -> PortResult<HashMap<Uuid, i64>> {
        let mut counts = HashMap::new();
        for batch_id in self.lock()?.accounts.iter().filter_map(|a| a.batch_id) {
            *counts.entry(batch_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
