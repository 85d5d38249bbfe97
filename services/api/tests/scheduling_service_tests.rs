//! Service-level tests for batch scheduling against the in-memory store.
//!
//! These cover generation, rescheduling, status changes, the weekly timetable and
//! the storage-level race between two generators.

use api_lib::adapters::{FixedClock, MemoryDb};
use async_trait::async_trait;
use batch_scheduling_core::domain::{NewSession, SessionFilter, SessionStatus};
use batch_scheduling_core::ports::{DatabaseService, PortResult};
use batch_scheduling_core::{
    Batch, CreateBatchRequest, GenerateSessionsRequest, NewBatch, RescheduleRequest,
    SchedulingConfig, SchedulingError, SchedulingService, Session,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const LINK: &str = "https://meet.example.com/level-1";

fn monday() -> NaiveDate {
    // 2026-10-19 is a Monday.
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn service_with(db: Arc<MemoryDb>, today: NaiveDate, config: SchedulingConfig) -> SchedulingService {
    SchedulingService::new(db.clone(), db, Arc::new(FixedClock(today)), config)
}

fn service(db: Arc<MemoryDb>) -> SchedulingService {
    service_with(db, monday(), SchedulingConfig::default())
}

fn batch_request(days: &[&str], time: &str) -> CreateBatchRequest {
    CreateBatchRequest {
        name: "Level 1 Evening".to_string(),
        level: 1,
        days: days.iter().map(|d| d.to_string()).collect(),
        time: time.to_string(),
        timezone: None,
        meet_link: Some(LINK.to_string()),
    }
}

fn two_weeks() -> GenerateSessionsRequest {
    GenerateSessionsRequest {
        days_ahead: Some(14),
        limit: Some(10),
        start_topic: None,
    }
}

fn reschedule(date: &str, start: &str, end: &str) -> RescheduleRequest {
    RescheduleRequest {
        date: date.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        meet_link: None,
    }
}

async fn monday_wednesday_batch(svc: &SchedulingService) -> Batch {
    svc.create_batch(batch_request(&["Monday", "Wednesday"], "6:00 PM - 7:00 PM"))
        .await
        .unwrap()
}

// =========================================================
// Batch Creation
// =========================================================

#[tokio::test]
async fn test_create_batch_canonicalizes_days_and_time() {
    let svc = service(Arc::new(MemoryDb::new()));
    let batch = svc
        .create_batch(batch_request(&["wednesday", "MONDAY", "Wednesday"], "6:00pm-7pm"))
        .await
        .unwrap();

    assert_eq!(batch.days, vec!["Wednesday".to_string(), "Monday".to_string()]);
    assert_eq!(batch.time, "6:00 PM - 7:00 PM");
    assert_eq!(batch.timezone, "Asia/Kolkata");
}

#[tokio::test]
async fn test_create_batch_rejects_invalid_input() {
    let svc = service(Arc::new(MemoryDb::new()));

    let cases = [
        batch_request(&[], "6:00 PM"),
        batch_request(&["Monday", "Someday"], "6:00 PM"),
        batch_request(&["Monday"], "18:00"),
        CreateBatchRequest {
            meet_link: Some("meet.example.com/no-scheme".to_string()),
            ..batch_request(&["Monday"], "6:00 PM")
        },
        CreateBatchRequest {
            meet_link: None,
            ..batch_request(&["Monday"], "6:00 PM")
        },
    ];
    for request in cases {
        assert!(matches!(
            svc.create_batch(request).await,
            Err(SchedulingError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn test_create_batch_falls_back_to_configured_link() {
    let config = SchedulingConfig {
        default_meet_link: Some("https://meet.example.com/lobby".to_string()),
        ..SchedulingConfig::default()
    };
    let svc = service_with(Arc::new(MemoryDb::new()), monday(), config);

    let batch = svc
        .create_batch(CreateBatchRequest {
            meet_link: None,
            ..batch_request(&["Friday"], "5:00 PM")
        })
        .await
        .unwrap();
    assert_eq!(batch.meet_link, "https://meet.example.com/lobby");
}

// =========================================================
// Session Generation
// =========================================================

#[tokio::test]
async fn test_generate_two_weeks_then_rerun_is_empty() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let batch = monday_wednesday_batch(&svc).await;

    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();
    assert_eq!(created.len(), 4);
    let topics: Vec<_> = created.iter().map(|s| s.topic).collect();
    assert_eq!(topics, vec![1, 2, 3, 4]);
    assert!(created.iter().all(|s| s.status == SessionStatus::Scheduled && s.meet_link == LINK));

    match svc.generate_sessions(batch.id, two_weeks()).await {
        Err(SchedulingError::EmptyResult { batch_id, from, to }) => {
            assert_eq!(batch_id, batch.id);
            assert_eq!(from, monday());
            assert_eq!(to, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        }
        other => panic!("expected EmptyResult, got {:?}", other),
    }

    let stored = svc
        .list_sessions(SessionFilter {
            batch_id: Some(batch.id),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 4);
}

#[tokio::test]
async fn test_topic_numbers_continue_across_calls() {
    let db = Arc::new(MemoryDb::new());
    let batch = monday_wednesday_batch(&service(db.clone())).await;

    service(db.clone()).generate_sessions(batch.id, two_weeks()).await.unwrap();

    // A week later the window overlaps the first run.
    let later = service_with(
        db.clone(),
        NaiveDate::from_ymd_opt(2026, 10, 26).unwrap(),
        SchedulingConfig::default(),
    );
    let created = later.generate_sessions(batch.id, two_weeks()).await.unwrap();
    let topics: Vec<_> = created.iter().map(|s| s.topic).collect();
    assert_eq!(topics, vec![5, 6]);

    let all = later.list_sessions(SessionFilter::default()).await.unwrap();
    let unique: HashSet<_> = all.iter().map(Session::slot).collect();
    assert_eq!(unique.len(), all.len());
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn test_explicit_start_topic_is_used() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = monday_wednesday_batch(&svc).await;

    let created = svc
        .generate_sessions(
            batch.id,
            GenerateSessionsRequest {
                start_topic: Some(20),
                ..two_weeks()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.first().map(|s| s.topic), Some(20));
    assert_eq!(created.last().map(|s| s.topic), Some(23));

    assert!(matches!(
        svc.generate_sessions(
            batch.id,
            GenerateSessionsRequest {
                start_topic: Some(0),
                ..two_weeks()
            }
        )
        .await,
        Err(SchedulingError::Validation(_))
    ));
}

#[tokio::test]
async fn test_start_topic_near_i32_max_is_rejected() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = monday_wednesday_batch(&svc).await;

    let result = svc
        .generate_sessions(
            batch.id,
            GenerateSessionsRequest {
                start_topic: Some(i32::MAX),
                ..two_weeks()
            },
        )
        .await;
    assert!(matches!(result, Err(SchedulingError::Validation(_))));

    let stored = svc.list_sessions(SessionFilter::default()).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_limit_and_lookahead_are_clamped() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = svc
        .create_batch(batch_request(
            &["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"],
            "9:00 AM",
        ))
        .await
        .unwrap();

    let created = svc
        .generate_sessions(
            batch.id,
            GenerateSessionsRequest {
                days_ahead: Some(500),
                limit: Some(100),
                start_topic: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 12);
}

#[tokio::test]
async fn test_generate_for_unknown_batch_is_not_found() {
    let svc = service(Arc::new(MemoryDb::new()));
    assert!(matches!(
        svc.generate_sessions(Uuid::new_v4(), two_weeks()).await,
        Err(SchedulingError::NotFound(_))
    ));
}

/// A store whose reads are stale: it never reports existing sessions or slot
/// occupants, the way a second writer racing the first one would see the table.
struct StaleReadDb {
    inner: Arc<MemoryDb>,
}

#[async_trait]
impl DatabaseService for StaleReadDb {
    async fn create_batch(&self, batch: NewBatch) -> PortResult<Batch> {
        self.inner.create_batch(batch).await
    }
    async fn get_batch_by_id(&self, batch_id: Uuid) -> PortResult<Batch> {
        self.inner.get_batch_by_id(batch_id).await
    }
    async fn list_batches(&self) -> PortResult<Vec<Batch>> {
        self.inner.list_batches().await
    }
    async fn delete_batch(&self, batch_id: Uuid) -> PortResult<()> {
        self.inner.delete_batch(batch_id).await
    }
    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        self.inner.get_session_by_id(session_id).await
    }
    async fn list_sessions(&self, filter: &SessionFilter) -> PortResult<Vec<Session>> {
        self.inner.list_sessions(filter).await
    }
    async fn get_sessions_in_window(
        &self,
        _batch_id: Uuid,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> PortResult<Vec<Session>> {
        Ok(Vec::new())
    }
    async fn get_max_topic(&self, _batch_id: Uuid) -> PortResult<Option<i32>> {
        Ok(None)
    }
    async fn find_session_at_slot(
        &self,
        _batch_id: Uuid,
        _date: NaiveDate,
        _start_time: &str,
    ) -> PortResult<Option<Session>> {
        Ok(None)
    }
    async fn create_sessions(&self, sessions: Vec<NewSession>) -> PortResult<Vec<Session>> {
        self.inner.create_sessions(sessions).await
    }
    async fn update_session(&self, session: &Session) -> PortResult<Session> {
        self.inner.update_session(session).await
    }
}

#[tokio::test]
async fn test_racing_generator_gets_conflict_and_stores_nothing() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let batch = monday_wednesday_batch(&svc).await;
    svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    let stale = SchedulingService::new(
        Arc::new(StaleReadDb { inner: db.clone() }),
        db.clone(),
        Arc::new(FixedClock(monday())),
        SchedulingConfig::default(),
    );
    // Three weeks: one new Monday/Wednesday pair plus four already-booked slots.
    let result = stale
        .generate_sessions(
            batch.id,
            GenerateSessionsRequest {
                days_ahead: Some(21),
                ..two_weeks()
            },
        )
        .await;
    assert!(matches!(result, Err(SchedulingError::Conflict(_))));

    let stored = svc.list_sessions(SessionFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 4);
}

#[tokio::test]
async fn test_racing_reschedule_is_rejected_by_storage() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let batch = monday_wednesday_batch(&svc).await;
    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    let stale = SchedulingService::new(
        Arc::new(StaleReadDb { inner: db.clone() }),
        db.clone(),
        Arc::new(FixedClock(monday())),
        SchedulingConfig::default(),
    );
    // The slot check passes on the stale read; the store still refuses the duplicate.
    let result = stale
        .reschedule_session(created[0].id, reschedule("2026-10-21", "6:00 PM", "7:00 PM"))
        .await;
    assert!(matches!(result, Err(SchedulingError::Conflict(_))));

    let unchanged = db.get_session_by_id(created[0].id).await.unwrap();
    assert_eq!(unchanged, created[0]);
}

#[tokio::test]
async fn test_concurrent_generators_never_duplicate_slots() {
    let db = Arc::new(MemoryDb::new());
    let svc = Arc::new(service(db.clone()));
    let batch = monday_wednesday_batch(&svc).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let svc = svc.clone();
        let batch_id = batch.id;
        handles.push(tokio::spawn(async move {
            svc.generate_sessions(batch_id, two_weeks()).await
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_)
            | Err(SchedulingError::EmptyResult { .. })
            | Err(SchedulingError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    let stored = svc.list_sessions(SessionFilter::default()).await.unwrap();
    let unique: HashSet<_> = stored.iter().map(Session::slot).collect();
    assert_eq!(stored.len(), 4);
    assert_eq!(unique.len(), 4);
}

// =========================================================
// Listing & Status Changes
// =========================================================

#[tokio::test]
async fn test_list_sessions_sorted_and_filtered() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let evening = monday_wednesday_batch(&svc).await;
    let morning = svc
        .create_batch(batch_request(&["Monday"], "10:00 AM - 11:00 AM"))
        .await
        .unwrap();

    svc.generate_sessions(evening.id, two_weeks()).await.unwrap();
    svc.generate_sessions(morning.id, two_weeks()).await.unwrap();

    let all = svc.list_sessions(SessionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 6);
    // 10:00 AM sorts before 6:00 PM on the same day.
    assert_eq!(all[0].batch_id, morning.id);
    assert_eq!(all[1].batch_id, evening.id);
    for pair in all.windows(2) {
        assert!(pair[0].date <= pair[1].date);
    }

    svc.cancel_session(all[0].id).await.unwrap();
    let cancelled = svc
        .list_sessions(SessionFilter {
            batch_id: None,
            status: Some(SessionStatus::Cancelled),
        })
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, all[0].id);
}

#[tokio::test]
async fn test_status_changes_keep_date_and_time() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = monday_wednesday_batch(&svc).await;
    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    let done = svc.complete_session(created[0].id).await.unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.date, created[0].date);
    assert_eq!(done.start_time, created[0].start_time);

    // Completed sessions cannot be cancelled directly, and vice versa.
    assert!(matches!(
        svc.cancel_session(created[0].id).await,
        Err(SchedulingError::Validation(_))
    ));
    svc.cancel_session(created[1].id).await.unwrap();
    assert!(matches!(
        svc.complete_session(created[1].id).await,
        Err(SchedulingError::Validation(_))
    ));

    assert!(matches!(
        svc.complete_session(Uuid::new_v4()).await,
        Err(SchedulingError::NotFound(_))
    ));
}

// =========================================================
// Rescheduling
// =========================================================

#[tokio::test]
async fn test_reschedule_onto_sibling_slot_conflicts() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let batch = monday_wednesday_batch(&svc).await;
    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    let result = svc
        .reschedule_session(created[0].id, reschedule("2026-10-21", "6:00 PM", "7:00 PM"))
        .await;
    assert!(matches!(result, Err(SchedulingError::Conflict(_))));

    let unchanged = db.get_session_by_id(created[0].id).await.unwrap();
    assert_eq!(unchanged, created[0]);
}

#[tokio::test]
async fn test_reschedule_cancelled_session_revives_it() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = monday_wednesday_batch(&svc).await;
    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    svc.cancel_session(created[1].id).await.unwrap();
    let moved = svc
        .reschedule_session(
            created[1].id,
            RescheduleRequest {
                meet_link: Some("https://meet.example.com/makeup".to_string()),
                ..reschedule("2026-10-22", "7:30pm", "8:30 PM")
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.status, SessionStatus::Scheduled);
    assert_eq!(moved.date, NaiveDate::from_ymd_opt(2026, 10, 22).unwrap());
    assert_eq!(moved.start_time, "7:30 PM");
    assert_eq!(moved.meet_link, "https://meet.example.com/makeup");
    assert_eq!(moved.topic, created[1].topic);
}

#[tokio::test]
async fn test_reschedule_within_own_slot_and_validation() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db);
    let batch = monday_wednesday_batch(&svc).await;
    let created = svc.generate_sessions(batch.id, two_weeks()).await.unwrap();

    // Same slot, longer session.
    let extended = svc
        .reschedule_session(created[0].id, reschedule("2026-10-19", "6:00 PM", "7:30 PM"))
        .await
        .unwrap();
    assert_eq!(extended.end_time, "7:30 PM");

    assert!(matches!(
        svc.reschedule_session(created[0].id, reschedule("next monday", "6:00 PM", "7:00 PM"))
            .await,
        Err(SchedulingError::Validation(_))
    ));
    assert!(matches!(
        svc.reschedule_session(Uuid::new_v4(), reschedule("2026-10-19", "6:00 PM", "7:00 PM"))
            .await,
        Err(SchedulingError::NotFound(_))
    ));
}

// =========================================================
// Weekly Timetable & Deletion
// =========================================================

#[tokio::test]
async fn test_weekly_timetable_counts_students() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let evening = monday_wednesday_batch(&svc).await;
    let sunday = svc
        .create_batch(batch_request(&["Sunday"], "11:00 AM"))
        .await
        .unwrap();
    db.add_account("Asha", Some(evening.id)).unwrap();
    db.add_account("Ravi", Some(evening.id)).unwrap();
    db.add_account("Unassigned", None).unwrap();

    let view = svc.weekly_timetable().await.unwrap();
    let summary: Vec<_> = view
        .iter()
        .map(|s| (s.weekday.as_str(), s.batch_id, s.student_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Sunday", sunday.id, 0),
            ("Monday", evening.id, 2),
            ("Wednesday", evening.id, 2),
        ]
    );
    assert_eq!(view[0].end_time, "12:00 PM");
}

#[tokio::test]
async fn test_delete_batch_cascades_and_unassigns_accounts() {
    let db = Arc::new(MemoryDb::new());
    let svc = service(db.clone());
    let batch = monday_wednesday_batch(&svc).await;
    svc.generate_sessions(batch.id, two_weeks()).await.unwrap();
    let account = db.add_account("Meera", Some(batch.id)).unwrap();

    svc.delete_batch(batch.id).await.unwrap();

    assert!(svc.list_sessions(SessionFilter::default()).await.unwrap().is_empty());
    assert_eq!(db.get_account(account.id).unwrap().batch_id, None);
    assert!(matches!(
        svc.get_batch(batch.id).await,
        Err(SchedulingError::NotFound(_))
    ));
    assert!(matches!(
        svc.delete_batch(batch.id).await,
        Err(SchedulingError::NotFound(_))
    ));
}
