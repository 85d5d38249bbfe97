//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the administrative REST API and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use batch_scheduling_core::{
    Batch, CreateBatchRequest, GenerateSessionsRequest, RescheduleRequest, SchedulingError,
    Session, SessionFilter, SessionStatus, WeeklySlot,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_batch_handler,
        list_batches_handler,
        get_batch_handler,
        delete_batch_handler,
        generate_sessions_handler,
        list_sessions_handler,
        complete_session_handler,
        cancel_session_handler,
        reschedule_session_handler,
        weekly_timetable_handler,
    ),
    components(
        schemas(
            CreateBatchPayload,
            BatchResponse,
            GenerateSessionsPayload,
            GenerateSessionsResponse,
            SessionResponse,
            ReschedulePayload,
            WeeklySlotResponse,
        )
    ),
    tags(
        (name = "Batch Scheduling API", description = "Administrative endpoints for batches, sessions and the weekly timetable.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateBatchPayload {
    pub name: String,
    pub level: i32,
    /// Weekday names, e.g. `["Monday", "Wednesday"]`.
    pub days: Vec<String>,
    /// Time range such as `6:00 PM - 7:00 PM`.
    pub time: String,
    pub timezone: Option<String>,
    pub meet_link: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub days: Vec<String>,
    pub time: String,
    pub timezone: String,
    pub meet_link: String,
}

impl From<Batch> for BatchResponse {
    fn from(b: Batch) -> Self {
        Self {
            id: b.id,
            name: b.name,
            level: b.level,
            days: b.days,
            time: b.time,
            timezone: b.timezone,
            meet_link: b.meet_link,
        }
    }
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct GenerateSessionsPayload {
    pub days_ahead: Option<u32>,
    pub limit: Option<u32>,
    pub start_topic: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateSessionsResponse {
    pub created: Vec<SessionResponse>,
    /// Present when nothing was generated because the window is fully booked.
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub level: i32,
    pub topic: i32,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: String,
    pub status: String,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            batch_id: s.batch_id,
            level: s.level,
            topic: s.topic,
            date: s.date,
            start_time: s.start_time,
            end_time: s.end_time,
            meet_link: s.meet_link,
            status: s.status.to_string(),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSessionsQuery {
    pub batch_id: Option<Uuid>,
    /// One of `scheduled`, `completed`, `cancelled`.
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReschedulePayload {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub meet_link: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WeeklySlotResponse {
    pub weekday: String,
    pub weekday_index: u32,
    pub start_time: String,
    pub end_time: String,
    pub batch_id: Uuid,
    pub batch_name: String,
    pub level: i32,
    pub meet_link: String,
    pub timezone: String,
    pub student_count: i64,
}

impl From<WeeklySlot> for WeeklySlotResponse {
    fn from(s: WeeklySlot) -> Self {
        Self {
            weekday: s.weekday,
            weekday_index: s.weekday_index,
            start_time: s.start_time,
            end_time: s.end_time,
            batch_id: s.batch_id,
            batch_name: s.batch_name,
            level: s.level,
            meet_link: s.meet_link,
            timezone: s.timezone,
            student_count: s.student_count,
        }
    }
}

type HandlerError = (StatusCode, String);

/// Maps a scheduling failure onto an HTTP status and message.
fn to_http_error(e: SchedulingError) -> HandlerError {
    match e {
        SchedulingError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        SchedulingError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        SchedulingError::Conflict(msg) => (
            StatusCode::CONFLICT,
            format!("{}. Pick another time.", msg),
        ),
        e @ SchedulingError::EmptyResult { .. } => (StatusCode::OK, e.to_string()),
        SchedulingError::Internal(msg) => {
            error!("Internal scheduling error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}

//=========================================================================================
// Batch Handlers
//=========================================================================================

/// Create a recurring weekly batch.
#[utoipa::path(
    post,
    path = "/batches",
    request_body = CreateBatchPayload,
    responses(
        (status = 201, description = "Batch created", body = BatchResponse),
        (status = 400, description = "Invalid days, time range or meeting link")
    )
)]
pub async fn create_batch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateBatchPayload>,
) -> Result<impl IntoResponse, HandlerError> {
    let batch = app_state
        .scheduler
        .create_batch(CreateBatchRequest {
            name: payload.name,
            level: payload.level,
            days: payload.days,
            time: payload.time,
            timezone: payload.timezone,
            meet_link: payload.meet_link,
        })
        .await
        .map_err(to_http_error)?;
    Ok((StatusCode::CREATED, Json(BatchResponse::from(batch))))
}

/// List every batch.
#[utoipa::path(
    get,
    path = "/batches",
    responses((status = 200, description = "All batches", body = [BatchResponse]))
)]
pub async fn list_batches_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<BatchResponse>>, HandlerError> {
    let batches = app_state.scheduler.list_batches().await.map_err(to_http_error)?;
    Ok(Json(batches.into_iter().map(BatchResponse::from).collect()))
}

/// Fetch one batch.
#[utoipa::path(
    get,
    path = "/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "The batch", body = BatchResponse),
        (status = 404, description = "Unknown batch")
    )
)]
pub async fn get_batch_handler(
    State(app_state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<BatchResponse>, HandlerError> {
    let batch = app_state.scheduler.get_batch(batch_id).await.map_err(to_http_error)?;
    Ok(Json(batch.into()))
}

/// Delete a batch together with its sessions.
#[utoipa::path(
    delete,
    path = "/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 204, description = "Batch deleted"),
        (status = 404, description = "Unknown batch")
    )
)]
pub async fn delete_batch_handler(
    State(app_state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    app_state.scheduler.delete_batch(batch_id).await.map_err(to_http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Generate the next sessions of a batch.
#[utoipa::path(
    post,
    path = "/batches/{id}/sessions/generate",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = GenerateSessionsPayload,
    responses(
        (status = 201, description = "Sessions created", body = GenerateSessionsResponse),
        (status = 200, description = "Window fully booked; nothing created", body = GenerateSessionsResponse),
        (status = 404, description = "Unknown batch"),
        (status = 409, description = "A concurrent generation stored one of the slots first")
    )
)]
pub async fn generate_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(batch_id): Path<Uuid>,
    payload: Option<Json<GenerateSessionsPayload>>,
) -> Result<impl IntoResponse, HandlerError> {
    // A bare POST without a JSON body uses the configured defaults.
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let request = GenerateSessionsRequest {
        days_ahead: payload.days_ahead,
        limit: payload.limit,
        start_topic: payload.start_topic,
    };
    match app_state.scheduler.generate_sessions(batch_id, request).await {
        Ok(created) => Ok((
            StatusCode::CREATED,
            Json(GenerateSessionsResponse {
                created: created.into_iter().map(SessionResponse::from).collect(),
                message: None,
            }),
        )),
        Err(e @ SchedulingError::EmptyResult { .. }) => Ok((
            StatusCode::OK,
            Json(GenerateSessionsResponse {
                created: Vec::new(),
                message: Some(e.to_string()),
            }),
        )),
        Err(e) => Err(to_http_error(e)),
    }
}

/// List sessions, optionally filtered by batch and status.
#[utoipa::path(
    get,
    path = "/sessions",
    params(ListSessionsQuery),
    responses(
        (status = 200, description = "Sessions ordered by date and start time", body = [SessionResponse]),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionResponse>>, HandlerError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<SessionStatus>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let sessions = app_state
        .scheduler
        .list_sessions(SessionFilter {
            batch_id: query.batch_id,
            status,
        })
        .await
        .map_err(to_http_error)?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// Mark a session as completed.
#[utoipa::path(
    post,
    path = "/sessions/{id}/complete",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Updated session", body = SessionResponse),
        (status = 400, description = "Cancelled sessions cannot be completed"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn complete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let session = app_state
        .scheduler
        .complete_session(session_id)
        .await
        .map_err(to_http_error)?;
    Ok(Json(session.into()))
}

/// Cancel a session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/cancel",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Updated session", body = SessionResponse),
        (status = 400, description = "Completed sessions cannot be cancelled"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn cancel_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let session = app_state
        .scheduler
        .cancel_session(session_id)
        .await
        .map_err(to_http_error)?;
    Ok(Json(session.into()))
}

/// Move a session to a new date and time. The session returns to `scheduled`.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reschedule",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = ReschedulePayload,
    responses(
        (status = 200, description = "Rescheduled session", body = SessionResponse),
        (status = 400, description = "Invalid date, time or link"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Another session of the batch holds the slot")
    )
)]
pub async fn reschedule_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<Json<SessionResponse>, HandlerError> {
    let session = app_state
        .scheduler
        .reschedule_session(
            session_id,
            RescheduleRequest {
                date: payload.date,
                start_time: payload.start_time,
                end_time: payload.end_time,
                meet_link: payload.meet_link,
            },
        )
        .await
        .map_err(to_http_error)?;
    Ok(Json(session.into()))
}

//=========================================================================================
// Timetable Handler
//=========================================================================================

/// The weekly timetable across every batch.
#[utoipa::path(
    get,
    path = "/timetable/weekly",
    responses((status = 200, description = "Slots sorted by weekday and start time", body = [WeeklySlotResponse]))
)]
pub async fn weekly_timetable_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<WeeklySlotResponse>>, HandlerError> {
    let slots = app_state
        .scheduler
        .weekly_timetable()
        .await
        .map_err(to_http_error)?;
    Ok(Json(slots.into_iter().map(WeeklySlotResponse::from).collect()))
}
