pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use rest::{
    cancel_session_handler, complete_session_handler, create_batch_handler, delete_batch_handler,
    generate_sessions_handler, get_batch_handler, list_batches_handler, list_sessions_handler,
    reschedule_session_handler, weekly_timetable_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the administrative API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/batches", post(create_batch_handler).get(list_batches_handler))
        .route("/batches/{id}", get(get_batch_handler).delete(delete_batch_handler))
        .route("/batches/{id}/sessions/generate", post(generate_sessions_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}/complete", post(complete_session_handler))
        .route("/sessions/{id}/cancel", post(cancel_session_handler))
        .route("/sessions/{id}/reschedule", post(reschedule_session_handler))
        .route("/timetable/weekly", get(weekly_timetable_handler))
        .with_state(app_state)
}
