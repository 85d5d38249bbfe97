//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use batch_scheduling_core::SchedulingService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<SchedulingService>,
}

impl AppState {
    pub fn new(scheduler: SchedulingService) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
        }
    }
}
