pub mod allocator;
pub mod domain;
pub mod error;
pub mod ports;
pub mod recurrence;
pub mod rescheduler;
pub mod service;
pub mod time_range;
pub mod weekly;

pub use domain::{
    Account, Batch, CurriculumKey, NewBatch, NewSession, Session, SessionFilter, SessionStatus,
    SlotKey, WeeklySlot,
};
pub use error::{SchedulingError, SchedulingResult};
pub use ports::{Clock, DatabaseService, PortError, PortResult, RosterService};
pub use rescheduler::RescheduleRequest;
pub use service::{CreateBatchRequest, GenerateSessionsRequest, SchedulingConfig, SchedulingService};
pub use time_range::{parse_preferred_time_range, parse_time_range, TimeRange};
