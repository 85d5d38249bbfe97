pub mod clock;
pub mod db;
pub mod memory;

pub use clock::{FixedClock, SystemClock};
pub use db::DbAdapter;
pub use memory::MemoryDb;
