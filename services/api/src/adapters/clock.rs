//! services/api/src/adapters/clock.rs
//!
//! Clock adapters implementing the `Clock` port.

use batch_scheduling_core::ports::Clock;
use chrono::{Local, NaiveDate};

/// Reads today's date from the host's local time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
