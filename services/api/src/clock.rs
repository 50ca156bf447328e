//! Source of the current calendar date

use chrono::{Local, NaiveDate};

/// Provides "today" to the completion and streak handlers
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local date of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
