//! UTC calendar source for period and day keys.
//!
//! Every admission re-reads "today" from the clock, so counters roll over on
//! their own at period boundaries. Tests swap in a `FixedClock`.

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
use chrono::Days;
use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock UTC date.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable date for tests.
#[cfg(test)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut guard) = self.date.lock() {
            *guard = date;
        }
    }

    pub fn advance_days(&self, days: u64) {
        if let Ok(mut guard) = self.date.lock() {
            if let Some(next) = guard.checked_add_days(Days::new(days)) {
                *guard = next;
            }
        }
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.date.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
