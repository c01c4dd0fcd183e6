use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

/// Facility-local wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// UTC shifted by a fixed offset, e.g. `330` for IST.
pub struct SystemClock {
    offset: Duration,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i64) -> Self {
        Self {
            offset: Duration::minutes(utc_offset_minutes),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + self.offset
    }
}
