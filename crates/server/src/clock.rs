//! Time source for timestamps and "today".
//!
//! Expiry checks and report periods are calendar dates in the clinic's local
//! time, so the clock carries the clinic's UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Source of the current instant and the clinic's current date.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date at the clinic.
    fn today(&self) -> NaiveDate;
}

/// Wall clock with the clinic's fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Create a wall clock for the given offset.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock frozen at one instant. Used in tests and report previews.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Freeze the clock at `now`, reading dates in UTC.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: Utc.fix(),
        }
    }

    /// Read dates at the given UTC offset instead.
    #[must_use]
    pub const fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Freeze the clock at midday UTC on `date`.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self::at(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.offset).date_naive()
    }
}
