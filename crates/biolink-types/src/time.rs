//! Date ranges and the event retention window.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::TypesError;

/// Retention window applied when configuration does not set one.
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

/// Longest accepted retention window, roughly a century.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// An inclusive range of UTC calendar days, held as millisecond bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start_ms: i64,
    end_ms: i64,
}

impl DateRange {
    /// Builds a range covering `from` through `to`, both inclusive.
    ///
    /// The end bound is the last millisecond of `to` (23:59:59.999), so events
    /// at any time on the final day are included.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidDateRange` if `from` is after `to`, and
    /// `TypesError::DateOutOfRange` if `to` is the last representable day.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self, TypesError> {
        if from > to {
            return Err(TypesError::InvalidDateRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        let end = Utc
            .from_utc_datetime(&to.and_time(NaiveTime::MIN))
            .checked_add_signed(Duration::days(1))
            .and_then(|next| next.checked_sub_signed(Duration::milliseconds(1)))
            .ok_or_else(|| TypesError::DateOutOfRange(to.to_string()))?;
        Ok(Self {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
        })
    }

    /// First included instant, Unix milliseconds.
    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    /// Last included instant, Unix milliseconds.
    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    #[cfg(test)]
    fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }
}

/// How long analytics events are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    days: i64,
}

impl RetentionPolicy {
    /// Creates a policy keeping events for `days` days.
    ///
    /// # Errors
    ///
    /// Returns `TypesError::InvalidRetentionDays` for zero or negative values,
    /// which would expire every event, and for values above
    /// [`MAX_RETENTION_DAYS`].
    pub fn new(days: i64) -> Result<Self, TypesError> {
        if !(1..=MAX_RETENTION_DAYS).contains(&days) {
            return Err(TypesError::InvalidRetentionDays(days));
        }
        Ok(Self { days })
    }

    /// The retention window in days.
    pub fn days(&self) -> i64 {
        self.days
    }

    /// Events strictly older than the returned instant are expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}
