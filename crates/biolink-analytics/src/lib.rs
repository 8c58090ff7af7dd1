//! Analytics engine for biolink.
//!
//! Stores profile views and link clicks in the `events` table and answers
//! the reporting questions asked of it:
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | [`record_event`] | append one event with a server-assigned timestamp |
//! | [`aggregate`] | grouped counts by country or referrer for one user |
//! | [`daily_counts`] / [`totals`] | time-range summary for one user |
//! | [`list_activity`] | paginated, searchable activity feed |
//! | [`sweep_expired`] | retention-based deletion |
//!
//! Events with no value for the grouped dimension land in a sentinel
//! bucket (`Unknown` / `Direct/Unknown`), so every counted event appears in
//! exactly one bucket.

mod error;
mod event;
mod report;
mod retention;
mod store;

pub use error::AnalyticsError;
pub use event::{AggregationQuery, Bucket, DailyCount, Event, NewEvent, SweepReport, Totals};
pub use report::{aggregate, daily_counts, totals};
pub use retention::{sweep_expired, SWEEP_BATCH_SIZE};
pub use store::{list_activity, record_event};

#[cfg(test)]
mod tests;
