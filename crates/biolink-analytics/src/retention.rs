//! Retention-based deletion of old events.

use biolink_types::RetentionPolicy;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::error::AnalyticsError;
use crate::event::SweepReport;

/// Maximum rows removed per `DELETE` statement.
pub const SWEEP_BATCH_SIZE: i64 = 5_000;

/// Permanently deletes every event older than the policy's window.
///
/// The cutoff is computed once from `now` and reused for every batch, so a
/// single sweep deletes a consistent set even while new events arrive.
/// Running the sweep again with the same `now` deletes nothing.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure. Batches committed
/// before the failure stay deleted.
pub fn sweep_expired(
    conn: &Connection,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<SweepReport, AnalyticsError> {
    let cutoff = policy.cutoff(now);
    let cutoff_ms = cutoff.timestamp_millis();

    let mut deleted_count = 0usize;
    loop {
        let deleted = conn.execute(
            "DELETE FROM events
             WHERE id IN (SELECT id FROM events WHERE occurred_at < ?1 LIMIT ?2)",
            params![cutoff_ms, SWEEP_BATCH_SIZE],
        )?;
        deleted_count += deleted;
        if (deleted as i64) < SWEEP_BATCH_SIZE {
            break;
        }
    }

    tracing::info!(
        deleted_count,
        retention_days = policy.days(),
        cutoff = %cutoff.to_rfc3339(),
        "retention sweep finished"
    );

    Ok(SweepReport {
        deleted_count,
        cutoff,
    })
}
