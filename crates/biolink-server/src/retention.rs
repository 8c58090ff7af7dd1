//! Background task for enforcing the event retention window.

use biolink_analytics::{sweep_expired, SweepReport};
use biolink_db::DbPool;
use biolink_types::RetentionPolicy;
use chrono::Utc;
use std::time::Duration;
use tokio::time::sleep;

/// Runs one sweep on the blocking pool.
///
/// # Errors
///
/// Returns a description of the failure when no connection is available,
/// the delete fails, or the blocking task does not complete.
pub async fn sweep_now(pool: DbPool, policy: RetentionPolicy) -> Result<SweepReport, String> {
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| format!("pool connection error: {}", e))?;
        sweep_expired(&conn, policy, Utc::now()).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("retention task panicked or was cancelled: {}", e))?
}

/// Starts a background task that periodically deletes expired events.
///
/// This task runs indefinitely. The first sweep happens one interval after
/// startup.
pub async fn start_retention_task(pool: DbPool, policy: RetentionPolicy, interval_seconds: u64) {
    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(
        interval_seconds,
        retention_days = policy.days(),
        "starting event retention task"
    );

    loop {
        sleep(interval).await;

        match sweep_now(pool.clone(), policy).await {
            Ok(report) if report.deleted_count > 0 => {
                tracing::info!(count = report.deleted_count, "deleted expired events");
            }
            Ok(_) => {
                tracing::debug!("no expired events to delete");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to delete expired events");
            }
        }
    }
}
