//! SQLite pool setup for the biolink store.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Pool and per-connection limits, taken from the `[database]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long SQLite retries a locked database before reporting busy (ms).
    pub busy_timeout_ms: u64,
    pub pool_max_size: u32,
    /// Checkout wait before a request is answered with 503 (ms).
    pub connection_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            connection_timeout_ms: 5_000,
        }
    }
}

/// Shared handle to the event and identity store.
pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("could not open the biolink store: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens `db_path` behind an r2d2 pool. Every connection runs in WAL mode
/// with foreign keys enforced.
///
/// `:memory:` gives each pooled connection its own empty database, so callers
/// that share rows through the pool need a file path or a single connection.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the first connections cannot be opened
/// or initialised.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            let mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            // `memory` is what in-memory databases report.
            if !matches!(mode.as_str(), "wal" | "memory") {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("journal_mode stayed {mode}, expected wal")),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = {};",
                settings.busy_timeout_ms
            ))
        });

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_timeout(Duration::from_millis(settings.connection_timeout_ms))
        .build(manager)?;

    Ok(pool)
}
