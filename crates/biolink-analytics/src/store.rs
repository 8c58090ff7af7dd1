//! Persistence operations for the event log.
//!
//! All writes go through [`record_event`], which stamps the event with the
//! server clock and inserts it in a single statement. Timestamps never go
//! backwards: if the clock reads earlier than the newest stored event, the
//! newest timestamp is reused.

use biolink_types::{search_pattern, Page, PageRequest};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AnalyticsError;
use crate::event::{Event, NewEvent};

pub(crate) const EVENT_COLUMNS: &str =
    "id, user_id, event_type, occurred_at, referrer, country, platform, link_id";

pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let occurred_at: i64 = row.get(3)?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(occurred_at)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, occurred_at))?;

    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        event_type: row.get(2)?,
        timestamp,
        referrer: row.get(4)?,
        country: row.get(5)?,
        platform: row.get(6)?,
        link_id: row.get(7)?,
    })
}

/// Blank dimension values are stored as NULL so they group with absent ones.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Appends an event, stamped at `now` (or the newest stored timestamp if
/// that is later).
///
/// Returns `None` without inserting when `user_id` does not name an
/// existing user.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure.
pub fn record_event(
    conn: &Connection,
    event: &NewEvent,
    now: DateTime<Utc>,
) -> Result<Option<Event>, AnalyticsError> {
    // The clamp and the insert share one statement so concurrent writers
    // cannot interleave between reading MAX(occurred_at) and inserting.
    let inserted = conn
        .query_row(
            &format!(
                "INSERT INTO events
                    (user_id, event_type, occurred_at, referrer, country, platform, link_id)
                 SELECT ?1, ?2,
                    MAX(?3, COALESCE((SELECT MAX(occurred_at) FROM events), ?3)),
                    ?4, ?5, ?6, ?7
                 WHERE EXISTS (SELECT 1 FROM users WHERE id = ?1)
                 RETURNING {EVENT_COLUMNS}"
            ),
            params![
                event.user_id,
                event.event_type.as_str(),
                now.timestamp_millis(),
                non_blank(&event.referrer),
                non_blank(&event.country),
                non_blank(&event.platform),
                non_blank(&event.link_id),
            ],
            event_from_row,
        )
        .optional()?;

    if inserted.is_none() {
        tracing::debug!(user_id = %event.user_id, "dropping event for unknown user");
    }

    Ok(inserted)
}

/// Lists one user's events newest first, optionally filtered by a
/// case-insensitive substring of type, referrer, country or platform.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure.
pub fn list_activity(
    conn: &Connection,
    user_id: &str,
    search: Option<&str>,
    request: PageRequest,
) -> Result<Page<Event>, AnalyticsError> {
    let pattern = search_pattern(search);
    let filter = "user_id = ?1 AND (?2 IS NULL
        OR event_type LIKE ?2 ESCAPE '\\'
        OR referrer LIKE ?2 ESCAPE '\\'
        OR country LIKE ?2 ESCAPE '\\'
        OR platform LIKE ?2 ESCAPE '\\')";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM events WHERE {filter}"),
        params![user_id, pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE {filter}
         ORDER BY occurred_at DESC, id DESC
         LIMIT ?3 OFFSET ?4"
    ))?;
    let items = stmt
        .query_map(
            params![user_id, pattern, request.page_size(), request.offset()],
            event_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, request))
}
