//! Grouped and time-bucketed reports over one user's events.

use biolink_types::DateRange;
use rusqlite::{params, Connection};

use crate::error::AnalyticsError;
use crate::event::{AggregationQuery, Bucket, DailyCount, Totals};

fn range_bounds(range: Option<DateRange>) -> (Option<i64>, Option<i64>) {
    match range {
        Some(r) => (Some(r.start_ms()), Some(r.end_ms())),
        None => (None, None),
    }
}

/// Counts a user's events of one type, grouped by a dimension.
///
/// Missing or blank values are counted under the dimension's sentinel label.
/// Buckets are ordered by count descending, then by value ascending (byte
/// order), so equal counts always come back in the same order.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure.
pub fn aggregate(
    conn: &Connection,
    query: &AggregationQuery,
) -> Result<Vec<Bucket>, AnalyticsError> {
    let (start, end) = range_bounds(query.range);
    // The column name comes from a closed enum, never from input.
    let column = query.dimension.column();
    let sql = format!(
        "SELECT COALESCE(NULLIF(TRIM({column}), ''), ?5) AS value, COUNT(*) AS n
         FROM events
         WHERE user_id = ?1 AND event_type = ?2
           AND (?3 IS NULL OR occurred_at >= ?3)
           AND (?4 IS NULL OR occurred_at <= ?4)
         GROUP BY value
         ORDER BY n DESC, value ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let buckets = stmt
        .query_map(
            params![
                query.user_id,
                query.event_type.as_str(),
                start,
                end,
                query.dimension.sentinel(),
            ],
            |row| {
                Ok(Bucket {
                    dimension_value: row.get(0)?,
                    count: row.get(1)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(buckets)
}

/// Per-day profile view and link click counts, oldest day first.
///
/// Days with no events are omitted.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure.
pub fn daily_counts(
    conn: &Connection,
    user_id: &str,
    range: Option<DateRange>,
) -> Result<Vec<DailyCount>, AnalyticsError> {
    let (start, end) = range_bounds(range);
    let mut stmt = conn.prepare(
        "SELECT date(occurred_at / 1000, 'unixepoch') AS day,
                SUM(event_type = 'profile_view'),
                SUM(event_type = 'link_click')
         FROM events
         WHERE user_id = ?1
           AND (?2 IS NULL OR occurred_at >= ?2)
           AND (?3 IS NULL OR occurred_at <= ?3)
         GROUP BY day
         ORDER BY day ASC",
    )?;
    let days = stmt
        .query_map(params![user_id, start, end], |row| {
            Ok(DailyCount {
                date: row.get(0)?,
                profile_views: row.get(1)?,
                link_clicks: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(days)
}

/// Total profile views and link clicks for a user.
///
/// # Errors
///
/// Returns `AnalyticsError::Database` on SQL failure.
pub fn totals(
    conn: &Connection,
    user_id: &str,
    range: Option<DateRange>,
) -> Result<Totals, AnalyticsError> {
    let (start, end) = range_bounds(range);
    let totals = conn.query_row(
        "SELECT COALESCE(SUM(event_type = 'profile_view'), 0),
                COALESCE(SUM(event_type = 'link_click'), 0)
         FROM events
         WHERE user_id = ?1
           AND (?2 IS NULL OR occurred_at >= ?2)
           AND (?3 IS NULL OR occurred_at <= ?3)",
        params![user_id, start, end],
        |row| {
            Ok(Totals {
                profile_views: row.get(0)?,
                link_clicks: row.get(1)?,
            })
        },
    )?;
    Ok(totals)
}
