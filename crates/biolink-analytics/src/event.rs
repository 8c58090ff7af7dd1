//! Event records and report row types.

use biolink_types::{DateRange, Dimension, EventType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An activity signal accepted for recording.
///
/// There is no timestamp field: the store assigns one at insert time.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: String,
    pub event_type: EventType,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub platform: Option<String>,
    pub link_id: Option<String>,
}

impl NewEvent {
    /// An event with no dimension values.
    pub fn new(user_id: impl Into<String>, event_type: EventType) -> Self {
        Self {
            user_id: user_id.into(),
            event_type,
            referrer: None,
            country: None,
            platform: None,
            link_id: None,
        }
    }
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub platform: Option<String>,
    pub link_id: Option<String>,
}

/// A grouped-count request for one user's events.
#[derive(Debug, Clone)]
pub struct AggregationQuery {
    pub user_id: String,
    pub event_type: EventType,
    pub dimension: Dimension,
    pub range: Option<DateRange>,
}

/// One group in an aggregation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub dimension_value: String,
    pub count: i64,
}

/// Event counts for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub profile_views: i64,
    pub link_clicks: i64,
}

/// Event counts over a whole range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub profile_views: i64,
    pub link_clicks: i64,
}

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows removed by this sweep.
    pub deleted_count: usize,
    /// Events strictly older than this instant were eligible.
    pub cutoff: DateTime<Utc>,
}
