//! Analytics API handlers for signed-in users.
//!
//! Provides:
//! - `GET /api/analytics`: the caller's events grouped by country or referrer
//! - `GET /api/analytics/summary`: totals and per-day counts for the caller
//! - `GET /api/users/{user_id}/activity`: one user's event feed (self or admin)

use crate::{
    api::{self, ApiError, ListQuery},
    authz::{self, AuthContext},
    AppState,
};
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use biolink_analytics::{
    aggregate, daily_counts, list_activity, totals, AggregationQuery, Bucket, DailyCount, Event,
    Totals,
};
use biolink_types::{Dimension, EventType, Page};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for `GET /api/analytics`.
#[derive(Debug, Deserialize)]
pub struct GroupedQuery {
    /// `country` or `referrer`.
    pub dimension: Option<String>,
    /// First day, `YYYY-MM-DD`, inclusive.
    pub from: Option<String>,
    /// Last day, `YYYY-MM-DD`, inclusive.
    pub to: Option<String>,
}

/// Query parameters for `GET /api/analytics/summary`.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Response for `GET /api/analytics`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResponse {
    pub profile_views: Vec<Bucket>,
    pub link_clicks: Vec<Bucket>,
}

/// Response for `GET /api/analytics/summary`.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub totals: Totals,
    pub daily: Vec<DailyCount>,
}

/// A page of events.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub activity: Vec<Event>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl From<Page<Event>> for ActivityResponse {
    fn from(page: Page<Event>) -> Self {
        Self {
            activity: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

fn parse_dimension(raw: Option<&str>) -> Result<Dimension, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("dimension is required".to_string()))?;
    raw.parse()
        .map_err(|e: biolink_types::ParseLabelError| ApiError::InvalidInput(e.to_string()))
}

/// Handler for `GET /api/analytics`.
///
/// Always scoped to the caller's own events.
pub async fn grouped_analytics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Query(params): Query<GroupedQuery>,
) -> Result<Json<GroupedResponse>, ApiError> {
    let dimension = parse_dimension(params.dimension.as_deref())?;
    let range = api::parse_date_range(params.from.as_deref(), params.to.as_deref())?;

    let response = api::with_conn(&state, move |conn| {
        let query = |event_type| AggregationQuery {
            user_id: principal.id.clone(),
            event_type,
            dimension,
            range,
        };
        Ok(GroupedResponse {
            profile_views: aggregate(conn, &query(EventType::ProfileView))?,
            link_clicks: aggregate(conn, &query(EventType::LinkClick))?,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Handler for `GET /api/analytics/summary`.
pub async fn summary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let range = api::parse_date_range(params.from.as_deref(), params.to.as_deref())?;

    let response = api::with_conn(&state, move |conn| {
        Ok(SummaryResponse {
            totals: totals(conn, &principal.id, range)?,
            daily: daily_counts(conn, &principal.id, range)?,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Loads a page of `user_id`'s activity. Callers check authorization first.
pub(crate) async fn activity_page(
    state: &Arc<AppState>,
    user_id: String,
    params: &ListQuery,
) -> Result<ActivityResponse, ApiError> {
    let request = params.page_request()?;
    let search = params.search.clone();

    let page = api::with_conn(state, move |conn| {
        Ok(list_activity(conn, &user_id, search.as_deref(), request)?)
    })
    .await?;

    Ok(page.into())
}

/// Handler for `GET /api/users/{user_id}/activity`.
pub async fn user_activity_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    authz::require_self_or_admin(&principal, &user_id)?;
    Ok(Json(activity_page(&state, user_id, &params).await?))
}
