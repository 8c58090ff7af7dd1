//! Admin API handlers.
//!
//! Every route here sits behind the access gate and checks the role again
//! through [`authz::require_admin`].

use crate::{
    api::{self, ApiError, ListQuery},
    api_analytics::{activity_page, ActivityResponse},
    authz::{self, AuthContext},
    AppState,
};
use axum::extract::{rejection::JsonRejection, Extension, Json, Path, Query};
use biolink_analytics::sweep_expired;
use biolink_feedback::{list_feedback, respond_to_feedback, Feedback, FeedbackStatus};
use biolink_identity::{list_users, User};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response for `GET /api/admin/users`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Response for `GET /api/admin/feedback`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListResponse {
    pub feedback: Vec<Feedback>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Body of `POST /api/admin/feedback/{id}/response`.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub response: String,
}

/// Response for `POST /api/admin/retention/sweep`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    pub deleted_count: usize,
    /// RFC 3339, UTC, millisecond precision.
    pub cutoff_date: String,
}

/// Handler for `GET /api/admin/users`.
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Query(params): Query<ListQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    authz::require_admin(Some(&principal))?;
    let request = params.page_request()?;
    let search = params.search;

    let page = api::with_conn(&state, move |conn| {
        Ok(list_users(conn, search.as_deref(), request)?)
    })
    .await?;

    Ok(Json(UsersResponse {
        users: page.items,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Handler for `GET /api/admin/feedback`.
///
/// `status=open|resolved` narrows the listing; any other value is rejected.
pub async fn list_feedback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Query(params): Query<ListQuery>,
) -> Result<Json<FeedbackListResponse>, ApiError> {
    authz::require_admin(Some(&principal))?;
    let request = params.page_request()?;
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<FeedbackStatus>()?),
    };
    let search = params.search;

    let page = api::with_conn(&state, move |conn| {
        Ok(list_feedback(conn, search.as_deref(), status, request)?)
    })
    .await?;

    Ok(Json(FeedbackListResponse {
        feedback: page.items,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

/// Handler for `POST /api/admin/feedback/{id}/response`.
pub async fn respond_to_feedback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Path(id): Path<i64>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<Feedback>, ApiError> {
    authz::require_admin(Some(&principal))?;
    let Json(body) = body?;

    let feedback = api::with_conn(&state, move |conn| {
        Ok(respond_to_feedback(conn, id, &principal.id, &body.response)?)
    })
    .await?;

    Ok(Json(feedback))
}

/// Handler for `GET /api/admin/users/{user_id}/activity`.
pub async fn user_activity_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    authz::require_admin(Some(&principal))?;
    Ok(Json(activity_page(&state, user_id, &params).await?))
}

/// Handler for `POST /api/admin/retention/sweep`.
///
/// Permanently deletes events older than the configured retention window.
pub async fn retention_sweep_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
) -> Result<Json<SweepResponse>, ApiError> {
    authz::require_admin(Some(&principal))?;
    let policy = state.retention;

    let report =
        api::with_conn(&state, move |conn| Ok(sweep_expired(conn, policy, Utc::now())?)).await?;

    tracing::info!(
        admin_id = %principal.id,
        deleted_count = report.deleted_count,
        "manual retention sweep"
    );

    Ok(Json(SweepResponse {
        success: true,
        deleted_count: report.deleted_count,
        cutoff_date: report.cutoff.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
