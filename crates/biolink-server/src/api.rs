//! Error type and request helpers shared by the API handlers.

use crate::AppState;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use biolink_analytics::AnalyticsError;
use biolink_feedback::FeedbackError;
use biolink_identity::IdentityError;
use biolink_types::{DateRange, PageRequest};
use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
///
/// `StoreUnavailable` and `Unknown` carry operator detail that is logged and
/// never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient permissions")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Unknown(String),
}

impl ApiError {
    /// The HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::StoreUnavailable(detail) => {
                tracing::error!(error = %detail, "store unavailable");
                "service temporarily unavailable".to_string()
            }
            ApiError::Unknown(detail) => {
                tracing::error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Classifies a SQLite error: contention and I/O problems are transient
/// store outages, anything else is unexpected.
fn from_sqlite(e: rusqlite::Error) -> ApiError {
    let unavailable = matches!(
        e.sqlite_error_code(),
        Some(
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
        )
    );
    if unavailable {
        ApiError::StoreUnavailable(e.to_string())
    } else {
        ApiError::Unknown(e.to_string())
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::Database(e) => from_sqlite(e),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Database(e) => from_sqlite(e),
            IdentityError::Pool(e) => ApiError::StoreUnavailable(e.to_string()),
            IdentityError::InvalidRole(_) => ApiError::Unknown(e.to_string()),
        }
    }
}

impl From<FeedbackError> for ApiError {
    fn from(e: FeedbackError) -> Self {
        match e {
            FeedbackError::Database(e) => from_sqlite(e),
            FeedbackError::NotFound(id) => ApiError::NotFound(format!("feedback {id}")),
            FeedbackError::Invalid(msg) => ApiError::InvalidInput(msg.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

/// Runs `f` with a pooled connection on the blocking thread pool.
///
/// # Errors
///
/// Returns `ApiError::StoreUnavailable` when no connection can be obtained
/// within the pool timeout, or whatever `f` returns.
pub async fn with_conn<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::StoreUnavailable(format!("db connection failed: {}", e)))?;
        f(&conn)
    })
    .await
    .map_err(|e| ApiError::Unknown(format!("task join error: {}", e)))?
}

/// Query parameters shared by paginated listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Case-insensitive substring filter. Blank matches everything.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
    /// Rows per page.
    pub page_size: Option<String>,
    /// Feedback status filter (`open` or `resolved`).
    pub status: Option<String>,
}

fn parse_number(name: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ApiError::InvalidInput(format!("{name} must be an integer, got {v:?}"))),
    }
}

impl ListQuery {
    /// The page request, with out-of-range numbers clamped.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if `page` or `pageSize` is not an integer.
    pub fn page_request(&self) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::new(
            parse_number("page", self.page.as_deref())?,
            parse_number("pageSize", self.page_size.as_deref())?,
        ))
    }
}

/// Parses an optional `from`/`to` pair of `YYYY-MM-DD` dates.
///
/// Both absent means "all time". Supplying only one is rejected, as is a
/// range whose start is after its end.
///
/// # Errors
///
/// Returns `ApiError::InvalidInput` for malformed or inconsistent dates.
pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>, ApiError> {
    let parse = |name: &str, v: &str| {
        NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
            .map_err(|_| ApiError::InvalidInput(format!("{name} must be YYYY-MM-DD, got {v:?}")))
    };

    fn blank(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    match (blank(from), blank(to)) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) => {
            let range = DateRange::from_dates(parse("from", from)?, parse("to", to)?)
                .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
            Ok(Some(range))
        }
        _ => Err(ApiError::InvalidInput(
            "from and to must be supplied together".to_string(),
        )),
    }
}
