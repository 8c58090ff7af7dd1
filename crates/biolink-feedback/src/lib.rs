//! User feedback and administrator responses.
//!
//! A feedback entry is `open` until an administrator records a response,
//! after which it is `resolved`. The status is derived from the presence of
//! a response and is never stored.

use biolink_types::{search_pattern, Page, PageRequest};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during feedback operations.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// A database operation failed.
    #[error("feedback database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No feedback entry has the given ID.
    #[error("feedback not found: {0}")]
    NotFound(i64),

    /// A message or response was empty.
    #[error("invalid feedback: {0}")]
    Invalid(&'static str),
}

/// Whether a feedback entry has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Open,
    Resolved,
}

impl std::str::FromStr for FeedbackStatus {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            _ => Err(FeedbackError::Invalid("status must be open or resolved")),
        }
    }
}

/// A feedback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub response: Option<String>,
    pub responded_at: Option<String>,
    pub responded_by: Option<String>,
    pub status: FeedbackStatus,
    pub created_at: String,
}

/// Fields for a new feedback entry.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub message: String,
}

const FEEDBACK_COLUMNS: &str =
    "id, user_id, email, message, response, responded_at, responded_by, created_at";

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
    let response: Option<String> = row.get(4)?;
    let status = if response.is_some() {
        FeedbackStatus::Resolved
    } else {
        FeedbackStatus::Open
    };
    Ok(Feedback {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        message: row.get(3)?,
        response,
        responded_at: row.get(5)?,
        responded_by: row.get(6)?,
        status,
        created_at: row.get(7)?,
    })
}

/// Stores a new feedback entry.
///
/// # Errors
///
/// Returns `FeedbackError::Invalid` for a blank message and
/// `FeedbackError::Database` on SQL failure.
pub fn submit_feedback(conn: &Connection, new: &NewFeedback) -> Result<Feedback, FeedbackError> {
    let message = new.message.trim();
    if message.is_empty() {
        return Err(FeedbackError::Invalid("message must not be empty"));
    }

    let feedback = conn.query_row(
        &format!(
            "INSERT INTO feedback (user_id, email, message) VALUES (?1, ?2, ?3)
             RETURNING {FEEDBACK_COLUMNS}"
        ),
        params![new.user_id, new.email, message],
        feedback_from_row,
    )?;
    tracing::info!(feedback_id = feedback.id, "feedback submitted");
    Ok(feedback)
}

/// Lists feedback newest first.
///
/// `search` matches email, message or response case-insensitively; an empty
/// search matches everything. `status` optionally keeps only open or only
/// resolved entries.
///
/// # Errors
///
/// Returns `FeedbackError::Database` on SQL failure.
pub fn list_feedback(
    conn: &Connection,
    search: Option<&str>,
    status: Option<FeedbackStatus>,
    request: PageRequest,
) -> Result<Page<Feedback>, FeedbackError> {
    let pattern = search_pattern(search);
    let status_label = status.map(|s| match s {
        FeedbackStatus::Open => "open",
        FeedbackStatus::Resolved => "resolved",
    });
    let filter = "(?1 IS NULL
            OR email LIKE ?1 ESCAPE '\\'
            OR message LIKE ?1 ESCAPE '\\'
            OR response LIKE ?1 ESCAPE '\\')
        AND (?2 IS NULL
            OR (?2 = 'open' AND response IS NULL)
            OR (?2 = 'resolved' AND response IS NOT NULL))";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM feedback WHERE {filter}"),
        params![pattern, status_label],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback
         WHERE {filter}
         ORDER BY created_at DESC, id DESC
         LIMIT ?3 OFFSET ?4"
    ))?;
    let items = stmt
        .query_map(
            params![pattern, status_label, request.page_size(), request.offset()],
            feedback_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, request))
}

/// Records an administrator's response, resolving the entry.
///
/// Responding again replaces the earlier response.
///
/// # Errors
///
/// Returns `FeedbackError::Invalid` for a blank response,
/// `FeedbackError::NotFound` for an unknown ID, and
/// `FeedbackError::Database` on SQL failure.
pub fn respond_to_feedback(
    conn: &Connection,
    id: i64,
    responder_id: &str,
    response: &str,
) -> Result<Feedback, FeedbackError> {
    let response = response.trim();
    if response.is_empty() {
        return Err(FeedbackError::Invalid("response must not be empty"));
    }

    let updated = conn
        .query_row(
            &format!(
                "UPDATE feedback
                 SET response = ?2,
                     responded_by = ?3,
                     responded_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1
                 RETURNING {FEEDBACK_COLUMNS}"
            ),
            params![id, response, responder_id],
            feedback_from_row,
        )
        .optional()?
        .ok_or(FeedbackError::NotFound(id))?;

    tracing::info!(feedback_id = id, responder = %responder_id, "feedback resolved");
    Ok(updated)
}
