//! Feedback submission for signed-in users.

use crate::{
    api::{self, ApiError},
    authz::AuthContext,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
};
use biolink_feedback::{submit_feedback, Feedback, NewFeedback};
use serde::Deserialize;
use std::sync::Arc;

/// Body of `POST /api/feedback`.
#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub message: String,
    /// Contact address, if different from the account's.
    pub email: Option<String>,
}

/// Handler for `POST /api/feedback`.
pub async fn submit_feedback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(AuthContext(principal)): Extension<AuthContext>,
    body: Result<Json<SubmitFeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let Json(body) = body?;
    let new = NewFeedback {
        user_id: Some(principal.id),
        email: body.email.filter(|e| !e.trim().is_empty()),
        message: body.message,
    };

    let feedback = api::with_conn(&state, move |conn| Ok(submit_feedback(conn, &new)?)).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}
