//! Public event ingestion.
//!
//! Ingestion is best-effort telemetry: the caller always gets `202 Accepted`
//! and every failure is logged instead of returned.

use crate::{api, AppState};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::{HeaderMap, StatusCode},
    Json,
};
use biolink_analytics::{record_event, NewEvent};
use biolink_types::EventType;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Edge headers consulted, in order, when the body carries no country.
const COUNTRY_HEADERS: [&str; 2] = ["x-vercel-ip-country", "cf-ipcountry"];

/// Body of `POST /api/events`.
///
/// Any client-supplied timestamp is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub platform: Option<String>,
    pub link_id: Option<String>,
}

/// Country reported by the edge network. `XX` means the edge could not tell.
fn edge_country(headers: &HeaderMap) -> Option<String> {
    COUNTRY_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|code| !code.is_empty() && !code.eq_ignore_ascii_case("xx"))
        .map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turns a request into a storable event, or `None` if it is unusable.
fn to_new_event(request: IngestRequest, headers: &HeaderMap) -> Option<NewEvent> {
    let event_type = match request.event_type.parse::<EventType>() {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(error = %e, "dropping event with unknown type");
            return None;
        }
    };
    if request.user_id.trim().is_empty() {
        tracing::debug!("dropping event without user id");
        return None;
    }

    let mut event = NewEvent::new(request.user_id, event_type);
    event.referrer = non_blank(request.referrer);
    event.country = non_blank(request.country).or_else(|| edge_country(headers));
    event.platform = non_blank(request.platform);
    event.link_id = non_blank(request.link_id);
    Some(event)
}

/// Handler for `POST /api/events`.
pub async fn ingest_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<Value>) {
    let accepted = (StatusCode::ACCEPTED, Json(json!({ "accepted": true })));

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "dropping unreadable event body");
            return accepted;
        }
    };
    let request: IngestRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed event body");
            return accepted;
        }
    };
    let Some(event) = to_new_event(request, &headers) else {
        return accepted;
    };

    let result = api::with_conn(&state, move |conn| {
        Ok(record_event(conn, &event, Utc::now())?)
    })
    .await;
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to record event");
    }

    accepted
}
