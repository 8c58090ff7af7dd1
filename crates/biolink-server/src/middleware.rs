use axum::{
    body::Body,
    http::{header, HeaderMap, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use biolink_types::Principal;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiError;
use crate::authz::{self, AccessDenied, AuthContext};
use crate::config::AccessConfig;
use crate::AppState;

/// Which family of protected prefixes a path falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedFamily {
    /// Page routes. Denials redirect.
    Ui,
    /// JSON routes. Denials are 401/403 bodies.
    Api,
}

/// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/x` but
/// not `/administrator`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Classifies `path` against the configured prefixes. API prefixes win when
/// both families match.
pub fn classify(access: &AccessConfig, path: &str) -> Option<ProtectedFamily> {
    if access.api_prefixes.iter().any(|p| matches_prefix(path, p)) {
        Some(ProtectedFamily::Api)
    } else if access.ui_prefixes.iter().any(|p| matches_prefix(path, p)) {
        Some(ProtectedFamily::Ui)
    } else {
        None
    }
}

/// Pulls the credential from the session cookie, else from
/// `Authorization: Bearer`.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolves the caller, bounded by `access.identity_timeout_ms`.
///
/// Provider errors, timeouts and panics all yield `None`: an unreachable
/// identity store never lets a request through.
pub async fn resolve_principal(state: &Arc<AppState>, headers: &HeaderMap) -> Option<Principal> {
    let credential = extract_credential(headers, &state.access.session_cookie)?;
    let identity = state.identity.clone();
    let timeout = Duration::from_millis(state.access.identity_timeout_ms);

    let lookup = tokio::task::spawn_blocking(move || identity.resolve_principal(&credential));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(principal))) => principal,
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "identity provider failed, treating as unauthenticated");
            None
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "identity lookup panicked or was cancelled");
            None
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = state.access.identity_timeout_ms,
                "identity lookup timed out, treating as unauthenticated"
            );
            None
        }
    }
}

fn sign_in_location(access: &AccessConfig, uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let callback: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    let separator = if access.sign_in_path.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{separator}callbackUrl={callback}", access.sign_in_path)
}

fn deny(access: &AccessConfig, family: ProtectedFamily, denied: AccessDenied, uri: &Uri) -> Response {
    match (family, denied) {
        (ProtectedFamily::Api, denied) => ApiError::from(denied).into_response(),
        (ProtectedFamily::Ui, AccessDenied::Unauthenticated) => {
            Redirect::to(&sign_in_location(access, uri)).into_response()
        }
        (ProtectedFamily::Ui, AccessDenied::Unauthorized) => {
            Redirect::to(&access.denied_redirect).into_response()
        }
    }
}

/// Global gate in front of every protected prefix.
///
/// Unprotected paths pass through untouched. Protected paths require an
/// administrator; the resolved principal is attached as [`AuthContext`].
pub async fn access_gate(mut req: Request<Body>, next: Next) -> Response {
    let Some(state) = req.extensions().get::<Arc<AppState>>().cloned() else {
        return ApiError::Unknown("application state missing from request".to_string())
            .into_response();
    };

    let Some(family) = classify(&state.access, req.uri().path()) else {
        return next.run(req).await;
    };

    let principal = resolve_principal(&state, req.headers()).await;
    match authz::require_admin(principal.as_ref()).cloned() {
        Ok(principal) => {
            tracing::debug!(user_id = %principal.id, path = %req.uri().path(), "access granted");
            req.extensions_mut().insert(AuthContext(principal));
            next.run(req).await
        }
        Err(denied) => {
            tracing::info!(
                path = %req.uri().path(),
                family = ?family,
                decision = ?denied,
                "access denied"
            );
            deny(&state.access, family, denied, req.uri())
        }
    }
}

/// Requires a resolved principal of any role.
///
/// Reuses the principal when the gate already attached one.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    if req.extensions().get::<AuthContext>().is_some() {
        return Ok(next.run(req).await);
    }

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::Unknown("application state missing from request".to_string()))?;

    let principal = resolve_principal(&state, req.headers())
        .await
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(AuthContext(principal));
    Ok(next.run(req).await)
}
