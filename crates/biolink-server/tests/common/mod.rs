#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use biolink_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use biolink_identity::{create_user, issue_session, IdentityProvider, NewUser, SqliteIdentityProvider};
use biolink_server::{app, config::AccessConfig, AppState};
use biolink_types::{RetentionPolicy, Role};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A migrated file-backed database plus the state the router is built from.
pub struct TestApp {
    pub pool: DbPool,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_pool(db_path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();

        let state = AppState {
            pool: pool.clone(),
            identity: Arc::new(SqliteIdentityProvider::new(pool.clone())),
            access: AccessConfig::default(),
            retention: RetentionPolicy::default(),
        };

        Self {
            pool,
            state,
            _dir: dir,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.state.identity = identity;
        self
    }

    pub fn with_access(mut self, access: AccessConfig) -> Self {
        self.state.access = access;
        self
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router().oneshot(req).await.unwrap()
    }

    /// Creates a user and a one-hour session. Returns `(user_id, token)`.
    pub fn user(&self, email: &str, role: Role) -> (String, String) {
        let conn = self.pool.get().unwrap();
        let user = create_user(&conn, &NewUser::new(email, role)).unwrap();
        let token = issue_session(&conn, &user.id, chrono::Duration::hours(1)).unwrap();
        (user.id, token)
    }

    /// Inserts an event with an exact timestamp, bypassing ingestion.
    pub fn insert_event(
        &self,
        user_id: &str,
        event_type: &str,
        occurred_at_ms: i64,
        country: Option<&str>,
        referrer: Option<&str>,
    ) {
        let conn = self.pool.get().unwrap();
        conn.execute(
            "INSERT INTO events (user_id, event_type, occurred_at, country, referrer)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id, event_type, occurred_at_ms, country, referrer],
        )
        .unwrap();
    }

    pub fn event_count(&self) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap()
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Milliseconds since the epoch for a UTC date and time.
pub fn utc_ms(date: &str, time: &str) -> i64 {
    let naive = chrono::NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S%.3f")
        .unwrap();
    naive.and_utc().timestamp_millis()
}
