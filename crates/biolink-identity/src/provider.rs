//! Credential to principal resolution.

use biolink_db::DbPool;
use biolink_types::{Principal, Role};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::{hash_token, IdentityError};

/// Resolves an opaque credential into the caller's identity.
///
/// Implementations are called from blocking context and must be cheap to
/// share across requests.
pub trait IdentityProvider: Send + Sync {
    /// Returns the principal for `credential`, or `None` when the credential
    /// is unknown, expired, or carries an unrecognised role.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be reached. Callers
    /// treat that the same as `None`.
    fn resolve_principal(&self, credential: &str) -> Result<Option<Principal>, IdentityError>;
}

/// An [`IdentityProvider`] backed by the `sessions` and `users` tables.
#[derive(Clone)]
pub struct SqliteIdentityProvider {
    pool: DbPool,
}

impl SqliteIdentityProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl IdentityProvider for SqliteIdentityProvider {
    fn resolve_principal(&self, credential: &str) -> Result<Option<Principal>, IdentityError> {
        let conn = self.pool.get()?;
        resolve_with_conn(&conn, credential)
    }
}

fn resolve_with_conn(
    conn: &Connection,
    credential: &str,
) -> Result<Option<Principal>, IdentityError> {
    if credential.trim().is_empty() {
        return Ok(None);
    }

    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT u.id, u.role
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            params![hash_token(credential), Utc::now().timestamp_millis()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((id, role_label)) = row else {
        return Ok(None);
    };

    match Role::parse(&role_label) {
        Some(role) => Ok(Some(Principal { id, role })),
        None => {
            tracing::warn!(user_id = %id, role = %role_label, "session user has unrecognised role");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_user, issue_session, NewUser};
    use biolink_db::{create_pool, run_migrations, DbRuntimeSettings};
    use chrono::Duration;

    fn test_pool() -> DbPool {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                pool_max_size: 1,
                ..Default::default()
            },
        )
        .expect("pool creation should succeed");
        run_migrations(&pool.get().unwrap()).expect("migrations should succeed");
        pool
    }

    #[test]
    fn resolves_valid_session() {
        let pool = test_pool();
        let (user, token) = {
            let conn = pool.get().unwrap();
            let user = create_user(&conn, &NewUser::new("a@example.com", Role::Admin)).unwrap();
            let token = issue_session(&conn, &user.id, Duration::hours(1)).unwrap();
            (user, token)
        };

        let provider = SqliteIdentityProvider::new(pool);
        let principal = provider.resolve_principal(&token).unwrap().expect("principal");
        assert_eq!(principal.id, user.id);
        assert_eq!(principal.role, Role::Admin);
    }

    #[test]
    fn unknown_blank_and_expired_credentials_resolve_to_none() {
        let pool = test_pool();
        let expired = {
            let conn = pool.get().unwrap();
            let user = create_user(&conn, &NewUser::new("a@example.com", Role::Admin)).unwrap();
            issue_session(&conn, &user.id, Duration::seconds(-1)).unwrap()
        };

        let provider = SqliteIdentityProvider::new(pool);
        assert!(provider.resolve_principal("not-a-token").unwrap().is_none());
        assert!(provider.resolve_principal("").unwrap().is_none());
        assert!(provider.resolve_principal(&expired).unwrap().is_none());
    }

    #[test]
    fn role_is_normalized_at_resolution() {
        let pool = test_pool();
        let token = {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO users (id, email, role) VALUES ('u1', 'x@example.com', 'super_admin')",
                [],
            )
            .unwrap();
            issue_session(&conn, "u1", Duration::hours(1)).unwrap()
        };

        let provider = SqliteIdentityProvider::new(pool);
        let principal = provider.resolve_principal(&token).unwrap().unwrap();
        assert_eq!(principal.role, Role::SuperAdmin);
    }

    #[test]
    fn unrecognised_role_fails_closed() {
        let pool = test_pool();
        let token = {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO users (id, email, role) VALUES ('u1', 'x@example.com', 'owner')",
                [],
            )
            .unwrap();
            issue_session(&conn, "u1", Duration::hours(1)).unwrap()
        };

        let provider = SqliteIdentityProvider::new(pool);
        assert!(provider.resolve_principal(&token).unwrap().is_none());
    }
}
