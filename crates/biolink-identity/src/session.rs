//! Session credentials.
//!
//! Only the SHA-256 of a credential is stored. The raw token is handed to
//! the caller once, at issue time.

use chrono::{Duration, Utc};
use rand::RngCore;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};

use crate::IdentityError;

/// Hashes a raw credential into its stored form (lowercase hex SHA-256).
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues a new session for `user_id` valid for `ttl`, returning the raw token.
///
/// # Errors
///
/// Returns `IdentityError::Database` if the insert fails, including when
/// `user_id` does not exist.
pub fn issue_session(
    conn: &Connection,
    user_id: &str,
    ttl: Duration,
) -> Result<String, IdentityError> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let expires_at = (Utc::now() + ttl).timestamp_millis();
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![hash_token(&token), user_id, expires_at],
    )?;

    tracing::debug!(user_id, "issued session");
    Ok(token)
}

/// Deletes the session for a raw token. Returns whether one existed.
///
/// # Errors
///
/// Returns `IdentityError::Database` on SQL failure.
pub fn revoke_session(conn: &Connection, token: &str) -> Result<bool, IdentityError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        [hash_token(token)],
    )?;
    Ok(deleted > 0)
}
