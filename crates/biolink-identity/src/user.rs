//! User records and the administrative user listing.

use biolink_types::{search_pattern, Page, PageRequest, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::IdentityError;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Role,
    pub created_at: String,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Role,
}

impl NewUser {
    /// A new account with only an email and role.
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: None,
            username: None,
            role,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, username, role, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(4)?;
    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(IdentityError::InvalidRole(role_str.clone())),
        )
    })?;
    user_with_role(row, role)
}

fn user_with_role(row: &Row<'_>, role: Role) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        username: row.get(3)?,
        role,
        created_at: row.get(5)?,
    })
}

/// Like [`user_from_row`], but a row whose stored role is outside the known
/// set is logged and skipped instead of failing the whole listing.
fn listed_user_from_row(row: &Row<'_>) -> rusqlite::Result<Option<User>> {
    let role_str: String = row.get(4)?;
    match Role::parse(&role_str) {
        Some(role) => user_with_role(row, role).map(Some),
        None => {
            let id: String = row.get(0)?;
            tracing::warn!(user_id = %id, role = %role_str, "skipping user with unrecognised role");
            Ok(None)
        }
    }
}

/// Creates a user with a fresh UUID.
///
/// # Errors
///
/// Returns `IdentityError::Database` if the insert fails (e.g. duplicate email).
pub fn create_user(conn: &Connection, new_user: &NewUser) -> Result<User, IdentityError> {
    let id = uuid::Uuid::new_v4().to_string();
    let user = conn.query_row(
        &format!(
            "INSERT INTO users (id, email, name, username, role)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {USER_COLUMNS}"
        ),
        params![
            id,
            new_user.email,
            new_user.name,
            new_user.username,
            new_user.role.as_str(),
        ],
        user_from_row,
    )?;
    Ok(user)
}

/// Looks up a user by ID.
///
/// # Errors
///
/// Returns `IdentityError::Database` if the query fails.
pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>, IdentityError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Lists users newest first, optionally filtered by a case-insensitive
/// substring of email, name or username.
///
/// Rows with an unrecognised stored role are left out of `items` but still
/// counted in `total`.
///
/// # Errors
///
/// Returns `IdentityError::Database` if the query fails.
pub fn list_users(
    conn: &Connection,
    search: Option<&str>,
    request: PageRequest,
) -> Result<Page<User>, IdentityError> {
    let pattern = search_pattern(search);
    let filter = "(?1 IS NULL
        OR email LIKE ?1 ESCAPE '\\'
        OR name LIKE ?1 ESCAPE '\\'
        OR username LIKE ?1 ESCAPE '\\')";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM users WHERE {filter}"),
        params![pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE {filter}
         ORDER BY created_at DESC, id DESC
         LIMIT ?2 OFFSET ?3"
    ))?;
    let items = stmt
        .query_map(
            params![pattern, request.page_size(), request.offset()],
            listed_user_from_row,
        )?
        .filter_map(Result::transpose)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, request))
}
