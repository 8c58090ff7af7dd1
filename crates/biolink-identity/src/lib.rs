//! Identity layer for biolink.
//!
//! Owns the `users` and `sessions` tables and turns an opaque session
//! credential into a [`Principal`](biolink_types::Principal). Everything
//! that needs to know who is calling goes through the [`IdentityProvider`]
//! trait so the HTTP layer never touches session storage directly.

mod error;
mod provider;
mod session;
mod user;

pub use error::IdentityError;
pub use provider::{IdentityProvider, SqliteIdentityProvider};
pub use session::{hash_token, issue_session, revoke_session};
pub use user::{create_user, get_user, list_users, NewUser, User};
