//! Error types for the identity layer.

/// Errors that can occur during identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// A database operation failed.
    #[error("identity database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("identity store unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored role label is outside the known set.
    #[error("invalid role label: {0}")]
    InvalidRole(String),
}
