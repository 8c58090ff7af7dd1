//! Error types for the analytics layer.

/// Errors that can occur during analytics operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A database operation failed.
    #[error("analytics database error: {0}")]
    Database(#[from] rusqlite::Error),
}
