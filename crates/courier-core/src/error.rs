//! Error types for the Courier service layer.

use thiserror::Error;

/// Result type alias using the Courier service [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level errors surfaced by Courier operations.
///
/// Provider and database failures are converted into one of these at the
/// handler boundary; raw errors never reach a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Request carries no valid session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Resource not found, or not visible under the caller's scope. All
    /// queries are owner-scoped, so an unowned resource answers the same as
    /// a missing one.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sub-account already exists for this user.
    #[error("A messaging sub-account is already connected")]
    AlreadyLinked,

    /// Operation requires a sub-account and none exists.
    #[error("No messaging sub-account connected")]
    NotLinked,

    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote provider rejected the call; carries the provider's message.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A required secret or credential pair is not configured.
    #[error("Server configuration error: {0}")]
    ServerConfig(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}
