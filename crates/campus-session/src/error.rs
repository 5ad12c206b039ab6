//! Error types for the session layer.

use campus_identity::IdentityError;

/// Errors that can occur while synchronizing a session.
///
/// Most of these never reach a caller: the store catches provider,
/// directory and cache failures at its boundary, logs them, and keeps
/// whatever state it had. They exist so collaborators have something
/// meaningful to return, and so the logs say which side failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The auth provider rejected or failed a call (session lookup,
    /// sign-out).
    #[error("auth provider error: {0}")]
    Provider(String),

    /// The profile backend failed to answer a lookup.
    #[error("profile directory error: {0}")]
    Directory(String),

    /// Reading or writing the local profile record failed.
    #[error("profile cache I/O failed: {0}")]
    CacheIo(#[from] std::io::Error),

    /// The local profile record could not be encoded or decoded.
    #[error(transparent)]
    CacheRecord(#[from] IdentityError),

    /// The store's actor task has stopped; the handle is dangling.
    #[error("session store is unavailable")]
    Unavailable,
}
