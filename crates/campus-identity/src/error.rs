//! Error types for the identity layer.
//!
//! Like every crate in Campus, this one owns its own error enum. An
//! `IdentityError` always means the problem is in turning a profile into
//! a cache record or back, never in networking or session state.

/// Errors that can occur while encoding or decoding identity data.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Serializing a profile into its cache record failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The cache record could not be parsed back into a profile.
    ///
    /// Usually a truncated write or a record left behind by an older
    /// version of the application with a different shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The record parsed, but describes a profile we refuse to use.
    #[error("invalid profile record: {0}")]
    InvalidRecord(String),
}
