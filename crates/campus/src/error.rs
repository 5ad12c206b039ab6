//! Unified error type for Campus.

use std::path::PathBuf;

use campus_guard::GuardError;
use campus_identity::IdentityError;
use campus_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors, so code
/// using the `campus` meta-crate only deals with this one type.
#[derive(Debug, thiserror::Error)]
pub enum CampusError {
    /// Profile encoding or decoding failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The session store failed or is gone.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A guard or landing-route table was misconfigured.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The configuration couldn't be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors loading a [`CampusConfig`](crate::CampusConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment override couldn't be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}
