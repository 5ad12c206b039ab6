//! Error types for the guard layer.

use campus_identity::RoleId;

/// Errors in guard configuration.
///
/// Evaluating a guard never fails; only building one from bad
/// configuration can.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A route is not an absolute path.
    #[error("route {0:?} must start with '/'")]
    RelativePath(String),

    /// A landing route was configured for a role id twice.
    #[error("duplicate landing route for role {0}")]
    DuplicateRole(RoleId),
}
