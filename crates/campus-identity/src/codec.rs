//! Cache record codec for profiles.
//!
//! The session layer keeps the last-known [`Profile`] in a single local
//! record so a reload can paint the right dashboard before the backend
//! answers. This module decides what that record looks like: plain JSON,
//! the same shape the backend returns.

use crate::{IdentityError, Profile};

/// The fixed name of the cached profile record.
pub const CACHE_KEY: &str = "userProfile";

/// Serializes a profile into its cache record.
///
/// # Errors
/// Returns [`IdentityError::Encode`] if serialization fails.
pub fn encode_profile(profile: &Profile) -> Result<String, IdentityError> {
    serde_json::to_string(profile).map_err(IdentityError::Encode)
}

/// Parses a cache record back into a profile.
///
/// A record with an empty email is rejected: the session layer matches
/// cached profiles to identities by email, and an empty one would match
/// an identity that has no email at all.
///
/// # Errors
/// - [`IdentityError::Decode`]: the record is not a profile
/// - [`IdentityError::InvalidRecord`]: the profile has no email
pub fn decode_profile(record: &str) -> Result<Profile, IdentityError> {
    let profile: Profile =
        serde_json::from_str(record).map_err(IdentityError::Decode)?;
    if profile.email.is_empty() {
        return Err(IdentityError::InvalidRecord(
            "cached profile has an empty email".into(),
        ));
    }
    Ok(profile)
}
