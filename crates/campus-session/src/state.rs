//! Session types: configuration, the published snapshot, and notices.
//!
//! The store owns one mutable session record. The outside world never
//! touches it directly; it sees:
//! - WHO is signed in and WHAT their profile says ([`SessionSnapshot`])
//! - WHETHER the store is still figuring that out (`loading`)
//! - side effects meant for the UI, like toasts and navigation ([`Notice`])

use std::time::Duration;

use campus_identity::{Identity, Profile, RoleId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Configuration for the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long the store may stay in `loading` before it is forced out,
    /// whether or not the provider has answered. Bounds the spinner.
    ///
    /// Default: 5 seconds.
    #[serde(with = "duration_ms")]
    pub loading_timeout: Duration,

    /// Capacity of the command channel between handles and the actor.
    pub command_channel_size: usize,

    /// How many notices a slow subscriber may lag behind before it
    /// starts missing them.
    pub notice_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            loading_timeout: Duration::from_secs(5),
            command_channel_size: 32,
            notice_capacity: 16,
        }
    }
}

/// Durations in config files are written as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of the session record.
///
/// `loading == false` only means the store has finished its synchronous
/// work for the latest event. A profile fetch may still be in flight, so
/// a snapshot can have an identity and no profile yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl SessionSnapshot {
    /// The state a freshly spawned store starts in.
    pub fn initial() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    /// `true` if an identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// The current identity's email, if any.
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(Identity::email)
    }

    /// The profile's role id, once a profile with a role is loaded.
    pub fn role_id(&self) -> Option<RoleId> {
        self.profile.as_ref().and_then(|p| p.role_id)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

/// A UI side effect requested by the store.
///
/// The store doesn't render anything or own a router; it publishes these
/// on a broadcast channel and whoever owns the UI acts on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// Show a short message.
    Toast { level: ToastLevel, message: String },
    /// Navigate to `path`.
    Navigate { path: String },
}

impl Notice {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self::Toast {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::Toast {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    pub(crate) fn navigate(path: impl Into<String>) -> Self {
        Self::Navigate { path: path.into() }
    }
}
