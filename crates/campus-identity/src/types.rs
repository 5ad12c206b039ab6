//! Core identity types.
//!
//! Two worlds meet here. The external auth provider knows about an
//! [`Identity`] (who signed in) and hands us [`AuthChange`]s whenever
//! that changes. The application's backend knows about a [`Profile`]
//! (our own user record), which carries the [`RoleId`] that access
//! control runs on.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// The backend's primary key for a user profile.
///
/// Newtype over `u64` so a user id can't be confused with a role id.
/// `#[serde(transparent)]` keeps it a plain number in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A numeric role identifier as stored by the backend.
///
/// The known values are `1` (admin), `2` (instructor) and `3` (student),
/// but the backend is free to hand us anything, so this stays a raw
/// number. Use [`Role::from_id`] to interpret it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RoleId(pub u32);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The roles the platform knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    /// Every known role, in role-id order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Instructor, Role::Student];

    /// Interprets a raw role id. Returns `None` for ids we don't know.
    pub fn from_id(id: RoleId) -> Option<Self> {
        match id.0 {
            1 => Some(Self::Admin),
            2 => Some(Self::Instructor),
            3 => Some(Self::Student),
            _ => None,
        }
    }

    /// The backend's numeric id for this role.
    pub fn id(self) -> RoleId {
        match self {
            Self::Admin => RoleId(1),
            Self::Instructor => RoleId(2),
            Self::Student => RoleId(3),
        }
    }
}

impl From<Role> for RoleId {
    fn from(role: Role) -> Self {
        role.id()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Instructor => write!(f, "instructor"),
            Self::Student => write!(f, "student"),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider side: Identity, AuthSession, AuthChange
// ---------------------------------------------------------------------------

/// The auth provider's view of a signed-in user.
///
/// We only ever look at two things: the provider's opaque id and the
/// email address. Everything else the provider knows stays with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque provider-assigned id. Never interpreted.
    pub id: String,

    /// Email address, if the provider has one for this user. Profiles
    /// are looked up by this value, so an identity without an email
    /// never gets a profile.
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    /// Builds an identity with an email address.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
        }
    }

    /// The email address, treating an empty string as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// A provider session: who is signed in, plus the provider's token.
///
/// The session layer only consults `identity`; the token fields are
/// carried so collaborators that talk to the backend can use them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub identity: Identity,
    pub access_token: String,
    /// Unix seconds at which the provider will expire this session.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// The kinds of auth-state changes a provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// Delivered once after subscribing, with whatever session exists.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
        };
        f.write_str(name)
    }
}

/// One `(event, session)` pair from the provider's change stream.
///
/// `session` is `None` when nobody is signed in after the change
/// (sign-out, or an expired session the provider gave up on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    /// The identity carried by this change, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }
}

// ---------------------------------------------------------------------------
// Application side: Profile
// ---------------------------------------------------------------------------

/// The application's own user record.
///
/// Fetched from the backend by email and cached locally. `role_id` is
/// optional: a profile that came back without one is not yet
/// role-gateable, and the guard lets it through rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
}

impl Profile {
    /// The interpreted role, if `role_id` is set and known.
    pub fn role(&self) -> Option<Role> {
        self.role_id.and_then(Role::from_id)
    }

    /// `true` if this profile belongs to the given email address.
    pub fn belongs_to(&self, email: &str) -> bool {
        self.email == email
    }
}

// =========================================================================
// Tests
// =========================================================================
