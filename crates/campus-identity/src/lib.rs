//! Identity and profile model for Campus.
//!
//! This crate defines the data that the rest of the workspace passes
//! around:
//!
//! - **Provider side** ([`Identity`], [`AuthSession`], [`AuthChange`]):
//!   what the external auth provider tells us about who is logged in.
//! - **Application side** ([`Profile`], [`RoleId`], [`Role`]): our own
//!   user record, fetched by email, carrying the role used for access
//!   control.
//! - **Cache codec** ([`encode_profile`], [`decode_profile`]): how a
//!   profile is stored in the local cache record.
//!
//! # Architecture
//!
//! ```text
//! Guard (above)    ← reads profile.role_id to decide redirects
//!     ↕
//! Session (above)  ← owns Identity + Profile, talks to the provider
//!     ↕
//! Identity (this crate) ← plain data, no I/O
//! ```

mod codec;
mod error;
mod types;

pub use codec::{CACHE_KEY, decode_profile, encode_profile};
pub use error::IdentityError;
pub use types::{
    AuthChange, AuthEvent, AuthSession, Identity, Profile, Role, RoleId,
    UserId,
};
