//! Session store for Campus.
//!
//! This crate keeps the application's idea of "who is signed in" in step
//! with an external auth provider:
//!
//! 1. **Identity**: what the provider says ([`AuthProvider`] trait)
//! 2. **Profile**: our own user record, looked up by email
//!    ([`ProfileDirectory`] trait) and cached locally ([`ProfileCache`])
//! 3. **Publishing**: snapshots for the UI and guards
//!    ([`SessionHandle`]), plus toasts and navigation ([`Notice`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard Layer (above)   ← reads snapshots to decide render vs redirect
//!     ↕
//! Session Layer (this crate) ← owns identity + profile, talks to backends
//!     ↕
//! Identity Layer (below) ← Identity, Profile, RoleId, AuthChange types
//! ```
//!
//! # Example
//!
//! ```rust
//! use campus_identity::{Identity, Profile, RoleId, UserId};
//! use campus_session::{
//!     MemoryAuthProvider, MemoryCache, MemoryDirectory, StoreConfig,
//!     spawn_session_store,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = MemoryAuthProvider::signed_in(Identity::new("u1", "ada@example.edu"));
//! let directory = MemoryDirectory::with_profiles([Profile {
//!     id: UserId(1),
//!     name: "Ada".into(),
//!     email: "ada@example.edu".into(),
//!     role_id: Some(RoleId(2)),
//! }]);
//!
//! let session = spawn_session_store(provider, directory, MemoryCache::new(), StoreConfig::default());
//! session.loaded().await.unwrap();
//! session.refresh_profile().await.unwrap();
//! assert_eq!(session.snapshot().role_id(), Some(RoleId(2)));
//! # }
//! ```

mod cache;
mod error;
pub mod memory;
mod provider;
mod state;
mod store;

pub use cache::{FileCache, MemoryCache, ProfileCache};
pub use error::SessionError;
pub use memory::{MemoryAuthProvider, MemoryDirectory};
pub use provider::{AuthProvider, AuthSubscription, ProfileDirectory};
pub use state::{Notice, SessionSnapshot, StoreConfig, ToastLevel};
pub use store::{SessionHandle, spawn_session_store};
