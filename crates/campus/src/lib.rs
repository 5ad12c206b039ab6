//! # Campus
//!
//! Session management and route guarding for the Campus learning
//! platform.
//!
//! Campus keeps track of who is signed in (through an external auth
//! provider), what the platform knows about them (their profile and
//! role, fetched by email and cached locally), and which pages they may
//! see. Implement [`AuthProvider`](campus_session::AuthProvider) and
//! [`ProfileDirectory`](campus_session::ProfileDirectory) for your
//! backends, then:
//!
//! ```rust,no_run
//! use campus::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), CampusError> {
//! campus::init_tracing();
//!
//! let config = CampusConfig::from_json_file("campus.json")?.apply_env()?;
//! let portal = Portal::start(config, MemoryAuthProvider::new(), MemoryDirectory::new())?;
//!
//! let mut page = portal.watch([Role::Instructor])?;
//! while let Some(decision) = page.next().await {
//!     println!("{decision:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod portal;

pub use config::{
    CampusConfig, ENV_CACHE_DIR, ENV_LOADING_TIMEOUT_MS, ENV_LOGIN_PATH,
};
pub use error::{CampusError, ConfigError};
pub use portal::Portal;

pub use campus_guard as guard;
pub use campus_identity as identity;
pub use campus_session as session;

/// Installs a `tracing` subscriber that prints to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this
/// more than once, or after another subscriber was installed, does
/// nothing.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub mod prelude {
    //! Everything an application usually needs, in one import.

    pub use crate::{CampusConfig, CampusError, Portal};
    pub use campus_guard::{GuardDecision, GuardWatcher, LandingRoutes, RouteGuard};
    pub use campus_identity::{Identity, Profile, Role, RoleId, UserId};
    pub use campus_session::{
        AuthProvider, MemoryAuthProvider, MemoryDirectory, Notice,
        ProfileDirectory, SessionHandle, SessionSnapshot, StoreConfig,
        ToastLevel,
    };
}
