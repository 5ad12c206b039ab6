//! Wiring a configured session store.

use campus_guard::{GuardWatcher, RouteGuard};
use campus_identity::RoleId;
use campus_session::{
    AuthProvider, FileCache, MemoryCache, ProfileDirectory, SessionHandle,
    spawn_session_store,
};

use crate::{CampusConfig, CampusError};

/// A running session store plus the configuration its guards use.
///
/// # Example
///
/// ```rust
/// use campus::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), CampusError> {
/// let portal = Portal::start(
///     CampusConfig::default(),
///     MemoryAuthProvider::new(),
///     MemoryDirectory::new(),
/// )?;
///
/// let mut dashboard = portal.watch([Role::Admin])?;
/// assert_eq!(dashboard.settled().await, Some(GuardDecision::Redirect("/login".into())));
/// # Ok(())
/// # }
/// ```
pub struct Portal {
    config: CampusConfig,
    session: SessionHandle,
}

impl Portal {
    /// Validates `config` and spawns the session store.
    ///
    /// The profile cache lives in `config.cache_dir` when set, in memory
    /// otherwise. Must be called from within a Tokio runtime.
    pub fn start<P, D>(
        config: CampusConfig,
        provider: P,
        directory: D,
    ) -> Result<Self, CampusError>
    where
        P: AuthProvider,
        D: ProfileDirectory,
    {
        config.validate()?;

        let session = match &config.cache_dir {
            Some(dir) => {
                let cache = FileCache::new(dir);
                tracing::info!(path = %cache.path().display(), "using file profile cache");
                spawn_session_store(provider, directory, cache, config.store.clone())
            }
            None => {
                tracing::info!("using in-memory profile cache");
                spawn_session_store(
                    provider,
                    directory,
                    MemoryCache::new(),
                    config.store.clone(),
                )
            }
        };

        Ok(Self { config, session })
    }

    /// The session store.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// The configuration the portal was started with.
    pub fn config(&self) -> &CampusConfig {
        &self.config
    }

    /// A guard for a page open to `roles`.
    pub fn guard<R: Into<RoleId>>(
        &self,
        roles: impl IntoIterator<Item = R>,
    ) -> Result<RouteGuard, CampusError> {
        self.config.guard(roles)
    }

    /// A guard for a page open to `roles`, already following the session.
    pub fn watch<R: Into<RoleId>>(
        &self,
        roles: impl IntoIterator<Item = R>,
    ) -> Result<GuardWatcher, CampusError> {
        Ok(self.guard(roles)?.watch(self.session.subscribe()))
    }

    /// Stops the session store.
    pub async fn shutdown(self) -> Result<(), CampusError> {
        self.session.shutdown().await?;
        Ok(())
    }
}
