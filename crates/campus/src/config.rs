//! Application configuration.
//!
//! Loaded from a JSON file, then optionally overridden from the
//! environment. Every field has a default, so `{}` is a valid file.
//!
//! ```json
//! {
//!   "store": { "loading_timeout": 5000 },
//!   "cache_dir": "/var/lib/campus",
//!   "login_path": "/login",
//!   "landing_routes": {
//!     "routes": { "1": "/admin/dashboard", "3": "/student/dashboard" },
//!     "fallback": "/"
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use campus_guard::{DEFAULT_LOGIN_PATH, LandingRoutes, RouteGuard};
use campus_identity::RoleId;
use campus_session::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::{CampusError, ConfigError};

/// Overrides [`StoreConfig::loading_timeout`], in milliseconds.
pub const ENV_LOADING_TIMEOUT_MS: &str = "CAMPUS_LOADING_TIMEOUT_MS";
/// Overrides [`CampusConfig::cache_dir`].
pub const ENV_CACHE_DIR: &str = "CAMPUS_CACHE_DIR";
/// Overrides [`CampusConfig::login_path`].
pub const ENV_LOGIN_PATH: &str = "CAMPUS_LOGIN_PATH";

/// Everything needed to run a session store and guard pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusConfig {
    /// Session store tuning.
    pub store: StoreConfig,

    /// Directory for the on-disk profile record. `None` keeps the cache
    /// in memory, so nothing survives a restart.
    pub cache_dir: Option<PathBuf>,

    /// Per-role landing pages for guards.
    pub landing_routes: LandingRoutes,

    /// Where guards send visitors who aren't signed in.
    pub login_path: String,
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            cache_dir: None,
            landing_routes: LandingRoutes::default(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
        }
    }
}

impl CampusConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, CampusError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CampusError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, CampusError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CampusError> {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(value) = get(ENV_LOADING_TIMEOUT_MS) {
            let ms: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_LOADING_TIMEOUT_MS,
                value: value.clone(),
            })?;
            self.store.loading_timeout = Duration::from_millis(ms);
        }
        if let Some(value) = get(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_LOGIN_PATH) {
            self.login_path = value;
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks the route settings.
    pub fn validate(&self) -> Result<(), CampusError> {
        self.landing_routes.validate()?;
        RouteGuard::new().redirect_to(self.login_path.as_str())?;
        Ok(())
    }

    /// A guard for a page open to `roles`, using this configuration's
    /// login path and landing routes. No roles means any signed-in user.
    pub fn guard<R: Into<RoleId>>(
        &self,
        roles: impl IntoIterator<Item = R>,
    ) -> Result<RouteGuard, CampusError> {
        let guard = RouteGuard::allow(roles)
            .redirect_to(self.login_path.as_str())?
            .landing_routes(self.landing_routes.clone())?;
        Ok(guard)
    }
}
