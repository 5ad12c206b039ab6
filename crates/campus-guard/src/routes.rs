//! Landing routes: where each role is sent when it lands somewhere it
//! isn't allowed.

use std::collections::BTreeMap;

use campus_identity::{Role, RoleId};
use serde::{Deserialize, Serialize};

use crate::GuardError;

/// A declarative map from role id to that role's home page.
///
/// Role ids without an entry land on `fallback`.
///
/// In JSON the map keys are the role ids as strings:
///
/// ```json
/// { "routes": { "1": "/admin/dashboard" }, "fallback": "/" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingRoutes {
    #[serde(default)]
    routes: BTreeMap<RoleId, String>,
    #[serde(default = "default_fallback")]
    fallback: String,
}

fn default_fallback() -> String {
    "/".to_owned()
}

impl LandingRoutes {
    /// An empty table: every role lands on `fallback`.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            routes: BTreeMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Builds a table from `(role id, path)` pairs.
    ///
    /// # Errors
    /// - [`GuardError::DuplicateRole`]: a role id appears twice
    /// - [`GuardError::RelativePath`]: a path doesn't start with `/`
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (RoleId, String)>,
        fallback: impl Into<String>,
    ) -> Result<Self, GuardError> {
        let mut table = Self::new(fallback);
        for (role_id, path) in pairs {
            if table.routes.insert(role_id, path).is_some() {
                return Err(GuardError::DuplicateRole(role_id));
            }
        }
        table.validate()?;
        Ok(table)
    }

    /// Returns the table with `role_id` landing on `path`.
    pub fn with_route(
        mut self,
        role_id: impl Into<RoleId>,
        path: impl Into<String>,
    ) -> Self {
        self.routes.insert(role_id.into(), path.into());
        self
    }

    /// The landing path for `role_id`.
    pub fn landing_for(&self, role_id: RoleId) -> &str {
        self.routes
            .get(&role_id)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    /// Where unknown roles land.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Checks that every path is absolute. Deserialized tables should be
    /// validated before use.
    ///
    /// # Errors
    /// Returns [`GuardError::RelativePath`] for the first offending path.
    pub fn validate(&self) -> Result<(), GuardError> {
        std::iter::once(&self.fallback)
            .chain(self.routes.values())
            .try_for_each(|path| check_absolute(path))
    }
}

/// The platform's standard table: each role's dashboard, `/` otherwise.
impl Default for LandingRoutes {
    fn default() -> Self {
        Self::new(default_fallback())
            .with_route(Role::Admin, "/admin/dashboard")
            .with_route(Role::Instructor, "/instructor/dashboard")
            .with_route(Role::Student, "/student/dashboard")
    }
}

pub(crate) fn check_absolute(path: &str) -> Result<(), GuardError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(GuardError::RelativePath(path.to_owned()))
    }
}
