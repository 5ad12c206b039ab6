//! The route guard: render, wait, or redirect.

use std::collections::BTreeSet;

use campus_identity::RoleId;
use campus_session::SessionSnapshot;
use tokio::sync::watch;

use crate::routes::check_absolute;
use crate::{GuardError, GuardWatcher, LandingRoutes};

/// Where unauthenticated visitors are sent unless configured otherwise.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// What a protected page should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is still loading. Show a spinner, decide nothing.
    Pending,
    /// Show the page.
    Render,
    /// Navigate to this path instead.
    Redirect(String),
}

impl GuardDecision {
    /// The redirect target, if this is a redirect.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirect(path) => Some(path),
            _ => None,
        }
    }
}

/// Guards one protected page.
///
/// The guard is stateless: it holds configuration and turns a
/// [`SessionSnapshot`] into a [`GuardDecision`]. Evaluation order:
///
/// 1. still loading → [`Pending`](GuardDecision::Pending)
/// 2. nobody signed in → redirect to `redirect_to`
/// 3. roles restricted, profile role known and not allowed → redirect
///    to that role's landing route
/// 4. otherwise → [`Render`](GuardDecision::Render)
///
/// A signed-in user whose profile hasn't arrived yet is rendered. If the
/// profile later turns out to carry a disallowed role, the next
/// evaluation redirects.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    allowed_roles: BTreeSet<RoleId>,
    redirect_to: String,
    landing: LandingRoutes,
}

impl RouteGuard {
    /// A guard admitting any signed-in user.
    pub fn new() -> Self {
        Self {
            allowed_roles: BTreeSet::new(),
            redirect_to: DEFAULT_LOGIN_PATH.to_owned(),
            landing: LandingRoutes::default(),
        }
    }

    /// A guard admitting only the given roles. An empty list admits any
    /// signed-in user.
    pub fn allow<R: Into<RoleId>>(roles: impl IntoIterator<Item = R>) -> Self {
        Self {
            allowed_roles: roles.into_iter().map(Into::into).collect(),
            ..Self::new()
        }
    }

    /// Sets where unauthenticated visitors are sent.
    ///
    /// # Errors
    /// Returns [`GuardError::RelativePath`] unless `path` starts with `/`.
    pub fn redirect_to(
        mut self,
        path: impl Into<String>,
    ) -> Result<Self, GuardError> {
        let path = path.into();
        check_absolute(&path)?;
        self.redirect_to = path;
        Ok(self)
    }

    /// Replaces the landing-route table.
    ///
    /// # Errors
    /// Returns [`GuardError::RelativePath`] if the table has relative paths.
    pub fn landing_routes(
        mut self,
        landing: LandingRoutes,
    ) -> Result<Self, GuardError> {
        landing.validate()?;
        self.landing = landing;
        Ok(self)
    }

    /// The allowed roles; empty means any signed-in user.
    pub fn allowed_roles(&self) -> &BTreeSet<RoleId> {
        &self.allowed_roles
    }

    /// Where unauthenticated visitors are sent.
    pub fn login_path(&self) -> &str {
        &self.redirect_to
    }

    /// Decides what to do for `snapshot`.
    pub fn evaluate(&self, snapshot: &SessionSnapshot) -> GuardDecision {
        if snapshot.loading {
            return GuardDecision::Pending;
        }
        if snapshot.identity.is_none() {
            tracing::debug!(to = %self.redirect_to, "not signed in, redirecting");
            return GuardDecision::Redirect(self.redirect_to.clone());
        }
        if self.allowed_roles.is_empty() {
            return GuardDecision::Render;
        }
        match snapshot.role_id() {
            Some(role_id) if !self.allowed_roles.contains(&role_id) => {
                let to = self.landing.landing_for(role_id);
                tracing::debug!(%role_id, %to, "role not allowed, redirecting");
                GuardDecision::Redirect(to.to_owned())
            }
            _ => GuardDecision::Render,
        }
    }

    /// Follows a session's snapshots and yields a new decision each time
    /// the outcome changes.
    pub fn watch(
        &self,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> GuardWatcher {
        GuardWatcher::new(self.clone(), snapshots)
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}
