//! Role-based route guarding for Campus.
//!
//! Every protected page is wrapped in a [`RouteGuard`]. Given the
//! session store's latest snapshot, the guard says whether to show a
//! spinner, render the page, or redirect: to the login page when nobody
//! is signed in, or to the user's own landing page when their role isn't
//! allowed here.
//!
//! # Key types
//!
//! - [`RouteGuard`]: allowed roles + login path → [`GuardDecision`]
//! - [`LandingRoutes`]: per-role landing pages, injected as configuration
//! - [`GuardWatcher`]: re-evaluates as the session changes
//!
//! ```rust
//! use campus_guard::{GuardDecision, RouteGuard};
//! use campus_identity::{Identity, Profile, Role, UserId};
//! use campus_session::SessionSnapshot;
//!
//! let admin_only = RouteGuard::allow([Role::Admin]);
//!
//! let student = SessionSnapshot {
//!     identity: Some(Identity::new("u3", "sam@example.edu")),
//!     profile: Some(Profile {
//!         id: UserId(3),
//!         name: "Sam".into(),
//!         email: "sam@example.edu".into(),
//!         role_id: Some(Role::Student.id()),
//!     }),
//!     loading: false,
//! };
//!
//! assert_eq!(
//!     admin_only.evaluate(&student),
//!     GuardDecision::Redirect("/student/dashboard".into())
//! );
//! ```

mod error;
mod guard;
mod routes;
mod watcher;

pub use error::GuardError;
pub use guard::{DEFAULT_LOGIN_PATH, GuardDecision, RouteGuard};
pub use routes::LandingRoutes;
pub use watcher::GuardWatcher;
