//! The two external collaborators of the session store.
//!
//! Campus doesn't implement authentication or profile storage itself.
//! Both live in a backend service (Supabase, Firebase, a custom API...).
//! Instead, this module defines two traits:
//!
//! - [`AuthProvider`]: who is signed in, how to sign out, and a stream
//!   of auth-state changes.
//! - [`ProfileDirectory`]: looks up the application's own profile
//!   record by email.
//!
//! The store is generic over both, so production code plugs in real
//! clients while tests and the demo use the in-memory versions from
//! [`crate::memory`].

use std::future::Future;

use campus_identity::{AuthChange, AuthSession, Profile};
use tokio::sync::mpsc;

use crate::SessionError;

/// Receiving end of an auth-change subscription.
///
/// Dropping it unsubscribes: the provider sees a closed channel and
/// stops delivering to it.
pub type AuthSubscription = mpsc::UnboundedReceiver<AuthChange>;

/// An external authentication provider.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the store shares one provider between its
///   actor task and the short-lived tasks it spawns for provider calls.
/// - The returned futures are `Send` so those tasks can run on any
///   worker thread.
///
/// # Example
///
/// ```rust
/// use campus_identity::AuthSession;
/// use campus_session::{AuthProvider, AuthSubscription, SessionError};
/// use tokio::sync::mpsc;
///
/// /// A provider where nobody is ever signed in.
/// struct Anonymous;
///
/// impl AuthProvider for Anonymous {
///     async fn current_session(&self) -> Result<Option<AuthSession>, SessionError> {
///         Ok(None)
///     }
///
///     async fn sign_out(&self) -> Result<(), SessionError> {
///         Ok(())
///     }
///
///     fn subscribe(&self) -> AuthSubscription {
///         // Nothing will ever be sent, the sender is dropped right away.
///         let (_tx, rx) = mpsc::unbounded_channel();
///         rx
///     }
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Returns the provider's current session, or `None` when nobody is
    /// signed in.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthSession>, SessionError>> + Send;

    /// Ends the provider session.
    ///
    /// # Errors
    /// Returns [`SessionError::Provider`] if the provider refused.
    fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Subscribes to auth-state changes. Every change after this call is
    /// delivered on the returned channel, in the provider's order.
    fn subscribe(&self) -> AuthSubscription;
}

/// The backend's profile lookup.
pub trait ProfileDirectory: Send + Sync + 'static {
    /// Looks up the profile registered under `email`.
    ///
    /// # Returns
    /// - `Ok(Some(profile))`: found
    /// - `Ok(None)`: no profile for this email
    /// - `Err(SessionError::Directory)`: the backend failed
    fn profile_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Profile>, SessionError>> + Send;
}
