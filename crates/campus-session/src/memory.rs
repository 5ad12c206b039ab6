//! In-memory collaborators for development, demos and tests.
//!
//! [`MemoryAuthProvider`] and [`MemoryDirectory`] stand in for the real
//! backend. Both are cheap to clone and clones share state, so a test can
//! give one clone to the store and keep driving it through another:
//! signing users in and out, adding latency, or making calls fail.
//!
//! Latency is implemented with `tokio::time::sleep`, so tests running on
//! a paused clock (`#[tokio::test(start_paused = true)]`) stay instant
//! and deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use campus_identity::{AuthChange, AuthEvent, AuthSession, Identity, Profile};
use rand::Rng;
use tokio::sync::mpsc;

use crate::{AuthProvider, AuthSubscription, ProfileDirectory, SessionError};

// ---------------------------------------------------------------------------
// MemoryAuthProvider
// ---------------------------------------------------------------------------

/// An auth provider that keeps its single session in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthProvider {
    inner: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Default)]
struct ProviderState {
    session: Option<AuthSession>,
    subscribers: Vec<mpsc::UnboundedSender<AuthChange>>,
    /// When set, `sign_out` fails with this reason.
    sign_out_failure: Option<String>,
    /// When set, `current_session` fails with this reason.
    session_failure: Option<String>,
    /// Artificial delay before `current_session` answers.
    session_delay: Duration,
}

impl MemoryAuthProvider {
    /// A provider with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider where `identity` is already signed in, as if the user
    /// had logged in during a previous visit. No change is emitted.
    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::new();
        provider.state().session = Some(new_session(identity));
        provider
    }

    /// Signs `identity` in and emits [`AuthEvent::SignedIn`].
    pub fn sign_in(&self, identity: Identity) -> AuthSession {
        let session = new_session(identity);
        let mut state = self.state();
        state.session = Some(session.clone());
        broadcast(&mut state, AuthEvent::SignedIn);
        session
    }

    /// Drops the session as if the provider had expired it, emitting
    /// [`AuthEvent::SignedOut`].
    pub fn expire(&self) {
        let mut state = self.state();
        state.session = None;
        broadcast(&mut state, AuthEvent::SignedOut);
    }

    /// Emits `event` carrying the current session, e.g. a token refresh.
    pub fn emit(&self, event: AuthEvent) {
        broadcast(&mut self.state(), event);
    }

    /// Makes every following `sign_out` fail with `reason`, or succeed
    /// again with `None`.
    pub fn fail_sign_out(&self, reason: Option<&str>) {
        self.state().sign_out_failure = reason.map(str::to_owned);
    }

    /// Makes every following `current_session` fail with `reason`, or
    /// answer normally again with `None`.
    pub fn fail_current_session(&self, reason: Option<&str>) {
        self.state().session_failure = reason.map(str::to_owned);
    }

    /// Delays every following `current_session` call by `delay`.
    pub fn set_session_delay(&self, delay: Duration) {
        self.state().session_delay = delay;
    }

    /// The provider's current session.
    pub fn session(&self) -> Option<AuthSession> {
        self.state().session.clone()
    }

    /// Number of live subscriptions. Closed ones are pruned first.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthProvider for MemoryAuthProvider {
    async fn current_session(
        &self,
    ) -> Result<Option<AuthSession>, SessionError> {
        let delay = self.state().session_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let state = self.state();
        match &state.session_failure {
            Some(reason) => Err(SessionError::Provider(reason.clone())),
            None => Ok(state.session.clone()),
        }
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        let mut state = self.state();
        if let Some(reason) = &state.sign_out_failure {
            return Err(SessionError::Provider(reason.clone()));
        }
        state.session = None;
        broadcast(&mut state, AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().subscribers.push(tx);
        rx
    }
}

/// Sends `event` with the current session to every subscriber, pruning
/// the ones that hung up.
fn broadcast(state: &mut ProviderState, event: AuthEvent) {
    let change = AuthChange {
        event,
        session: state.session.clone(),
    };
    state
        .subscribers
        .retain(|tx| tx.send(change.clone()).is_ok());
}

fn new_session(identity: Identity) -> AuthSession {
    AuthSession {
        identity,
        access_token: generate_token(),
        expires_at: None,
    }
}

/// A random 32-character hex access token (128 bits).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

/// A profile backend backed by a map from email to profile.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    profiles: HashMap<String, Profile>,
    latency: HashMap<String, Duration>,
    default_latency: Duration,
    failing: bool,
    lookups: usize,
}

impl MemoryDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory pre-filled with `profiles`.
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let directory = Self::new();
        for profile in profiles {
            directory.insert(profile);
        }
        directory
    }

    /// Adds or replaces the profile registered under its email.
    pub fn insert(&self, profile: Profile) {
        self.state().profiles.insert(profile.email.clone(), profile);
    }

    /// Removes the profile registered under `email`.
    pub fn remove(&self, email: &str) -> Option<Profile> {
        self.state().profiles.remove(email)
    }

    /// Delays lookups for `email` by `latency`.
    pub fn set_latency(&self, email: &str, latency: Duration) {
        self.state().latency.insert(email.to_owned(), latency);
    }

    /// Delays lookups for emails without their own latency.
    pub fn set_default_latency(&self, latency: Duration) {
        self.state().default_latency = latency;
    }

    /// Makes every following lookup fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// How many lookups have been started.
    pub fn lookups(&self) -> usize {
        self.state().lookups
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileDirectory for MemoryDirectory {
    /// The answer is decided when the lookup starts; latency only delays
    /// its delivery. A slow lookup therefore returns the data as it was
    /// when it was issued.
    async fn profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Profile>, SessionError> {
        let (answer, latency) = {
            let mut state = self.state();
            state.lookups += 1;
            let answer = if state.failing {
                Err(SessionError::Directory(format!(
                    "lookup for {email} failed"
                )))
            } else {
                Ok(state.profiles.get(email).cloned())
            };
            let latency = state
                .latency
                .get(email)
                .copied()
                .unwrap_or(state.default_latency);
            (answer, latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        answer
    }
}
