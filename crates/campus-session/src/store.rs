//! Session store actor: one Tokio task that owns the session record.
//!
//! The store follows the actor model: a single task owns the mutable
//! record (`identity`, `profile`, `loading`) and everything else talks
//! to it through channels. Three kinds of input drive it:
//!
//! ```text
//!   SessionHandle ──(StoreCommand)──┐
//!   AuthProvider ──(AuthChange)─────┼──→ SessionActor ──(watch)──→ snapshots
//!   spawned tasks ──(Completion)────┘         │
//!                                             └──(broadcast)──→ notices
//! ```
//!
//! Anything slow (reading the initial session, fetching a profile,
//! signing out) runs in its own spawned task and reports back as a
//! `Completion`, so the actor never blocks on the network.
//!
//! # Request sequencing
//!
//! Every profile fetch gets the next number from a counter. Starting a
//! fetch aborts the one before it, and a completion whose number isn't
//! the latest is dropped. A slow response for an old identity can
//! therefore never overwrite a newer one.

use std::sync::Arc;

use campus_identity::{AuthChange, AuthSession, Identity, Profile};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::{
    AuthProvider, Notice, ProfileCache, ProfileDirectory, SessionError,
    SessionSnapshot, StoreConfig,
};

/// Where the UI is sent after signing out.
const HOME_PATH: &str = "/";

/// Commands sent from a [`SessionHandle`] to the actor.
///
/// Each carries a reply channel that fires once the command's effect is
/// visible in the published snapshot.
enum StoreCommand {
    SignOut { reply: oneshot::Sender<()> },
    RefreshProfile { reply: oneshot::Sender<()> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Results reported back to the actor by the tasks it spawned.
enum Completion {
    Initialized(Result<Option<AuthSession>, SessionError>),
    ProfileFetched {
        request: u64,
        email: String,
        result: Result<Option<Profile>, SessionError>,
    },
    SignedOut {
        result: Result<(), SessionError>,
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session store.
///
/// Cheap to clone. The store keeps running while at least one handle is
/// alive, or until [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<StoreCommand>,
    state: watch::Receiver<SessionSnapshot>,
    /// Only the actor holds the sender, so subscribers see `Closed` once
    /// it stops. This receiver is never read; it only mints new ones.
    notices: Arc<broadcast::Receiver<Notice>>,
}

impl SessionHandle {
    /// The latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver that wakes on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Subscribes to toasts and navigation requests. Only notices sent
    /// after this call are delivered. The receiver reports
    /// [`RecvError::Closed`](broadcast::error::RecvError::Closed) once the
    /// store has stopped.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.resubscribe()
    }

    /// Waits until `loading` is off and returns that snapshot.
    ///
    /// Resolves at the latest after the configured loading timeout.
    pub async fn loaded(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| !s.loading)
            .await
            .map_err(|_| SessionError::Unavailable)?
            .clone();
        Ok(snapshot)
    }

    /// Signs out.
    ///
    /// Local state (identity, profile, cached record) is cleared whether
    /// or not the provider call succeeds. The outcome is reported as a
    /// toast notice followed by a navigation to `/`. Resolves once the
    /// provider has answered.
    ///
    /// # Errors
    /// Only [`SessionError::Unavailable`], if the store has stopped.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::SignOut { reply }).await
    }

    /// Re-fetches the profile for the current identity's email.
    ///
    /// Resolves once that fetch has settled (applied, failed, or been
    /// overtaken by a newer one). Without an email this is a no-op.
    ///
    /// # Errors
    /// Only [`SessionError::Unavailable`], if the store has stopped.
    pub async fn refresh_profile(&self) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::RefreshProfile { reply })
            .await
    }

    /// Stops the store: unsubscribes from the provider, aborts in-flight
    /// fetches and ends the actor task. Resolves after teardown.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| StoreCommand::Shutdown { reply }).await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<()>) -> StoreCommand,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// SessionActor
// ---------------------------------------------------------------------------

struct SessionActor<P, D, C> {
    provider: Arc<P>,
    directory: Arc<D>,
    cache: C,
    config: StoreConfig,

    /// The one mutable session record.
    record: SessionSnapshot,
    state_tx: watch::Sender<SessionSnapshot>,
    notices: broadcast::Sender<Notice>,

    receiver: mpsc::Receiver<StoreCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,

    /// Number of the most recently issued profile fetch. Completions
    /// carrying any other number are stale.
    latest_request: u64,
    in_flight: Option<JoinHandle<()>>,
    /// `refresh_profile` callers, keyed by the request they wait for.
    refresh_waiters: Vec<(u64, oneshot::Sender<()>)>,

    /// Set once any auth change has been handled. A slower initial
    /// session read must not overwrite what a change already told us.
    saw_change: bool,
}

impl<P, D, C> SessionActor<P, D, C>
where
    P: AuthProvider,
    D: ProfileDirectory,
    C: ProfileCache,
{
    async fn run(mut self) {
        tracing::info!(
            timeout_ms = self.config.loading_timeout.as_millis() as u64,
            "session store started"
        );

        // Subscribe before reading the initial session so no change
        // between the two is missed.
        let mut changes = self.provider.subscribe();
        let mut changes_open = true;
        self.spawn_init();

        let timeout = time::sleep(self.config.loading_timeout);
        tokio::pin!(timeout);

        let shutdown_reply = loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(StoreCommand::SignOut { reply }) => self.sign_out(reply),
                    Some(StoreCommand::RefreshProfile { reply }) => {
                        self.refresh_profile(reply)
                    }
                    Some(StoreCommand::Shutdown { reply }) => break Some(reply),
                    None => break None,
                },
                change = changes.recv(), if changes_open => match change {
                    Some(change) => self.handle_change(change),
                    None => {
                        changes_open = false;
                        tracing::warn!("auth provider closed its change stream");
                    }
                },
                Some(done) = self.completions_rx.recv() => {
                    self.handle_completion(done);
                }
                () = &mut timeout, if self.record.loading => {
                    tracing::warn!(
                        timeout_ms = self.config.loading_timeout.as_millis() as u64,
                        "session still loading after timeout, forcing loading off"
                    );
                    self.record.loading = false;
                }
            }
            self.publish();
        };

        drop(changes);
        self.cancel_fetch();
        tracing::info!("session store stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    // -- Initialization ---------------------------------------------------

    fn spawn_init(&self) {
        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = provider.current_session().await;
            let _ = tx.send(Completion::Initialized(result));
        });
    }

    fn handle_initialized(
        &mut self,
        result: Result<Option<AuthSession>, SessionError>,
    ) {
        match result {
            Ok(session) if !self.saw_change => {
                tracing::debug!(
                    signed_in = session.is_some(),
                    "initial session read"
                );
                self.apply_identity(session.map(|s| s.identity));
            }
            Ok(_) => {
                tracing::debug!(
                    "initial session superseded by a newer auth change"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read initial session");
                if !self.saw_change {
                    self.apply_identity(None);
                }
            }
        }
        self.record.loading = false;
    }

    // -- Auth changes -----------------------------------------------------

    fn handle_change(&mut self, change: AuthChange) {
        tracing::info!(
            event = %change.event,
            signed_in = change.session.is_some(),
            "auth state changed"
        );
        self.saw_change = true;
        self.apply_identity(change.session.map(|s| s.identity));
        self.record.loading = false;
    }

    /// The cache-then-fetch sequence shared by init and every change.
    fn apply_identity(&mut self, identity: Option<Identity>) {
        let email = identity
            .as_ref()
            .and_then(Identity::email)
            .map(str::to_owned);
        self.record.identity = identity;

        let Some(email) = email else {
            self.record.profile = None;
            self.clear_cache();
            self.cancel_fetch();
            return;
        };

        // A profile always belongs to the identity it is shown with.
        if self
            .record
            .profile
            .as_ref()
            .is_some_and(|p| !p.belongs_to(&email))
        {
            self.record.profile = None;
        }

        if let Some(cached) = self.read_cache() {
            if cached.belongs_to(&email) {
                tracing::debug!(%email, "applied cached profile");
                self.record.profile = Some(cached);
            }
        }

        self.start_fetch(email);
    }

    // -- Profile fetches --------------------------------------------------

    fn start_fetch(&mut self, email: String) -> u64 {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.latest_request += 1;
        let request = self.latest_request;

        tracing::debug!(request, %email, "fetching profile");

        let directory = Arc::clone(&self.directory);
        let tx = self.completions_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = directory.profile_by_email(&email).await;
            let _ = tx.send(Completion::ProfileFetched {
                request,
                email,
                result,
            });
        }));
        request
    }

    /// Aborts any in-flight fetch and invalidates its number, in case its
    /// completion is already queued.
    fn cancel_fetch(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.latest_request += 1;
        self.settle_waiters(u64::MAX);
    }

    fn handle_profile_fetched(
        &mut self,
        request: u64,
        email: String,
        result: Result<Option<Profile>, SessionError>,
    ) {
        if request != self.latest_request {
            tracing::debug!(
                request,
                latest = self.latest_request,
                %email,
                "discarding stale profile response"
            );
            return;
        }
        self.in_flight = None;

        match result {
            Ok(Some(profile)) if !profile.belongs_to(&email) => {
                tracing::warn!(
                    %email,
                    returned = %profile.email,
                    "directory returned a profile for another email, ignoring"
                );
            }
            Ok(Some(profile)) if self.record.email() == Some(email.as_str()) => {
                if let Err(e) = self.cache.store(&profile) {
                    tracing::warn!(error = %e, "failed to cache profile");
                }
                tracing::info!(
                    %email,
                    user_id = %profile.id,
                    role_id = ?profile.role_id,
                    "profile loaded"
                );
                self.record.profile = Some(profile);
            }
            Ok(Some(_)) => {
                tracing::debug!(%email, "identity changed during fetch, discarding");
            }
            Ok(None) => {
                tracing::warn!(%email, "no profile registered for identity");
            }
            Err(e) => {
                tracing::warn!(
                    %email,
                    error = %e,
                    "profile fetch failed, keeping previous state"
                );
            }
        }

        self.settle_waiters(request);
    }

    fn refresh_profile(&mut self, reply: oneshot::Sender<()>) {
        let Some(email) = self.record.email().map(str::to_owned) else {
            tracing::debug!("profile refresh without an email, ignoring");
            let _ = reply.send(());
            return;
        };
        let request = self.start_fetch(email);
        self.refresh_waiters.push((request, reply));
    }

    /// Wakes every refresh caller waiting on a request numbered `upto` or
    /// lower. Publishes first so they observe the result.
    fn settle_waiters(&mut self, upto: u64) {
        if self.refresh_waiters.is_empty() {
            return;
        }
        self.publish();
        let (done, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.refresh_waiters)
                .into_iter()
                .partition(|(request, _)| *request <= upto);
        self.refresh_waiters = pending;
        for (_, reply) in done {
            let _ = reply.send(());
        }
    }

    // -- Sign-out ---------------------------------------------------------

    fn sign_out(&mut self, reply: oneshot::Sender<()>) {
        tracing::info!(email = ?self.record.email(), "signing out");

        // Cleared up front: the user asked to leave, and a provider
        // failure must not leave their profile on screen.
        self.record.identity = None;
        self.record.profile = None;
        self.clear_cache();
        self.cancel_fetch();

        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = provider.sign_out().await;
            let _ = tx.send(Completion::SignedOut { result, reply });
        });
    }

    fn handle_signed_out(
        &mut self,
        result: Result<(), SessionError>,
        reply: oneshot::Sender<()>,
    ) {
        match result {
            Ok(()) => {
                tracing::info!("signed out");
                self.notify(Notice::success("Signed out successfully"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "provider sign-out failed");
                self.notify(Notice::error(format!("Error signing out: {e}")));
            }
        }
        self.notify(Notice::navigate(HOME_PATH));
        self.publish();
        let _ = reply.send(());
    }

    // -- Plumbing ---------------------------------------------------------

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Initialized(result) => self.handle_initialized(result),
            Completion::ProfileFetched {
                request,
                email,
                result,
            } => self.handle_profile_fetched(request, email, result),
            Completion::SignedOut { result, reply } => {
                self.handle_signed_out(result, reply)
            }
        }
    }

    /// Reads the cached profile. A corrupt record is removed and treated
    /// as absent.
    fn read_cache(&self) -> Option<Profile> {
        match self.cache.load() {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cached profile");
                self.clear_cache();
                None
            }
        }
    }

    fn clear_cache(&self) {
        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, "failed to clear cached profile");
        }
    }

    fn publish(&self) {
        let next = &self.record;
        self.state_tx.send_if_modified(|current| {
            if current != next {
                *current = next.clone();
                true
            } else {
                false
            }
        });
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine; nobody is showing toasts.
        let _ = self.notices.send(notice);
    }
}

/// Spawns a session store and returns a handle to it.
///
/// Must be called from within a Tokio runtime. The store immediately
/// subscribes to `provider`, reads its current session, and arms the
/// loading timeout from `config`.
pub fn spawn_session_store<P, D, C>(
    provider: P,
    directory: D,
    cache: C,
    config: StoreConfig,
) -> SessionHandle
where
    P: AuthProvider,
    D: ProfileDirectory,
    C: ProfileCache,
{
    let (sender, receiver) = mpsc::channel(config.command_channel_size.max(1));
    let (state_tx, state_rx) = watch::channel(SessionSnapshot::initial());
    let (notices_tx, notices_rx) =
        broadcast::channel(config.notice_capacity.max(1));
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();

    let actor = SessionActor {
        provider: Arc::new(provider),
        directory: Arc::new(directory),
        cache,
        config,
        record: SessionSnapshot::initial(),
        state_tx,
        notices: notices_tx,
        receiver,
        completions_tx,
        completions_rx,
        latest_request: 0,
        in_flight: None,
        refresh_waiters: Vec::new(),
        saw_change: false,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        sender,
        state: state_rx,
        notices: Arc::new(notices_rx),
    }
}
