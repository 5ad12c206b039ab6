//! Integration tests for the session store actor.
//!
//! Every test runs on a paused Tokio clock (`start_paused = true`), so
//! provider delays, directory latency and the loading timeout all resolve
//! instantly and in a fixed order.

use std::time::Duration;

use campus_identity::{
    AuthEvent, AuthSession, Identity, Profile, RoleId, UserId, decode_profile,
};
use campus_session::{
    AuthProvider, AuthSubscription, MemoryAuthProvider, MemoryCache,
    MemoryDirectory, Notice, ProfileDirectory, SessionError, SessionHandle,
    SessionSnapshot, StoreConfig, ToastLevel, spawn_session_store,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, sleep};

// =========================================================================
// Helpers
// =========================================================================

const ADA: &str = "ada@example.edu";
const GRACE: &str = "grace@example.edu";

fn identity(email: &str) -> Identity {
    Identity::new(format!("id-{email}"), email)
}

fn profile(id: u64, email: &str, role: u32) -> Profile {
    Profile {
        id: UserId(id),
        name: email.split('@').next().unwrap_or_default().to_owned(),
        email: email.to_owned(),
        role_id: Some(RoleId(role)),
    }
}

/// Waits (on the paused clock) until a snapshot satisfies `pred`.
async fn wait_until(
    handle: &SessionHandle,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
        .await
        .expect("condition never reached")
        .expect("store stopped")
        .clone();
    snapshot
}

fn cached(cache: &MemoryCache) -> Option<Profile> {
    cache.raw().map(|raw| decode_profile(&raw).expect("valid record"))
}

struct Fixture {
    provider: MemoryAuthProvider,
    directory: MemoryDirectory,
    cache: MemoryCache,
    handle: SessionHandle,
}

fn spawn(
    provider: MemoryAuthProvider,
    directory: MemoryDirectory,
    cache: MemoryCache,
) -> Fixture {
    let handle = spawn_session_store(
        provider.clone(),
        directory.clone(),
        cache.clone(),
        StoreConfig::default(),
    );
    Fixture {
        provider,
        directory,
        cache,
        handle,
    }
}

/// A provider whose initial read is slow and frozen: after `delay` it
/// reports `initial`, whatever has happened since. Changes and sign-out
/// go through to the wrapped in-memory provider.
struct FrozenInitialProvider {
    inner: MemoryAuthProvider,
    initial: Identity,
    delay: Duration,
}

impl AuthProvider for FrozenInitialProvider {
    async fn current_session(&self) -> Result<Option<AuthSession>, SessionError> {
        sleep(self.delay).await;
        Ok(Some(AuthSession {
            identity: self.initial.clone(),
            access_token: "frozen".into(),
            expires_at: None,
        }))
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.inner.sign_out().await
    }

    fn subscribe(&self) -> AuthSubscription {
        self.inner.subscribe()
    }
}

/// A directory that answers every lookup with the same profile, whatever
/// email was asked for.
struct FixedDirectory(Profile);

impl ProfileDirectory for FixedDirectory {
    async fn profile_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<Profile>, SessionError> {
        Ok(Some(self.0.clone()))
    }
}

// =========================================================================
// Initialization
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawn_without_session_loads_signed_out_and_clears_cache() {
    let cache = MemoryCache::with_profile(&profile(1, ADA, 3)).unwrap();
    let f = spawn(MemoryAuthProvider::new(), MemoryDirectory::new(), cache);

    let snap = f.handle.loaded().await.unwrap();

    assert!(snap.identity.is_none());
    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none(), "no identity means no cached profile");
}

#[tokio::test(start_paused = true)]
async fn test_spawn_with_session_fetches_and_caches_profile() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 2)]),
        MemoryCache::new(),
    );

    let snap = wait_until(&f.handle, |s| s.profile.is_some()).await;

    assert_eq!(snap.email(), Some(ADA));
    assert_eq!(snap.role_id(), Some(RoleId(2)));
    assert_eq!(cached(&f.cache), Some(profile(1, ADA, 2)));
}

#[tokio::test(start_paused = true)]
async fn test_cached_profile_applied_before_fetch_resolves() {
    // Cache says student; the backend (slowly) says instructor.
    let directory = MemoryDirectory::with_profiles([profile(1, ADA, 2)]);
    directory.set_latency(ADA, Duration::from_secs(1));
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        directory,
        MemoryCache::with_profile(&profile(1, ADA, 3)).unwrap(),
    );

    let first = f.handle.loaded().await.unwrap();
    assert!(!first.loading);
    assert_eq!(first.role_id(), Some(RoleId(3)), "cache applied immediately");

    let fresh = wait_until(&f.handle, |s| s.role_id() == Some(RoleId(2))).await;
    assert_eq!(fresh.profile, Some(profile(1, ADA, 2)));
    assert_eq!(cached(&f.cache), Some(profile(1, ADA, 2)));
}

#[tokio::test(start_paused = true)]
async fn test_cached_profile_for_other_email_is_not_applied() {
    let directory = MemoryDirectory::with_profiles([profile(1, ADA, 2)]);
    directory.set_latency(ADA, Duration::from_secs(1));
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        directory,
        MemoryCache::with_profile(&profile(2, GRACE, 1)).unwrap(),
    );

    let first = f.handle.loaded().await.unwrap();

    assert!(first.identity.is_some());
    assert!(first.profile.is_none(), "grace's cached profile must not show for ada");
}

#[tokio::test(start_paused = true)]
async fn test_loading_timeout_forces_loading_off_when_provider_hangs() {
    let provider = MemoryAuthProvider::signed_in(identity(ADA));
    provider.set_session_delay(Duration::from_secs(60));
    let f = spawn(
        provider,
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    let start = Instant::now();

    let snap = f.handle.loaded().await.unwrap();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(5), "released too early: {waited:?}");
    assert!(waited < Duration::from_secs(60), "timeout did not fire: {waited:?}");
    assert!(snap.identity.is_none());

    // The slow provider eventually answers and the session catches up.
    let late = wait_until(&f.handle, |s| s.profile.is_some()).await;
    assert_eq!(late.email(), Some(ADA));
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_cache_record_is_removed() {
    let cache = MemoryCache::new();
    cache.put_raw("definitely not json");
    let directory = MemoryDirectory::with_profiles([profile(1, ADA, 3)]);
    directory.set_failing(true);
    let f = spawn(MemoryAuthProvider::signed_in(identity(ADA)), directory, cache);

    let snap = f.handle.loaded().await.unwrap();

    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_spawn_provider_failure_loads_signed_out_and_clears_cache() {
    let provider = MemoryAuthProvider::signed_in(identity(ADA));
    provider.fail_current_session(Some("provider down"));
    let f = spawn(
        provider,
        MemoryDirectory::with_profiles([profile(1, ADA, 1)]),
        MemoryCache::with_profile(&profile(1, ADA, 1)).unwrap(),
    );

    let snap = f.handle.loaded().await.unwrap();

    assert!(snap.identity.is_none());
    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none(), "failed init must not keep the record");
    assert_eq!(f.directory.lookups(), 0);
}

// =========================================================================
// Auth changes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_auth_change_before_initial_session_wins() {
    let inner = MemoryAuthProvider::new();
    let cache = MemoryCache::new();
    let handle = spawn_session_store(
        FrozenInitialProvider {
            inner: inner.clone(),
            initial: identity(ADA),
            delay: Duration::from_secs(3),
        },
        MemoryDirectory::with_profiles([profile(1, ADA, 3), profile(2, GRACE, 2)]),
        cache.clone(),
        StoreConfig::default(),
    );

    // Let the store subscribe, then sign in before the initial read lands.
    sleep(Duration::from_millis(10)).await;
    inner.sign_in(identity(GRACE));
    wait_until(&handle, |s| s.profile.is_some()).await;

    // Well past the initial read: it must not have replaced grace.
    sleep(Duration::from_secs(10)).await;
    let snap = handle.snapshot();
    assert_eq!(snap.email(), Some(GRACE));
    assert_eq!(snap.profile, Some(profile(2, GRACE, 2)));
    assert_eq!(cached(&cache), Some(profile(2, GRACE, 2)));
}

#[tokio::test(start_paused = true)]
async fn test_initial_session_failure_after_auth_change_keeps_identity() {
    let provider = MemoryAuthProvider::new();
    provider.set_session_delay(Duration::from_secs(3));
    let f = spawn(
        provider,
        MemoryDirectory::with_profiles([profile(2, GRACE, 2)]),
        MemoryCache::new(),
    );

    sleep(Duration::from_millis(10)).await;
    f.provider.sign_in(identity(GRACE));
    f.provider.fail_current_session(Some("provider down"));
    wait_until(&f.handle, |s| s.profile.is_some()).await;

    sleep(Duration::from_secs(10)).await;
    let snap = f.handle.snapshot();
    assert_eq!(snap.email(), Some(GRACE));
    assert_eq!(cached(&f.cache), Some(profile(2, GRACE, 2)));
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_change_loads_profile() {
    let f = spawn(
        MemoryAuthProvider::new(),
        MemoryDirectory::with_profiles([profile(1, ADA, 1)]),
        MemoryCache::new(),
    );
    f.handle.loaded().await.unwrap();

    f.provider.sign_in(identity(ADA));

    let snap = wait_until(&f.handle, |s| s.profile.is_some()).await;
    assert_eq!(snap.role_id(), Some(RoleId(1)));
    assert!(!snap.loading);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_clears_identity_profile_and_cache() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;

    f.provider.expire();

    let snap = wait_until(&f.handle, |s| s.identity.is_none()).await;
    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_switching_user_drops_previous_profile() {
    let directory =
        MemoryDirectory::with_profiles([profile(1, ADA, 1), profile(2, GRACE, 3)]);
    directory.set_latency(GRACE, Duration::from_secs(1));
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        directory,
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;

    f.provider.sign_in(identity(GRACE));

    // While grace's profile is in flight, ada's admin profile must be gone.
    let between = wait_until(&f.handle, |s| s.email() == Some(GRACE)).await;
    assert!(between.profile.is_none());

    let snap = wait_until(&f.handle, |s| s.profile.is_some()).await;
    assert_eq!(snap.profile, Some(profile(2, GRACE, 3)));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_fetches_latest_issued_wins() {
    // Fetch A (issued first) is slow and carries the old role.
    // Fetch B (issued 50ms later) is fast and carries the new role.
    let directory = MemoryDirectory::with_profiles([profile(1, ADA, 3)]);
    directory.set_latency(ADA, Duration::from_millis(200));
    let f = spawn(MemoryAuthProvider::new(), directory, MemoryCache::new());
    f.handle.loaded().await.unwrap();

    f.provider.sign_in(identity(ADA));
    sleep(Duration::from_millis(50)).await;
    f.directory.insert(profile(1, ADA, 2));
    f.directory.set_latency(ADA, Duration::from_millis(10));
    f.provider.emit(AuthEvent::TokenRefreshed);

    // Let both fetches run well past A's completion time.
    sleep(Duration::from_millis(500)).await;

    let snap = f.handle.snapshot();
    assert_eq!(snap.role_id(), Some(RoleId(2)), "older, slower fetch must not win");
    assert_eq!(cached(&f.cache), Some(profile(1, ADA, 2)));
    assert_eq!(f.directory.lookups(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_for_previous_user_is_discarded() {
    let directory =
        MemoryDirectory::with_profiles([profile(1, ADA, 1), profile(2, GRACE, 3)]);
    directory.set_latency(ADA, Duration::from_millis(300));
    directory.set_latency(GRACE, Duration::from_millis(10));
    let f = spawn(MemoryAuthProvider::new(), directory, MemoryCache::new());
    f.handle.loaded().await.unwrap();

    f.provider.sign_in(identity(ADA));
    sleep(Duration::from_millis(50)).await;
    f.provider.sign_in(identity(GRACE));
    sleep(Duration::from_secs(1)).await;

    let snap = f.handle.snapshot();
    assert_eq!(snap.email(), Some(GRACE));
    assert_eq!(snap.profile, Some(profile(2, GRACE, 3)));
}

#[tokio::test(start_paused = true)]
async fn test_profile_for_other_email_is_not_applied_or_cached() {
    let cache = MemoryCache::new();
    let handle = spawn_session_store(
        MemoryAuthProvider::signed_in(identity(ADA)),
        FixedDirectory(profile(1, "ADA@example.edu", 1)),
        cache.clone(),
        StoreConfig::default(),
    );

    handle.loaded().await.unwrap();
    handle.refresh_profile().await.unwrap();

    assert!(handle.snapshot().profile.is_none());
    assert!(cache.raw().is_none());
}

// =========================================================================
// refresh_profile()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_profile_without_email_is_noop() {
    let f = spawn(
        MemoryAuthProvider::new(),
        MemoryDirectory::new(),
        MemoryCache::new(),
    );
    f.handle.loaded().await.unwrap();

    f.handle.refresh_profile().await.unwrap();

    assert_eq!(f.directory.lookups(), 0);
    assert!(f.handle.snapshot().profile.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_profile_picks_up_backend_change() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;
    f.directory.insert(profile(1, ADA, 2));

    f.handle.refresh_profile().await.unwrap();

    // The refresh resolves only after its result is published.
    assert_eq!(f.handle.snapshot().role_id(), Some(RoleId(2)));
    assert_eq!(cached(&f.cache), Some(profile(1, ADA, 2)));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_keeps_previous_profile() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;

    f.directory.set_failing(true);
    f.handle.refresh_profile().await.unwrap();
    assert_eq!(f.handle.snapshot().role_id(), Some(RoleId(3)));

    f.directory.set_failing(false);
    f.directory.remove(ADA);
    f.handle.refresh_profile().await.unwrap();
    assert_eq!(
        f.handle.snapshot().role_id(),
        Some(RoleId(3)),
        "a missing profile also leaves the last known one in place"
    );
}

// =========================================================================
// sign_out()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_out_clears_state_and_notifies_success() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;
    let mut notices = f.handle.notices();

    f.handle.sign_out().await.unwrap();

    let snap = f.handle.snapshot();
    assert!(snap.identity.is_none());
    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none());
    assert!(f.provider.session().is_none());

    assert!(matches!(
        notices.recv().await.unwrap(),
        Notice::Toast { level: ToastLevel::Success, .. }
    ));
    assert_eq!(
        notices.recv().await.unwrap(),
        Notice::Navigate { path: "/".into() }
    );
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_provider_failure_still_clears_state() {
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        MemoryDirectory::with_profiles([profile(1, ADA, 3)]),
        MemoryCache::new(),
    );
    wait_until(&f.handle, |s| s.profile.is_some()).await;
    f.provider.fail_sign_out(Some("network down"));
    let mut notices = f.handle.notices();

    f.handle.sign_out().await.expect("provider failure is not returned");

    let snap = f.handle.snapshot();
    assert!(snap.identity.is_none());
    assert!(snap.profile.is_none());
    assert!(f.cache.raw().is_none());

    match notices.recv().await.unwrap() {
        Notice::Toast { level, message } => {
            assert_eq!(level, ToastLevel::Error);
            assert!(message.contains("network down"), "got: {message}");
        }
        other => panic!("expected error toast, got {other:?}"),
    }
    assert_eq!(
        notices.recv().await.unwrap(),
        Notice::Navigate { path: "/".into() }
    );
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_while_fetch_in_flight_never_shows_profile() {
    let directory = MemoryDirectory::with_profiles([profile(1, ADA, 1)]);
    directory.set_latency(ADA, Duration::from_millis(500));
    let f = spawn(
        MemoryAuthProvider::signed_in(identity(ADA)),
        directory,
        MemoryCache::new(),
    );
    f.handle.loaded().await.unwrap();

    f.handle.sign_out().await.unwrap();
    sleep(Duration::from_secs(1)).await;

    assert!(f.handle.snapshot().profile.is_none());
    assert!(f.cache.raw().is_none());
}

// =========================================================================
// shutdown()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_unsubscribes_and_invalidates_handle() {
    let f = spawn(
        MemoryAuthProvider::new(),
        MemoryDirectory::new(),
        MemoryCache::new(),
    );
    f.handle.loaded().await.unwrap();
    assert_eq!(f.provider.subscriber_count(), 1);

    f.handle.shutdown().await.unwrap();

    assert_eq!(f.provider.subscriber_count(), 0);
    assert!(matches!(
        f.handle.sign_out().await,
        Err(SessionError::Unavailable)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_notice_stream_while_handle_alive() {
    let f = spawn(
        MemoryAuthProvider::new(),
        MemoryDirectory::new(),
        MemoryCache::new(),
    );
    let mut notices = f.handle.notices();
    let handle_clone = f.handle.clone();

    f.handle.shutdown().await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(1), notices.recv()).await;
    assert!(matches!(closed, Ok(Err(RecvError::Closed))));
    drop(handle_clone);
}
