//! A scripted walk through a Campus session, entirely in memory.
//!
//! Run with `cargo run -p portal [config.json]`, optionally with
//! `RUST_LOG=debug` to watch the store's decisions.

use std::time::Duration;

use campus::prelude::*;

// ---------------------------------------------------------------------------
// Pretend backend
// ---------------------------------------------------------------------------

fn directory() -> MemoryDirectory {
    let profile = |id, name: &str, email: &str, role: Role| Profile {
        id: UserId(id),
        name: name.into(),
        email: email.into(),
        role_id: Some(role.id()),
    };
    let directory = MemoryDirectory::with_profiles([
        profile(1, "Ada", "ada@campus.test", Role::Admin),
        profile(2, "Grace", "grace@campus.test", Role::Instructor),
        profile(3, "Sam", "sam@campus.test", Role::Student),
    ]);
    directory.set_default_latency(Duration::from_millis(150));
    directory
}

fn load_config() -> Result<CampusConfig, CampusError> {
    let config = match std::env::args().nth(1) {
        Some(path) => CampusConfig::from_json_file(path)?,
        None => CampusConfig::default(),
    };
    config.apply_env()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), CampusError> {
    campus::init_tracing();

    let config = load_config()?;
    let provider = MemoryAuthProvider::new();
    let directory = directory();
    let portal = Portal::start(config, provider.clone(), directory.clone())?;

    // The UI side: print every toast and navigation the store asks for.
    let mut notices = portal.session().notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match serde_json::to_string(&notice) {
                Ok(json) => println!("notice   {json}"),
                Err(e) => tracing::warn!(error = %e, "unprintable notice"),
            }
        }
    });

    // Two protected pages, each following the session on its own.
    for (page, roles) in [
        ("/admin/dashboard", vec![Role::Admin]),
        ("/courses/grading", vec![Role::Admin, Role::Instructor]),
    ] {
        let mut watcher = portal.watch(roles)?;
        tokio::spawn(async move {
            while let Some(decision) = watcher.next().await {
                println!("{page:<18} {decision:?}");
            }
        });
    }

    let snapshot = portal.session().loaded().await?;
    println!("loaded   signed_in={}", snapshot.is_authenticated());

    println!("-- Sam (student) signs in");
    provider.sign_in(Identity::new("auth-sam", "sam@campus.test"));
    settle().await;

    println!("-- Grace (instructor) signs in on the same device");
    provider.sign_in(Identity::new("auth-grace", "grace@campus.test"));
    settle().await;

    println!("-- Grace is promoted to admin in the backend");
    directory.insert(Profile {
        id: UserId(2),
        name: "Grace".into(),
        email: "grace@campus.test".into(),
        role_id: Some(Role::Admin.id()),
    });
    portal.session().refresh_profile().await?;
    settle().await;

    println!("-- Grace signs out");
    portal.session().sign_out().await?;
    settle().await;

    portal.shutdown().await
}

/// Gives the printers and any slow lookups time to catch up.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}
