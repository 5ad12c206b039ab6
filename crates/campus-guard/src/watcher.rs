//! Reactive guard evaluation.
//!
//! A page doesn't evaluate its guard once: identity, profile and
//! `loading` keep changing as the session store works. [`GuardWatcher`]
//! re-evaluates on every published snapshot and reports only decisions
//! that differ from the last one, which is exactly when a page has to
//! swap its spinner, render, or navigate away.

use campus_session::SessionSnapshot;
use tokio::sync::watch;

use crate::{GuardDecision, RouteGuard};

/// Follows a session store's snapshots through one guard.
pub struct GuardWatcher {
    guard: RouteGuard,
    snapshots: watch::Receiver<SessionSnapshot>,
    last: Option<GuardDecision>,
}

impl GuardWatcher {
    pub(crate) fn new(
        guard: RouteGuard,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            guard,
            snapshots,
            last: None,
        }
    }

    /// The decision for the latest snapshot, without waiting.
    pub fn current(&self) -> GuardDecision {
        self.guard.evaluate(&self.snapshots.borrow())
    }

    /// Waits for the next changed decision.
    ///
    /// The first call returns the current decision immediately. After
    /// that, snapshots that don't change the outcome are skipped.
    /// Returns `None` once the session store has stopped.
    pub async fn next(&mut self) -> Option<GuardDecision> {
        if self.last.is_none() {
            let decision = self.guard.evaluate(&self.snapshots.borrow_and_update());
            self.last = Some(decision.clone());
            return Some(decision);
        }

        loop {
            self.snapshots.changed().await.ok()?;
            let decision =
                self.guard.evaluate(&self.snapshots.borrow_and_update());
            if self.last.as_ref() != Some(&decision) {
                self.last = Some(decision.clone());
                return Some(decision);
            }
        }
    }

    /// Waits until the guard settles on something other than
    /// [`GuardDecision::Pending`] and returns it.
    pub async fn settled(&mut self) -> Option<GuardDecision> {
        loop {
            match self.next().await? {
                GuardDecision::Pending => continue,
                decision => return Some(decision),
            }
        }
    }
}
