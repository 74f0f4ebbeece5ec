//! Identity Session Tracker.
//!
//! DESIGN
//! ======
//! The change subscription and the one-time fetch race into a single `watch`
//! slot. The actor is last-write-wins; `is_resolving` only ever moves from
//! `true` to `false`, on whichever channel answers first. A subscription that
//! lagged behind the bus triggers a fresh fetch, since a missed sign-out would
//! otherwise leave the old actor in place.
//!
//! CANCELLATION
//! ============
//! Dropping the tracker aborts its task. A fetch still in flight is dropped
//! with it, so a late answer never lands in torn-down state.

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ActorId, AuthNotice, AuthSubscription, IdentityProvider};

/// Live view of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorIdentity {
    pub actor_id: Option<ActorId>,
    /// True until the provider has answered once on either channel.
    pub is_resolving: bool,
}

impl ActorIdentity {
    #[must_use]
    pub fn resolving() -> Self {
        Self { actor_id: None, is_resolving: true }
    }

    #[must_use]
    pub fn resolved(actor_id: Option<ActorId>) -> Self {
        Self { actor_id, is_resolving: false }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        !self.is_resolving && self.actor_id.is_some()
    }
}

pub struct SessionTracker {
    state: watch::Receiver<ActorIdentity>,
    task: JoinHandle<()>,
}

impl SessionTracker {
    /// Subscribe to the provider and start the one-time fetch.
    ///
    /// The subscription is registered before the fetch is issued so no change
    /// published in between is lost.
    #[must_use]
    pub fn activate(provider: Arc<dyn IdentityProvider>) -> Self {
        let subscription = provider.subscribe();
        let (tx, rx) = watch::channel(ActorIdentity::resolving());
        let task = tokio::spawn(track(provider, subscription, tx));
        Self { state: rx, task }
    }

    #[must_use]
    pub fn snapshot(&self) -> ActorIdentity {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ActorIdentity> {
        self.state.clone()
    }

    /// Wait for the first answer from the provider.
    pub async fn resolved(&self) -> ActorIdentity {
        let mut rx = self.state.clone();
        match rx.wait_for(|state| !state.is_resolving).await {
            Ok(state) => state.clone(),
            Err(_) => ActorIdentity::resolved(None),
        }
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn publish(tx: &watch::Sender<ActorIdentity>, actor_id: Option<ActorId>) {
    let next = ActorIdentity::resolved(actor_id);
    tx.send_if_modified(|state| {
        if *state == next {
            return false;
        }
        *state = next;
        true
    });
}

async fn track(
    provider: Arc<dyn IdentityProvider>,
    mut subscription: AuthSubscription,
    tx: watch::Sender<ActorIdentity>,
) {
    let fetch = provider.current_actor();
    tokio::pin!(fetch);
    let mut fetched = false;
    let mut subscribed = true;

    while !fetched || subscribed {
        tokio::select! {
            result = &mut fetch, if !fetched => {
                fetched = true;
                let actor = result.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "current actor fetch failed; treating as signed out");
                    None
                });
                publish(&tx, actor);
            }
            notice = subscription.recv(), if subscribed => match notice {
                Some(AuthNotice::Event(event)) => {
                    tracing::debug!(?event, "auth state change");
                    publish(&tx, event.actor().cloned());
                }
                Some(AuthNotice::Resync) => {
                    // Missed events may include a sign-out; ask the provider again.
                    fetch.set(provider.current_actor());
                    fetched = false;
                }
                None => subscribed = false,
            },
        }
    }

    // Keep the slot open for readers until every receiver is gone.
    tx.closed().await;
}
