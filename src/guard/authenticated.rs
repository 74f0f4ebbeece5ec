//! Guard admitting any signed-in actor.

#[cfg(test)]
#[path = "authenticated_test.rs"]
mod tests;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{AccessState, GuardContext, decide_authenticated, first_settled, settle};
use crate::identity::tracker::{ActorIdentity, SessionTracker};
use crate::navigation::{NavigationIntent, RouteScope};

pub struct AuthenticatedGuard {
    state: watch::Receiver<AccessState>,
    task: JoinHandle<()>,
}

impl AuthenticatedGuard {
    /// Mount on `scope`, following the router's `location`.
    #[must_use]
    pub fn mount(ctx: &GuardContext, scope: RouteScope, location: watch::Receiver<String>) -> Self {
        let tracker = SessionTracker::activate(ctx.identity.clone());
        let identity = tracker.watch();
        let redirects = ctx.redirects.clone();
        let (tx, rx) = watch::channel(AccessState::Pending);

        let task = tokio::spawn(async move {
            // The tracker lives exactly as long as this task.
            let _tracker = tracker;
            run(identity, location, scope, tx, redirects).await;
        });

        Self { state: rx, task }
    }

    #[must_use]
    pub fn state(&self) -> AccessState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AccessState> {
        self.state.clone()
    }

    /// Whether the guarded subtree may render right now.
    #[must_use]
    pub fn renders_subtree(&self) -> bool {
        self.state.borrow().is_granted()
    }

    /// First decided state; `Pending` if the guard stopped before deciding.
    pub async fn settled(&self) -> AccessState {
        first_settled(self.state.clone(), AccessState::is_pending)
            .await
            .unwrap_or(AccessState::Pending)
    }
}

impl Drop for AuthenticatedGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut identity: watch::Receiver<ActorIdentity>,
    mut location: watch::Receiver<String>,
    scope: RouteScope,
    tx: watch::Sender<AccessState>,
    redirects: mpsc::UnboundedSender<NavigationIntent>,
) {
    loop {
        let next = {
            let actor = identity.borrow_and_update();
            let here = location.borrow_and_update();
            if scope.contains(&here) { decide_authenticated(&actor, &here) } else { AccessState::Pending }
        };
        let intent = next.intent();
        settle(&tx, &redirects, &scope, next, intent);

        tokio::select! {
            changed = identity.changed() => if changed.is_err() { break },
            changed = location.changed() => if changed.is_err() { break },
        }
    }
}
