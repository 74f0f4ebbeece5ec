//! Guard admitting signed-in actors who hold one of an allow-listed set of
//! roles.
//!
//! The role query starts at mount alongside the identity tracker and restarts
//! on every identity or location change. A restart drops the previous query
//! future, so a stale answer can never decide a newer evaluation.

#[cfg(test)]
#[path = "team_test.rs"]
mod tests;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{GuardContext, RoleAnswer, TeamAccessState, decide_team, first_settled, settle};
use crate::identity::tracker::{ActorIdentity, SessionTracker};
use crate::navigation::{NavigationIntent, RouteScope};
use crate::roles::RoleSet;
use crate::roles::resolver::RoleResolver;

pub struct TeamGuard {
    state: watch::Receiver<TeamAccessState>,
    task: JoinHandle<()>,
}

impl TeamGuard {
    /// Mount on `scope` admitting holders of any role in `allowed`.
    #[must_use]
    pub fn mount(ctx: &GuardContext, scope: RouteScope, allowed: RoleSet, location: watch::Receiver<String>) -> Self {
        let tracker = SessionTracker::activate(ctx.identity.clone());
        let identity = tracker.watch();
        let resolver = ctx.role_resolver();
        let redirects = ctx.redirects.clone();
        let (tx, rx) = watch::channel(TeamAccessState::Pending);

        let task = tokio::spawn(async move {
            let _tracker = tracker;
            run(identity, location, scope, resolver, allowed, tx, redirects).await;
        });

        Self { state: rx, task }
    }

    #[must_use]
    pub fn state(&self) -> TeamAccessState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<TeamAccessState> {
        self.state.clone()
    }

    #[must_use]
    pub fn renders_subtree(&self) -> bool {
        self.state.borrow().is_granted()
    }

    /// First decided state; `Pending` if the guard stopped before deciding.
    pub async fn settled(&self) -> TeamAccessState {
        first_settled(self.state.clone(), TeamAccessState::is_pending)
            .await
            .unwrap_or(TeamAccessState::Pending)
    }
}

impl Drop for TeamGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut identity: watch::Receiver<ActorIdentity>,
    mut location: watch::Receiver<String>,
    scope: RouteScope,
    resolver: RoleResolver,
    allowed: RoleSet,
    tx: watch::Sender<TeamAccessState>,
    redirects: mpsc::UnboundedSender<NavigationIntent>,
) {
    let mut roles = RoleAnswer::Pending;
    let mut query: BoxFuture<'_, bool> = resolver.has_any(&allowed).boxed();
    let mut querying = true;

    loop {
        let next = {
            let actor = identity.borrow_and_update();
            let here = location.borrow_and_update();
            if scope.contains(&here) { decide_team(&actor, roles, &here) } else { TeamAccessState::Pending }
        };
        let intent = next.intent();
        settle(&tx, &redirects, &scope, next, intent);

        tokio::select! {
            held = &mut query, if querying => {
                querying = false;
                roles = RoleAnswer::Resolved(held);
            }
            changed = identity.changed() => {
                if changed.is_err() {
                    break;
                }
                roles = RoleAnswer::Pending;
                query = resolver.has_any(&allowed).boxed();
                querying = true;
            }
            changed = location.changed() => {
                if changed.is_err() {
                    break;
                }
                roles = RoleAnswer::Pending;
                query = resolver.has_any(&allowed).boxed();
                querying = true;
            }
        }
    }
}
