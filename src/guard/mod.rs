//! Route guards.
//!
//! ARCHITECTURE
//! ============
//! A guard is mounted on a [`RouteScope`] and owns one task. The task watches
//! the actor identity (through its own `SessionTracker`) and the router's
//! location, publishes an access state on a `watch` channel, and sends one
//! [`NavigationIntent`] each time it enters a denied state. Dropping the guard
//! is unmounting it: the task is aborted and nothing is written afterwards.
//!
//! The two guards stay separate types because their denials differ: the
//! authenticated-only guard always sends the visitor to login with a resume
//! path, the team guard sends a signed-in visitor without a team role home
//! with nothing carried forward.
//!
//! The decision tables (`decide_authenticated`, `decide_team`) are pure so
//! they can be tested without tasks.

pub mod authenticated;
pub mod team;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::identity::IdentityProvider;
use crate::identity::tracker::ActorIdentity;
use crate::navigation::{NavigationIntent, RouteScope, pathname};
use crate::roles::RoleStore;
use crate::roles::resolver::{RoleCache, RoleResolver};

/// Collaborators handed to every guard at mount time.
#[derive(Clone)]
pub struct GuardContext {
    pub identity: Arc<dyn IdentityProvider>,
    pub roles: Arc<dyn RoleStore>,
    pub role_cache: RoleCache,
    /// Where denied guards send their redirect instruction.
    pub redirects: mpsc::UnboundedSender<NavigationIntent>,
}

impl GuardContext {
    #[must_use]
    pub fn role_resolver(&self) -> RoleResolver {
        RoleResolver::new(self.identity.clone(), self.roles.clone(), self.role_cache.clone())
    }
}

// =============================================================================
// STATES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    /// Render nothing.
    Pending,
    Granted,
    Denied { original_path: String },
}

impl AccessState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub fn intent(&self) -> Option<NavigationIntent> {
        match self {
            Self::Pending => None,
            Self::Granted => Some(NavigationIntent::allow()),
            Self::Denied { original_path } => Some(NavigationIntent::login(original_path.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamAccessState {
    /// Render nothing until both identity and roles are known.
    Pending,
    Granted,
    DeniedUnauthenticated { original_path: String },
    DeniedUnauthorized,
}

impl TeamAccessState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub fn intent(&self) -> Option<NavigationIntent> {
        match self {
            Self::Pending => None,
            Self::Granted => Some(NavigationIntent::allow()),
            Self::DeniedUnauthenticated { original_path } => Some(NavigationIntent::login(original_path.clone())),
            Self::DeniedUnauthorized => Some(NavigationIntent::home()),
        }
    }
}

/// Progress of the team guard's role query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAnswer {
    Pending,
    Resolved(bool),
}

// =============================================================================
// DECISION TABLES
// =============================================================================

#[must_use]
pub fn decide_authenticated(identity: &ActorIdentity, location: &str) -> AccessState {
    if identity.is_resolving {
        return AccessState::Pending;
    }
    match identity.actor_id {
        Some(_) => AccessState::Granted,
        None => AccessState::Denied { original_path: pathname(location).to_owned() },
    }
}

/// Joint wait: nothing is decided while either identity or roles are pending.
#[must_use]
pub fn decide_team(identity: &ActorIdentity, roles: RoleAnswer, location: &str) -> TeamAccessState {
    if identity.is_resolving {
        return TeamAccessState::Pending;
    }
    let RoleAnswer::Resolved(held) = roles else {
        return TeamAccessState::Pending;
    };
    match (&identity.actor_id, held) {
        (None, _) => TeamAccessState::DeniedUnauthenticated { original_path: pathname(location).to_owned() },
        (Some(_), true) => TeamAccessState::Granted,
        (Some(_), false) => TeamAccessState::DeniedUnauthorized,
    }
}

// =============================================================================
// SHARED TASK PLUMBING
// =============================================================================

/// Publish `next` if it differs from the current state, sending its redirect
/// on entry to a denied state. Returns whether the state changed.
fn settle<S>(
    state: &watch::Sender<S>,
    redirects: &mpsc::UnboundedSender<NavigationIntent>,
    scope: &RouteScope,
    next: S,
    intent: Option<NavigationIntent>,
) -> bool
where
    S: PartialEq + std::fmt::Debug,
{
    let changed = state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        tracing::debug!(scope = scope.as_str(), from = ?current, to = ?next, "guard transition");
        *current = next;
        true
    });
    if changed {
        if let Some(intent) = intent.filter(|intent| intent.href().is_some()) {
            // The orchestrator may already be gone; nothing to redirect then.
            let _ = redirects.send(intent);
        }
    }
    changed
}

/// Wait on a guard's state channel for the first non-pending state.
async fn first_settled<S, F>(mut rx: watch::Receiver<S>, is_pending: F) -> Option<S>
where
    S: Clone,
    F: Fn(&S) -> bool,
{
    rx.wait_for(|state| !is_pending(state)).await.ok().map(|state| state.clone())
}
