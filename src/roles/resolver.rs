//! Role Resolver: does the current actor hold at least one of these roles?
//!
//! ERROR HANDLING
//! ==============
//! There is no failure channel. An identity fetch error reads as "no actor"
//! and a failed per-role check reads as "not held", so an ambiguous answer can
//! never grant access. Answers that involved a failed check are not cached.
//!
//! CACHING
//! =======
//! Answers are memoized per `(actor, sorted role set)` for a short TTL. The
//! actor is always re-fetched from the Identity Provider first, so a sign-out
//! or actor switch can never be masked by a cached grant.

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;

use super::{Role, RoleSet, RoleStore};
use crate::identity::{ActorId, IdentityProvider};

// =============================================================================
// CACHE
// =============================================================================

struct CachedAnswer {
    held: bool,
    stored_at: Instant,
}

/// Short-lived memo of role answers, shared by every resolver in the process.
#[derive(Clone)]
pub struct RoleCache {
    entries: Arc<Mutex<HashMap<(ActorId, RoleSet), CachedAnswer>>>,
    ttl: Duration,
}

impl RoleCache {
    /// A zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(ActorId, RoleSet), CachedAnswer>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, actor: &ActorId, roles: &RoleSet) -> Option<bool> {
        if self.ttl.is_zero() {
            return None;
        }
        let key = (actor.clone(), roles.clone());
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(answer) if answer.stored_at.elapsed() < self.ttl => Some(answer.held),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, actor: ActorId, roles: RoleSet, held: bool) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.lock();
        entries.retain(|_, answer| answer.stored_at.elapsed() < ttl);
        entries.insert((actor, roles), CachedAnswer { held, stored_at: Instant::now() });
    }

    /// Drop every cached answer for `actor` (sign-out, role change).
    pub fn forget_actor(&self, actor: &ActorId) {
        self.lock().retain(|(cached, _), _| cached != actor);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Held,
    NotHeld,
    Failed,
}

pub struct RoleResolver {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RoleStore>,
    cache: RoleCache,
}

impl RoleResolver {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RoleStore>, cache: RoleCache) -> Self {
        Self { identity, store, cache }
    }

    /// True iff the actor signed in right now holds at least one of `roles`.
    pub async fn has_any(&self, roles: &RoleSet) -> bool {
        if roles.is_empty() {
            return false;
        }

        let actor = match self.identity.current_actor().await {
            Ok(Some(actor)) => actor,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "identity fetch failed during role check; treating as signed out");
                return false;
            }
        };

        if let Some(held) = self.cache.get(&actor, roles) {
            tracing::debug!(%actor, %roles, held, "role answer served from cache");
            return held;
        }

        let outcomes = join_all(roles.iter().map(|role| self.check(&actor, role))).await;
        let held = outcomes.contains(&CheckOutcome::Held);
        if !outcomes.contains(&CheckOutcome::Failed) {
            self.cache.insert(actor, roles.clone(), held);
        }
        held
    }

    async fn check(&self, actor: &ActorId, role: Role) -> CheckOutcome {
        match self.store.has_role(actor, role).await {
            Ok(true) => CheckOutcome::Held,
            Ok(false) => CheckOutcome::NotHeld,
            Err(e) => {
                tracing::warn!(error = %e, %actor, %role, "role check failed; counting as not held");
                CheckOutcome::Failed
            }
        }
    }
}
