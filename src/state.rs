//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the gate middleware via the
//! `State` extractor. It holds the account and role backends as trait objects
//! so tests swap in in-memory fakes, plus the process-wide role cache and
//! auth event bus that every per-request guard shares.

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::GateConfig;
use crate::guard::GuardContext;
use crate::identity::cookie::CookieIdentity;
use crate::identity::{AuthEvents, IdentityProvider};
use crate::navigation::NavigationIntent;
use crate::roles::RoleStore;
use crate::roles::resolver::{RoleCache, RoleResolver};
use crate::services::accounts::AccountStore;

/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub roles: Arc<dyn RoleStore>,
    pub role_cache: RoleCache,
    pub events: AuthEvents,
    pub config: Arc<GateConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, roles: Arc<dyn RoleStore>, config: GateConfig) -> Self {
        Self {
            accounts,
            roles,
            role_cache: RoleCache::new(config.role_cache_ttl),
            events: AuthEvents::new(),
            config: Arc::new(config),
        }
    }

    /// Identity Provider for the visitor holding `token`.
    #[must_use]
    pub fn identity_for(&self, token: Option<String>) -> Arc<dyn IdentityProvider> {
        Arc::new(CookieIdentity::new(self.accounts.clone(), token, self.events.clone()))
    }

    #[must_use]
    pub fn role_resolver(&self, identity: Arc<dyn IdentityProvider>) -> RoleResolver {
        RoleResolver::new(identity, self.roles.clone(), self.role_cache.clone())
    }

    #[must_use]
    pub fn guard_context(
        &self,
        identity: Arc<dyn IdentityProvider>,
        redirects: mpsc::UnboundedSender<NavigationIntent>,
    ) -> GuardContext {
        GuardContext { identity, roles: self.roles.clone(), role_cache: self.role_cache.clone(), redirects }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
