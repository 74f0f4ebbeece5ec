//! Identity Provider over a browser session cookie.

#[cfg(test)]
#[path = "cookie_test.rs"]
mod tests;

use std::sync::Arc;

use super::{ActorId, AuthEvents, AuthSubscription, EventScope, IdentityError, IdentityProvider};
use crate::services::accounts::AccountStore;
use crate::services::session::session_key;

/// One visitor's view of the shared session store, keyed by their token.
pub struct CookieIdentity {
    accounts: Arc<dyn AccountStore>,
    token: Option<String>,
    events: AuthEvents,
}

impl CookieIdentity {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, token: Option<String>, events: AuthEvents) -> Self {
        Self { accounts, token, events }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for CookieIdentity {
    fn subscribe(&self) -> AuthSubscription {
        let scope = self
            .token
            .as_deref()
            .map_or(EventScope::Anonymous, |token| EventScope::Session(session_key(token)));
        self.events.subscribe(scope)
    }

    async fn current_actor(&self) -> Result<Option<ActorId>, IdentityError> {
        let Some(token) = self.token.as_deref() else {
            return Ok(None);
        };
        Ok(self.accounts.resolve_session(token).await?)
    }
}
