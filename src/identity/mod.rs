//! Identity Provider seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! Guards never read the process-wide session store directly. They are handed
//! an `Arc<dyn IdentityProvider>` with two independent channels: a change
//! subscription and a one-time "who is signed in right now" fetch. Only the
//! sign-in and sign-out flows publish on the [`AuthEvents`] bus.

pub mod cookie;
pub mod tracker;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::services::accounts::AccountError;

const AUTH_EVENT_CAPACITY: usize = 256;

/// Opaque, stable identifier of an authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(ActorId),
    SignedOut,
    TokenRefreshed(ActorId),
}

impl AuthEvent {
    /// Actor signed in after this event, if any.
    #[must_use]
    pub fn actor(&self) -> Option<&ActorId> {
        match self {
            Self::SignedIn(actor) | Self::TokenRefreshed(actor) => Some(actor),
            Self::SignedOut => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("session lookup failed: {0}")]
    Session(#[from] AccountError),
}

// =============================================================================
// EVENT BUS
// =============================================================================

/// Which published events a subscriber sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventScope {
    /// Every event on the bus.
    Global,
    /// Events published for one session key.
    Session(String),
    /// No events; used for visitors without a session.
    Anonymous,
}

#[derive(Debug, Clone)]
struct Envelope {
    session: Option<String>,
    event: AuthEvent,
}

/// Process-wide fan-out of authentication state changes.
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<Envelope>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish an event, optionally tagged with the session key it concerns.
    pub fn publish(&self, session: Option<&str>, event: AuthEvent) {
        // No live subscribers is the common case.
        let _ = self.tx.send(Envelope { session: session.map(str::to_owned), event });
    }

    #[must_use]
    pub fn subscribe(&self, scope: EventScope) -> AuthSubscription {
        AuthSubscription { rx: self.tx.subscribe(), scope }
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// What a subscriber hears from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthNotice {
    Event(AuthEvent),
    /// Events were dropped because this subscriber fell behind; any of them
    /// may have concerned it, so current state must be fetched again.
    Resync,
}

/// Live registration on the event bus. Dropping it unsubscribes.
pub struct AuthSubscription {
    rx: broadcast::Receiver<Envelope>,
    scope: EventScope,
}

impl AuthSubscription {
    /// Next event in scope, a resync marker after lag, or `None` once the bus
    /// is gone.
    pub async fn recv(&mut self) -> Option<AuthNotice> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.accepts(&envelope) => return Some(AuthNotice::Event(envelope.event)),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    if self.scope == EventScope::Anonymous {
                        continue;
                    }
                    tracing::warn!(skipped, "auth event subscriber lagged; resyncing");
                    return Some(AuthNotice::Resync);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, envelope: &Envelope) -> bool {
        match &self.scope {
            EventScope::Global => true,
            EventScope::Session(key) => envelope.session.as_deref() == Some(key.as_str()),
            EventScope::Anonymous => false,
        }
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Authentication collaborator: who, if anyone, is signed in.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register for sign-in, sign-out and refresh notifications.
    fn subscribe(&self) -> AuthSubscription;

    /// One-time fetch of the actor signed in right now.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when the provider cannot answer. Callers in
    /// this crate read that as "no actor".
    async fn current_actor(&self) -> Result<Option<ActorId>, IdentityError>;
}
