//! Gate middleware: runs the route guards in front of protected pages.
//!
//! DESIGN
//! ======
//! Each gated request gets its own cookie-backed Identity Provider and a
//! [`Navigator`] seeded with the request location. The guard for the matching
//! scope is mounted, awaited until it leaves `Pending`, and dropped before the
//! response is returned. A denial becomes a `303 See Other` to wherever the
//! navigator ended up after following the guard's intent.
//!
//! Only `GET` and `HEAD` are gated; API calls carry their own auth checks.

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tokio::sync::mpsc;

use super::auth::session_token;
use crate::guard::authenticated::AuthenticatedGuard;
use crate::guard::team::TeamGuard;
use crate::guard::{AccessState, TeamAccessState};
use crate::navigation::{NavigationIntent, Navigator, RouteScope, pathname};
use crate::roles::RoleSet;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Any signed-in actor.
    Authenticated,
    /// Signed-in actors holding admin, leader or volunteer.
    Team,
}

#[derive(Debug)]
pub struct ProtectedRoute {
    pub prefix: &'static str,
    pub guard: GuardKind,
}

pub static PROTECTED_ROUTES: [ProtectedRoute; 3] = [
    ProtectedRoute { prefix: "/dashboard/aluno", guard: GuardKind::Authenticated },
    ProtectedRoute { prefix: "/dashboard", guard: GuardKind::Team },
    ProtectedRoute { prefix: "/kids/dashboard", guard: GuardKind::Team },
];

/// Longest protected prefix containing `path`.
#[must_use]
pub fn protected_route(path: &str) -> Option<&'static ProtectedRoute> {
    PROTECTED_ROUTES
        .iter()
        .filter(|route| RouteScope::new(route.prefix).contains(path))
        .max_by_key(|route| route.prefix.len())
}

pub async fn enforce(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let location = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());
    let navigator = Navigator::new(&location);
    if navigator.current() != location {
        tracing::debug!(from = %location, to = %navigator.current(), "restoring deep link");
        return Redirect::to(&navigator.current()).into_response();
    }

    let Some(route) = protected_route(pathname(&location)) else {
        return next.run(request).await;
    };

    let Some(intent) = evaluate(&state, route, session_token(&jar), &navigator).await else {
        tracing::warn!(path = %pathname(&location), "guard stopped before deciding");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    if intent.href().is_none() {
        return next.run(request).await;
    }

    navigator.follow(&intent);
    tracing::debug!(path = %pathname(&location), to = %navigator.current(), "gate denied request");
    Redirect::to(&navigator.current()).into_response()
}

/// Mount the route's guard and return its decision: an allow intent, the
/// redirect it sent, or `None` if it stopped first.
async fn evaluate(
    state: &AppState,
    route: &ProtectedRoute,
    token: Option<String>,
    navigator: &Navigator,
) -> Option<NavigationIntent> {
    let (redirects, mut intents) = mpsc::unbounded_channel();
    let ctx = state.guard_context(state.identity_for(token), redirects);
    let scope = RouteScope::new(route.prefix);

    match route.guard {
        GuardKind::Authenticated => {
            let guard = AuthenticatedGuard::mount(&ctx, scope, navigator.location());
            match guard.settled().await {
                AccessState::Pending => None,
                AccessState::Granted => Some(NavigationIntent::allow()),
                AccessState::Denied { .. } => intents.recv().await,
            }
        }
        GuardKind::Team => {
            let guard = TeamGuard::mount(&ctx, scope, RoleSet::team(), navigator.location());
            match guard.settled().await {
                TeamAccessState::Pending => None,
                TeamAccessState::Granted => Some(NavigationIntent::allow()),
                TeamAccessState::DeniedUnauthenticated { .. } | TeamAccessState::DeniedUnauthorized => {
                    intents.recv().await
                }
            }
        }
    }
}
