//! Auth routes: password sign-in, sign-out, role checks, first-admin bootstrap.
//!
//! Sign-in and sign-out are the only publishers on the auth event bus, so any
//! guard tracking the same session hears about the change.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::identity::{ActorId, AuthEvent};
use crate::navigation::resume_path;
use crate::roles::{Role, RoleSet};
use crate::services::accounts::{AccountError, normalize_email};
use crate::services::session::session_key;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_token";

pub(crate) fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn error_response(status: StatusCode, code: &str) -> Response {
    (status, Json(serde_json::json!({ "error": code }))).into_response()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Signed-in actor extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthActor {
    pub actor_id: ActorId,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthActor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let actor_id = app_state
            .accounts
            .resolve_session(&token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { actor_id, token })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginBody {
    email: String,
    password: String,
    /// Resume path carried from the login page's `next` parameter.
    next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub actor_id: ActorId,
    pub redirect: String,
}

/// `POST /api/auth/login`: check credentials, set cookie, hand back the resume path.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginBody>) -> Response {
    let Some(email) = normalize_email(&body.email) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_email");
    };

    let signed_in = match state.accounts.sign_in(&email, &body.password).await {
        Ok(Some(signed_in)) => signed_in,
        Ok(None) => return error_response(StatusCode::UNAUTHORIZED, "invalid_credentials"),
        Err(e) => {
            tracing::error!(error = %e, "sign-in failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "sign_in_failed");
        }
    };

    state
        .events
        .publish(Some(&session_key(&signed_in.token)), AuthEvent::SignedIn(signed_in.actor_id.clone()));
    tracing::info!(actor = %signed_in.actor_id, "signed in");

    let redirect = resume_path(body.next.as_deref(), &state.config.default_resume_path);
    let jar = jar.add(session_cookie(signed_in.token, state.config.cookie_secure));
    (jar, Json(LoginResponse { actor_id: signed_in.actor_id, redirect })).into_response()
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthActor) -> impl IntoResponse {
    if let Err(e) = state.accounts.sign_out(&auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }
    state.events.publish(Some(&session_key(&auth.token)), AuthEvent::SignedOut);
    state.role_cache.forget_actor(&auth.actor_id);
    tracing::info!(actor = %auth.actor_id, "signed out");

    let jar = CookieJar::new().add(clear_session_cookie(state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub actor_id: ActorId,
}

/// `GET /api/auth/me`: return the signed-in actor.
pub async fn me(auth: AuthActor) -> Json<MeResponse> {
    Json(MeResponse { actor_id: auth.actor_id })
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolesResponse {
    pub admin: bool,
    pub team: bool,
}

/// `GET /api/auth/roles`: what the current visitor may see. Never fails;
/// anything unresolved reads as `false`.
pub async fn roles(State(state): State<AppState>, jar: CookieJar) -> Json<RolesResponse> {
    let resolver = state.role_resolver(state.identity_for(session_token(&jar)));
    let admin_roles = RoleSet::only(Role::Admin);
    let team_roles = RoleSet::team();
    let (admin, team) = tokio::join!(resolver.has_any(&admin_roles), resolver.has_any(&team_roles));
    Json(RolesResponse { admin, team })
}

#[derive(Deserialize)]
pub struct BootstrapBody {
    email: String,
    password: String,
}

/// `POST /api/admin/bootstrap`: create the first admin while none exists.
pub async fn bootstrap_admin(State(state): State<AppState>, Json(body): Json<BootstrapBody>) -> Response {
    let Some(email) = normalize_email(&body.email) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_email");
    };

    match state.accounts.bootstrap_admin(&email, &body.password).await {
        Ok(actor_id) => (StatusCode::CREATED, Json(MeResponse { actor_id })).into_response(),
        Err(AccountError::AdminAlreadyConfigured) => {
            error_response(StatusCode::FORBIDDEN, "admin_already_configured")
        }
        Err(AccountError::EmailTaken) => error_response(StatusCode::CONFLICT, "email_taken"),
        Err(AccountError::InvalidEmail) => error_response(StatusCode::BAD_REQUEST, "invalid_email"),
        Err(AccountError::WeakPassword { .. }) => error_response(StatusCode::BAD_REQUEST, "weak_password"),
        Err(e) => {
            tracing::error!(error = %e, "bootstrap admin failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "bootstrap_failed")
        }
    }
}
