//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the auth API, the health check, and the static site
//! under a single Axum router. The gate middleware wraps everything so
//! protected page loads are decided before the site is served.

pub mod auth;
pub mod gate;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router: API routes, gate, and SPA fallback.
pub fn app(state: AppState) -> Router {
    let site_dir = state.config.site_dir.clone();
    let site = ServeDir::new(&site_dir).fallback(ServeFile::new(site_dir.join("index.html")));

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/roles", get(auth::roles))
        .route("/api/admin/bootstrap", post(auth::bootstrap_admin))
        .route("/healthz", get(healthz))
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), gate::enforce))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
