use axum::body::Body;
use axum::http::Request as HttpRequest;
use axum::http::header::{COOKIE, LOCATION};
use tower::ServiceExt;

use super::*;
use crate::roles::Role;
use crate::routes::auth::SESSION_COOKIE;
use crate::state::test_helpers::{TestApp, test_app};

async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> Response {
    let mut request = HttpRequest::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        request = request.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    crate::routes::app(app.state.clone())
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

fn signed_in(app: &TestApp, role: Option<Role>) -> String {
    let actor = app.accounts.add_user("ana@example.org", "secret1");
    if let Some(role) = role {
        app.roles.grant(&actor, role);
    }
    app.accounts.open_session(&actor)
}

// =============================================================================
// protected_route
// =============================================================================

#[test]
fn longest_prefix_wins() {
    assert_eq!(protected_route("/dashboard/aluno/aulas").unwrap().guard, GuardKind::Authenticated);
    assert_eq!(protected_route("/dashboard/kids/criancas").unwrap().guard, GuardKind::Team);
    assert_eq!(protected_route("/kids/dashboard").unwrap().guard, GuardKind::Team);
    assert_eq!(protected_route("/dashboard").unwrap().prefix, "/dashboard");
}

#[test]
fn public_paths_are_unprotected() {
    assert!(protected_route("/").is_none());
    assert!(protected_route("/login").is_none());
    assert!(protected_route("/dashboards").is_none());
    assert!(protected_route("/kids").is_none());
}

// =============================================================================
// enforce
// =============================================================================

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login_with_resume_path() {
    let app = test_app();
    let response = get(&app, "/dashboard/kids/criancas", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fdashboard%2Fkids%2Fcriancas");
}

#[tokio::test]
async fn stale_cookie_is_treated_as_signed_out() {
    let app = test_app();
    let response = get(&app, "/dashboard/aluno", Some("not-a-session")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fdashboard%2Faluno");
}

#[tokio::test]
async fn member_without_team_role_is_sent_home() {
    let app = test_app();
    let token = signed_in(&app, Some(Role::Member));
    let response = get(&app, "/kids/dashboard", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn team_member_passes_through() {
    let app = test_app();
    let token = signed_in(&app, Some(Role::Volunteer));
    let response = get(&app, "/dashboard/kids/criancas", Some(&token)).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn student_area_needs_no_role() {
    let app = test_app();
    let token = signed_in(&app, None);
    let response = get(&app, "/dashboard/aluno", Some(&token)).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn public_pages_are_not_gated() {
    let app = test_app();
    let response = get(&app, "/login", None).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
    let response = get(&app, "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_get_requests_are_not_gated() {
    let app = test_app();
    let request = HttpRequest::builder().method(Method::POST).uri("/dashboard").body(Body::empty()).unwrap();
    let response = crate::routes::app(app.state.clone()).oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn deep_link_is_restored_before_gating() {
    let app = test_app();
    let response = get(&app, "/?p=%2Fdashboard%2Fkids", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/kids");

    let response = get(&app, "/?p=%2F%2Fevil.example", None).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}
