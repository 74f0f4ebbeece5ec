use super::test_helpers::*;
use crate::roles::{Role, RoleSet};

#[tokio::test]
async fn identity_for_without_token_is_signed_out() {
    let app = test_app();
    let identity = app.state.identity_for(None);
    assert_eq!(identity.current_actor().await.unwrap(), None);
}

#[tokio::test]
async fn identity_for_resolves_session_token() {
    let app = test_app();
    let actor_id = app.accounts.add_user("ana@example.org", "secret1");
    let token = app.accounts.open_session(&actor_id);
    let identity = app.state.identity_for(Some(token));
    assert_eq!(identity.current_actor().await.unwrap(), Some(actor_id));
}

#[tokio::test]
async fn resolvers_share_the_app_role_cache() {
    let app = test_app();
    let actor_id = app.accounts.add_user("ana@example.org", "secret1");
    app.roles.grant(&actor_id, Role::Admin);
    let token = app.accounts.open_session(&actor_id);

    let first = app.state.role_resolver(app.state.identity_for(Some(token.clone())));
    assert!(first.has_any(&RoleSet::team()).await);
    let calls = app.roles.call_count();

    let second = app.state.role_resolver(app.state.identity_for(Some(token)));
    assert!(second.has_any(&RoleSet::team()).await);
    assert_eq!(app.roles.call_count(), calls);
    assert_eq!(app.state.role_cache.len(), 1);
}

#[test]
fn new_takes_cache_ttl_from_config() {
    let app = test_app();
    assert!(app.state.role_cache.is_empty());
    assert_eq!(app.state.config.default_resume_path, "/kids/dashboard");
}
