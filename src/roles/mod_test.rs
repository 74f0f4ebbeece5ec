use super::*;

#[test]
fn every_role_name_parses_back_and_matches_serde() {
    for role in ROLES {
        assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        assert_eq!(serde_json::to_string(&role).unwrap(), format!("\"{}\"", role.as_str()));
    }
}

#[test]
fn member_is_stored_as_user() {
    assert_eq!("user".parse::<Role>().unwrap(), Role::Member);
    assert_eq!(serde_json::to_string(&Role::Member).unwrap(), "\"user\"");
}

#[test]
fn unknown_role_rejected_at_parse() {
    let err = "pastor".parse::<Role>().unwrap_err();
    assert_eq!(err, UnknownRole("pastor".into()));
    assert_eq!(err.to_string(), "unknown role `pastor`");
}

#[test]
fn role_parse_is_exact() {
    assert!("Admin".parse::<Role>().is_err());
    assert!(" admin".parse::<Role>().is_err());
}

#[test]
fn role_set_parse_fails_on_first_unknown() {
    let err = RoleSet::parse(["admin", "elder", "leader"]).unwrap_err();
    assert_eq!(err.0, "elder");
}

#[test]
fn role_set_order_and_duplicates_do_not_matter() {
    let a = RoleSet::parse(["volunteer", "admin", "leader"]).unwrap();
    let b = RoleSet::parse(["leader", "admin", "volunteer", "admin"]).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, RoleSet::team());
    assert_eq!(a.len(), 3);
}

#[test]
fn role_set_display_is_sorted() {
    assert_eq!(RoleSet::team().to_string(), "admin,leader,volunteer");
    assert_eq!(RoleSet::default().to_string(), "");
}

#[test]
fn team_excludes_member() {
    let team = RoleSet::team();
    assert!(team.contains(Role::Admin));
    assert!(!team.contains(Role::Member));
}

#[test]
fn role_set_collects_from_iterator() {
    let set: RoleSet = [Role::Leader, Role::Leader].into_iter().collect();
    assert_eq!(set, RoleSet::only(Role::Leader));
    assert!(!set.is_empty());
}
