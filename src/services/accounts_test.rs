use super::*;

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_trims_and_lowercases() {
    assert_eq!(normalize_email("  Pastor@Lusitana.PT "), Some("pastor@lusitana.pt".into()));
}

#[test]
fn normalize_email_rejects_malformed() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("no-at-sign"), None);
    assert_eq!(normalize_email("@domain.pt"), None);
    assert_eq!(normalize_email("local@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

// =============================================================================
// validate_password
// =============================================================================

#[test]
fn validate_password_minimum_length() {
    assert!(validate_password("12345").is_err());
    assert!(validate_password("123456").is_ok());
}

#[test]
fn validate_password_counts_chars_not_bytes() {
    assert!(validate_password("ããããã").is_err());
    assert!(validate_password("çççççç").is_ok());
}

#[test]
fn weak_password_message_mentions_minimum() {
    let err = validate_password("x").unwrap_err();
    assert_eq!(err.to_string(), "password must be at least 6 characters");
}

// =============================================================================
// hash_password / verify_password
// =============================================================================

#[test]
fn hash_then_verify_accepts_same_password() {
    let hash = hash_password("sal-da-terra").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "sal-da-terra"));
}

#[test]
fn verify_rejects_wrong_password() {
    let hash = hash_password("sal-da-terra").unwrap();
    assert!(!verify_password(&hash, "luz-do-mundo"));
}

#[test]
fn hashes_are_salted() {
    assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
}

#[test]
fn verify_rejects_garbage_hash() {
    assert!(!verify_password("not-a-phc-string", "anything"));
}
