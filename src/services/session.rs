//! Session token management.
//!
//! ARCHITECTURE
//! ============
//! The browser holds a random 32-byte token in an HttpOnly cookie. Postgres
//! only ever sees its SHA-256 (`session_key`), which is also the key auth
//! events are published under, so neither the table nor the event bus carries
//! a usable credential.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::fmt::Write;

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::ActorId;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Stable, non-reversible key for a session token.
#[must_use]
pub fn session_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Create a session for the given user, returning the raw token.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token_hash, user_id) VALUES ($1, $2)")
        .bind(session_key(&token))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Resolve a session token to its actor, ignoring expired sessions.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<ActorId>, sqlx::Error> {
    let user_id: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM sessions WHERE token_hash = $1 AND expires_at > now()")
            .bind(session_key(token))
            .fetch_optional(pool)
            .await?;
    Ok(user_id.map(|id| ActorId::new(id.to_string())))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(session_key(token))
        .execute(pool)
        .await?;
    Ok(())
}
