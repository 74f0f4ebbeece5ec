//! Accounts: password sign-in, sessions, and first-admin bootstrap.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route handlers and the cookie identity provider talk to accounts through
//! the [`AccountStore`] trait; `PgAccounts` is the production backend and the
//! tests swap in an in-memory one.

#[cfg(test)]
#[path = "accounts_test.rs"]
mod tests;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use super::session;
use crate::identity::ActorId;

pub const MIN_PASSWORD_LEN: usize = 6;
const BOOTSTRAP_DISPLAY_NAME: &str = "Admin";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("an admin is already configured")]
    AdminAlreadyConfigured,
    #[error("email already registered")]
    EmailTaken,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// A freshly created session.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub actor_id: ActorId,
    pub token: String,
}

// =============================================================================
// VALIDATION + HASHING
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// # Errors
///
/// Returns [`AccountError::WeakPassword`] below [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::WeakPassword { min: MIN_PASSWORD_LEN });
    }
    Ok(())
}

/// Argon2id PHC string for `password` with a random salt.
///
/// # Errors
///
/// Returns [`AccountError::PasswordHash`] if salt encoding or hashing fails.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AccountError::PasswordHash(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AccountError::PasswordHash(e.to_string()))?;
    Ok(phc.to_string())
}

#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

// =============================================================================
// ACCOUNT STORE
// =============================================================================

#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Actor owning a live session token.
    async fn resolve_session(&self, token: &str) -> Result<Option<ActorId>, AccountError>;

    /// Check credentials and open a session. `None` on bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<SignedIn>, AccountError>;

    async fn sign_out(&self, token: &str) -> Result<(), AccountError>;

    /// Create the first admin account. Refused once any admin exists.
    async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<ActorId, AccountError>;
}

pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccountStore for PgAccounts {
    async fn resolve_session(&self, token: &str) -> Result<Option<ActorId>, AccountError> {
        Ok(session::validate_session(&self.pool, token).await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<SignedIn>, AccountError> {
        let row: Option<(Uuid, Option<String>)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((user_id, Some(hash))) = row else {
            return Ok(None);
        };
        if !verify_password(&hash, password) {
            return Ok(None);
        }

        let token = session::create_session(&self.pool, user_id).await?;
        Ok(Some(SignedIn { actor_id: ActorId::new(user_id.to_string()), token }))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AccountError> {
        Ok(session::delete_session(&self.pool, token).await?)
    }

    async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<ActorId, AccountError> {
        validate_password(password)?;
        let hash = hash_password(password)?;

        let mut tx = self.pool.begin().await?;
        // Serialize concurrent bootstraps so only one can see zero admins.
        sqlx::query("LOCK TABLE user_roles IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role = 'admin'")
            .fetch_one(&mut *tx)
            .await?;
        if admins > 0 {
            return Err(AccountError::AdminAlreadyConfigured);
        }

        let user_id: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO users (email, display_name, password_hash) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(email)
        .bind(BOOTSTRAP_DISPLAY_NAME)
        .bind(&hash)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user_id) = user_id else {
            return Err(AccountError::EmailTaken);
        };

        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, 'admin')")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(%user_id, "bootstrap admin created");
        Ok(ActorId::new(user_id.to_string()))
    }
}
