//! Postgres-backed Role Store.
//!
//! Delegates to the `has_role(uuid, app_role)` SQL function so the database
//! stays the single authority on role membership.

use sqlx::PgPool;

use crate::identity::ActorId;
use crate::roles::{Role, RoleStore, RoleStoreError};

pub struct PgRoles {
    pool: PgPool,
}

impl PgRoles {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoleStore for PgRoles {
    async fn has_role(&self, actor: &ActorId, role: Role) -> Result<bool, RoleStoreError> {
        let held: Option<bool> = sqlx::query_scalar("SELECT public.has_role($1::uuid, $2::app_role)")
            .bind(actor.as_str())
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(held.unwrap_or(false))
    }
}
