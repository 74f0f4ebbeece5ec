//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool and enforce schema
//! migrations (users, sessions, roles, `has_role`) before serving traffic.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::GateConfig;

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// The acquire timeout bounds every identity and role lookup, so a stalled
/// database turns into a fast failure the guards fold into "denied".
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(config: &GateConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
