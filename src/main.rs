use std::sync::Arc;

use lusitana_gate::config::{ConfigError, GateConfig};
use lusitana_gate::services::accounts::PgAccounts;
use lusitana_gate::services::roles::PgRoles;
use lusitana_gate::state::AppState;
use lusitana_gate::{db, routes};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database init failed: {0}")]
    Db(#[from] sqlx::Error),
    #[error("server io: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = GateConfig::from_env()?;
    let port = config.port;

    let pool = db::init_pool(&config).await?;
    let state = AppState::new(
        Arc::new(PgAccounts::new(pool.clone())),
        Arc::new(PgRoles::new(pool)),
        config,
    );

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "lusitana-gate listening");
    axum::serve(listener, app).await?;
    Ok(())
}
