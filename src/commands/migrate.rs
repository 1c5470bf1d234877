use anyhow::Result;
use tracing::info;

use crate::config::ServerConfig;
use crate::db::{create_pool, run_migrations};

pub async fn handle_migrate(config: &ServerConfig) -> Result<()> {
    let pool = create_pool(&config.database_url)?;
    let applied = run_migrations(&pool).await?;
    info!("Applied {} migration(s)", applied);
    Ok(())
}
