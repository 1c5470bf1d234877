use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::db::{create_pool, run_migrations};
use crate::repositories::Repositories;
use crate::stripe_client::StripeGateway;
use crate::web::{AppState, start_web_server};

pub async fn handle_serve(
    config: ServerConfig,
    interface: String,
    port: u16,
    metrics_port: u16,
) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "serve");
    });

    let pool = create_pool(&config.database_url)?;
    run_migrations(&pool).await?;

    tokio::spawn(async move {
        if let Err(e) = crate::metrics::start_metrics_server(metrics_port).await {
            error!(error = %e, "Metrics server stopped");
        }
    });

    let state = AppState::new(
        Repositories::postgres(pool),
        Arc::new(StripeGateway::new()),
        config.codec,
        &config.jwt_secret,
    );

    info!("Donation service ready");
    start_web_server(interface, port, state).await
}
