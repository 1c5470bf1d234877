use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tracing::info;

/// Install the Prometheus recorder. The returned handle renders the scrape body.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        // Buckets: 5ms to 10s, covering provider round trips on invoice events
        .set_buckets_for_metric(
            Matcher::Full("donations.webhook.processing_ms".to_string()),
            &[
                5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ],
        )
        .context("failed to set buckets for donations.webhook.processing_ms")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Initialize donation metrics to zero so they appear in Prometheus before
/// the first event arrives.
pub fn initialize_donation_metrics() {
    metrics::counter!("donations.webhook.received").absolute(0);
    metrics::counter!("donations.webhook.signature_invalid").absolute(0);
    metrics::counter!("donations.webhook.ignored").absolute(0);
    metrics::counter!("donations.webhook.duplicate").absolute(0);
    metrics::counter!("donations.webhook.failed").absolute(0);
    metrics::counter!("donations.recorded").absolute(0);
    metrics::counter!("donations.charge.created").absolute(0);
    metrics::counter!("donations.subscription.created").absolute(0);
    metrics::counter!("donations.stripe.api_errors").absolute(0);
}

pub async fn start_metrics_server(port: u16) -> Result<()> {
    let handle = init_metrics()?;
    initialize_donation_metrics();

    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting metrics server on http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind metrics server")?;
    axum::serve(listener, app)
        .await
        .context("Metrics server failed")
}
