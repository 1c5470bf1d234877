use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::actions;
use crate::donation_service::DonationService;
use crate::reconciler::WebhookReconciler;
use crate::repositories::Repositories;
use crate::secret_codec::SecretCodec;
use crate::stripe_client::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub reconciler: WebhookReconciler,
    pub donation_service: DonationService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        codec: SecretCodec,
        jwt_secret: &str,
    ) -> Self {
        Self {
            reconciler: WebhookReconciler::new(repos.clone(), gateway.clone(), codec.clone()),
            donation_service: DonationService::new(repos, gateway, codec),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

// Middleware for request logging with correlation ID
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    let start_time = Instant::now();

    info!("Started {} {} [{}]", method, path, request_id);

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let status = response.status();

    info!(
        "Completed {} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        duration.as_secs_f64() * 1000.0
    );

    response
}

// Middleware to capture HTTP errors to Sentry
async fn sentry_error_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if response.status().is_server_error() {
        let status = response.status();
        error!("HTTP {} error on {} {}", status.as_u16(), method, path);

        // Path only: webhook query strings carry tenant ids
        sentry::configure_scope(|scope| {
            scope.set_tag("http.method", method.as_str());
            scope.set_tag("http.path", &path);
            scope.set_tag("http.status_code", status.as_u16().to_string());
        });

        sentry::capture_message(
            &format!("HTTP {} error on {} {}", status.as_u16(), method, path),
            sentry::Level::Error,
        );
    }

    response
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(actions::health))
        .route("/webhooks/stripe", post(actions::stripe_webhook))
        .route(
            "/webhooks/stripe/{tenant_id}",
            post(actions::stripe_webhook_for_tenant),
        )
        .route("/donations/log", post(actions::log_donation))
        .route("/donations/charge", post(actions::create_charge))
        .route("/donations/subscribe", post(actions::create_subscription))
        .with_state(app_state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn(sentry_error_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server(interface: String, port: u16, app_state: AppState) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "web-server");
    });
    info!("Starting web server on {}:{}", interface, port);

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", interface, port)).await?;
    info!("Web server listening on http://{}:{}", interface, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
