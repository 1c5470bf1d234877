use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::web::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookQuery {
    pub tenant_id: Uuid,
}

/// POST /webhooks/stripe?tenantId={tenant_id}
pub async fn stripe_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    reconcile(&state, query.tenant_id, &headers, &body).await
}

/// POST /webhooks/stripe/{tenant_id}
pub async fn stripe_webhook_for_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    reconcile(&state, tenant_id, &headers, &body).await
}

/// Bodies stay empty on every outcome so nothing about the payment leaks.
async fn reconcile(
    state: &AppState,
    tenant_id: Uuid,
    headers: &HeaderMap,
    body: &[u8],
) -> StatusCode {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
    else {
        metrics::counter!("donations.webhook.signature_invalid").increment(1);
        return StatusCode::UNAUTHORIZED;
    };

    match state
        .reconciler
        .handle_webhook(tenant_id, body, signature)
        .await
    {
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_unauthenticated() => StatusCode::UNAUTHORIZED,
        Err(e) => {
            error!(%tenant_id, error = %e, "Webhook processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
