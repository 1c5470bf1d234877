use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::auth::DonationEditor;
use crate::donation_service::{ChargeInstruction, ExternalDonation, SubscribeInstruction};
use crate::donations::{Donation, FundAllocation, FundDonation};
use crate::error::ReconcileError;
use crate::web::AppState;

use super::{DataResponse, json_error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDonationRequest {
    pub tenant_id: Uuid,
    pub secret_key: String,
    pub donation: ExternalDonation,
    pub fund: FundAllocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedDonationView {
    pub donation: Donation,
    pub funds: Vec<FundDonation>,
}

/// Errors on routes with a known caller: the message is theirs to see,
/// except for storage failures.
fn error_response(e: ReconcileError, context: &str) -> Response {
    let status = e.status_code();
    if status.is_server_error() && !matches!(e, ReconcileError::Gateway(_)) {
        error!(error = %e, "{}", context);
        return json_error(status, context).into_response();
    }
    json_error(status, &e.to_string()).into_response()
}

/// POST /donations/log
/// Record a donation reported by an outside source holding the tenant's secret key
pub async fn log_donation(
    State(state): State<AppState>,
    Json(request): Json<LogDonationRequest>,
) -> impl IntoResponse {
    match state
        .donation_service
        .log_external_donation(
            request.tenant_id,
            &request.secret_key,
            request.donation,
            request.fund,
        )
        .await
    {
        Ok(logged) => (
            StatusCode::CREATED,
            Json(DataResponse {
                data: LoggedDonationView {
                    donation: logged.donation,
                    funds: logged.funds,
                },
            }),
        )
            .into_response(),
        // Anonymous callers learn nothing beyond the rejection
        Err(e) if e.is_unauthenticated() => {
            json_error(StatusCode::UNAUTHORIZED, "Unauthenticated").into_response()
        }
        Err(e) => error_response(e, "Failed to log donation"),
    }
}

/// POST /donations/charge
pub async fn create_charge(
    DonationEditor(user): DonationEditor,
    State(state): State<AppState>,
    Json(instruction): Json<ChargeInstruction>,
) -> impl IntoResponse {
    match state
        .donation_service
        .charge(user.tenant_id, instruction)
        .await
    {
        Ok(result) => Json(DataResponse { data: result }).into_response(),
        Err(e) => error_response(e, "Failed to create charge"),
    }
}

/// POST /donations/subscribe
pub async fn create_subscription(
    DonationEditor(user): DonationEditor,
    State(state): State<AppState>,
    Json(instruction): Json<SubscribeInstruction>,
) -> impl IntoResponse {
    match state
        .donation_service
        .subscribe(user.tenant_id, instruction)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(DataResponse { data: created })).into_response(),
        Err(e) => error_response(e, "Failed to create subscription"),
    }
}
