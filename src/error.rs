//! Error taxonomy for the reconciliation pipeline.

use axum::http::StatusCode;
use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No usable gateway credentials, or a presented key did not match.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Unsupported payment method type: {0}")]
    UnsupportedPaymentMethod(String),

    #[error("Unrecognized event shape: {0}")]
    UnrecognizedEventShape(String),

    #[error("Fund allocations total {allocated} but donation amount is {expected}")]
    FundAllocationMismatch {
        expected: BigDecimal,
        allocated: BigDecimal,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    /// The payment provider rejected or failed a request.
    #[error("Payment provider error: {0}")]
    Gateway(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

impl ReconcileError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            ReconcileError::Unauthenticated(_) | ReconcileError::InvalidSignature(_)
        )
    }

    /// Status code used by authenticated routes, where the caller may see the message.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReconcileError::Unauthenticated(_) | ReconcileError::InvalidSignature(_) => {
                StatusCode::UNAUTHORIZED
            }
            ReconcileError::Validation(_) | ReconcileError::FundAllocationMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            ReconcileError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ReconcileError::UnsupportedPaymentMethod(_)
            | ReconcileError::UnrecognizedEventShape(_)
            | ReconcileError::Crypto(_)
            | ReconcileError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
