//! Normalizes Stripe's per-type payment method blocks into a method label
//! and a masked account identifier.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReconcileError, ReconcileResult};
use crate::stripe_client::PaymentGateway;
use crate::stripe_events::PaymentObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    AchDebit,
}

impl PaymentMethod {
    pub fn from_provider_type(provider_type: &str) -> ReconcileResult<Self> {
        match provider_type {
            "card" => Ok(PaymentMethod::Card),
            "ach_debit" => Ok(PaymentMethod::AchDebit),
            other => Err(ReconcileError::UnsupportedPaymentMethod(other.to_string())),
        }
    }

    /// Label stored on the donation row.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::AchDebit => "ACH Debit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedAccount {
    pub last4: Option<String>,
}

/// `payment_method_details` as found on a charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub card: Option<MaskedAccount>,
    pub ach_debit: Option<MaskedAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub method_details: String,
}

impl PaymentMethodDetails {
    pub fn normalize(&self) -> ReconcileResult<PaymentDetails> {
        let method = PaymentMethod::from_provider_type(&self.type_)?;
        let account = match method {
            PaymentMethod::Card => self.card.as_ref(),
            PaymentMethod::AchDebit => self.ach_debit.as_ref(),
        };
        let last4 = account.and_then(|a| a.last4.clone()).ok_or_else(|| {
            ReconcileError::UnrecognizedEventShape(format!(
                "payment_method_details.{}.last4 is missing",
                self.type_
            ))
        })?;

        Ok(PaymentDetails {
            method,
            method_details: last4,
        })
    }
}

/// Inline details win; invoices only reference their charge, which is fetched.
pub async fn extract_payment_details(
    gateway: &dyn PaymentGateway,
    secret_key: &str,
    object: &PaymentObject,
) -> ReconcileResult<PaymentDetails> {
    if let Some(details) = &object.payment_method_details {
        return details.normalize();
    }

    let charge_id = object.charge.as_deref().ok_or_else(|| {
        ReconcileError::UnrecognizedEventShape(
            "event has neither payment_method_details nor a charge reference".into(),
        )
    })?;

    debug!(charge_id, "Fetching charge for payment method details");
    let charge = gateway.get_charge(secret_key, charge_id).await?;
    charge
        .payment_method_details
        .as_ref()
        .ok_or_else(|| {
            ReconcileError::UnrecognizedEventShape(format!(
                "charge {charge_id} has no payment_method_details"
            ))
        })?
        .normalize()
}
