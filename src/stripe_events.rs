//! The slice of Stripe's event payload the reconciler reads, and the
//! classification of an event into log and donation side effects.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ReconcileError, ReconcileResult};
use crate::event_logs::build_message;
use crate::money::cents_to_amount;
use crate::payment_details::PaymentMethodDetails;

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: PaymentObject,
}

/// Fields shared by charge and invoice objects. Anything absent on one of
/// the two shapes is simply `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentObject {
    pub id: Option<String>,
    /// Charges report `amount`.
    pub amount: Option<i64>,
    /// Invoices report `amount_paid`.
    pub amount_paid: Option<i64>,
    pub currency: Option<String>,
    pub customer: Option<String>,
    pub created: Option<i64>,
    pub status: Option<String>,
    pub billing_reason: Option<String>,
    pub failure_message: Option<String>,
    pub outcome: Option<ChargeOutcome>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub subscription: Option<String>,
    /// Invoices on older API versions carry the subscription's metadata here.
    pub subscription_details: Option<SubscriptionDetails>,
    pub parent: Option<InvoiceParent>,
    pub invoice: Option<String>,
    pub charge: Option<String>,
    pub payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeOutcome {
    pub seller_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceParent {
    pub subscription_details: Option<SubscriptionDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionDetails {
    pub subscription: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

impl PaymentObject {
    /// Subscription id, from the top-level field or the newer `parent` block.
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_deref().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.subscription_details.as_ref())
                .and_then(|d| d.subscription.as_deref())
        })
    }

    pub fn is_subscription_driven(&self) -> bool {
        self.subscription_id().is_some()
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains("subscription"))
    }

    pub fn fund_metadata(&self) -> Option<&str> {
        self.metadata.get("funds").map(String::as_str)
    }

    /// `funds` copied onto the invoice from the subscription's own metadata.
    pub fn subscription_fund_metadata(&self) -> Option<&str> {
        let parent = self
            .parent
            .as_ref()
            .and_then(|p| p.subscription_details.as_ref());
        [parent, self.subscription_details.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|d| d.metadata.as_ref()?.get("funds"))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ChargeSucceeded,
    InvoicePaid,
}

impl EventKind {
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "charge.succeeded" => Some(EventKind::ChargeSucceeded),
            "invoice.paid" => Some(EventKind::InvoicePaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ChargeSucceeded => "charge.succeeded",
            EventKind::InvoicePaid => "invoice.paid",
        }
    }
}

/// Normalized view of a recognised event.
#[derive(Debug, Clone)]
pub struct ClassifiedEvent {
    pub kind: EventKind,
    pub event_id: String,
    pub customer_id: Option<String>,
    pub amount: BigDecimal,
    pub occurred_at: DateTime<Utc>,
    pub status: Option<String>,
    pub message: String,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Classification {
    Ignore,
    /// Logged for idempotency, no donation. Subscription charges land here
    /// because the matching `invoice.paid` records the donation.
    LogOnly(ClassifiedEvent),
    LogAndDonate(ClassifiedEvent),
}

pub fn classify(event: &StripeEvent) -> ReconcileResult<Classification> {
    let Some(kind) = EventKind::parse(&event.event_type) else {
        return Ok(Classification::Ignore);
    };
    let object = &event.data.object;

    let cents = match kind {
        EventKind::ChargeSucceeded => object.amount,
        EventKind::InvoicePaid => object.amount_paid,
    }
    .ok_or_else(|| {
        ReconcileError::UnrecognizedEventShape(format!(
            "{} event {} has no amount",
            kind.as_str(),
            event.id
        ))
    })?;

    let seconds = object.created.unwrap_or(event.created);
    let occurred_at = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        ReconcileError::UnrecognizedEventShape(format!("timestamp {seconds} is out of range"))
    })?;

    let message = build_message(
        object.billing_reason.as_deref(),
        object.status.as_deref(),
        object.failure_message.as_deref(),
        object
            .outcome
            .as_ref()
            .and_then(|o| o.seller_message.as_deref()),
    );

    let classified = ClassifiedEvent {
        kind,
        event_id: event.id.clone(),
        customer_id: object.customer.clone(),
        amount: cents_to_amount(cents),
        occurred_at,
        status: object.status.clone(),
        message,
        subscription_id: object.subscription_id().map(str::to_string),
    };

    if kind == EventKind::ChargeSucceeded && object.is_subscription_driven() {
        return Ok(Classification::LogOnly(classified));
    }
    // Trials and fully discounted invoices: no charge exists to record.
    if kind == EventKind::InvoicePaid && cents == 0 {
        return Ok(Classification::LogOnly(classified));
    }
    Ok(Classification::LogAndDonate(classified))
}
