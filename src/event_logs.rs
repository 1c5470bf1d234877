use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway_credentials::PaymentProvider;

/// Diesel model for the event_logs table.
///
/// One row per provider event id and tenant. Rows are never updated; their
/// existence is what stops a redelivered event from being applied twice.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::event_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_event_id: String,
    pub provider: PaymentProvider,
    pub customer_id: Option<String>,
    pub event_type: String,
    pub status: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new event log entries
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::event_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEventLog {
    pub tenant_id: Uuid,
    pub provider_event_id: String,
    pub provider: PaymentProvider,
    pub customer_id: Option<String>,
    pub event_type: String,
    pub status: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Human readable summary of a payment event.
///
/// Invoices carry a billing reason ("subscription_cycle paid"). Charges fall
/// back to the processor's seller message, prefixed by the failure message
/// when the charge reported one.
pub fn build_message(
    billing_reason: Option<&str>,
    status: Option<&str>,
    failure_message: Option<&str>,
    seller_message: Option<&str>,
) -> String {
    let seller_message = seller_message.unwrap_or_default();
    match (billing_reason, failure_message) {
        (Some(reason), _) => format!("{} {}", reason, status.unwrap_or_default()),
        (None, Some(failure)) => format!("{} {}", failure, seller_message),
        (None, None) => seller_message.to_string(),
    }
}
