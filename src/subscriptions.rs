use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::donations::FundAllocation;

/// Diesel model for the subscriptions table
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_subscription_id: String,
    pub person_id: Option<Uuid>,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSubscription {
    pub tenant_id: Uuid,
    pub provider_subscription_id: String,
    pub person_id: Option<Uuid>,
    pub customer_id: String,
}

/// Recurring per-fund amount, consulted when a renewal invoice has no fund metadata.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::subscription_funds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFund {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_subscription_id: String,
    pub fund_id: Uuid,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::subscription_funds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSubscriptionFund {
    pub tenant_id: Uuid,
    pub provider_subscription_id: String,
    pub fund_id: Uuid,
    pub amount: BigDecimal,
}

impl From<&SubscriptionFund> for FundAllocation {
    fn from(fund: &SubscriptionFund) -> Self {
        Self {
            fund_id: fund.fund_id,
            amount: fund.amount.clone(),
        }
    }
}
