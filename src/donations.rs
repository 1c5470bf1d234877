use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};
use crate::money::deserialize_amount;

/// Diesel model for the donations table
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::donations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub batch_id: Uuid,
    pub person_id: Option<Uuid>,
    pub donation_date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub method: String,
    pub method_details: Option<String>,
    pub notes: Option<String>,
    pub provider_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new donations. The batch id is stamped by the ledger.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::donations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDonation {
    pub tenant_id: Uuid,
    pub batch_id: Uuid,
    pub person_id: Option<Uuid>,
    pub donation_date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub method: String,
    pub method_details: Option<String>,
    pub notes: Option<String>,
    pub provider_event_id: Option<String>,
}

/// Diesel model for the fund_donations table
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fund_donations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct FundDonation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub donation_id: Uuid,
    pub fund_id: Uuid,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::fund_donations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewFundDonation {
    pub tenant_id: Uuid,
    pub donation_id: Uuid,
    pub fund_id: Uuid,
    pub amount: BigDecimal,
}

/// The share of a payment attributed to one fund, as carried in
/// `metadata.funds` on provider objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundAllocation {
    #[serde(rename = "id")]
    pub fund_id: Uuid,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
}

/// Parse the JSON encoded fund list from provider metadata.
pub fn parse_fund_metadata(raw: &str) -> ReconcileResult<Vec<FundAllocation>> {
    serde_json::from_str(raw).map_err(|e| {
        ReconcileError::UnrecognizedEventShape(format!("metadata.funds is not a fund list: {e}"))
    })
}

pub fn encode_fund_metadata(allocations: &[FundAllocation]) -> ReconcileResult<String> {
    serde_json::to_string(allocations)
        .map_err(|e| ReconcileError::Validation(format!("cannot encode fund list: {e}")))
}

/// Combine allocations that name the same fund; output is ordered by fund id.
pub fn merge_allocations(allocations: Vec<FundAllocation>) -> Vec<FundAllocation> {
    let mut merged: BTreeMap<Uuid, BigDecimal> = BTreeMap::new();
    for allocation in allocations {
        *merged.entry(allocation.fund_id).or_default() += allocation.amount;
    }
    merged
        .into_iter()
        .map(|(fund_id, amount)| FundAllocation { fund_id, amount })
        .collect()
}

/// Allocations, when present, must account for exactly the donation amount.
pub fn validate_allocations(
    amount: &BigDecimal,
    allocations: &[FundAllocation],
) -> ReconcileResult<()> {
    if allocations.is_empty() {
        return Ok(());
    }
    if let Some(negative) = allocations.iter().find(|a| a.amount < BigDecimal::from(0)) {
        return Err(ReconcileError::Validation(format!(
            "fund {} has a negative allocation",
            negative.fund_id
        )));
    }
    // Columns hold cents; finer amounts would be rounded row by row on write
    if let Some(fractional) = allocations
        .iter()
        .find(|a| a.amount.with_scale(2) != a.amount)
    {
        return Err(ReconcileError::Validation(format!(
            "fund {} allocation {} has more than two decimal places",
            fractional.fund_id, fractional.amount
        )));
    }
    let allocated: BigDecimal = allocations.iter().map(|a| a.amount.clone()).sum();
    if allocated != *amount {
        return Err(ReconcileError::FundAllocationMismatch {
            expected: amount.clone(),
            allocated,
        });
    }
    Ok(())
}
