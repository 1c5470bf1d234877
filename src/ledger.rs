//! Writes donations into the tenant's current batch.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::donations::{
    Donation, FundAllocation, FundDonation, NewDonation, NewFundDonation, merge_allocations,
    parse_fund_metadata, validate_allocations,
};
use crate::error::ReconcileResult;
use crate::repositories::{Repositories, SubscriptionStore};

/// A donation before it is attached to a batch.
#[derive(Debug, Clone)]
pub struct DonationInput {
    pub tenant_id: Uuid,
    pub person_id: Option<Uuid>,
    pub donation_date: DateTime<Utc>,
    pub amount: BigDecimal,
    pub method: String,
    pub method_details: Option<String>,
    pub notes: Option<String>,
    pub provider_event_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggedDonation {
    pub donation: Donation,
    pub funds: Vec<FundDonation>,
}

/// Fund split for an incoming payment, in order of preference: inline
/// `metadata.funds`, the split stored when the subscription was created, then
/// the subscription metadata copied onto the invoice. The last covers the
/// first invoice, which Stripe settles before the stored split is committed.
pub async fn resolve_fund_allocations(
    subscriptions: &dyn SubscriptionStore,
    tenant_id: Uuid,
    fund_metadata: Option<&str>,
    subscription_id: Option<&str>,
    subscription_fund_metadata: Option<&str>,
) -> ReconcileResult<Vec<FundAllocation>> {
    if let Some(raw) = fund_metadata {
        return parse_fund_metadata(raw);
    }

    let Some(subscription_id) = subscription_id else {
        return Ok(Vec::new());
    };

    let funds = subscriptions
        .load_funds_by_subscription_id(tenant_id, subscription_id)
        .await?;
    if !funds.is_empty() {
        debug!(
            subscription_id,
            funds = funds.len(),
            "Recovered fund split from subscription"
        );
        return Ok(funds.iter().map(FundAllocation::from).collect());
    }

    match subscription_fund_metadata {
        Some(raw) => {
            debug!(subscription_id, "Using fund split from subscription metadata");
            parse_fund_metadata(raw)
        }
        None => {
            warn!(subscription_id, "No fund split known for subscription");
            Ok(Vec::new())
        }
    }
}

pub async fn log_donation(
    repos: &Repositories,
    input: DonationInput,
    allocations: Vec<FundAllocation>,
) -> ReconcileResult<LoggedDonation> {
    validate_allocations(&input.amount, &allocations)?;
    let allocations = merge_allocations(allocations);

    let batch = repos
        .batches
        .get_or_create_current(input.tenant_id, Utc::now().date_naive())
        .await?;

    let donation = repos
        .donations
        .create(NewDonation {
            tenant_id: input.tenant_id,
            batch_id: batch.id,
            person_id: input.person_id,
            donation_date: input.donation_date,
            amount: input.amount,
            method: input.method,
            method_details: input.method_details,
            notes: input.notes,
            provider_event_id: input.provider_event_id,
        })
        .await?;

    let new_funds = allocations
        .into_iter()
        .map(|allocation| NewFundDonation {
            tenant_id: donation.tenant_id,
            donation_id: donation.id,
            fund_id: allocation.fund_id,
            amount: allocation.amount,
        })
        .collect();
    let funds = repos
        .donations
        .create_fund_donations(donation.tenant_id, new_funds)
        .await?;

    metrics::counter!("donations.recorded").increment(1);
    info!(
        tenant_id = %donation.tenant_id,
        donation_id = %donation.id,
        batch_id = %batch.id,
        amount = %donation.amount,
        funds = funds.len(),
        "Recorded donation"
    );

    Ok(LoggedDonation { donation, funds })
}
