//! Payments started by the organization itself, and donations reported by
//! outside sources holding the tenant's secret key.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

use crate::donations::{
    FundAllocation, encode_fund_metadata, merge_allocations, validate_allocations,
};
use crate::error::{ReconcileError, ReconcileResult};
use crate::gateway_credentials::{TenantGateway, resolve_tenant_gateway};
use crate::ledger::{DonationInput, LoggedDonation, log_donation};
use crate::money::{amount_to_cents, deserialize_amount};
use crate::repositories::Repositories;
use crate::secret_codec::SecretCodec;
use crate::stripe_client::{
    BillingInterval, ChargeRequest, ChargeResult, PaymentGateway, PaymentType, SubscriptionRequest,
    SubscriptionResult,
};
use crate::subscriptions::{NewSubscription, NewSubscriptionFund, Subscription, SubscriptionFund};

fn default_currency() -> String {
    "usd".to_string()
}

fn default_interval_count() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeInstruction {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub description: Option<String>,
    #[serde(default)]
    pub funds: Vec<FundAllocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeInstruction {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub interval: BillingInterval,
    #[serde(default = "default_interval_count")]
    pub interval_count: u64,
    #[serde(default)]
    pub funds: Vec<FundAllocation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSubscription {
    pub provider: SubscriptionResult,
    pub subscription: Subscription,
    pub funds: Vec<SubscriptionFund>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDonation {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: BigDecimal,
    pub donation_date: Option<DateTime<Utc>>,
    pub person_id: Option<Uuid>,
    pub method: String,
    pub method_details: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct DonationService {
    repos: Repositories,
    gateway: Arc<dyn PaymentGateway>,
    codec: SecretCodec,
}

impl DonationService {
    pub fn new(repos: Repositories, gateway: Arc<dyn PaymentGateway>, codec: SecretCodec) -> Self {
        Self {
            repos,
            gateway,
            codec,
        }
    }

    async fn tenant_gateway(&self, tenant_id: Uuid) -> ReconcileResult<TenantGateway> {
        resolve_tenant_gateway(
            self.repos.gateway_credentials.as_ref(),
            &self.codec,
            tenant_id,
        )
        .await
    }

    /// Charge a saved payment method. The donation itself is written when
    /// Stripe delivers the resulting `charge.succeeded` webhook.
    pub async fn charge(
        &self,
        tenant_id: Uuid,
        instruction: ChargeInstruction,
    ) -> ReconcileResult<ChargeResult> {
        let amount_cents = positive_cents(&instruction.amount)?;
        validate_allocations(&instruction.amount, &instruction.funds)?;
        let gateway = self.tenant_gateway(tenant_id).await?;

        let request = ChargeRequest {
            amount_cents,
            currency: instruction.currency,
            customer_id: instruction.customer_id,
            payment_method_id: instruction.payment_method_id,
            payment_type: instruction.payment_type,
            description: instruction.description,
            metadata: fund_metadata(&instruction.funds)?,
        };
        let result = self
            .gateway
            .create_charge(&gateway.secret_key, request)
            .await?;

        metrics::counter!("donations.charge.created").increment(1);
        info!(%tenant_id, charge_id = %result.id, "Initiated charge");
        Ok(result)
    }

    /// Create a recurring subscription and store its fund split, which later
    /// `invoice.paid` events fall back on.
    pub async fn subscribe(
        &self,
        tenant_id: Uuid,
        instruction: SubscribeInstruction,
    ) -> ReconcileResult<CreatedSubscription> {
        let amount_cents = positive_cents(&instruction.amount)?;
        if instruction.interval_count == 0 {
            return Err(ReconcileError::Validation(
                "interval count must be at least 1".into(),
            ));
        }
        validate_allocations(&instruction.amount, &instruction.funds)?;
        let funds = merge_allocations(instruction.funds);

        let gateway = self.tenant_gateway(tenant_id).await?;
        let product_id = gateway.product_id.clone().ok_or_else(|| {
            ReconcileError::Validation("tenant gateway has no product configured".into())
        })?;

        let request = SubscriptionRequest {
            amount_cents,
            currency: instruction.currency,
            customer_id: instruction.customer_id.clone(),
            payment_method_id: instruction.payment_method_id,
            product_id,
            interval: instruction.interval,
            interval_count: instruction.interval_count,
            metadata: fund_metadata(&funds)?,
        };
        let provider = self
            .gateway
            .create_subscription(&gateway.secret_key, request)
            .await?;

        let person_id = self
            .repos
            .customers
            .get_by_provider_customer_id(tenant_id, &instruction.customer_id)
            .await?
            .map(|c| c.person_id);

        let new_funds = funds
            .into_iter()
            .map(|f| NewSubscriptionFund {
                tenant_id,
                provider_subscription_id: provider.id.clone(),
                fund_id: f.fund_id,
                amount: f.amount,
            })
            .collect();
        let (subscription, funds) = self
            .repos
            .subscriptions
            .create_with_funds(
                NewSubscription {
                    tenant_id,
                    provider_subscription_id: provider.id.clone(),
                    person_id,
                    customer_id: instruction.customer_id,
                },
                new_funds,
            )
            .await?;

        metrics::counter!("donations.subscription.created").increment(1);
        info!(
            %tenant_id,
            subscription_id = %subscription.provider_subscription_id,
            funds = funds.len(),
            "Created subscription"
        );

        Ok(CreatedSubscription {
            provider,
            subscription,
            funds,
        })
    }

    /// Record a donation from an outside source. The caller proves it acts
    /// for the tenant by presenting the tenant's secret key.
    pub async fn log_external_donation(
        &self,
        tenant_id: Uuid,
        presented_secret_key: &str,
        donation: ExternalDonation,
        fund: FundAllocation,
    ) -> ReconcileResult<LoggedDonation> {
        let gateway = self.tenant_gateway(tenant_id).await?;
        let matches: bool = presented_secret_key
            .as_bytes()
            .ct_eq(gateway.secret_key.as_bytes())
            .into();
        if !matches {
            return Err(ReconcileError::Unauthenticated(
                "secret key does not match".into(),
            ));
        }

        positive_cents(&donation.amount)?;
        log_donation(
            &self.repos,
            DonationInput {
                tenant_id,
                person_id: donation.person_id,
                donation_date: donation.donation_date.unwrap_or_else(Utc::now),
                amount: donation.amount,
                method: donation.method,
                method_details: donation.method_details,
                notes: donation.notes,
                provider_event_id: None,
            },
            vec![fund],
        )
        .await
    }
}

fn positive_cents(amount: &BigDecimal) -> ReconcileResult<i64> {
    let cents = amount_to_cents(amount)?;
    if cents <= 0 {
        return Err(ReconcileError::Validation(
            "amount must be greater than 0".into(),
        ));
    }
    Ok(cents)
}

/// Stripe rejects metadata values longer than this.
const MAX_METADATA_VALUE_LEN: usize = 500;

fn fund_metadata(funds: &[FundAllocation]) -> ReconcileResult<HashMap<String, String>> {
    let mut metadata = HashMap::new();
    if funds.is_empty() {
        return Ok(metadata);
    }
    let encoded = encode_fund_metadata(funds)?;
    if encoded.len() > MAX_METADATA_VALUE_LEN {
        return Err(ReconcileError::Validation(format!(
            "{} fund allocations do not fit in Stripe metadata ({} of {} characters)",
            funds.len(),
            encoded.len(),
            MAX_METADATA_VALUE_LEN
        )));
    }
    metadata.insert("funds".to_string(), encoded);
    Ok(metadata)
}
