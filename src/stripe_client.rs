//! Payment provider calls, keyed per request by the tenant's secret key.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stripe::generated::billing::subscription::{
    CreateSubscriptionItems, PlanInterval, SubscriptionItemPriceData,
    SubscriptionItemPriceDataRecurring, SubscriptionProrationBehavior,
};
use stripe::{
    Charge, ChargeId, Client, CreateCharge, CreatePaymentIntent, CreateSubscription, Currency,
    CustomerId, PaymentIntent, PaymentIntentOffSession, PaymentMethodId,
};
use tracing::{error, info};

use crate::error::{ReconcileError, ReconcileResult};
use crate::payment_details::PaymentMethodDetails;

/// The part of a retrieved charge the extractor needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeDetail {
    pub id: String,
    pub amount: Option<i64>,
    pub status: Option<String>,
    pub payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Card,
    Bank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl From<BillingInterval> for PlanInterval {
    fn from(interval: BillingInterval) -> Self {
        match interval {
            BillingInterval::Day => Self::Day,
            BillingInterval::Week => Self::Week,
            BillingInterval::Month => Self::Month,
            BillingInterval::Year => Self::Year,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub customer_id: String,
    /// Required for card charges; bank charges use the customer's default source.
    pub payment_method_id: Option<String>,
    pub payment_type: PaymentType,
    pub description: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResult {
    pub id: String,
    pub status: String,
    pub amount: i64,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub product_id: String,
    pub interval: BillingInterval,
    pub interval_count: u64,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResult {
    pub id: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn get_charge(&self, secret_key: &str, charge_id: &str) -> ReconcileResult<ChargeDetail>;

    async fn create_charge(
        &self,
        secret_key: &str,
        request: ChargeRequest,
    ) -> ReconcileResult<ChargeResult>;

    async fn create_subscription(
        &self,
        secret_key: &str,
        request: SubscriptionRequest,
    ) -> ReconcileResult<SubscriptionResult>;
}

/// `PaymentGateway` over the Stripe API.
#[derive(Debug, Clone, Default)]
pub struct StripeGateway;

impl StripeGateway {
    pub fn new() -> Self {
        Self
    }
}

fn parse_id<T>(raw: &str, what: &str) -> ReconcileResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ReconcileError::Validation(format!("invalid {what} '{raw}': {e}")))
}

fn parse_currency(raw: &str) -> ReconcileResult<Currency> {
    raw.to_lowercase()
        .parse::<Currency>()
        .map_err(|_| ReconcileError::Validation(format!("unsupported currency '{raw}'")))
}

/// Re-read a typed Stripe object through its JSON form.
fn reshape<T: Serialize, U: DeserializeOwned>(object: &T) -> ReconcileResult<U> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|e| ReconcileError::Gateway(format!("unexpected provider response: {e}")))
}

fn gateway_error(operation: &str, e: stripe::StripeError) -> ReconcileError {
    error!(operation, error = %e, "Stripe request failed");
    metrics::counter!("donations.stripe.api_errors").increment(1);
    ReconcileError::Gateway(e.to_string())
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn get_charge(&self, secret_key: &str, charge_id: &str) -> ReconcileResult<ChargeDetail> {
        let client = Client::new(secret_key);
        let id: ChargeId = parse_id(charge_id, "charge id")?;

        let charge = Charge::retrieve(&client, &id, &[])
            .await
            .map_err(|e| gateway_error("retrieve_charge", e))?;
        reshape(&charge)
    }

    async fn create_charge(
        &self,
        secret_key: &str,
        request: ChargeRequest,
    ) -> ReconcileResult<ChargeResult> {
        let client = Client::new(secret_key);
        let currency = parse_currency(&request.currency)?;
        let customer: CustomerId = parse_id(&request.customer_id, "customer id")?;

        let result: ChargeResult = match request.payment_type {
            PaymentType::Card => {
                let payment_method_id = request.payment_method_id.as_deref().ok_or_else(|| {
                    ReconcileError::Validation("card charges require a payment method".into())
                })?;
                let payment_method: PaymentMethodId =
                    parse_id(payment_method_id, "payment method id")?;

                let mut params = CreatePaymentIntent::new(request.amount_cents, currency);
                params.customer = Some(customer);
                params.payment_method = Some(payment_method);
                params.confirm = Some(true);
                params.off_session = Some(PaymentIntentOffSession::Exists(true));
                params.description = request.description.as_deref();
                params.metadata = Some(request.metadata.clone());

                let intent = PaymentIntent::create(&client, params)
                    .await
                    .map_err(|e| gateway_error("create_payment_intent", e))?;
                reshape(&intent)?
            }
            PaymentType::Bank => {
                let mut params = CreateCharge::new();
                params.amount = Some(request.amount_cents);
                params.currency = Some(currency);
                params.customer = Some(customer);
                params.description = request.description.as_deref();
                params.metadata = Some(request.metadata.clone());

                let charge = Charge::create(&client, params)
                    .await
                    .map_err(|e| gateway_error("create_charge", e))?;
                reshape(&charge)?
            }
        };

        info!(
            provider_id = %result.id,
            status = %result.status,
            "Created Stripe charge"
        );
        Ok(result)
    }

    async fn create_subscription(
        &self,
        secret_key: &str,
        request: SubscriptionRequest,
    ) -> ReconcileResult<SubscriptionResult> {
        let client = Client::new(secret_key);
        let customer: CustomerId = parse_id(&request.customer_id, "customer id")?;

        let mut params = CreateSubscription::new(customer);
        params.items = Some(vec![CreateSubscriptionItems {
            price_data: Some(SubscriptionItemPriceData {
                currency: parse_currency(&request.currency)?,
                product: request.product_id.clone(),
                recurring: SubscriptionItemPriceDataRecurring {
                    interval: request.interval.into(),
                    interval_count: Some(request.interval_count),
                },
                unit_amount: Some(request.amount_cents),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        params.default_payment_method = Some(&request.payment_method_id);
        params.proration_behavior = Some(SubscriptionProrationBehavior::None);
        params.metadata = Some(request.metadata.clone());

        let subscription = stripe::Subscription::create(&client, params)
            .await
            .map_err(|e| gateway_error("create_subscription", e))?;
        let result: SubscriptionResult = reshape(&subscription)?;

        info!(
            provider_id = %result.id,
            status = %result.status,
            "Created Stripe subscription"
        );
        Ok(result)
    }
}
