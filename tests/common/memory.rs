//! In-memory stores and a scripted payment gateway.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use donations::customers::Customer;
use donations::donation_batches::{DonationBatch, NewDonationBatch};
use donations::donation_service::DonationService;
use donations::donations::{Donation, FundDonation, NewDonation, NewFundDonation};
use donations::error::{ReconcileError, ReconcileResult};
use donations::event_logs::{EventLog, NewEventLog};
use donations::gateway_credentials::{GatewayCredential, NewGatewayCredential};
use donations::repositories::{
    CustomerStore, DonationBatchStore, DonationStore, EventLogStore, GatewayCredentialStore,
    Repositories, SubscriptionStore,
};
use donations::secret_codec::SecretCodec;
use donations::stripe_client::{
    ChargeDetail, ChargeRequest, ChargeResult, PaymentGateway, SubscriptionRequest,
    SubscriptionResult,
};
use donations::subscriptions::{
    NewSubscription, NewSubscriptionFund, Subscription, SubscriptionFund,
};
use donations::webhook_signature::compute_signature;
use donations::{WebhookOutcome, WebhookReconciler};

pub const SECRET_KEY: &str = "sk_test_4eC39HqLyjWDarjtT1zdp7dc";
pub const WEBHOOK_SECRET: &str = "whsec_test_reconciliation";
pub const PRODUCT_ID: &str = "prod_donations";

pub fn test_codec() -> SecretCodec {
    SecretCodec::new([11u8; 32])
}

/// `Stripe-Signature` value for `payload`, signed now.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let signature = compute_signature(secret, timestamp, payload).unwrap();
    format!("t={},v1={}", timestamp, signature)
}

#[derive(Default)]
struct LedgerState {
    credentials: Vec<GatewayCredential>,
    customers: Vec<Customer>,
    event_logs: Vec<EventLog>,
    batches: Vec<DonationBatch>,
    donations: Vec<Donation>,
    fund_donations: Vec<FundDonation>,
    subscriptions: Vec<Subscription>,
    subscription_funds: Vec<SubscriptionFund>,
}

/// Every store behind one lock, so each trait call is atomic.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            gateway_credentials: self.clone(),
            customers: self.clone(),
            event_logs: self.clone(),
            batches: self.clone(),
            donations: self.clone(),
            subscriptions: self.clone(),
        }
    }

    pub fn add_gateway(&self, codec: &SecretCodec, tenant_id: Uuid) {
        let new = NewGatewayCredential::encrypt(
            codec,
            tenant_id,
            "pk_test",
            SECRET_KEY,
            WEBHOOK_SECRET,
            Some(PRODUCT_ID),
        )
        .unwrap();
        self.state.lock().unwrap().credentials.push(GatewayCredential {
            id: Uuid::now_v7(),
            tenant_id: new.tenant_id,
            provider: new.provider,
            public_key: new.public_key,
            encrypted_secret_key: new.encrypted_secret_key,
            encrypted_webhook_key: new.encrypted_webhook_key,
            encrypted_product_id: new.encrypted_product_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }

    pub fn link_customer(&self, tenant_id: Uuid, provider_customer_id: &str) -> Uuid {
        let person_id = Uuid::now_v7();
        self.state.lock().unwrap().customers.push(Customer {
            id: Uuid::now_v7(),
            tenant_id,
            provider_customer_id: provider_customer_id.to_string(),
            person_id,
            created_at: Utc::now(),
        });
        person_id
    }

    pub fn donations(&self, tenant_id: Uuid) -> Vec<Donation> {
        let state = self.state.lock().unwrap();
        state
            .donations
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn fund_donations(&self, tenant_id: Uuid) -> Vec<FundDonation> {
        let state = self.state.lock().unwrap();
        state
            .fund_donations
            .iter()
            .filter(|f| f.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn event_logs(&self, tenant_id: Uuid) -> Vec<EventLog> {
        let state = self.state.lock().unwrap();
        state
            .event_logs
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn batches(&self, tenant_id: Uuid) -> Vec<DonationBatch> {
        let state = self.state.lock().unwrap();
        state
            .batches
            .iter()
            .filter(|b| b.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn subscription_funds(&self, tenant_id: Uuid) -> Vec<SubscriptionFund> {
        let state = self.state.lock().unwrap();
        state
            .subscription_funds
            .iter()
            .filter(|f| f.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GatewayCredentialStore for MemoryLedger {
    async fn load_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<GatewayCredential>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .credentials
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerStore for MemoryLedger {
    async fn get_by_provider_customer_id(
        &self,
        tenant_id: Uuid,
        provider_customer_id: &str,
    ) -> Result<Option<Customer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .customers
            .iter()
            .find(|c| c.tenant_id == tenant_id && c.provider_customer_id == provider_customer_id)
            .cloned())
    }
}

#[async_trait]
impl EventLogStore for MemoryLedger {
    async fn record_if_new(&self, entry: NewEventLog) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let exists = state.event_logs.iter().any(|e| {
            e.tenant_id == entry.tenant_id && e.provider_event_id == entry.provider_event_id
        });
        if exists {
            return Ok(false);
        }
        state.event_logs.push(EventLog {
            id: Uuid::now_v7(),
            tenant_id: entry.tenant_id,
            provider_event_id: entry.provider_event_id,
            provider: entry.provider,
            customer_id: entry.customer_id,
            event_type: entry.event_type,
            status: entry.status,
            message: entry.message,
            occurred_at: entry.occurred_at,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn get_by_provider_event_id(
        &self,
        tenant_id: Uuid,
        provider_event_id: &str,
    ) -> Result<Option<EventLog>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .event_logs
            .iter()
            .find(|e| e.tenant_id == tenant_id && e.provider_event_id == provider_event_id)
            .cloned())
    }
}

#[async_trait]
impl DonationBatchStore for MemoryLedger {
    async fn get_or_create_current(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<DonationBatch> {
        let mut state = self.state.lock().unwrap();
        if let Some(batch) = state
            .batches
            .iter()
            .find(|b| b.tenant_id == tenant_id && b.is_current)
        {
            return Ok(batch.clone());
        }

        let new = NewDonationBatch::current(tenant_id, today);
        let batch = DonationBatch {
            id: Uuid::now_v7(),
            tenant_id: new.tenant_id,
            name: new.name,
            batch_date: new.batch_date,
            is_current: new.is_current,
            created_at: Utc::now(),
        };
        state.batches.push(batch.clone());
        Ok(batch)
    }
}

#[async_trait]
impl DonationStore for MemoryLedger {
    async fn create(&self, new: NewDonation) -> Result<Donation> {
        let donation = Donation {
            id: Uuid::now_v7(),
            tenant_id: new.tenant_id,
            batch_id: new.batch_id,
            person_id: new.person_id,
            donation_date: new.donation_date,
            amount: new.amount,
            method: new.method,
            method_details: new.method_details,
            notes: new.notes,
            provider_event_id: new.provider_event_id,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().donations.push(donation.clone());
        Ok(donation)
    }

    async fn create_fund_donations(
        &self,
        tenant_id: Uuid,
        funds: Vec<NewFundDonation>,
    ) -> Result<Vec<FundDonation>> {
        if funds.iter().any(|f| f.tenant_id != tenant_id) {
            anyhow::bail!("Fund allocation belongs to a different tenant");
        }
        let created: Vec<FundDonation> = funds
            .into_iter()
            .map(|f| FundDonation {
                id: Uuid::now_v7(),
                tenant_id: f.tenant_id,
                donation_id: f.donation_id,
                fund_id: f.fund_id,
                amount: f.amount,
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .fund_donations
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_by_batch(&self, tenant_id: Uuid, batch_id: Uuid) -> Result<Vec<Donation>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .donations
            .iter()
            .filter(|d| d.tenant_id == tenant_id && d.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn list_fund_donations(
        &self,
        tenant_id: Uuid,
        donation_id: Uuid,
    ) -> Result<Vec<FundDonation>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .fund_donations
            .iter()
            .filter(|f| f.tenant_id == tenant_id && f.donation_id == donation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryLedger {
    async fn create_with_funds(
        &self,
        new: NewSubscription,
        funds: Vec<NewSubscriptionFund>,
    ) -> Result<(Subscription, Vec<SubscriptionFund>)> {
        let subscription = Subscription {
            id: Uuid::now_v7(),
            tenant_id: new.tenant_id,
            provider_subscription_id: new.provider_subscription_id,
            person_id: new.person_id,
            customer_id: new.customer_id,
            created_at: Utc::now(),
        };
        let funds: Vec<SubscriptionFund> = funds
            .into_iter()
            .map(|f| SubscriptionFund {
                id: Uuid::now_v7(),
                tenant_id: f.tenant_id,
                provider_subscription_id: f.provider_subscription_id,
                fund_id: f.fund_id,
                amount: f.amount,
            })
            .collect();

        let mut state = self.state.lock().unwrap();
        state.subscriptions.push(subscription.clone());
        state.subscription_funds.extend(funds.iter().cloned());
        Ok((subscription, funds))
    }

    async fn load_funds_by_subscription_id(
        &self,
        tenant_id: Uuid,
        provider_subscription_id: &str,
    ) -> Result<Vec<SubscriptionFund>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscription_funds
            .iter()
            .filter(|f| {
                f.tenant_id == tenant_id && f.provider_subscription_id == provider_subscription_id
            })
            .cloned()
            .collect())
    }
}

/// Payment gateway double: serves scripted charges and records requests.
#[derive(Default)]
pub struct FakeGateway {
    charges: Mutex<HashMap<String, ChargeDetail>>,
    pub charge_requests: Mutex<Vec<ChargeRequest>>,
    pub subscription_requests: Mutex<Vec<SubscriptionRequest>>,
    pub failure: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_charge(&self, charge: ChargeDetail) {
        self.charges
            .lock()
            .unwrap()
            .insert(charge.id.clone(), charge);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn check_failure(&self) -> ReconcileResult<()> {
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ReconcileError::Gateway(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn get_charge(&self, secret_key: &str, charge_id: &str) -> ReconcileResult<ChargeDetail> {
        assert_eq!(secret_key, SECRET_KEY);
        self.check_failure()?;
        self.charges
            .lock()
            .unwrap()
            .get(charge_id)
            .cloned()
            .ok_or_else(|| ReconcileError::Gateway(format!("No such charge: '{charge_id}'")))
    }

    async fn create_charge(
        &self,
        secret_key: &str,
        request: ChargeRequest,
    ) -> ReconcileResult<ChargeResult> {
        assert_eq!(secret_key, SECRET_KEY);
        self.check_failure()?;
        let result = ChargeResult {
            id: format!("pi_test_{}", Uuid::new_v4().simple()),
            status: "succeeded".to_string(),
            amount: request.amount_cents,
        };
        self.charge_requests.lock().unwrap().push(request);
        Ok(result)
    }

    async fn create_subscription(
        &self,
        secret_key: &str,
        request: SubscriptionRequest,
    ) -> ReconcileResult<SubscriptionResult> {
        assert_eq!(secret_key, SECRET_KEY);
        self.check_failure()?;
        self.subscription_requests.lock().unwrap().push(request);
        Ok(SubscriptionResult {
            id: format!("sub_test_{}", Uuid::new_v4().simple()),
            status: "active".to_string(),
        })
    }
}

/// One tenant with Stripe configured, wired to memory stores.
pub struct Harness {
    pub tenant_id: Uuid,
    pub ledger: Arc<MemoryLedger>,
    pub gateway: Arc<FakeGateway>,
    pub codec: SecretCodec,
    pub reconciler: WebhookReconciler,
    pub service: DonationService,
}

impl Harness {
    pub fn new() -> Self {
        let tenant_id = Uuid::now_v7();
        let ledger = MemoryLedger::new();
        let gateway = FakeGateway::new();
        let codec = test_codec();
        ledger.add_gateway(&codec, tenant_id);

        let repos = ledger.repositories();
        let reconciler = WebhookReconciler::new(repos.clone(), gateway.clone(), codec.clone());
        let service = DonationService::new(repos, gateway.clone(), codec.clone());

        Self {
            tenant_id,
            ledger,
            gateway,
            codec,
            reconciler,
            service,
        }
    }

    /// Sign `payload` with the tenant's webhook secret and deliver it.
    pub async fn deliver(&self, payload: &[u8]) -> ReconcileResult<WebhookOutcome> {
        let signature = sign(payload, WEBHOOK_SECRET);
        self.reconciler
            .handle_webhook(self.tenant_id, payload, &signature)
            .await
    }
}

/// `charge.succeeded` with inline card or ACH details.
pub fn charge_succeeded(
    event_id: &str,
    amount: i64,
    customer: &str,
    payment_method_details: serde_json::Value,
    metadata: serde_json::Value,
) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "charge.succeeded",
        "created": 1_760_000_000,
        "data": {"object": {
            "id": format!("ch_{event_id}"),
            "object": "charge",
            "amount": amount,
            "currency": "usd",
            "customer": customer,
            "created": 1_760_000_000,
            "status": "succeeded",
            "description": "Online gift",
            "outcome": {"seller_message": "Payment complete.", "type": "authorized"},
            "metadata": metadata,
            "payment_method_details": payment_method_details
        }}
    }))
    .unwrap()
}

/// `invoice.paid` referencing its charge and subscription, without fund metadata.
pub fn invoice_paid(
    event_id: &str,
    amount_paid: i64,
    customer: &str,
    subscription: &str,
    charge: &str,
) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "invoice.paid",
        "created": 1_760_000_500,
        "data": {"object": {
            "id": format!("in_{event_id}"),
            "object": "invoice",
            "amount_paid": amount_paid,
            "currency": "usd",
            "customer": customer,
            "created": 1_760_000_400,
            "status": "paid",
            "billing_reason": "subscription_cycle",
            "subscription": subscription,
            "charge": charge,
            "metadata": {}
        }}
    }))
    .unwrap()
}

pub fn card(last4: &str) -> serde_json::Value {
    serde_json::json!({"type": "card", "card": {"brand": "visa", "last4": last4}})
}

pub fn ach_debit(last4: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "ach_debit",
        "ach_debit": {"bank_name": "STRIPE TEST BANK", "last4": last4}
    })
}
