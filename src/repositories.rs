//! Storage seams used by the reconciliation core.
//!
//! Every method is scoped by tenant id. The Postgres repositories in the
//! `*_repo` modules implement these traits; tests supply in-memory stores.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::customers::Customer;
use crate::customers_repo::CustomersRepository;
use crate::db::PgPool;
use crate::donation_batches::DonationBatch;
use crate::donation_batches_repo::DonationBatchesRepository;
use crate::donations::{Donation, FundDonation, NewDonation, NewFundDonation};
use crate::donations_repo::DonationsRepository;
use crate::event_logs::{EventLog, NewEventLog};
use crate::event_logs_repo::EventLogsRepository;
use crate::gateway_credentials::GatewayCredential;
use crate::gateway_credentials_repo::GatewayCredentialsRepository;
use crate::subscriptions::{NewSubscription, NewSubscriptionFund, Subscription, SubscriptionFund};
use crate::subscriptions_repo::SubscriptionsRepository;

#[async_trait]
pub trait GatewayCredentialStore: Send + Sync {
    /// All credentials for a tenant. Empty means the tenant has no gateway.
    async fn load_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<GatewayCredential>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_by_provider_customer_id(
        &self,
        tenant_id: Uuid,
        provider_customer_id: &str,
    ) -> Result<Option<Customer>>;
}

#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Insert the entry unless one exists for the same tenant and provider
    /// event id. Returns whether this call created it.
    async fn record_if_new(&self, entry: NewEventLog) -> Result<bool>;

    async fn get_by_provider_event_id(
        &self,
        tenant_id: Uuid,
        provider_event_id: &str,
    ) -> Result<Option<EventLog>>;
}

#[async_trait]
pub trait DonationBatchStore: Send + Sync {
    /// Atomically fetch the tenant's open batch or create one dated `today`.
    /// Concurrent callers for one tenant all receive the same batch.
    async fn get_or_create_current(&self, tenant_id: Uuid, today: NaiveDate)
    -> Result<DonationBatch>;
}

#[async_trait]
pub trait DonationStore: Send + Sync {
    async fn create(&self, donation: NewDonation) -> Result<Donation>;

    /// Persist all allocations for one donation together or not at all.
    async fn create_fund_donations(
        &self,
        tenant_id: Uuid,
        funds: Vec<NewFundDonation>,
    ) -> Result<Vec<FundDonation>>;

    async fn list_by_batch(&self, tenant_id: Uuid, batch_id: Uuid) -> Result<Vec<Donation>>;

    async fn list_fund_donations(
        &self,
        tenant_id: Uuid,
        donation_id: Uuid,
    ) -> Result<Vec<FundDonation>>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create_with_funds(
        &self,
        subscription: NewSubscription,
        funds: Vec<NewSubscriptionFund>,
    ) -> Result<(Subscription, Vec<SubscriptionFund>)>;

    async fn load_funds_by_subscription_id(
        &self,
        tenant_id: Uuid,
        provider_subscription_id: &str,
    ) -> Result<Vec<SubscriptionFund>>;
}

/// One handle per storage seam, shared across request tasks.
#[derive(Clone)]
pub struct Repositories {
    pub gateway_credentials: Arc<dyn GatewayCredentialStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub event_logs: Arc<dyn EventLogStore>,
    pub batches: Arc<dyn DonationBatchStore>,
    pub donations: Arc<dyn DonationStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            gateway_credentials: Arc::new(GatewayCredentialsRepository::new(pool.clone())),
            customers: Arc::new(CustomersRepository::new(pool.clone())),
            event_logs: Arc::new(EventLogsRepository::new(pool.clone())),
            batches: Arc::new(DonationBatchesRepository::new(pool.clone())),
            donations: Arc::new(DonationsRepository::new(pool.clone())),
            subscriptions: Arc::new(SubscriptionsRepository::new(pool)),
        }
    }
}
