//! Turns verified Stripe webhooks into event log entries and donations.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Span, error, info, warn};
use uuid::Uuid;

use crate::donations::validate_allocations;
use crate::error::ReconcileResult;
use crate::event_logs::NewEventLog;
use crate::gateway_credentials::{PaymentProvider, resolve_tenant_gateway};
use crate::ledger::{DonationInput, log_donation, resolve_fund_allocations};
use crate::payment_details::extract_payment_details;
use crate::repositories::Repositories;
use crate::secret_codec::SecretCodec;
use crate::stripe_client::PaymentGateway;
use crate::stripe_events::{Classification, ClassifiedEvent, StripeEvent, classify};
use crate::webhook_signature::construct_event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event type not relevant to donations; nothing written.
    Ignored,
    /// Event id already in the event log; nothing written.
    Duplicate,
    /// Logged without a donation.
    Logged,
    DonationRecorded(Uuid),
}

#[derive(Clone)]
pub struct WebhookReconciler {
    repos: Repositories,
    gateway: Arc<dyn PaymentGateway>,
    codec: SecretCodec,
}

impl WebhookReconciler {
    pub fn new(repos: Repositories, gateway: Arc<dyn PaymentGateway>, codec: SecretCodec) -> Self {
        Self {
            repos,
            gateway,
            codec,
        }
    }

    #[tracing::instrument(
        skip(self, raw_body, signature),
        fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
    )]
    pub async fn handle_webhook(
        &self,
        tenant_id: Uuid,
        raw_body: &[u8],
        signature: &str,
    ) -> ReconcileResult<WebhookOutcome> {
        metrics::counter!("donations.webhook.received").increment(1);
        let start = Instant::now();

        let result = self.process(tenant_id, raw_body, signature).await;

        match &result {
            Ok(WebhookOutcome::Ignored) => {
                metrics::counter!("donations.webhook.ignored").increment(1);
            }
            Ok(WebhookOutcome::Duplicate) => {
                metrics::counter!("donations.webhook.duplicate").increment(1);
            }
            Ok(_) => {}
            Err(e) if e.is_unauthenticated() => {
                warn!(error = %e, "Rejected webhook");
                metrics::counter!("donations.webhook.signature_invalid").increment(1);
            }
            Err(e) => {
                warn!(error = %e, "Failed to reconcile webhook");
                metrics::counter!("donations.webhook.failed").increment(1);
            }
        }

        metrics::histogram!("donations.webhook.processing_ms")
            .record(start.elapsed().as_millis() as f64);
        result
    }

    async fn process(
        &self,
        tenant_id: Uuid,
        raw_body: &[u8],
        signature: &str,
    ) -> ReconcileResult<WebhookOutcome> {
        let gateway = resolve_tenant_gateway(
            self.repos.gateway_credentials.as_ref(),
            &self.codec,
            tenant_id,
        )
        .await?;
        let event = construct_event(raw_body, signature, &gateway.webhook_key)?;

        let span = Span::current();
        span.record("event_id", event.id.as_str());
        span.record("event_type", event.event_type.as_str());

        let classified = match classify(&event)? {
            Classification::Ignore => return Ok(WebhookOutcome::Ignored),
            Classification::LogOnly(classified) => {
                let created = self
                    .repos
                    .event_logs
                    .record_if_new(log_entry(tenant_id, &classified))
                    .await?;
                if !created {
                    return Ok(WebhookOutcome::Duplicate);
                }
                info!("Logged subscription charge without a donation");
                return Ok(WebhookOutcome::Logged);
            }
            Classification::LogAndDonate(classified) => classified,
        };

        // Everything that can reject the event runs before the log write, so
        // a failure here leaves the event open for redelivery.
        let object = &event.data.object;
        let details =
            extract_payment_details(self.gateway.as_ref(), &gateway.secret_key, object).await?;
        let person_id = self.person_for(tenant_id, &event, &classified).await?;
        let allocations = resolve_fund_allocations(
            self.repos.subscriptions.as_ref(),
            tenant_id,
            object.fund_metadata(),
            classified.subscription_id.as_deref(),
            object.subscription_fund_metadata(),
        )
        .await?;
        validate_allocations(&classified.amount, &allocations)?;

        let created = self
            .repos
            .event_logs
            .record_if_new(log_entry(tenant_id, &classified))
            .await?;
        if !created {
            info!("Event already applied");
            return Ok(WebhookOutcome::Duplicate);
        }

        let logged = log_donation(
            &self.repos,
            DonationInput {
                tenant_id,
                person_id,
                donation_date: classified.occurred_at,
                amount: classified.amount.clone(),
                method: details.method.label().to_string(),
                method_details: Some(details.method_details),
                notes: None,
                provider_event_id: Some(classified.event_id.clone()),
            },
            allocations,
        )
        .await
        .inspect_err(|e| error!(error = %e, "Event logged but donation write failed"))?;

        Ok(WebhookOutcome::DonationRecorded(logged.donation.id))
    }

    async fn person_for(
        &self,
        tenant_id: Uuid,
        event: &StripeEvent,
        classified: &ClassifiedEvent,
    ) -> ReconcileResult<Option<Uuid>> {
        let Some(customer_id) = classified.customer_id.as_deref() else {
            warn!(event_id = %event.id, "Payment has no customer; recording anonymously");
            return Ok(None);
        };

        let customer = self
            .repos
            .customers
            .get_by_provider_customer_id(tenant_id, customer_id)
            .await?;
        if customer.is_none() {
            warn!(
                customer_id,
                event_id = %event.id,
                "Unknown customer; recording donation without a person"
            );
        }
        Ok(customer.map(|c| c.person_id))
    }
}

fn log_entry(tenant_id: Uuid, classified: &ClassifiedEvent) -> NewEventLog {
    NewEventLog {
        tenant_id,
        provider_event_id: classified.event_id.clone(),
        provider: PaymentProvider::Stripe,
        customer_id: classified.customer_id.clone(),
        event_type: classified.kind.as_str().to_string(),
        status: classified.status.clone(),
        message: classified.message.clone(),
        occurred_at: classified.occurred_at,
    }
}
