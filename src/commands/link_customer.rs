use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::customers::NewCustomer;
use crate::customers_repo::CustomersRepository;
use crate::db::create_pool;

/// Attribute a Stripe customer's future donations to a person.
pub async fn handle_link_customer(
    config: &ServerConfig,
    tenant_id: Uuid,
    provider_customer_id: String,
    person_id: Uuid,
) -> Result<()> {
    let repo = CustomersRepository::new(create_pool(&config.database_url)?);
    let customer = repo
        .link(NewCustomer {
            tenant_id,
            provider_customer_id,
            person_id,
        })
        .await?;

    if customer.person_id != person_id {
        warn!(
            %tenant_id,
            provider_customer_id = %customer.provider_customer_id,
            existing_person_id = %customer.person_id,
            "Customer already linked to another person; left unchanged"
        );
        return Ok(());
    }
    info!(
        %tenant_id,
        provider_customer_id = %customer.provider_customer_id,
        %person_id,
        "Linked customer"
    );
    Ok(())
}
