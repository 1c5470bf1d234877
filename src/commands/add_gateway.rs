use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::db::create_pool;
use crate::gateway_credentials::NewGatewayCredential;
use crate::gateway_credentials_repo::GatewayCredentialsRepository;

pub struct AddGatewayArgs {
    pub tenant_id: Uuid,
    pub public_key: String,
    pub secret_key: String,
    pub webhook_key: String,
    pub product_id: Option<String>,
}

/// Encrypt and store a tenant's Stripe keys, replacing any existing set.
pub async fn handle_add_gateway(config: &ServerConfig, args: AddGatewayArgs) -> Result<()> {
    let credential = NewGatewayCredential::encrypt(
        &config.codec,
        args.tenant_id,
        &args.public_key,
        &args.secret_key,
        &args.webhook_key,
        args.product_id.as_deref(),
    )
    .context("Failed to encrypt gateway credentials")?;

    let repo = GatewayCredentialsRepository::new(create_pool(&config.database_url)?);
    let stored = repo.upsert(credential).await?;

    info!(
        tenant_id = %stored.tenant_id,
        provider = stored.provider.as_str(),
        "Stored gateway credentials"
    );
    Ok(())
}
