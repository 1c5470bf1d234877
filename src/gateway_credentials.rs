use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};
use crate::repositories::GatewayCredentialStore;
use crate::secret_codec::SecretCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(existing_type_path = "crate::schema::sql_types::PaymentProvider")]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    #[db_enum(rename = "stripe")]
    Stripe,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
        }
    }
}

/// Diesel model for the gateway_credentials table. Key columns hold ciphertext.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::gateway_credentials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GatewayCredential {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider: PaymentProvider,
    pub public_key: String,
    pub encrypted_secret_key: String,
    pub encrypted_webhook_key: String,
    pub encrypted_product_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for new gateway credentials
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::gateway_credentials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewGatewayCredential {
    pub tenant_id: Uuid,
    pub provider: PaymentProvider,
    pub public_key: String,
    pub encrypted_secret_key: String,
    pub encrypted_webhook_key: String,
    pub encrypted_product_id: Option<String>,
}

impl NewGatewayCredential {
    pub fn encrypt(
        codec: &SecretCodec,
        tenant_id: Uuid,
        public_key: &str,
        secret_key: &str,
        webhook_key: &str,
        product_id: Option<&str>,
    ) -> ReconcileResult<Self> {
        Ok(Self {
            tenant_id,
            provider: PaymentProvider::Stripe,
            public_key: public_key.to_string(),
            encrypted_secret_key: codec.encrypt(secret_key)?,
            encrypted_webhook_key: codec.encrypt(webhook_key)?,
            encrypted_product_id: product_id.map(|p| codec.encrypt(p)).transpose()?,
        })
    }
}

/// Plaintext keys for one request. Never logged.
#[derive(Clone)]
pub struct TenantGateway {
    pub tenant_id: Uuid,
    pub provider: PaymentProvider,
    pub public_key: String,
    pub secret_key: String,
    pub webhook_key: String,
    pub product_id: Option<String>,
}

impl std::fmt::Debug for TenantGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantGateway")
            .field("tenant_id", &self.tenant_id)
            .field("provider", &self.provider)
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .field("webhook_key", &"[REDACTED]")
            .finish()
    }
}

impl TenantGateway {
    pub fn decrypt(credential: &GatewayCredential, codec: &SecretCodec) -> ReconcileResult<Self> {
        Ok(Self {
            tenant_id: credential.tenant_id,
            provider: credential.provider,
            public_key: credential.public_key.clone(),
            secret_key: codec.decrypt(&credential.encrypted_secret_key)?,
            webhook_key: codec.decrypt(&credential.encrypted_webhook_key)?,
            product_id: credential
                .encrypted_product_id
                .as_deref()
                .map(|p| codec.decrypt(p))
                .transpose()?,
        })
    }
}

/// Resolve and decrypt a tenant's Stripe credentials.
///
/// Storage allows one credential per tenant and provider, so the first Stripe
/// row is the only one. No row means the tenant is unauthenticated.
pub async fn resolve_tenant_gateway(
    store: &dyn GatewayCredentialStore,
    codec: &SecretCodec,
    tenant_id: Uuid,
) -> ReconcileResult<TenantGateway> {
    let credentials = store.load_for_tenant(tenant_id).await?;
    let credential = credentials
        .iter()
        .find(|c| c.provider == PaymentProvider::Stripe)
        .ok_or_else(|| {
            ReconcileError::Unauthenticated(format!(
                "no payment gateway configured for tenant {tenant_id}"
            ))
        })?;

    TenantGateway::decrypt(credential, codec)
}
