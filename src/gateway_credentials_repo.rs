use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::PgPool;
use crate::gateway_credentials::{GatewayCredential, NewGatewayCredential};
use crate::repositories::GatewayCredentialStore;

#[derive(Clone)]
pub struct GatewayCredentialsRepository {
    pool: PgPool,
}

impl GatewayCredentialsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store credentials, replacing the tenant's existing ones for the same provider
    pub async fn upsert(&self, new_credential: NewGatewayCredential) -> Result<GatewayCredential> {
        use crate::schema::gateway_credentials::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let stored: GatewayCredential = diesel::insert_into(dsl::gateway_credentials)
                .values(&new_credential)
                .on_conflict((dsl::tenant_id, dsl::provider))
                .do_update()
                .set((
                    dsl::public_key.eq(&new_credential.public_key),
                    dsl::encrypted_secret_key.eq(&new_credential.encrypted_secret_key),
                    dsl::encrypted_webhook_key.eq(&new_credential.encrypted_webhook_key),
                    dsl::encrypted_product_id.eq(&new_credential.encrypted_product_id),
                    dsl::updated_at.eq(diesel::dsl::now),
                ))
                .returning(GatewayCredential::as_returning())
                .get_result(&mut conn)?;

            Ok::<GatewayCredential, anyhow::Error>(stored)
        })
        .await??;

        Ok(result)
    }
}

#[async_trait]
impl GatewayCredentialStore for GatewayCredentialsRepository {
    async fn load_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<GatewayCredential>> {
        use crate::schema::gateway_credentials::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let credentials: Vec<GatewayCredential> = dsl::gateway_credentials
                .filter(dsl::tenant_id.eq(tenant_id))
                .order_by(dsl::created_at.asc())
                .select(GatewayCredential::as_select())
                .load(&mut conn)?;

            Ok::<Vec<GatewayCredential>, anyhow::Error>(credentials)
        })
        .await??;

        Ok(result)
    }
}
