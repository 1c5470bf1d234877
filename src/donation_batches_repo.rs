use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::PgPool;
use crate::donation_batches::{DonationBatch, NewDonationBatch};
use crate::repositories::DonationBatchStore;

#[derive(Clone)]
pub struct DonationBatchesRepository {
    pool: PgPool,
}

impl DonationBatchesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonationBatchStore for DonationBatchesRepository {
    /// Insert-if-absent against the partial unique index on open batches,
    /// then read back whichever row won. No check-then-act window.
    async fn get_or_create_current(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<DonationBatch> {
        use crate::schema::donation_batches::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::insert_into(dsl::donation_batches)
                .values(&NewDonationBatch::current(tenant_id, today))
                .on_conflict_do_nothing()
                .execute(&mut conn)?;

            let batch: DonationBatch = dsl::donation_batches
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::is_current.eq(true))
                .select(DonationBatch::as_select())
                .first(&mut conn)?;

            Ok::<DonationBatch, anyhow::Error>(batch)
        })
        .await??;

        Ok(result)
    }
}
