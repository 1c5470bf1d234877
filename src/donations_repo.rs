use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::PgPool;
use crate::donations::{Donation, FundDonation, NewDonation, NewFundDonation};
use crate::repositories::DonationStore;

#[derive(Clone)]
pub struct DonationsRepository {
    pool: PgPool,
}

impl DonationsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonationStore for DonationsRepository {
    async fn create(&self, new_donation: NewDonation) -> Result<Donation> {
        use crate::schema::donations::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let inserted: Donation = diesel::insert_into(dsl::donations)
                .values(&new_donation)
                .returning(Donation::as_returning())
                .get_result(&mut conn)?;

            Ok::<Donation, anyhow::Error>(inserted)
        })
        .await??;

        Ok(result)
    }

    async fn create_fund_donations(
        &self,
        tenant_id: Uuid,
        funds: Vec<NewFundDonation>,
    ) -> Result<Vec<FundDonation>> {
        use crate::schema::fund_donations::dsl;

        if funds.iter().any(|f| f.tenant_id != tenant_id) {
            anyhow::bail!("Fund allocation belongs to a different tenant");
        }
        if funds.is_empty() {
            return Ok(Vec::new());
        }

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            // All allocations of a donation land together
            let inserted = conn.transaction::<Vec<FundDonation>, anyhow::Error, _>(|conn| {
                let rows: Vec<FundDonation> = diesel::insert_into(dsl::fund_donations)
                    .values(&funds)
                    .returning(FundDonation::as_returning())
                    .get_results(conn)?;
                Ok(rows)
            })?;

            Ok::<Vec<FundDonation>, anyhow::Error>(inserted)
        })
        .await??;

        Ok(result)
    }

    async fn list_by_batch(&self, tenant_id: Uuid, batch_id: Uuid) -> Result<Vec<Donation>> {
        use crate::schema::donations::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let donations: Vec<Donation> = dsl::donations
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::batch_id.eq(batch_id))
                .order_by(dsl::donation_date.asc())
                .select(Donation::as_select())
                .load(&mut conn)?;

            Ok::<Vec<Donation>, anyhow::Error>(donations)
        })
        .await??;

        Ok(result)
    }

    async fn list_fund_donations(
        &self,
        tenant_id: Uuid,
        donation_id: Uuid,
    ) -> Result<Vec<FundDonation>> {
        use crate::schema::fund_donations::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let funds: Vec<FundDonation> = dsl::fund_donations
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::donation_id.eq(donation_id))
                .select(FundDonation::as_select())
                .load(&mut conn)?;

            Ok::<Vec<FundDonation>, anyhow::Error>(funds)
        })
        .await??;

        Ok(result)
    }
}
