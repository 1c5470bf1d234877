use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::PgPool;
use crate::repositories::SubscriptionStore;
use crate::subscriptions::{NewSubscription, NewSubscriptionFund, Subscription, SubscriptionFund};

#[derive(Clone)]
pub struct SubscriptionsRepository {
    pool: PgPool,
}

impl SubscriptionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionsRepository {
    async fn create_with_funds(
        &self,
        new_subscription: NewSubscription,
        funds: Vec<NewSubscriptionFund>,
    ) -> Result<(Subscription, Vec<SubscriptionFund>)> {
        use crate::schema::{subscription_funds, subscriptions};

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let created = conn.transaction::<_, anyhow::Error, _>(|conn| {
                let subscription: Subscription = diesel::insert_into(subscriptions::table)
                    .values(&new_subscription)
                    .returning(Subscription::as_returning())
                    .get_result(conn)?;

                let funds: Vec<SubscriptionFund> = if funds.is_empty() {
                    Vec::new()
                } else {
                    diesel::insert_into(subscription_funds::table)
                        .values(&funds)
                        .returning(SubscriptionFund::as_returning())
                        .get_results(conn)?
                };

                Ok((subscription, funds))
            })?;

            Ok::<(Subscription, Vec<SubscriptionFund>), anyhow::Error>(created)
        })
        .await??;

        Ok(result)
    }

    async fn load_funds_by_subscription_id(
        &self,
        tenant_id: Uuid,
        provider_subscription_id: &str,
    ) -> Result<Vec<SubscriptionFund>> {
        use crate::schema::subscription_funds::dsl;

        let pool = self.pool.clone();
        let provider_subscription_id = provider_subscription_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let funds: Vec<SubscriptionFund> = dsl::subscription_funds
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::provider_subscription_id.eq(&provider_subscription_id))
                .select(SubscriptionFund::as_select())
                .load(&mut conn)?;

            Ok::<Vec<SubscriptionFund>, anyhow::Error>(funds)
        })
        .await??;

        Ok(result)
    }
}
