use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::customers::{Customer, NewCustomer};
use crate::db::PgPool;
use crate::repositories::CustomerStore;

#[derive(Clone)]
pub struct CustomersRepository {
    pool: PgPool,
}

impl CustomersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Link a provider customer to a person, keeping the existing link if present
    pub async fn link(&self, new_customer: NewCustomer) -> Result<Customer> {
        use crate::schema::customers::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            diesel::insert_into(dsl::customers)
                .values(&new_customer)
                .on_conflict((dsl::tenant_id, dsl::provider_customer_id))
                .do_nothing()
                .execute(&mut conn)?;

            let customer: Customer = dsl::customers
                .filter(dsl::tenant_id.eq(new_customer.tenant_id))
                .filter(dsl::provider_customer_id.eq(&new_customer.provider_customer_id))
                .select(Customer::as_select())
                .first(&mut conn)?;

            Ok::<Customer, anyhow::Error>(customer)
        })
        .await??;

        Ok(result)
    }
}

#[async_trait]
impl CustomerStore for CustomersRepository {
    async fn get_by_provider_customer_id(
        &self,
        tenant_id: Uuid,
        provider_customer_id: &str,
    ) -> Result<Option<Customer>> {
        use crate::schema::customers::dsl;

        let pool = self.pool.clone();
        let provider_customer_id = provider_customer_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let customer: Option<Customer> = dsl::customers
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::provider_customer_id.eq(&provider_customer_id))
                .select(Customer::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<Customer>, anyhow::Error>(customer)
        })
        .await??;

        Ok(result)
    }
}
