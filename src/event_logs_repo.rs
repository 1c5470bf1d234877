use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::PgPool;
use crate::event_logs::{EventLog, NewEventLog};
use crate::repositories::EventLogStore;

#[derive(Clone)]
pub struct EventLogsRepository {
    pool: PgPool,
}

impl EventLogsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLogStore for EventLogsRepository {
    /// Single conditional insert; the unique (tenant_id, provider_event_id)
    /// constraint decides which of two concurrent deliveries wins.
    async fn record_if_new(&self, entry: NewEventLog) -> Result<bool> {
        use crate::schema::event_logs::dsl;

        let pool = self.pool.clone();
        let inserted = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let rows = diesel::insert_into(dsl::event_logs)
                .values(&entry)
                .on_conflict((dsl::tenant_id, dsl::provider_event_id))
                .do_nothing()
                .execute(&mut conn)?;

            Ok::<bool, anyhow::Error>(rows == 1)
        })
        .await??;

        Ok(inserted)
    }

    async fn get_by_provider_event_id(
        &self,
        tenant_id: Uuid,
        provider_event_id: &str,
    ) -> Result<Option<EventLog>> {
        use crate::schema::event_logs::dsl;

        let pool = self.pool.clone();
        let provider_event_id = provider_event_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let entry: Option<EventLog> = dsl::event_logs
                .filter(dsl::tenant_id.eq(tenant_id))
                .filter(dsl::provider_event_id.eq(&provider_event_id))
                .select(EventLog::as_select())
                .first(&mut conn)
                .optional()?;

            Ok::<Option<EventLog>, anyhow::Error>(entry)
        })
        .await??;

        Ok(result)
    }
}
