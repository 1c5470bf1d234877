use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Diesel model for the donation_batches table. At most one row per tenant
/// has `is_current` set; closing a batch happens outside this service.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::donation_batches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DonationBatch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub batch_date: NaiveDate,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::donation_batches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDonationBatch {
    pub tenant_id: Uuid,
    pub name: String,
    pub batch_date: NaiveDate,
    pub is_current: bool,
}

impl NewDonationBatch {
    pub fn current(tenant_id: Uuid, batch_date: NaiveDate) -> Self {
        Self {
            tenant_id,
            name: format!("Online Donations {}", batch_date.format("%Y-%m-%d")),
            batch_date,
            is_current: true,
        }
    }
}
