//! Donation ledger fed by Stripe webhooks.
//!
//! Verified provider events are classified, normalized and written into the
//! tenant's current donation batch exactly once per provider event id.

pub mod actions;
pub mod auth;
pub mod commands;
pub mod config;
pub mod customers;
pub mod customers_repo;
pub mod db;
pub mod donation_batches;
pub mod donation_batches_repo;
pub mod donation_service;
pub mod donations;
pub mod donations_repo;
pub mod error;
pub mod event_logs;
pub mod event_logs_repo;
pub mod gateway_credentials;
pub mod gateway_credentials_repo;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod payment_details;
pub mod reconciler;
pub mod repositories;
pub mod schema;
pub mod secret_codec;
pub mod stripe_client;
pub mod stripe_events;
pub mod subscriptions;
pub mod subscriptions_repo;
pub mod web;
pub mod webhook_signature;

pub use error::{ReconcileError, ReconcileResult};
pub use reconciler::{WebhookOutcome, WebhookReconciler};
pub use repositories::Repositories;
