//! Shared transactional store: Postgres schema and query functions used by
//! the orchestrator, billing reducer, metered proxy and API shell. No
//! component owns the schema exclusively — `init_schema` is idempotent and
//! safe to call from any of them on startup, mirroring the teacher's own
//! `db::init_schema` convention.

pub mod billing_events;
pub mod boxes;
pub mod bundles;
pub mod customer_connections;
pub mod customers;
pub mod error;
pub mod models;
pub mod onboarding;
pub mod operator_jobs;
pub mod proxy_tokens;
pub mod schema;
pub mod subscriptions;
pub mod usage;

pub use error::{Error, Result};
pub use schema::init_schema;
