//! Store ports — the counter, user and state tables the admission core talks to.
//!
//! `PgStore` is the production backend. The test-only `MemoryStore` can be
//! told to fail, which is how the fail-open paths are exercised.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::limits::period::PeriodKind;
use crate::models::user::{AuthIdentity, UserRow};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The single failure signal every store operation surfaces.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Composite primary key of `usage_counters`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub user_id: String,
    pub feature: String,
    pub period_kind: PeriodKind,
    pub period_key: String,
}

/// `"{user_id}:{device_id}:{YYYY-MM-DD}"`, the key of `device_counters`.
pub fn device_day_key(user_id: &str, device_id: &str, day: &str) -> String {
    format!("{user_id}:{device_id}:{day}")
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, 0 when no row exists.
    async fn get_usage(&self, key: &UsageKey) -> StoreResult<u32>;

    /// Idempotent by key.
    async fn upsert_usage(&self, key: &UsageKey, used: u32) -> StoreResult<()>;

    async fn get_device_count(&self, day_key: &str) -> StoreResult<u32>;

    async fn upsert_device_count(&self, day_key: &str, count: u32) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, auth_id: &str) -> StoreResult<Option<UserRow>>;

    /// Inserts the default row for a first-seen identity and returns the
    /// stored row. A concurrent insert for the same auth id is not an error.
    async fn insert_default_user(&self, auth_id: &str, email: Option<&str>)
        -> StoreResult<UserRow>;

    /// Resolves a live session id to the identity that owns it.
    async fn resolve_session(&self, session_id: &str) -> StoreResult<Option<AuthIdentity>>;
}

/// Cloud history blobs for plans with `cloud_history`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_state(&self, auth_id: &str) -> StoreResult<Option<Value>>;

    async fn save_state(&self, auth_id: &str, data: &Value) -> StoreResult<()>;
}
