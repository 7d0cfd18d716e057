use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::user::{AuthIdentity, UserRow};
use crate::store::{
    CounterStore, StateStore, StoreError, StoreResult, UsageKey, UserStore,
};

/// Postgres-backed store. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl CounterStore for PgStore {
    async fn get_usage(&self, key: &UsageKey) -> StoreResult<u32> {
        let used: Option<i32> = self
            .bounded(
                sqlx::query_scalar(
                    r#"
                    SELECT used FROM usage_counters
                    WHERE user_id = $1 AND feature = $2 AND period_kind = $3 AND period_key = $4
                    "#,
                )
                .bind(&key.user_id)
                .bind(&key.feature)
                .bind(key.period_kind.as_str())
                .bind(&key.period_key)
                .fetch_optional(&self.pool),
            )
            .await?;
        Ok(used.map(to_count).unwrap_or(0))
    }

    async fn upsert_usage(&self, key: &UsageKey, used: u32) -> StoreResult<()> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO usage_counters (user_id, feature, period_kind, period_key, used)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, feature, period_kind, period_key)
                DO UPDATE SET used = EXCLUDED.used, updated_at = now()
                "#,
            )
            .bind(&key.user_id)
            .bind(&key.feature)
            .bind(key.period_kind.as_str())
            .bind(&key.period_key)
            .bind(to_column(used))
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get_device_count(&self, day_key: &str) -> StoreResult<u32> {
        let count: Option<i32> = self
            .bounded(
                sqlx::query_scalar("SELECT count FROM device_counters WHERE day_key = $1")
                    .bind(day_key)
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(count.map(to_count).unwrap_or(0))
    }

    async fn upsert_device_count(&self, day_key: &str, count: u32) -> StoreResult<()> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO device_counters (day_key, count)
                VALUES ($1, $2)
                ON CONFLICT (day_key) DO UPDATE SET count = EXCLUDED.count
                "#,
            )
            .bind(day_key)
            .bind(to_column(count))
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, auth_id: &str) -> StoreResult<Option<UserRow>> {
        self.bounded(
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT auth_id, email, fullname, role, plan, plan_status, created_at
                FROM users WHERE auth_id = $1
                "#,
            )
            .bind(auth_id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_default_user(
        &self,
        auth_id: &str,
        email: Option<&str>,
    ) -> StoreResult<UserRow> {
        // DO NOTHING keeps one row per auth id when two first requests race.
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO users (auth_id, email, plan, plan_status, role)
                VALUES ($1, $2, 'free', 'active', 'user')
                ON CONFLICT (auth_id) DO NOTHING
                "#,
            )
            .bind(auth_id)
            .bind(email)
            .execute(&self.pool),
        )
        .await?;

        self.find_user(auth_id).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("user {auth_id} missing after insert"))
        })
    }

    async fn resolve_session(&self, session_id: &str) -> StoreResult<Option<AuthIdentity>> {
        self.bounded(
            sqlx::query_as::<_, AuthIdentity>(
                r#"
                SELECT auth_id, email FROM auth_sessions
                WHERE session_id = $1 AND expires_at > now()
                "#,
            )
            .bind(session_id)
            .fetch_optional(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl StateStore for PgStore {
    async fn load_state(&self, auth_id: &str) -> StoreResult<Option<Value>> {
        self.bounded(
            sqlx::query_scalar("SELECT data FROM user_state WHERE auth_id = $1")
                .bind(auth_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn save_state(&self, auth_id: &str, data: &Value) -> StoreResult<()> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO user_state (auth_id, data)
                VALUES ($1, $2)
                ON CONFLICT (auth_id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                "#,
            )
            .bind(auth_id)
            .bind(data)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
