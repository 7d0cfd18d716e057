use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::models::user::{AuthIdentity, UserRow};
use crate::store::{
    CounterStore, StateStore, StoreError, StoreResult, UsageKey, UserStore,
};

/// In-process store for tests.
///
/// `fail_counters` / `fail_users` make every call of that family return
/// `StoreError::Unavailable`; `fail_counter_writes` fails only the upserts.
#[derive(Default)]
pub struct MemoryStore {
    usage: Mutex<HashMap<UsageKey, u32>>,
    devices: Mutex<HashMap<String, u32>>,
    users: Mutex<HashMap<String, UserRow>>,
    sessions: Mutex<HashMap<String, AuthIdentity>>,
    states: Mutex<HashMap<String, Value>>,
    fail_counters: AtomicBool,
    fail_counter_writes: AtomicBool,
    fail_users: AtomicBool,
    usage_writes: AtomicUsize,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_counters(&self, fail: bool) {
        self.fail_counters.store(fail, Ordering::SeqCst);
    }

    /// Fails only the upserts; reads keep working.
    pub fn set_fail_counter_writes(&self, fail: bool) {
        self.fail_counter_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_users(&self, fail: bool) {
        self.fail_users.store(fail, Ordering::SeqCst);
    }

    fn check_counters(&self) -> StoreResult<()> {
        if self.fail_counters.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("counter store down".to_string()));
        }
        Ok(())
    }

    fn check_counter_writes(&self) -> StoreResult<()> {
        self.check_counters()?;
        if self.fail_counter_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("counter store read-only".to_string()));
        }
        Ok(())
    }

    fn check_users(&self) -> StoreResult<()> {
        if self.fail_users.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("user store down".to_string()));
        }
        Ok(())
    }

    /// Registers a live session for `auth_id`.
    pub fn add_session(&self, session_id: &str, auth_id: &str, email: Option<&str>) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(
                session_id.to_string(),
                AuthIdentity {
                    auth_id: auth_id.to_string(),
                    email: email.map(str::to_string),
                },
            );
        }
    }

    /// Seeds a user row with an explicit plan and role, as billing or admin
    /// tooling would.
    pub fn put_user(&self, auth_id: &str, plan: &str, role: &str) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(
                auth_id.to_string(),
                UserRow {
                    auth_id: auth_id.to_string(),
                    email: None,
                    fullname: None,
                    role: Some(role.to_string()),
                    plan: Some(plan.to_string()),
                    plan_status: Some("active".to_string()),
                    created_at: Utc::now(),
                },
            );
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or(0)
    }

    /// Stored counter value, `None` when no row exists.
    pub fn usage_row(&self, key: &UsageKey) -> Option<u32> {
        self.usage.lock().ok().and_then(|u| u.get(key).copied())
    }

    pub fn usage_rows_for(&self, user_id: &str) -> usize {
        self.usage
            .lock()
            .map(|u| u.keys().filter(|k| k.user_id == user_id).count())
            .unwrap_or(0)
    }

    pub fn device_row(&self, day_key: &str) -> Option<u32> {
        self.devices.lock().ok().and_then(|d| d.get(day_key).copied())
    }

    pub fn device_keys(&self) -> Vec<String> {
        self.devices
            .lock()
            .map(|d| d.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn usage_writes(&self) -> usize {
        self.usage_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get_usage(&self, key: &UsageKey) -> StoreResult<u32> {
        self.check_counters()?;
        let usage = self.usage.lock().map_err(poisoned)?;
        Ok(usage.get(key).copied().unwrap_or(0))
    }

    async fn upsert_usage(&self, key: &UsageKey, used: u32) -> StoreResult<()> {
        self.check_counter_writes()?;
        self.usage
            .lock()
            .map_err(poisoned)?
            .insert(key.clone(), used);
        self.usage_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_device_count(&self, day_key: &str) -> StoreResult<u32> {
        self.check_counters()?;
        let devices = self.devices.lock().map_err(poisoned)?;
        Ok(devices.get(day_key).copied().unwrap_or(0))
    }

    async fn upsert_device_count(&self, day_key: &str, count: u32) -> StoreResult<()> {
        self.check_counter_writes()?;
        self.devices
            .lock()
            .map_err(poisoned)?
            .insert(day_key.to_string(), count);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, auth_id: &str) -> StoreResult<Option<UserRow>> {
        self.check_users()?;
        let users = self.users.lock().map_err(poisoned)?;
        Ok(users.get(auth_id).cloned())
    }

    async fn insert_default_user(
        &self,
        auth_id: &str,
        email: Option<&str>,
    ) -> StoreResult<UserRow> {
        self.check_users()?;
        let mut users = self.users.lock().map_err(poisoned)?;
        let row = users
            .entry(auth_id.to_string())
            .or_insert_with(|| UserRow {
                auth_id: auth_id.to_string(),
                email: email.map(str::to_string),
                fullname: None,
                role: Some("user".to_string()),
                plan: Some("free".to_string()),
                plan_status: Some("active".to_string()),
                created_at: Utc::now(),
            });
        Ok(row.clone())
    }

    async fn resolve_session(&self, session_id: &str) -> StoreResult<Option<AuthIdentity>> {
        self.check_users()?;
        let sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_state(&self, auth_id: &str) -> StoreResult<Option<Value>> {
        self.check_users()?;
        let states = self.states.lock().map_err(poisoned)?;
        Ok(states.get(auth_id).cloned())
    }

    async fn save_state(&self, auth_id: &str, data: &Value) -> StoreResult<()> {
        self.check_users()?;
        self.states
            .lock()
            .map_err(poisoned)?
            .insert(auth_id.to_string(), data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::period::PeriodKind;

    fn key() -> UsageKey {
        UsageKey {
            user_id: "u1".to_string(),
            feature: "chat_messages".to_string(),
            period_kind: PeriodKind::Total,
            period_key: "all".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_row_reads_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.get_usage(&key()).await.unwrap(), 0);
        assert_eq!(store.usage_row(&key()), None);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_key() {
        let store = MemoryStore::new();
        store.upsert_usage(&key(), 4).await.unwrap();
        store.upsert_usage(&key(), 4).await.unwrap();
        assert_eq!(store.get_usage(&key()).await.unwrap(), 4);
        assert_eq!(store.usage_rows_for("u1"), 1);
    }

    #[tokio::test]
    async fn test_insert_default_user_keeps_existing_row() {
        let store = MemoryStore::new();
        store.put_user("u1", "premium", "admin");
        let row = store.insert_default_user("u1", None).await.unwrap();
        assert_eq!(row.plan.as_deref(), Some("premium"));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_counters(true);
        assert!(store.get_usage(&key()).await.is_err());
        assert!(store.upsert_device_count("k", 1).await.is_err());
        // user family unaffected
        assert!(store.find_user("u1").await.is_ok());
    }
}
