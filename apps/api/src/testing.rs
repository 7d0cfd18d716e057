//! Shared fixtures for handler and pipeline tests.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::clock::FixedClock;
use crate::config::Config;
use crate::limits::abuse::AbuseGuard;
use crate::limits::catalog::PlanCatalog;
use crate::limits::quota::QuotaEngine;
use crate::llm_client::testing::StubProvider;
use crate::state::AppState;
use crate::store::MemoryStore;

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub llm: Arc<StubProvider>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        anthropic_api_key: "test".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        free_device_daily_limit: 20,
        enable_abuse_guard: true,
        free_model: "free-model".to_string(),
        paid_model_default: "paid-model".to_string(),
        paid_model_allow: vec!["big-model".to_string()],
        store_timeout_secs: 1,
        plan_quota_overrides: None,
    }
}

pub fn harness_with(config: Config, llm: StubProvider, date: NaiveDate) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(date));
    let llm = Arc::new(llm);
    let quota = QuotaEngine::new(
        Arc::new(PlanCatalog::builtin()),
        store.clone(),
        clock.clone(),
    );
    let abuse = AbuseGuard::new(
        store.clone(),
        clock.clone(),
        config.free_device_daily_limit,
        config.enable_abuse_guard,
    );
    let state = AppState {
        models: config.model_policy(),
        users: store.clone(),
        states: store.clone(),
        quota: Arc::new(quota),
        abuse: Arc::new(abuse),
        llm: llm.clone(),
        available_models: Arc::new(HashSet::new()),
    };
    Harness {
        state,
        store,
        clock,
        llm,
    }
}

pub fn harness() -> Harness {
    harness_with(
        test_config(),
        StubProvider::default(),
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
    )
}
