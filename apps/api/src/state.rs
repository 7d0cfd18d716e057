use std::collections::HashSet;
use std::sync::Arc;

use crate::limits::abuse::AbuseGuard;
use crate::limits::quota::QuotaEngine;
use crate::llm_client::selector::ModelPolicy;
use crate::llm_client::ChatProvider;
use crate::store::{StateStore, UserStore};

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup; counters live in the store.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub states: Arc<dyn StateStore>,
    pub quota: Arc<QuotaEngine>,
    pub abuse: Arc<AbuseGuard>,
    /// Pluggable model provider. Default: Anthropic `LlmClient`.
    pub llm: Arc<dyn ChatProvider>,
    pub models: ModelPolicy,
    /// Models the provider reported at startup; empty when discovery failed.
    pub available_models: Arc<HashSet<String>>,
}
