use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::admission::RequestUser;
use crate::errors::AppError;
use crate::limits::catalog::{CHAT_MESSAGES, FEATURES};
use crate::limits::flags::{feature_enabled, job_insights_level, FeatureFlags, InsightsLevel};
use crate::limits::quota::UsageSnapshot;
use crate::llm_client::selector::choose_model;
use crate::models::user::Plan;
use crate::routes::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub plan: Plan,
    #[serde(flatten)]
    pub usage: UsageSnapshot,
}

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    pub plan: Plan,
    pub limits: BTreeMap<&'static str, UsageSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub plan: Plan,
    pub rebuild_with_ai: bool,
    pub optimize_ai: bool,
    pub downloads: bool,
    pub cloud_history: bool,
    pub job_insights_level: InsightsLevel,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub plan: Plan,
    pub models: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StateBody {
    pub data: Value,
}

/// GET /api/credits
///
/// Chat usage in the caller's current period. Never 5xx on a counter outage:
/// the snapshot reports `used = 0` instead.
pub async fn handle_credits(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
) -> Json<CreditsResponse> {
    let plan = user.record.plan;
    let usage = state
        .quota
        .snapshot(&user.counter_id, plan, CHAT_MESSAGES)
        .await;
    Json(CreditsResponse { plan, usage })
}

/// GET /api/limits
pub async fn handle_limits(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
) -> Json<LimitsResponse> {
    let plan = user.record.plan;
    let mut limits = BTreeMap::new();
    for feature in FEATURES {
        let snapshot = state.quota.snapshot(&user.counter_id, plan, feature).await;
        limits.insert(feature, snapshot);
    }
    Json(LimitsResponse { plan, limits })
}

/// GET /api/features
pub async fn handle_features(Extension(user): Extension<RequestUser>) -> Json<FeaturesResponse> {
    let plan = user.record.plan;
    let flags = FeatureFlags::for_plan(plan);
    Json(FeaturesResponse {
        plan,
        rebuild_with_ai: flags.rebuild_with_ai,
        optimize_ai: flags.optimize_ai,
        downloads: flags.downloads,
        cloud_history: flags.cloud_history,
        job_insights_level: job_insights_level(plan),
    })
}

/// GET /api/models
///
/// Optional auth; guests see the free list.
pub async fn handle_models(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
) -> Json<ModelsResponse> {
    let plan = user.record.plan;
    let models = state
        .models
        .allowed_models_for_plan(plan, Some(state.available_models.as_ref()));
    let default = choose_model(None, &models);
    Json(ModelsResponse {
        plan,
        models,
        default,
    })
}

fn require_cloud_history(user: &RequestUser) -> Result<&str, AppError> {
    if !feature_enabled(user.record.plan.as_str(), "cloud_history").is_enabled() {
        return Err(AppError::FeatureUnavailable("cloud_history".to_string()));
    }
    user.auth_id().ok_or(AppError::LoginRequired)
}

/// GET /api/state
pub async fn handle_get_state(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
) -> Result<Json<StateBody>, AppError> {
    let auth_id = require_cloud_history(&user)?;
    let data = state.states.load_state(auth_id).await?;
    Ok(Json(StateBody {
        data: data.unwrap_or(Value::Null),
    }))
}

/// POST /api/state
pub async fn handle_save_state(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    ApiJson(body): ApiJson<StateBody>,
) -> Result<StatusCode, AppError> {
    let auth_id = require_cloud_history(&user)?;
    state.states.save_state(auth_id, &body.data).await?;
    info!(auth_id, "saved cloud state");
    Ok(StatusCode::NO_CONTENT)
}
