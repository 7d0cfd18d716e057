use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::admission::{Admission, RequestUser};
use crate::errors::AppError;
use crate::limits::quota::QuotaGrant;
use crate::llm_client::prompts::CHAT_SYSTEM;
use crate::routes::{select_model, ApiJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    pub usage: Option<QuotaGrant>,
}

/// POST /ask
///
/// Career chat. Optional auth; free callers pass the device guard first and
/// every admitted call spends one `chat_messages` unit.
pub async fn handle_ask(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    let model = select_model(&state, &user, request.model.as_deref())?;
    let reply = state.llm.complete(&model, CHAT_SYSTEM, message).await?;
    info!(user = %user.counter_id, model = %model, "chat reply sent");

    Ok(Json(AskResponse {
        reply,
        model_used: model,
        usage: admission.quota,
    }))
}
