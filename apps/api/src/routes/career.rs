//! Metered career tools: résumé analysis, skill gap, cover letters and the
//! interview coach. Admission has already charged the feature by the time a
//! handler runs; failures here are not refunded.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::admission::{Admission, RequestUser};
use crate::errors::AppError;
use crate::limits::quota::QuotaGrant;
use crate::llm_client::complete_json;
use crate::llm_client::prompts::{
    COVER_LETTER_PROMPT, COVER_LETTER_SYSTEM, INTERVIEW_FEEDBACK_PROMPT,
    INTERVIEW_QUESTION_PROMPT, INTERVIEW_SYSTEM, JSON_ONLY_SYSTEM, RESUME_ANALYSIS_PROMPT,
    SKILL_GAP_PROMPT,
};
use crate::routes::{select_model, ApiJson};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResumeAnalysisRequest {
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SkillGapRequest {
    pub skills: String,
    pub target_role: String,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub job_description: String,
    pub profile: String,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub letter: String,
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    pub usage: Option<QuotaGrant>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewQuestionRequest {
    pub role: String,
    #[serde(default)]
    pub previous: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewFeedbackRequest {
    pub role: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct CoachResponse {
    pub content: String,
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    pub usage: Option<QuotaGrant>,
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Adds `modelUsed` and `usage` to an object payload from the model.
fn decorate(mut payload: Value, model: String, usage: Option<QuotaGrant>) -> Value {
    if let Value::Object(map) = &mut payload {
        map.insert("modelUsed".to_string(), Value::String(model));
        map.insert(
            "usage".to_string(),
            serde_json::to_value(usage).unwrap_or(Value::Null),
        );
    }
    payload
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/resume-analysis
pub async fn handle_resume_analysis(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<ResumeAnalysisRequest>,
) -> Result<Json<Value>, AppError> {
    require("resume_text", &request.resume_text)?;

    let jd = request
        .job_description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let prompt = RESUME_ANALYSIS_PROMPT
        .replace(
            "{jd_clause}",
            if jd.is_some() {
                " against the job description"
            } else {
                ""
            },
        )
        .replace("{resume}", request.resume_text.trim())
        .replace(
            "{jd_block}",
            &jd.map(|jd| format!("\nJOB DESCRIPTION:\n{jd}"))
                .unwrap_or_default(),
        );

    let model = select_model(&state, &user, None)?;
    let payload: Value =
        complete_json(state.llm.as_ref(), &model, JSON_ONLY_SYSTEM, &prompt).await?;

    Ok(Json(decorate(payload, model, admission.quota)))
}

/// POST /api/skill-gap
pub async fn handle_skill_gap(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<SkillGapRequest>,
) -> Result<Json<Value>, AppError> {
    require("skills", &request.skills)?;
    require("target_role", &request.target_role)?;

    let prompt = SKILL_GAP_PROMPT
        .replace("{skills}", request.skills.trim())
        .replace("{role}", request.target_role.trim());

    let model = select_model(&state, &user, None)?;
    let payload: Value =
        complete_json(state.llm.as_ref(), &model, JSON_ONLY_SYSTEM, &prompt).await?;

    Ok(Json(decorate(payload, model, admission.quota)))
}

/// POST /api/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<CoverLetterRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    require("job_description", &request.job_description)?;
    require("profile", &request.profile)?;

    let prompt = COVER_LETTER_PROMPT
        .replace("{job}", request.job_description.trim())
        .replace("{profile}", request.profile.trim());

    let model = select_model(&state, &user, None)?;
    let letter = state
        .llm
        .complete(&model, COVER_LETTER_SYSTEM, &prompt)
        .await?;

    Ok(Json(CoverLetterResponse {
        letter,
        model_used: model,
        usage: admission.quota,
    }))
}

/// POST /api/interview/question
pub async fn handle_interview_question(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<InterviewQuestionRequest>,
) -> Result<Json<CoachResponse>, AppError> {
    require("role", &request.role)?;

    let previous = if request.previous.is_empty() {
        "none".to_string()
    } else {
        request.previous.join(" | ")
    };
    let prompt = INTERVIEW_QUESTION_PROMPT
        .replace("{role}", request.role.trim())
        .replace("{previous}", &previous);

    let model = select_model(&state, &user, None)?;
    let content = state.llm.complete(&model, INTERVIEW_SYSTEM, &prompt).await?;

    Ok(Json(CoachResponse {
        content,
        model_used: model,
        usage: admission.quota,
    }))
}

/// POST /api/interview/feedback
pub async fn handle_interview_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Extension(admission): Extension<Admission>,
    ApiJson(request): ApiJson<InterviewFeedbackRequest>,
) -> Result<Json<CoachResponse>, AppError> {
    require("question", &request.question)?;
    require("answer", &request.answer)?;

    let prompt = INTERVIEW_FEEDBACK_PROMPT
        .replace("{role}", request.role.trim())
        .replace("{question}", request.question.trim())
        .replace("{answer}", request.answer.trim());

    let model = select_model(&state, &user, None)?;
    let content = state.llm.complete(&model, INTERVIEW_SYSTEM, &prompt).await?;

    Ok(Json(CoachResponse {
        content,
        model_used: model,
        usage: admission.quota,
    }))
}
