pub mod account;
pub mod ask;
pub mod career;
pub mod health;

use axum::{
    extract::FromRequest,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};

use crate::admission::{admission_layer, Gate, GatedState, RequestUser};
use crate::errors::AppError;
use crate::limits::catalog::{
    CHAT_MESSAGES, COVER_LETTER, INTERVIEW_COACH, RESUME_ANALYZER, SKILL_GAP,
};
use crate::llm_client::selector::choose_model;
use crate::state::AppState;

const ASK: Gate = Gate::open().metered(CHAT_MESSAGES).with_abuse_guard();
const RESUME_ANALYSIS: Gate = Gate::auth().metered(RESUME_ANALYZER).with_abuse_guard();
const COVER_LETTERS: Gate = Gate::auth().metered(COVER_LETTER).with_abuse_guard();
const SKILL_GAPS: Gate = Gate::auth().metered(SKILL_GAP).with_abuse_guard();
const INTERVIEW: Gate = Gate::auth().metered(INTERVIEW_COACH);

/// `Json` whose rejections render as `VALIDATION_ERROR` (400) instead of
/// axum's plain-text 4xx.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Wraps `route` in the admission middleware for `gate`.
fn gated(state: &AppState, gate: Gate, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        GatedState::new(state.clone(), gate),
        admission_layer,
    ))
}

/// Picks the model for this caller: `requested` if the plan allows it, else
/// the plan's default.
pub(crate) fn select_model(
    state: &AppState,
    user: &RequestUser,
    requested: Option<&str>,
) -> Result<String, AppError> {
    let plan = user.record.plan;
    let allowed = state
        .models
        .allowed_models_for_plan(plan, Some(state.available_models.as_ref()));
    choose_model(requested, &allowed)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("no model configured for plan {plan}")))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Metered
        .route("/ask", gated(&state, ASK, post(ask::handle_ask)))
        .route(
            "/api/resume-analysis",
            gated(&state, RESUME_ANALYSIS, post(career::handle_resume_analysis)),
        )
        .route(
            "/api/cover-letter",
            gated(&state, COVER_LETTERS, post(career::handle_cover_letter)),
        )
        .route(
            "/api/skill-gap",
            gated(&state, SKILL_GAPS, post(career::handle_skill_gap)),
        )
        .route(
            "/api/interview/question",
            gated(&state, INTERVIEW, post(career::handle_interview_question)),
        )
        .route(
            "/api/interview/feedback",
            gated(&state, INTERVIEW, post(career::handle_interview_feedback)),
        )
        // Account
        .route(
            "/api/credits",
            gated(&state, Gate::auth(), get(account::handle_credits)),
        )
        .route(
            "/api/limits",
            gated(&state, Gate::auth(), get(account::handle_limits)),
        )
        .route(
            "/api/features",
            gated(&state, Gate::auth(), get(account::handle_features)),
        )
        .route(
            "/api/state",
            gated(
                &state,
                Gate::auth(),
                get(account::handle_get_state).post(account::handle_save_state),
            ),
        )
        .route(
            "/api/models",
            gated(&state, Gate::open(), get(account::handle_models)),
        )
        .with_state(state)
}
