//! Admission Middleware — wraps each gated route with the pipeline and maps
//! denials to HTTP in one place.

pub mod bootstrap;
pub mod pipeline;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::limits::device::{device_set_cookie, resolve_device};
use crate::state::AppState;

pub use pipeline::{Admission, Gate, RequestUser};

/// State for one gated route: the app plus the gate it enforces.
#[derive(Clone)]
pub struct GatedState {
    pub app: AppState,
    pub gate: Gate,
}

impl GatedState {
    pub fn new(app: AppState, gate: Gate) -> Self {
        Self { app, gate }
    }
}

pub async fn admission_layer(
    State(gated): State<GatedState>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers().clone();
    let device = resolve_device(&headers);

    // Bootstrap once per request even when gates are stacked.
    let cached = req.extensions().get::<RequestUser>().cloned();
    let user = match cached {
        Some(user) => user,
        None => pipeline::resolve_user(&gated.app, &headers, &device).await,
    };

    let decision = pipeline::evaluate(&gated.app, &user, &device, &gated.gate).await;

    let mut response = match decision {
        Ok(admission) => {
            debug!(user = %user.counter_id, quota = ?admission.quota, "admitted");
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(admission);
            next.run(req).await
        }
        Err(denial) => {
            debug!(user = %user.counter_id, reason = ?denial.reason(), "denied");
            AppError::from(denial).into_response()
        }
    };

    if device.is_minted() {
        match HeaderValue::from_str(&device_set_cookie(&device.id)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "could not encode device cookie"),
        }
    }

    response
}
