//! Admission pipeline — one admit/deny decision per gated request.
//!
//! Order: auth check → staff bypass → abuse guard (free plan) → quota.
//! A denial at any step stops the pipeline, so an abuse-blocked request never
//! reaches the quota counter.

use axum::http::HeaderMap;
use serde::Serialize;

use crate::admission::bootstrap::{bootstrap_user, resolve_identity};
use crate::errors::AppError;
use crate::limits::abuse::{AbuseBlock, AbuseVerdict};
use crate::limits::device::DeviceId;
use crate::limits::quota::{QuotaDenial, QuotaGrant};
use crate::models::user::UserRecord;
use crate::state::AppState;

/// What an endpoint requires before its handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub feature: Option<&'static str>,
    pub require_auth: bool,
    pub abuse_guard: bool,
}

impl Gate {
    /// Signed-in caller, no metering.
    pub const fn auth() -> Self {
        Self {
            feature: None,
            require_auth: true,
            abuse_guard: false,
        }
    }

    /// Anyone, no metering.
    pub const fn open() -> Self {
        Self {
            feature: None,
            require_auth: false,
            abuse_guard: false,
        }
    }

    pub const fn metered(self, feature: &'static str) -> Self {
        Self {
            feature: Some(feature),
            ..self
        }
    }

    pub const fn with_abuse_guard(self) -> Self {
        Self {
            abuse_guard: true,
            ..self
        }
    }
}

/// Bootstrapped caller, cached in request extensions for the handler.
#[derive(Debug, Clone)]
pub struct RequestUser {
    pub record: UserRecord,
    /// Key counters are stored under: the auth id, or `anon:<device>` for guests.
    pub counter_id: String,
}

impl RequestUser {
    pub fn auth_id(&self) -> Option<&str> {
        self.record.auth_id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    AbuseGuardBlock,
    QuotaExceeded,
    LoginRequired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
    LoginRequired,
    AbuseGuard(AbuseBlock),
    Quota(QuotaDenial),
}

impl Denial {
    pub fn reason(&self) -> DenyReason {
        match self {
            Denial::LoginRequired => DenyReason::LoginRequired,
            Denial::AbuseGuard(_) => DenyReason::AbuseGuardBlock,
            Denial::Quota(_) => DenyReason::QuotaExceeded,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::LoginRequired => AppError::LoginRequired,
            Denial::AbuseGuard(block) => AppError::AbuseBlocked(block),
            Denial::Quota(denial) => AppError::QuotaExceeded(denial),
        }
    }
}

/// Admit side of the decision, handed to handlers as an extension.
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub abuse: AbuseVerdict,
    pub quota: Option<QuotaGrant>,
}

pub type AdmissionDecision = Result<Admission, Denial>;

/// Resolves identity and bootstraps the user row.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap, device: &DeviceId) -> RequestUser {
    let identity = resolve_identity(state.users.as_ref(), headers).await;
    let record = bootstrap_user(state.users.as_ref(), identity.as_ref()).await;
    // Guest quota is per device too: a caller that drops its cookies gets a
    // fresh device id and therefore a fresh allowance.
    let counter_id = match &record.auth_id {
        Some(id) => id.clone(),
        None => format!("anon:{}", device.id),
    };
    RequestUser { record, counter_id }
}

pub async fn evaluate(
    state: &AppState,
    user: &RequestUser,
    device: &DeviceId,
    gate: &Gate,
) -> AdmissionDecision {
    let record = &user.record;

    if gate.require_auth && record.auth_id.is_none() {
        return Err(Denial::LoginRequired);
    }

    if record.role.is_staff() {
        // Staff skip every counter, device guard included.
        return Ok(Admission {
            abuse: AbuseVerdict::NotApplicable,
            quota: gate
                .feature
                .map(|_| QuotaGrant::Bypass { bypass: record.role }),
        });
    }

    let abuse = if gate.abuse_guard {
        state
            .abuse
            .allow_free_use(device, &user.counter_id, record.plan)
            .await
            .map_err(Denial::AbuseGuard)?
    } else {
        AbuseVerdict::NotApplicable
    };

    let quota = match gate.feature {
        Some(feature) => Some(
            state
                .quota
                .check_and_increment(&user.counter_id, record.role, record.plan, feature)
                .await
                .map_err(Denial::Quota)?,
        ),
        None => None,
    };

    Ok(Admission { abuse, quota })
}
