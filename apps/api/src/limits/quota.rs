//! Quota Engine — per-feature, per-period check-and-increment.
//!
//! Read, compare, write. The read and the write are separate store calls, so
//! two concurrent admissions can observe the same `used` and both write
//! `used + 1`; the counter is advisory and that slack is accepted.
//!
//! Store failures:
//! - read fails → admit, no increment (`skipped: "counter error"`)
//! - read succeeds, write fails → still admit with the computed value

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::limits::catalog::{normalize_feature, Limit, PlanCatalog};
use crate::limits::period::{period_key, PeriodKind};
use crate::models::user::{Plan, Role};
use crate::store::{CounterStore, UsageKey};

pub const COUNTER_ERROR: &str = "counter error";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuotaGrant {
    /// Staff roles are never counted.
    Bypass { bypass: Role },
    Unlimited {
        feature: String,
        limit: Option<u32>,
        period_kind: PeriodKind,
        period_key: String,
    },
    Counted {
        feature: String,
        used: u32,
        limit: u32,
        period_kind: PeriodKind,
        period_key: String,
    },
    /// Admitted without counting because the counter could not be read.
    Skipped {
        feature: String,
        skipped: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaDenial {
    pub feature: String,
    pub limit: u32,
    pub period_kind: PeriodKind,
    pub period_key: String,
    pub message: String,
}

/// Read-only view of one feature's counter, for the credits/limits endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub used: u32,
    pub max: Option<u32>,
    pub left: Option<u32>,
    pub period_kind: PeriodKind,
    pub period_key: String,
}

pub struct QuotaEngine {
    catalog: Arc<PlanCatalog>,
    counters: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl QuotaEngine {
    pub fn new(
        catalog: Arc<PlanCatalog>,
        counters: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            counters,
            clock,
        }
    }

    pub async fn check_and_increment(
        &self,
        user_id: &str,
        role: Role,
        plan: Plan,
        feature: &str,
    ) -> Result<QuotaGrant, QuotaDenial> {
        if role.is_staff() {
            debug!(user_id, role = role.as_str(), "staff bypass, not counting");
            return Ok(QuotaGrant::Bypass { bypass: role });
        }

        let feature = normalize_feature(feature);
        let quota = self.catalog.quota(plan, &feature);
        let key = period_key(quota.period, self.clock.today());

        let limit = match quota.limit {
            Limit::Unlimited => {
                return Ok(QuotaGrant::Unlimited {
                    feature,
                    limit: None,
                    period_kind: quota.period,
                    period_key: key,
                })
            }
            Limit::Capped(n) => n,
        };

        let usage_key = UsageKey {
            user_id: user_id.to_string(),
            feature: feature.clone(),
            period_kind: quota.period,
            period_key: key.clone(),
        };

        let used = match self.counters.get_usage(&usage_key).await {
            Ok(used) => used,
            Err(e) => {
                warn!(user_id, feature = %feature, error = %e, "quota read failed, admitting uncounted");
                return Ok(QuotaGrant::Skipped {
                    feature,
                    skipped: COUNTER_ERROR,
                });
            }
        };

        if used >= limit {
            info!(user_id, feature = %feature, used, limit, period_key = %key, "quota exceeded");
            return Err(QuotaDenial {
                message: exceeded_message(&feature, limit, quota.period),
                feature,
                limit,
                period_kind: quota.period,
                period_key: key,
            });
        }

        let new_used = used + 1;
        if let Err(e) = self.counters.upsert_usage(&usage_key, new_used).await {
            warn!(user_id, feature = %feature, error = %e, "quota increment failed, admitting anyway");
        }

        Ok(QuotaGrant::Counted {
            feature,
            used: new_used,
            limit,
            period_kind: quota.period,
            period_key: key,
        })
    }

    /// Current counter for `(user, feature)` without touching it. A failed
    /// read reports `used = 0`.
    pub async fn snapshot(&self, user_id: &str, plan: Plan, feature: &str) -> UsageSnapshot {
        let feature = normalize_feature(feature);
        let quota = self.catalog.quota(plan, &feature);
        let key = period_key(quota.period, self.clock.today());

        let used = match quota.limit {
            Limit::Unlimited => 0,
            Limit::Capped(_) => {
                let usage_key = UsageKey {
                    user_id: user_id.to_string(),
                    feature: feature.clone(),
                    period_kind: quota.period,
                    period_key: key.clone(),
                };
                self.counters.get_usage(&usage_key).await.unwrap_or_else(|e| {
                    warn!(user_id, feature = %feature, error = %e, "usage snapshot failed");
                    0
                })
            }
        };

        let max = quota.limit.cap();
        UsageSnapshot {
            used,
            max,
            left: max.map(|m| m.saturating_sub(used)),
            period_kind: quota.period,
            period_key: key,
        }
    }
}

fn exceeded_message(feature: &str, limit: u32, period: PeriodKind) -> String {
    let label = feature.replace('_', " ");
    match period {
        PeriodKind::Total => {
            format!("You've used all {limit} {label} on your plan. Upgrade to continue.")
        }
        other => format!(
            "You've reached your {label} limit ({limit}) for this {other}. Upgrade or try again next {other}."
        ),
    }
}
