//! Abuse Guard — daily ceiling per (user, device) for the free plan.
//!
//! Sits in front of the feature quotas and caps how many metered calls one
//! free user may make from one device per UTC day. Each account has its own
//! counter. Fails open on store errors.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::limits::device::DeviceId;
use crate::limits::period::day_key;
use crate::limits::quota::COUNTER_ERROR;
use crate::models::user::Plan;
use crate::store::{device_day_key, CounterStore};

pub const DEFAULT_FREE_DEVICE_DAILY_LIMIT: u32 = 20;
pub const ABUSE_MESSAGE: &str =
    "Free daily limit reached for this device. Please try again tomorrow or upgrade.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AbuseVerdict {
    /// Paid plan or guard disabled.
    NotApplicable,
    Allowed { used: u32, limit: u32 },
    Skipped { skipped: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbuseBlock {
    pub used: u32,
    pub limit: u32,
    pub message: &'static str,
}

pub struct AbuseGuard {
    counters: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    daily_limit: u32,
    enabled: bool,
}

impl AbuseGuard {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
        daily_limit: u32,
        enabled: bool,
    ) -> Self {
        Self {
            counters,
            clock,
            daily_limit,
            enabled,
        }
    }

    pub async fn allow_free_use(
        &self,
        device: &DeviceId,
        user_id: &str,
        plan: Plan,
    ) -> Result<AbuseVerdict, AbuseBlock> {
        if !self.enabled || plan != Plan::Free {
            return Ok(AbuseVerdict::NotApplicable);
        }

        let key = device_day_key(user_id, &device.id, &day_key(self.clock.today()));

        let used = match self.counters.get_device_count(&key).await {
            Ok(used) => used,
            Err(e) => {
                warn!(user_id, device = %device.id, error = %e, "device counter read failed, admitting");
                return Ok(AbuseVerdict::Skipped {
                    skipped: COUNTER_ERROR,
                });
            }
        };

        if used >= self.daily_limit {
            info!(user_id, device = %device.id, used, "free device daily limit reached");
            return Err(AbuseBlock {
                used,
                limit: self.daily_limit,
                message: ABUSE_MESSAGE,
            });
        }

        if let Err(e) = self.counters.upsert_device_count(&key, used + 1).await {
            warn!(user_id, device = %device.id, error = %e, "device counter write failed, admitting");
            return Ok(AbuseVerdict::Skipped {
                skipped: COUNTER_ERROR,
            });
        }

        Ok(AbuseVerdict::Allowed {
            used: used + 1,
            limit: self.daily_limit,
        })
    }
}
