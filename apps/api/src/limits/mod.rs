//! Usage limits: period keys, the plan catalog, capability flags, and the two
//! counters (per-feature quotas and the free-plan device guard).

pub mod abuse;
pub mod catalog;
pub mod device;
pub mod flags;
pub mod period;
pub mod quota;
