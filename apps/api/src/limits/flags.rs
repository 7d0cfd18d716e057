//! Feature-flag Resolver — capability bits for non-metered features.

use serde::Serialize;

use crate::models::user::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightsLevel {
    Basic,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Level(InsightsLevel),
}

impl FlagValue {
    /// A level flag counts as enabled whatever its depth.
    pub fn is_enabled(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Level(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub rebuild_with_ai: bool,
    pub optimize_ai: bool,
    pub downloads: bool,
    pub cloud_history: bool,
    pub job_insights: InsightsLevel,
}

impl FeatureFlags {
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => Self {
                rebuild_with_ai: false,
                optimize_ai: false,
                downloads: false,
                cloud_history: false,
                job_insights: InsightsLevel::Basic,
            },
            Plan::Weekly => Self {
                rebuild_with_ai: true,
                optimize_ai: true,
                downloads: true,
                cloud_history: false,
                job_insights: InsightsLevel::Basic,
            },
            Plan::Standard | Plan::Premium => Self {
                rebuild_with_ai: true,
                optimize_ai: true,
                downloads: true,
                cloud_history: true,
                job_insights: InsightsLevel::Full,
            },
            Plan::EmployerJd => Self {
                rebuild_with_ai: false,
                optimize_ai: false,
                downloads: true,
                cloud_history: true,
                job_insights: InsightsLevel::Basic,
            },
        }
    }

    pub fn get(&self, flag: &str) -> FlagValue {
        match flag.trim().to_ascii_lowercase().as_str() {
            "rebuild_with_ai" => FlagValue::Bool(self.rebuild_with_ai),
            "optimize_ai" => FlagValue::Bool(self.optimize_ai),
            "downloads" => FlagValue::Bool(self.downloads),
            "cloud_history" => FlagValue::Bool(self.cloud_history),
            "job_insights" => FlagValue::Level(self.job_insights),
            _ => FlagValue::Bool(false),
        }
    }
}

/// Looks up `flag` for a plan name. Unknown plans use the free set; unknown
/// flags are `false`.
pub fn feature_enabled(plan: &str, flag: &str) -> FlagValue {
    FeatureFlags::for_plan(Plan::parse(plan)).get(flag)
}

pub fn job_insights_level(plan: Plan) -> InsightsLevel {
    FeatureFlags::for_plan(plan).job_insights
}
