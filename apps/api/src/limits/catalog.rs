//! Plan Catalog — static plan → feature → quota table.
//!
//! Built once at startup (optionally patched from `PLAN_QUOTA_OVERRIDES`) and
//! shared read-only afterwards. Unlimited is its own variant, never a sentinel
//! integer.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize, Serializer};

use crate::limits::period::PeriodKind;
use crate::models::user::Plan;

pub const CHAT_MESSAGES: &str = "chat_messages";
pub const RESUME_ANALYZER: &str = "resume_analyzer";
pub const COVER_LETTER: &str = "cover_letter";
pub const SKILL_GAP: &str = "skill_gap";
pub const INTERVIEW_COACH: &str = "interview_coach";
pub const RESUME_BUILDER: &str = "resume_builder";

/// Canonical metered features, in display order.
pub const FEATURES: [&str; 6] = [
    CHAT_MESSAGES,
    RESUME_ANALYZER,
    COVER_LETTER,
    SKILL_GAP,
    INTERVIEW_COACH,
    RESUME_BUILDER,
];

/// Legacy names still sent by older clients.
const FEATURE_ALIASES: [(&str, &str); 2] = [
    ("resume_analyses", RESUME_ANALYZER),
    ("cover_letters", COVER_LETTER),
];

/// Lowercases and maps legacy aliases onto canonical feature names.
pub fn normalize_feature(raw: &str) -> String {
    let name = raw.trim().to_ascii_lowercase();
    FEATURE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Capped(u32),
    Unlimited,
}

impl Limit {
    pub fn cap(&self) -> Option<u32> {
        match self {
            Limit::Capped(n) => Some(*n),
            Limit::Unlimited => None,
        }
    }
}

impl From<Option<u32>> for Limit {
    fn from(value: Option<u32>) -> Self {
        value.map(Limit::Capped).unwrap_or(Limit::Unlimited)
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cap().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quota {
    pub period: PeriodKind,
    pub limit: Limit,
}

impl Quota {
    const fn capped(period: PeriodKind, n: u32) -> Self {
        Self {
            period,
            limit: Limit::Capped(n),
        }
    }

    const fn unlimited(period: PeriodKind) -> Self {
        Self {
            period,
            limit: Limit::Unlimited,
        }
    }
}

/// Quota returned for a feature the plan does not list.
pub const UNLISTED_FEATURE_QUOTA: Quota = Quota::unlimited(PeriodKind::Month);

#[derive(Debug, Deserialize)]
struct QuotaOverride {
    period: PeriodKind,
    limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PlanCatalog {
    quotas: HashMap<Plan, HashMap<String, Quota>>,
}

impl PlanCatalog {
    pub fn builtin() -> Self {
        use PeriodKind::{Month, Total, Week, Year};

        let table: [(Plan, [(&str, Quota); 6]); 5] = [
            (
                Plan::Free,
                [
                    (CHAT_MESSAGES, Quota::capped(Total, 15)),
                    (RESUME_ANALYZER, Quota::capped(Total, 3)),
                    (COVER_LETTER, Quota::capped(Total, 3)),
                    (SKILL_GAP, Quota::capped(Total, 3)),
                    (INTERVIEW_COACH, Quota::capped(Total, 3)),
                    (RESUME_BUILDER, Quota::capped(Total, 2)),
                ],
            ),
            (
                Plan::Weekly,
                [
                    (CHAT_MESSAGES, Quota::capped(Week, 100)),
                    (RESUME_ANALYZER, Quota::capped(Week, 10)),
                    (COVER_LETTER, Quota::capped(Week, 10)),
                    (SKILL_GAP, Quota::capped(Week, 10)),
                    (INTERVIEW_COACH, Quota::capped(Week, 10)),
                    (RESUME_BUILDER, Quota::capped(Week, 5)),
                ],
            ),
            (
                Plan::Standard,
                [
                    (CHAT_MESSAGES, Quota::capped(Month, 600)),
                    (RESUME_ANALYZER, Quota::capped(Month, 50)),
                    (COVER_LETTER, Quota::capped(Month, 30)),
                    (SKILL_GAP, Quota::capped(Month, 30)),
                    (INTERVIEW_COACH, Quota::capped(Month, 30)),
                    (RESUME_BUILDER, Quota::capped(Month, 20)),
                ],
            ),
            (
                Plan::Premium,
                [
                    (CHAT_MESSAGES, Quota::unlimited(Month)),
                    (RESUME_ANALYZER, Quota::capped(Month, 200)),
                    (COVER_LETTER, Quota::capped(Month, 100)),
                    (SKILL_GAP, Quota::unlimited(Month)),
                    (INTERVIEW_COACH, Quota::unlimited(Month)),
                    (RESUME_BUILDER, Quota::unlimited(Month)),
                ],
            ),
            (
                Plan::EmployerJd,
                [
                    (CHAT_MESSAGES, Quota::capped(Year, 1200)),
                    (RESUME_ANALYZER, Quota::capped(Year, 24)),
                    (COVER_LETTER, Quota::capped(Year, 24)),
                    (SKILL_GAP, Quota::capped(Year, 24)),
                    (INTERVIEW_COACH, Quota::capped(Year, 24)),
                    (RESUME_BUILDER, Quota::capped(Year, 12)),
                ],
            ),
        ];

        let quotas = table
            .into_iter()
            .map(|(plan, features)| {
                let map = features
                    .into_iter()
                    .map(|(name, quota)| (name.to_string(), quota))
                    .collect();
                (plan, map)
            })
            .collect();

        Self { quotas }
    }

    /// Applies a JSON patch of the form `{plan: {feature: {period, limit}}}`.
    /// A `null` limit means unlimited.
    pub fn with_overrides(mut self, raw_json: &str) -> Result<Self> {
        let patch: HashMap<String, HashMap<String, QuotaOverride>> =
            serde_json::from_str(raw_json).context("PLAN_QUOTA_OVERRIDES is not valid JSON")?;

        for (plan_name, features) in patch {
            let Some(plan) = Plan::from_known(&plan_name) else {
                bail!("PLAN_QUOTA_OVERRIDES names unknown plan '{plan_name}'");
            };
            let entry = self.quotas.entry(plan).or_default();
            for (feature, quota) in features {
                entry.insert(
                    normalize_feature(&feature),
                    Quota {
                        period: quota.period,
                        limit: quota.limit.into(),
                    },
                );
            }
        }

        Ok(self)
    }

    /// Quota for `(plan, feature)`. Aliases are normalized first; features the
    /// plan does not list are unlimited.
    pub fn quota(&self, plan: Plan, feature: &str) -> Quota {
        let feature = normalize_feature(feature);
        let table = self
            .quotas
            .get(&plan)
            .or_else(|| self.quotas.get(&Plan::Free));
        table
            .and_then(|t| t.get(&feature))
            .copied()
            .unwrap_or(UNLISTED_FEATURE_QUOTA)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_chat_is_total_fifteen() {
        let catalog = PlanCatalog::builtin();
        let quota = catalog.quota(Plan::Free, CHAT_MESSAGES);
        assert_eq!(quota.period, PeriodKind::Total);
        assert_eq!(quota.limit, Limit::Capped(15));
    }

    #[test]
    fn test_weekly_resume_analyzer() {
        let quota = PlanCatalog::builtin().quota(Plan::Weekly, RESUME_ANALYZER);
        assert_eq!(quota, Quota::capped(PeriodKind::Week, 10));
    }

    #[test]
    fn test_aliases_normalize() {
        assert_eq!(normalize_feature("resume_analyses"), RESUME_ANALYZER);
        assert_eq!(normalize_feature("Cover_Letters"), COVER_LETTER);
        assert_eq!(normalize_feature("chat_messages"), CHAT_MESSAGES);

        let catalog = PlanCatalog::builtin();
        assert_eq!(
            catalog.quota(Plan::Weekly, "resume_analyses"),
            catalog.quota(Plan::Weekly, RESUME_ANALYZER)
        );
    }

    #[test]
    fn test_unknown_feature_is_unlimited() {
        let quota = PlanCatalog::builtin().quota(Plan::Free, "new_thing");
        assert_eq!(quota.limit, Limit::Unlimited);
        assert_eq!(quota.period, PeriodKind::Month);
    }

    #[test]
    fn test_unlimited_serializes_as_null() {
        let json = serde_json::to_value(Quota::unlimited(PeriodKind::Month)).unwrap();
        assert!(json["limit"].is_null());
        let json = serde_json::to_value(Quota::capped(PeriodKind::Week, 4)).unwrap();
        assert_eq!(json["limit"], 4);
        assert_eq!(json["period"], "week");
    }

    #[test]
    fn test_overrides_merge_over_builtin() {
        let catalog = PlanCatalog::builtin()
            .with_overrides(
                r#"{"free": {"chat_messages": {"period": "month", "limit": 20},
                             "cover_letters": {"period": "total", "limit": null}}}"#,
            )
            .unwrap();
        assert_eq!(
            catalog.quota(Plan::Free, CHAT_MESSAGES),
            Quota::capped(PeriodKind::Month, 20)
        );
        assert_eq!(
            catalog.quota(Plan::Free, COVER_LETTER).limit,
            Limit::Unlimited
        );
        // untouched entries survive
        assert_eq!(
            catalog.quota(Plan::Free, RESUME_BUILDER),
            Quota::capped(PeriodKind::Total, 2)
        );
    }

    #[test]
    fn test_overrides_reject_unknown_plan() {
        let err = PlanCatalog::builtin()
            .with_overrides(r#"{"gold": {}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("gold"));
    }

    #[test]
    fn test_overrides_reject_bad_json() {
        assert!(PlanCatalog::builtin().with_overrides("{not json").is_err());
    }
}
