//! Model Selector — which model identifiers a plan may call.

use std::collections::HashSet;

use crate::models::user::Plan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPolicy {
    pub free_model: String,
    pub paid_default: String,
    pub paid_allow: Vec<String>,
}

impl ModelPolicy {
    /// Ordered allow-list for `plan`, deduplicated on first occurrence.
    ///
    /// With a non-empty `available` set the list is intersected with it. An
    /// empty intersection falls back to the free model if the provider serves
    /// it, else to the unfiltered list.
    pub fn allowed_models_for_plan(
        &self,
        plan: Plan,
        available: Option<&HashSet<String>>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let candidates: Vec<String> = if plan.is_paid() {
            std::iter::once(&self.paid_default)
                .chain(self.paid_allow.iter())
                .filter(|m| !m.is_empty())
                .filter(|m| seen.insert(m.as_str()))
                .cloned()
                .collect()
        } else {
            vec![self.free_model.clone()]
        };

        let Some(available) = available.filter(|a| !a.is_empty()) else {
            return candidates;
        };

        let filtered: Vec<String> = candidates
            .iter()
            .filter(|m| available.contains(m.as_str()))
            .cloned()
            .collect();

        if !filtered.is_empty() {
            filtered
        } else if available.contains(&self.free_model) {
            vec![self.free_model.clone()]
        } else {
            candidates
        }
    }
}

/// `requested` when allowed, otherwise the head of the list.
pub fn choose_model(requested: Option<&str>, allowed: &[String]) -> Option<String> {
    requested
        .map(str::trim)
        .filter(|r| allowed.iter().any(|m| m.as_str() == *r))
        .map(str::to_string)
        .or_else(|| allowed.first().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ModelPolicy {
        ModelPolicy {
            free_model: "haiku".to_string(),
            paid_default: "sonnet".to_string(),
            paid_allow: vec![
                "opus".to_string(),
                "sonnet".to_string(),
                "".to_string(),
                "haiku".to_string(),
            ],
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_gets_single_model() {
        assert_eq!(policy().allowed_models_for_plan(Plan::Free, None), vec!["haiku"]);
    }

    #[test]
    fn test_paid_list_dedups_preserving_order() {
        assert_eq!(
            policy().allowed_models_for_plan(Plan::Premium, None),
            vec!["sonnet", "opus", "haiku"]
        );
    }

    #[test]
    fn test_intersection_with_available() {
        let available = set(&["opus", "haiku"]);
        assert_eq!(
            policy().allowed_models_for_plan(Plan::Standard, Some(&available)),
            vec!["opus", "haiku"]
        );
    }

    #[test]
    fn test_empty_intersection_falls_back_to_free_model() {
        let p = ModelPolicy {
            paid_allow: vec![],
            ..policy()
        };
        let available = set(&["haiku", "other"]);
        assert_eq!(
            p.allowed_models_for_plan(Plan::Weekly, Some(&available)),
            vec!["haiku"]
        );
    }

    #[test]
    fn test_empty_intersection_without_free_keeps_unfiltered() {
        let available = set(&["something-else"]);
        assert_eq!(
            policy().allowed_models_for_plan(Plan::Premium, Some(&available)),
            vec!["sonnet", "opus", "haiku"]
        );
    }

    #[test]
    fn test_empty_available_set_is_ignored() {
        let available = HashSet::new();
        assert_eq!(
            policy().allowed_models_for_plan(Plan::Free, Some(&available)),
            vec!["haiku"]
        );
    }

    #[test]
    fn test_choose_model() {
        let allowed = vec!["sonnet".to_string(), "opus".to_string()];
        assert_eq!(choose_model(Some("opus"), &allowed).as_deref(), Some("opus"));
        assert_eq!(choose_model(Some("gpt"), &allowed).as_deref(), Some("sonnet"));
        assert_eq!(choose_model(None, &allowed).as_deref(), Some("sonnet"));
        assert_eq!(choose_model(None, &[]), None);
    }
}
