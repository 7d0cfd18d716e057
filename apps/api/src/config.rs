use anyhow::{bail, Context, Result};

use crate::limits::abuse::DEFAULT_FREE_DEVICE_DAILY_LIMIT;
use crate::llm_client::selector::ModelPolicy;

const DEFAULT_FREE_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_PAID_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 3;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub free_device_daily_limit: u32,
    pub enable_abuse_guard: bool,
    pub free_model: String,
    pub paid_model_default: String,
    pub paid_model_allow: Vec<String>,
    pub store_timeout_secs: u64,
    /// Raw JSON patch for the plan catalog, applied at startup.
    pub plan_quota_overrides: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            free_device_daily_limit: parse_env(
                "FREE_DEVICE_DAILY_LIMIT",
                DEFAULT_FREE_DEVICE_DAILY_LIMIT,
            )?,
            enable_abuse_guard: match std::env::var("ENABLE_IP_ABUSE_GUARD") {
                Ok(raw) => parse_bool(&raw).with_context(|| {
                    format!("ENABLE_IP_ABUSE_GUARD must be a boolean, got '{raw}'")
                })?,
                Err(_) => true,
            },
            free_model: env_or("FREE_MODEL", DEFAULT_FREE_MODEL),
            paid_model_default: env_or("PAID_MODEL_DEFAULT", DEFAULT_PAID_MODEL),
            paid_model_allow: split_list(&std::env::var("PAID_MODEL_ALLOW").unwrap_or_default()),
            store_timeout_secs: parse_env("STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?,
            plan_quota_overrides: std::env::var("PLAN_QUOTA_OVERRIDES")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn model_policy(&self) -> ModelPolicy {
        ModelPolicy {
            free_model: self.free_model.clone(),
            paid_default: self.paid_model_default.clone(),
            paid_allow: self.paid_model_allow.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized boolean '{other}'"),
    }
}

/// Comma list, trimmed, empties dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("ON").unwrap());
        assert!(parse_bool(" yes ").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("False").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" claude-opus-4-1, ,claude-sonnet-4-5 ,"),
            vec!["claude-opus-4-1", "claude-sonnet-4-5"]
        );
        assert!(split_list("").is_empty());
    }
}
