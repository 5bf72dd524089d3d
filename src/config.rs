use std::str::FromStr;
use std::time::Duration;

use crate::quiz::effects::RegenerationPolicy;
use crate::quiz::retry::RetryPolicy;

const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub regeneration: RegenerationPolicy,
    /// How long an untouched chat session is kept in memory.
    pub session_idle: Duration,
}

impl Settings {
    /// Reads settings from the process environment (call `dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let retry_attempts: u32 = parse_or(&lookup, "DRILL_RETRY_ATTEMPTS", 3)?;
        let retry_delay_ms: u64 = parse_or(&lookup, "DRILL_RETRY_DELAY_MS", 1000)?;
        let regenerate_delay_ms: u64 = parse_or(&lookup, "DRILL_REGENERATE_DELAY_MS", 2000)?;
        let max_regenerations: u32 = parse_or(&lookup, "DRILL_MAX_REGENERATIONS", 5)?;
        let timeout_secs: u64 = parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 30)?;
        let session_idle_secs: u64 = parse_or(&lookup, "DRILL_SESSION_IDLE_SECS", 86_400)?;

        Ok(Self {
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_base: lookup("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::new(retry_attempts, Duration::from_millis(retry_delay_ms)),
            regeneration: RegenerationPolicy {
                delay: Duration::from_millis(regenerate_delay_ms),
                max_regenerations,
            },
            session_idle: Duration::from_secs(session_idle_secs),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_apply() {
        let settings = settings(&[("GEMINI_API_KEY", "secret")]).unwrap();
        assert_eq!(settings.gemini_model, DEFAULT_MODEL);
        assert_eq!(settings.gemini_api_base, DEFAULT_API_BASE);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.regeneration, RegenerationPolicy::default());
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.session_idle, Duration::from_secs(86_400));
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(
            settings(&[]),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));
        assert!(settings(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = settings(&[
            ("GEMINI_API_KEY", "secret"),
            ("DRILL_RETRY_ATTEMPTS", "5"),
            ("DRILL_MAX_REGENERATIONS", " 2 "),
        ])
        .unwrap();
        assert_eq!(settings.retry.max_attempts(), 5);
        assert_eq!(settings.regeneration.max_regenerations, 2);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = settings(&[("GEMINI_API_KEY", "secret"), ("DRILL_RETRY_DELAY_MS", "soon")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DRILL_RETRY_DELAY_MS",
                ..
            }
        ));
    }
}
