use std::env;
use std::fmt;

use crate::error::StartupError;

pub const CREDENTIAL_VAR: &str = "HF_TOKEN";

const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
const DEFAULT_MODEL_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const MAX_TEMPERATURE: f32 = 2.0;
const DEFAULT_ROLLBACK_FAILED_TURNS: bool = false;

/// API token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// What happens to the user message of a turn whose model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedTurnPolicy {
    /// Leave the unanswered user message in history.
    KeepUserMessage,
    /// Remove it so the next request does not carry a dangling question.
    Rollback,
}

impl FailedTurnPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeepUserMessage => "keep",
            Self::Rollback => "rollback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credential: Credential,
    pub model: String,
    pub model_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub model_timeout_secs: Option<u64>,
    pub failed_turn_policy: FailedTurnPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<Self, StartupError> {
        let token = get_var(CREDENTIAL_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(StartupError::MissingCredential {
                var: CREDENTIAL_VAR,
            })?;

        let rollback = parse_bool(
            get_var("ROLLBACK_FAILED_TURNS").as_deref(),
            DEFAULT_ROLLBACK_FAILED_TURNS,
        );
        let failed_turn_policy = if rollback {
            FailedTurnPolicy::Rollback
        } else {
            FailedTurnPolicy::KeepUserMessage
        };

        Ok(Self {
            credential: Credential::new(token),
            model: get_var("MODEL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_base_url: get_var("MODEL_BASE_URL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            max_tokens: parse_max_tokens(get_var("MAX_TOKENS").as_deref()),
            temperature: parse_temperature(get_var("TEMPERATURE").as_deref()),
            model_timeout_secs: parse_positive_u64(get_var("MODEL_TIMEOUT_SECS").as_deref()),
            failed_turn_policy,
        })
    }
}

fn parse_positive_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn parse_max_tokens(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

fn parse_temperature(raw: Option<&str>) -> f32 {
    raw.and_then(|value| value.trim().parse::<f32>().ok())
        .filter(|value| value.is_finite() && (0.0..=MAX_TEMPERATURE).contains(value))
        .unwrap_or(DEFAULT_TEMPERATURE)
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
