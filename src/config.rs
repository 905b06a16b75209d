// ⚙️ Configuration
// Built once at startup from the environment and passed down explicitly

use crate::error::ConfigError;
use crate::fetcher::RetryPolicy;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PLAID_BASE_URL: &str = "https://sandbox.plaid.com";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Credentials and location of the transaction aggregator
#[derive(Clone)]
pub struct AggregatorConfig {
    pub base_url: String,
    pub client_id: String,
    pub secret: String,
    pub access_token: String,
}

impl fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Chat-completion provider settings
#[derive(Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub aggregator: AggregatorConfig,
    pub llm: LlmConfig,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let max_attempts: u32 = parse_number(&get, "PLAID_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "PLAID_MAX_ATTEMPTS",
                value: "0".to_string(),
                expected: "a positive integer",
            });
        }
        let base_delay_ms = parse_number(&get, "PLAID_RETRY_BASE_DELAY_MS", 2000)?;

        Ok(Config {
            aggregator: AggregatorConfig {
                base_url: trim_slash(string_or("PLAID_BASE_URL", DEFAULT_PLAID_BASE_URL)),
                client_id: string_or("PLAID_CLIENT_ID", ""),
                secret: string_or("PLAID_SECRET", ""),
                access_token: string_or("PLAID_ACCESS_TOKEN", ""),
            },
            llm: LlmConfig {
                base_url: trim_slash(string_or("DEEPSEEK_API_URL", DEFAULT_LLM_BASE_URL)),
                api_key: get("DEEPSEEK_API_KEY"),
                model: string_or("DEEPSEEK_MODEL", DEFAULT_LLM_MODEL),
            },
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
            },
            http_timeout: Duration::from_secs(parse_number(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?),
            bind_addr: string_or("BIND_ADDR", DEFAULT_BIND_ADDR),
        })
    }
}

fn parse_number<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            expected: "a non-negative integer",
        }),
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
