use anyhow::{Context, Result};

pub const DEFAULT_LLM_API_URL: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.5-flash";
/// Ceiling on a single provider request. The gateway itself never times out.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
/// Fails at startup only on malformed optional values; the suggestion secrets
/// are checked on every call instead (see `SuggestionConfig`).
#[derive(Debug, Clone)]
pub struct Config {
    pub suggestions: SuggestionConfig,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

/// The three external values the suggestion flow cannot run without.
#[derive(Debug, Clone, Default)]
pub struct SuggestionConfig {
    pub llm_api_key: Option<String>,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            suggestions: SuggestionConfig {
                llm_api_key: optional_env("LLM_API_KEY"),
                store_url: optional_env("STORE_URL"),
                store_key: optional_env("STORE_KEY"),
            },
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: match optional_env("LLM_TIMEOUT_SECS") {
                Some(v) => v
                    .parse::<u64>()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
                None => DEFAULT_LLM_TIMEOUT_SECS,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl SuggestionConfig {
    /// Names of the required variables that are absent or blank, in a fixed order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("LLM_API_KEY", &self.llm_api_key),
            ("STORE_URL", &self.store_url),
            ("STORE_KEY", &self.store_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// The subset of `missing` the read-only store endpoints care about.
    pub fn missing_store(&self) -> Vec<&'static str> {
        self.missing()
            .into_iter()
            .filter(|name| name.starts_with("STORE_"))
            .collect()
    }
}

/// Reads an env var, treating an empty value the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
