use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::backend::DEFAULT_BASE_URL;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Absent key means every generation call falls back.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Preferred model, tried before the built-in preference list.
    pub llm_model: Option<String>,
    pub generation_timeout: Duration,
    pub discovery_timeout: Duration,
    pub retrieval_top_k: usize,
    pub cors_allowed_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            llm_model: optional_env("LLM_MODEL"),
            generation_timeout: Duration::from_secs(parse_env("GENERATION_TIMEOUT_SECS", 20)?),
            discovery_timeout: Duration::from_secs(parse_env("DISCOVERY_TIMEOUT_SECS", 10)?),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K", 5)?,
            cors_allowed_origins: parse_origins(
                optional_env("CORS_ALLOWED_ORIGINS")
                    .as_deref()
                    .unwrap_or("http://localhost:5173,http://localhost:3000"),
            ),
            port: parse_env("PORT", 8000).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_drops_empty() {
        assert_eq!(
            parse_origins(" http://localhost:5173/ ,, https://mentor.example.com"),
            vec!["http://localhost:5173", "https://mentor.example.com"]
        );
    }

    #[test]
    fn test_parse_env_default_and_error() {
        assert_eq!(parse_env::<u64>("MENTOR_TEST_UNSET_TIMEOUT", 7).unwrap(), 7);

        std::env::set_var("MENTOR_TEST_BAD_PORT", "eighty");
        let err = parse_env::<u16>("MENTOR_TEST_BAD_PORT", 8000).unwrap_err();
        assert!(err.to_string().contains("MENTOR_TEST_BAD_PORT"));
    }

    #[test]
    fn test_blank_optional_env_is_absent() {
        std::env::set_var("MENTOR_TEST_BLANK_KEY", "   ");
        assert_eq!(optional_env("MENTOR_TEST_BLANK_KEY"), None);
    }
}
