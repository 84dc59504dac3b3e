use anyhow::{Context, Result};
use chat_client::{ChatClient, RetryPolicy};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use summary_expert::ModelSettings;

pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Model and client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: ModelSettings,
    pub read_timeout: Duration,
    pub max_attempts: u32,
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var("LLM_API_KEY")
            .or_else(|| var("OPENAI_API_KEY"))
            .context("LLM_API_KEY or OPENAI_API_KEY must be set")?;

        let mut model = ModelSettings::default();
        if let Some(name) = var("LLM_MODEL") {
            model = model.with_model(name);
        }
        if let Some(raw) = var("LLM_MAX_TOKENS") {
            model = model.with_max_tokens(
                raw.parse()
                    .context("LLM_MAX_TOKENS must be a valid number")?,
            );
        }
        if let Some(raw) = var("LLM_TEMPERATURE") {
            model = model.with_temperature(
                raw.parse()
                    .context("LLM_TEMPERATURE must be a valid number")?,
            );
        }

        let read_timeout = match var("LLM_READ_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .context("LLM_READ_TIMEOUT_SECS must be a valid number")?,
            None => DEFAULT_READ_TIMEOUT_SECS,
        };
        let max_attempts = match var("LLM_MAX_ATTEMPTS") {
            Some(raw) => raw
                .parse()
                .context("LLM_MAX_ATTEMPTS must be a valid number")?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            api_key,
            base_url: var("LLM_BASE_URL"),
            model,
            read_timeout: Duration::from_secs(read_timeout),
            max_attempts,
        })
    }

    pub fn chat_client(&self) -> ChatClient {
        let client = ChatClient::new(self.api_key.clone())
            .with_timeout(self.read_timeout)
            .with_retry_policy(RetryPolicy::default().with_max_attempts(self.max_attempts));

        match &self.base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        }
    }
}
