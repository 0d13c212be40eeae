use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

const API_URL_ENV: &str = "REEL_API_URL";
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat backend, without a trailing slash.
    pub base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.base_url)
            .with_context(|| format!("{API_URL_ENV} is not a valid URL: {}", self.base_url))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!(
                "{API_URL_ENV} must be http(s), got '{}'",
                parsed.scheme()
            );
        }

        Ok(())
    }
}
