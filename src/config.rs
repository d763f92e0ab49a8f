use std::env;
use std::time::Duration;

use crate::types::FetchConfig;

/// Runtime configuration, resolved from the environment with defaults that
/// match the upstream deployment. Nothing here is required except the API
/// key for whichever provider is selected.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listing endpoint of the news site.
    pub news_api_url: String,
    /// Channel the search endpoint is scoped to.
    pub news_channel_id: u32,
    /// The fixed topic every scheduled run classifies against.
    pub topic: String,
    /// Provider identifier resolved through the registry for scheduled runs.
    pub default_model: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub anthropic_model: String,
    pub database_url: String,
    pub request_timeout: Duration,
    /// Seconds between scheduled incremental runs.
    pub run_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let request_timeout = env::var("NEWS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let run_interval_secs = env::var("NEWS_RUN_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600);

        Self {
            news_api_url: env::var("NEWS_API_URL")
                .unwrap_or_else(|_| "https://udn.com/api/more".to_string()),
            news_channel_id: env::var("NEWS_CHANNEL_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            topic: env::var("NEWS_TOPIC")
                .unwrap_or_else(|_| "price changes of daily necessities".to_string()),
            default_model: env::var("NEWS_DEFAULT_MODEL")
                .unwrap_or_else(|_| "default-openai".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-opus-5".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://news.db?mode=rwc".to_string()),
            request_timeout,
            run_interval_secs,
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: "news-ingestion/0.1".to_string(),
            timeout: self.request_timeout,
        }
    }
}
