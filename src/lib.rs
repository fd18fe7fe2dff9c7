pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod news;

use std::sync::Arc;
use std::time::Duration;

use config::Config;
use error::{AppError, Result};
use llm::{GeminiClient, Summarizer};
use news::{NewsApiClient, NewsSource};
use reqwest::{Client, ClientBuilder};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub news: Arc<dyn NewsSource>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    /// Wires the live NewsAPI and Gemini clients.
    pub fn new(config: Config) -> Result<Self> {
        let news = NewsApiClient::new(&config)?;
        let summarizer = GeminiClient::new(&config)?;
        Ok(Self::with_upstreams(config, Arc::new(news), Arc::new(summarizer)))
    }

    pub fn with_upstreams(
        config: Config,
        news: Arc<dyn NewsSource>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            news,
            summarizer,
        }
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}
