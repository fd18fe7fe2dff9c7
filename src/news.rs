use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::api::models::Article;
use crate::config::Config;
use crate::error::{AppError, Result};

/// Headline categories accepted by the listing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    General,
    Business,
    #[default]
    Technology,
    Sports,
    Health,
    Science,
    Entertainment,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Sports,
        Category::Health,
        Category::Science,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Health => "health",
            Category::Science => "science",
            Category::Entertainment => "entertainment",
        }
    }

    /// Parses an optional query value; absent or blank means the default.
    pub fn from_query(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Category::default()),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| {
                let accepted: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
                AppError::Validation(format!(
                    "Unknown category '{}'. Expected one of: {}",
                    s.trim(),
                    accepted.join(", ")
                ))
            })
    }
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetches the current headlines for `category`, in upstream order.
    async fn top_headlines(&self, category: Category) -> Result<Vec<Article>>;
}

#[derive(Deserialize)]
struct NewsApiResponse {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    // NewsAPI may send `"articles": null` when a category has no headlines.
    articles: Option<Vec<RawArticle>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSource {
    name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_web_link(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Maps raw upstream entries to `Article`s, dropping any without a title or
/// an http(s) url and keeping at most `limit` of the rest.
pub(crate) fn map_articles(raw: Vec<RawArticle>, limit: usize) -> Vec<Article> {
    raw.into_iter()
        .filter_map(|entry| {
            let title = non_blank(entry.title)?;
            let url = non_blank(entry.url).filter(|url| is_web_link(url))?;
            Some(Article {
                title,
                url,
                description: non_blank(entry.description),
                source_name: non_blank(entry.source.and_then(|s| s.name)),
            })
        })
        .take(limit)
        .collect()
}

/// Pulls a readable message out of a NewsAPI error body, falling back to the
/// raw text.
fn upstream_message(body: &str) -> String {
    match serde_json::from_str::<NewsApiResponse>(body) {
        Ok(NewsApiResponse {
            code, message: Some(message), ..
        }) => match code {
            Some(code) => format!("{}: {}", code, message),
            None => message,
        },
        _ => body.chars().take(200).collect(),
    }
}

/// Client for the NewsAPI `top-headlines` endpoint.
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    url: String,
    language: String,
    page_size: u32,
}

impl NewsApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: crate::build_http_client(config.upstream_timeout)?,
            api_key: config.news_api_key.clone(),
            url: config.news_api_url.clone(),
            language: config.news_language.clone(),
            page_size: config.news_page_size,
        })
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn top_headlines(&self, category: Category) -> Result<Vec<Article>> {
        let started = Instant::now();
        let page_size = self.page_size.to_string();

        let response = self
            .client
            .get(&self.url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("category", category.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, elapsed = ?started.elapsed(), "news service responded");

        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "news service returned {}: {}",
                status,
                upstream_message(&body)
            )));
        }

        let payload: NewsApiResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::UpstreamMalformed(format!("news service response could not be parsed: {}", e))
        })?;

        if payload.status.as_deref() == Some("error") {
            return Err(AppError::UpstreamUnavailable(format!(
                "news service reported an error: {}",
                upstream_message(&body)
            )));
        }

        let raw = payload.articles.unwrap_or_default();
        let fetched = raw.len();
        let articles = map_articles(raw, self.page_size as usize);
        if articles.len() < fetched.min(self.page_size as usize) {
            tracing::debug!(
                fetched,
                kept = articles.len(),
                "dropped headlines without title or web url"
            );
        }

        Ok(articles)
    }
}
