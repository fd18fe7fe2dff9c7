use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

pub const EMPTY_SUMMARY_FALLBACK: &str =
    "The AI model could not generate a summary for this content.";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns a short summary of `content`.
    async fn summarize(&self, content: &str) -> Result<String>;
}

pub fn build_prompt(content: &str) -> String {
    let mut result = String::with_capacity(content.len() + 200);
    result.push_str(
        "Based on the following news article content, provide a clear and concise \
         summary of about 3-4 sentences. Focus on the key takeaway:\n\n---\n\n",
    );
    result.push_str(content);
    result.push_str("\n\n---\n\nSummary:");
    result
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate. Blank text is replaced
    /// with the fallback summary; a reply with no text at all is malformed.
    pub fn into_summary(self) -> Result<String> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let texts: Vec<String> = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if texts.is_empty() {
            let detail = match block_reason {
                Some(reason) => format!("prompt was blocked ({})", reason),
                None => "reply contained no generated text".to_string(),
            };
            return Err(AppError::UpstreamMalformed(format!(
                "generation service {}",
                detail
            )));
        }

        let summary = texts.concat().trim().to_string();
        if summary.is_empty() {
            return Ok(EMPTY_SUMMARY_FALLBACK.to_string());
        }
        Ok(summary)
    }
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: crate::build_http_client(config.upstream_timeout)?,
            api_key: config.gemini_api_key.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.gemini_api_url, config.gemini_model
            ),
        })
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, content: &str) -> Result<String> {
        let prompt = build_prompt(content);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(%status, elapsed = ?started.elapsed(), "generation service responded");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::UpstreamUnavailable(format!(
                "generation service is rate limiting requests: {}",
                upstream_message(&text)
            )));
        }
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "generation service returned {}: {}",
                status,
                upstream_message(&text)
            )));
        }

        let reply: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            AppError::UpstreamMalformed(format!(
                "generation service response could not be parsed: {}",
                e
            ))
        })?;

        reply.into_summary()
    }
}
