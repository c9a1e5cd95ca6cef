//! Generation backend seam and the Gemini REST implementation.
//!
//! `LlmClient` holds an `Arc<dyn GenerationBackend>`; tests swap in a scripted
//! double, production uses `GeminiBackend`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FailureKind, GenerationFailure};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DISCOVERY_PAGE_SIZE: u32 = 100;
const MAX_DISCOVERY_PAGES: usize = 10;
const TEMPERATURE: f32 = 0.3;
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// The two operations the extraction core needs from a text generator.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Models able to generate text, without any `models/` prefix.
    async fn list_models(&self) -> Result<Vec<String>, GenerationFailure>;

    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, GenerationFailure>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiBackend
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generativelanguage` REST backend.
///
/// A missing API key is not a startup error: every call fails fast with
/// `FailureKind::Auth` and the pipeline serves fallback results.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn api_key(&self) -> Result<&str, GenerationFailure> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GenerationFailure::new(FailureKind::Auth, "GEMINI_API_KEY is not set"))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn list_models(&self) -> Result<Vec<String>, GenerationFailure> {
        let key = self.api_key()?;
        let url = format!("{}/models", self.base_url);
        let page_size = DISCOVERY_PAGE_SIZE.to_string();

        let mut available = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_DISCOVERY_PAGES {
            let mut query = vec![("key", key), ("pageSize", page_size.as_str())];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(transport_failure)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status.as_u16(), &body));
            }

            let page: ModelList = response.json().await.map_err(|e| {
                GenerationFailure::new(
                    FailureKind::MalformedResponse,
                    format!("model list was not valid JSON: {e}"),
                )
            })?;

            available.extend(generation_capable(page.models));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Discovered {} generation-capable models", available.len());
        Ok(available)
    }

    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, GenerationFailure> {
        let key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            GenerationFailure::new(
                FailureKind::MalformedResponse,
                format!("generateContent response was not valid JSON: {e}"),
            )
        })?;

        extract_text(parsed)
    }
}

fn generation_capable(models: Vec<ModelInfo>) -> impl Iterator<Item = String> {
    models
        .into_iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|m| m.name.trim_start_matches("models/").to_string())
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationFailure> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationFailure::new(
            FailureKind::ContentBlocked,
            format!("prompt blocked: {reason}"),
        ));
    }

    Err(GenerationFailure::new(
        FailureKind::MalformedResponse,
        "response carried no text candidates",
    ))
}

/// Maps a non-success HTTP status and its body onto a failure kind.
fn classify_status(status: u16, body: &str) -> GenerationFailure {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(300).collect());
    let lower = message.to_lowercase();

    let kind = if status == 401
        || status == 403
        || lower.contains("api key")
        || lower.contains("authentication")
    {
        FailureKind::Auth
    } else if status == 429 || lower.contains("quota") || lower.contains("rate limit") {
        FailureKind::QuotaExceeded
    } else if lower.contains("safety") || lower.contains("blocked") {
        FailureKind::ContentBlocked
    } else if status == 404 || status == 400 || lower.contains("not found") {
        FailureKind::ModelUnavailable
    } else {
        FailureKind::Network
    };

    GenerationFailure::new(kind, format!("HTTP {status}: {message}"))
}

fn transport_failure(e: reqwest::Error) -> GenerationFailure {
    if e.is_timeout() {
        GenerationFailure::new(FailureKind::Timeout, e.to_string())
    } else {
        GenerationFailure::new(FailureKind::Network, e.to_string())
    }
}
