//! Gemini API client with SSE streaming support.

use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ba_protocol::StreamEvent;

use crate::sse::decode_sse;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(String),
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    http: Client,
}

/// Build an HTTP client with appropriate timeouts and connection limits.
fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
}

impl GeminiClient {
    /// Create a new client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create a new client with a custom model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: build_http_client(),
        }
    }

    /// Send a non-streaming generation request, returning the text of the
    /// first candidate. Used for project file generation.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&ApiRequest::user_text(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{status}: {body}")));
        }

        let payload: GeneratePayload = response.json().await?;
        let text = payload.candidate_text();
        if text.is_empty() {
            return Err(GeminiError::Api("no text content in response".to_string()));
        }
        Ok(text)
    }

    /// Send a streaming generation request and return a stream of events.
    ///
    /// Transport or API failures surface as a single terminal
    /// `StreamEvent::Error`; a complete response ends with `Done`.
    pub fn stream(&self, prompt: &str) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let http = self.http.clone();
        let prompt = prompt.to_string();

        stream! {
            match open_stream(&http, &api_key, &model, &prompt).await {
                Ok(response) => {
                    let mut events = Box::pin(decode_sse(response.bytes_stream()));

                    while let Some(result) = events.next().await {
                        match result {
                            Ok(sse_event) => {
                                for event in payload_events(&sse_event.data) {
                                    yield event;
                                }
                            }
                            Err(e) => {
                                yield StreamEvent::Error(format!("stream error: {e}"));
                                return;
                            }
                        }
                    }

                    yield StreamEvent::Done;
                }
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                }
            }
        }
    }
}

async fn open_stream(
    http: &Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<reqwest::Response, GeminiError> {
    let url = format!("{API_BASE}/{model}:streamGenerateContent?alt=sse");
    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .header("content-type", "application/json")
        .json(&ApiRequest::user_text(prompt))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GeminiError::Api(format!("{status}: {body}")));
    }

    Ok(response)
}

/// Parse one SSE `data:` payload into stream events.
///
/// Unparseable payloads are skipped rather than failing the stream; the API
/// occasionally sends keepalive frames with no candidate content.
fn payload_events(data: &str) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    let payload: GeneratePayload = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(_) => return events,
    };

    let text = payload.candidate_text();
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta(text));
    }

    if let Some(usage) = payload.usage_metadata {
        events.push(StreamEvent::Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        });
    }

    events
}

// API request/response types

#[derive(Debug, Serialize)]
struct ApiRequest {
    contents: Vec<ApiContent>,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: String,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize)]
struct ApiPart {
    text: String,
}

impl ApiRequest {
    fn user_text(prompt: &str) -> Self {
        Self {
            contents: vec![ApiContent {
                role: "user".to_string(),
                parts: vec![ApiPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl GeneratePayload {
    /// Concatenated text of the first candidate's parts.
    fn candidate_text(&self) -> String {
        let Some(candidate) = self.candidates.first() else {
            return String::new();
        };
        let Some(content) = &candidate.content else {
            return String::new();
        };
        content.parts.iter().map(|p| p.text.as_str()).collect()
    }
}
