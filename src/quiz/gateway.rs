//! Model gateway: the generative-language HTTP endpoint and its wire format.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("rate limit exceeded: {body}")]
    RateLimited { body: String },

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl GatewayError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GatewayError::RateLimited { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Unconstrained request; the reply is free natural-language text.
    pub fn text(instructions: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: instructions.into(),
                }],
            }],
            generation_config: None,
        }
    }

    /// Request whose reply must be JSON conforming to `schema`.
    pub fn structured(instructions: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            }),
            ..Self::text(instructions)
        }
    }

    pub fn instructions(&self) -> &str {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
/// Anything missing, empty or unparsable yields `None`.
pub fn extract_text(body: &str) -> Option<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).ok()?;
    let text = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text;
    (!text.trim().is_empty()).then_some(text)
}

/// A single attempt against the generative-language service.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Sends the request once and returns the raw body of a 2xx response.
    async fn send(&self, request: &GenerateContentRequest) -> Result<String, GatewayError>;
}

const GATEWAY_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `generateContent` endpoint of the Gemini API.
pub struct GeminiGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiGateway {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(GATEWAY_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key,
        })
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn send(&self, request: &GenerateContentRequest) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited { body });
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Gateway access for the rest of the quiz: every call goes through the retry policy.
pub struct ModelClient {
    gateway: Arc<dyn ModelGateway>,
    retry: RetryPolicy,
}

impl ModelClient {
    pub fn new(gateway: Arc<dyn ModelGateway>, retry: RetryPolicy) -> Self {
        Self { gateway, retry }
    }

    /// Sends the request with retries and returns the first candidate's text,
    /// or `None` when the service answered without usable content.
    pub async fn generate_text(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<Option<String>, GatewayError> {
        log::debug!(
            "Sending model request ({} chars, structured: {})",
            request.instructions().len(),
            request.generation_config.is_some()
        );
        let body = self
            .retry
            .execute(|| self.gateway.send(request))
            .await?;
        Ok(extract_text(&body))
    }
}
