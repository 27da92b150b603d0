//! Generative model endpoint client.
//!
//! Protocol: `POST {endpoint}/{model}` with a bearer token and
//! `{"inputs": <base64 image>, "parameters": {"prompt", "negative_prompt"}}`.
//! A `200` with an `image/*` body is the result; a `503` whose JSON mentions
//! loading (or carries `estimated_time`) means the model is warming up.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bf_core::config::RestyleConfig;
use bf_core::{Error, Result};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

/// Wait assumed when a loading reply carries no estimate.
const DEFAULT_LOADING_SECS: f64 = 10.0;

/// Longest error body excerpt kept in failure messages.
const BODY_SNIPPET_LEN: usize = 200;

/// What the model endpoint said about one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Image(Bytes),
    /// The model is loading; try again after roughly this many seconds.
    Loading { estimated_secs: f64 },
    Failed { status: Option<u16>, message: String },
}

/// A generative image-to-image model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        negative_prompt: &str,
        image: Bytes,
    ) -> ModelReply;
}

#[derive(Debug, Deserialize)]
struct LoadingBody {
    #[serde(default)]
    error: String,
    estimated_time: Option<f64>,
}

/// HTTP client for hosted inference endpoints.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl InferenceClient {
    pub fn new(config: &RestyleConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build inference client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/{}", self.endpoint, model.trim_start_matches('/'))
    }
}

#[async_trait]
impl ImageModel for InferenceClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        negative_prompt: &str,
        image: Bytes,
    ) -> ModelReply {
        let body = json!({
            "inputs": STANDARD.encode(&image),
            "parameters": {
                "prompt": prompt,
                "negative_prompt": negative_prompt,
            },
        });

        let mut request = self.http.post(self.url_for(model)).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                return ModelReply::Failed {
                    status: None,
                    message: format!("request failed: {e}"),
                }
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return ModelReply::Failed {
                    status: Some(status.as_u16()),
                    message: format!("failed to read body: {e}"),
                }
            }
        };

        interpret(status.as_u16(), &content_type, bytes)
    }
}

/// Map a raw endpoint response onto a [`ModelReply`].
pub fn interpret(status: u16, content_type: &str, body: Bytes) -> ModelReply {
    if (200..300).contains(&status) && content_type.starts_with("image/") {
        return ModelReply::Image(body);
    }

    if status == 503 {
        if let Ok(parsed) = serde_json::from_slice::<LoadingBody>(&body) {
            if parsed.estimated_time.is_some() || parsed.error.to_ascii_lowercase().contains("loading") {
                return ModelReply::Loading {
                    estimated_secs: parsed.estimated_time.unwrap_or(DEFAULT_LOADING_SECS),
                };
            }
        }
    }

    let text = String::from_utf8_lossy(&body);
    let snippet: String = text.chars().take(BODY_SNIPPET_LEN).collect();
    ModelReply::Failed {
        status: Some(status),
        message: format!("HTTP {status}: {snippet}"),
    }
}
