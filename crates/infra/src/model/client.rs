//! HTTP client for the external model capability.
//!
//! Speaks the chat-completions wire shape and maps transport failures to
//! `Unavailable`, so callers can distinguish "the model endpoint is down"
//! from a malformed response.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tides_core::ModelPort;
use tides_domain::{ModelConfig, Result, TidesError};
use tracing::debug;

pub struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

impl HttpModelClient {
    /// Build a client from the model section of the configuration.
    ///
    /// # Errors
    /// Returns `TidesError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TidesError::Config(format!("Failed to build model client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ModelPort for HttpModelClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            TidesError::Unavailable(format!("model endpoint unreachable: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TidesError::Unavailable(format!(
                "model endpoint returned {status}"
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            TidesError::Internal(format!("malformed model response: {e}"))
        })?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TidesError::Internal("model response had no choices".to_string()))?;

        debug!(answer_len = answer.len(), "model completion received");
        Ok(answer)
    }
}
