use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

use super::prompt::REVIEW_SYSTEM_PROMPT;
use super::{CompletionClient, LlmError};

/// Ollama HTTP client for local model inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(&config.base_url, &config.model, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl CompletionClient for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: REVIEW_SYSTEM_PROMPT,
            stream: false,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Requesting completion");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Mock completion client for testing: a canned response or a canned error.
pub struct MockCompletionClient {
    result: Result<String, LlmError>,
}

impl MockCompletionClient {
    pub fn new(response: &str) -> Self {
        Self {
            result: Ok(response.to_string()),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self { result: Err(error) }
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        self.result.clone()
    }
}
