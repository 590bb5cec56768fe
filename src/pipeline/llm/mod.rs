pub mod ollama;
pub mod prompt;
pub mod review;

pub use ollama::{MockCompletionClient, OllamaClient};
pub use prompt::{build_review_prompt, REVIEW_SYSTEM_PROMPT};
pub use review::{extract_json_object, merge_verdict, parse_verdict, LlmVerdict};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Language model service is not running at {0}")]
    Connection(String),

    #[error("Language model request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Language model returned error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}

/// A text-completion service. Blocking; callers on an async runtime wrap
/// calls in `spawn_blocking`.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
