use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Pediadose";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hits requested when a query is restricted to a mapped reference document.
pub const TARGETED_TOP_K: usize = 6;
/// Hits requested for an unrestricted query over the whole evidence store.
pub const GENERAL_TOP_K: usize = 5;

/// Character budget of the evidence excerpt kept in audit records.
pub const AUDIT_EXCERPT_CHARS: usize = 500;
/// Character budget of the excerpt quoted when no threshold could be extracted.
pub const AMBIGUOUS_EXCERPT_CHARS: usize = 300;
/// Characters quoted before / after a contraindication match.
pub const CONTRAINDICATION_WINDOW_BEFORE: usize = 30;
pub const CONTRAINDICATION_WINDOW_AFTER: usize = 100;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "medgemma:4b";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EVIDENCE_TIMEOUT_SECS: u64 = 15;

/// Context words appended to general evidence queries.
pub const DEFAULT_QUERY_CONTEXT: &str = "children juvenile idiopathic arthritis mg";

/// Get the application data directory.
/// Falls back to the working directory when the platform exposes none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the JSON evidence corpus backing the process-wide index.
pub fn default_corpus_path() -> PathBuf {
    app_data_dir().join("evidence.json")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,pediadose=debug"
    } else {
        "info"
    }
}

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Remote search service. When unset the process-wide in-memory index is used.
    pub endpoint: Option<String>,
    pub corpus_path: PathBuf,
    pub targeted_top_k: usize,
    pub general_top_k: usize,
    pub timeout_secs: u64,
    pub query_context: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            corpus_path: default_corpus_path(),
            targeted_top_k: TARGETED_TOP_K,
            general_top_k: GENERAL_TOP_K,
            timeout_secs: DEFAULT_EVIDENCE_TIMEOUT_SECS,
            query_context: DEFAULT_QUERY_CONTEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub evidence: EvidenceConfig,
    pub llm: LlmConfig,
    /// Evidence excerpt budget for decision results and audit records.
    pub excerpt_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evidence: EvidenceConfig::default(),
            llm: LlmConfig::default(),
            excerpt_chars: AUDIT_EXCERPT_CHARS,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `PEDIADOSE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("PEDIADOSE_EVIDENCE_URL").filter(|v| !v.trim().is_empty()) {
            config.evidence.endpoint = Some(url);
        }
        if let Some(path) = lookup("PEDIADOSE_EVIDENCE_CORPUS") {
            config.evidence.corpus_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("PEDIADOSE_EVIDENCE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.evidence.timeout_secs = secs;
        }
        if let Some(url) = lookup("PEDIADOSE_OLLAMA_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("PEDIADOSE_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(secs) = lookup("PEDIADOSE_LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.llm.timeout_secs = secs;
        }

        config
    }
}
