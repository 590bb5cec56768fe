pub mod adapter;
pub mod http;
pub mod index;
pub mod memory;
pub mod store;

pub use adapter::{reference_document, retrieve, RetrievalOptions, REFERENCE_DOCUMENTS};
pub use http::HttpEvidenceStore;
pub use index::EvidenceIndex;
pub use memory::InMemoryEvidenceStore;
pub use store::EvidenceStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Evidence store connection failed: {0}")]
    Connection(String),

    #[error("Evidence request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Evidence store error (status {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Evidence response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("Cannot read evidence corpus {path}: {reason}")]
    CorpusLoad { path: String, reason: String },

    #[error("Invalid evidence corpus {path}: {reason}")]
    CorpusParse { path: String, reason: String },

    #[error("Evidence index lock poisoned")]
    LockPoisoned,
}
