use crate::models::{EvidenceHit, SourceFilter};

use super::EvidenceError;

/// Semantic search over medical reference documents.
///
/// Implementations are blocking. Inside an async runtime they must be called
/// from `spawn_blocking` or a plain thread.
pub trait EvidenceStore: Send + Sync {
    /// Up to `top_k` hits for `query`, best first, optionally restricted to
    /// one source document.
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SourceFilter>,
    ) -> Result<Vec<EvidenceHit>, EvidenceError>;
}

impl<S: EvidenceStore + ?Sized> EvidenceStore for &S {
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SourceFilter>,
    ) -> Result<Vec<EvidenceHit>, EvidenceError> {
        (**self).search(query, top_k, filter)
    }
}
