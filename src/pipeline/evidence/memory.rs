use std::path::Path;

use crate::models::{EvidenceHit, SourceFilter};

use super::store::EvidenceStore;
use super::EvidenceError;

/// Evidence store over a fixed list of passages, scored lexically.
///
/// Scoring counts how many distinct query terms (three letters or more) occur
/// in a passage. Ties keep corpus order, so results are stable across calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvidenceStore {
    chunks: Vec<EvidenceHit>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: Vec<EvidenceHit>) -> Self {
        Self { chunks }
    }

    /// Load a corpus from a JSON array of `{source, page, text}` objects.
    pub fn load(path: &Path) -> Result<Self, EvidenceError> {
        let json = std::fs::read_to_string(path).map_err(|e| EvidenceError::CorpusLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let chunks: Vec<EvidenceHit> =
            serde_json::from_str(&json).map_err(|e| EvidenceError::CorpusParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), chunks = chunks.len(), "Evidence corpus loaded");
        Ok(Self { chunks })
    }

    pub fn add(&mut self, source: &str, page: Option<&str>, text: &str) {
        self.chunks.push(EvidenceHit::new(source, page, text));
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
    {
        if !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }
    terms
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SourceFilter>,
    ) -> Result<Vec<EvidenceHit>, EvidenceError> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &EvidenceHit)> = self
            .chunks
            .iter()
            .filter(|chunk| filter.map_or(true, |f| chunk.source_label == f.source))
            .map(|chunk| {
                let text = chunk.text.to_lowercase();
                let score = terms.iter().filter(|t| text.contains(t.as_str())).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }
}
