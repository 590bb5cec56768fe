use crate::config::{self, EvidenceConfig};
use crate::models::{EvidenceBundle, EvidenceHit, SourceFilter};
use crate::pipeline::prescription::search_variants;

use super::store::EvidenceStore;
use super::EvidenceError;

/// A reference document dedicated to one substance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDocument {
    pub aliases: &'static [&'static str],
    pub source: &'static str,
}

/// Substances with a dedicated technical sheet in the evidence store.
pub static REFERENCE_DOCUMENTS: &[ReferenceDocument] = &[
    ReferenceDocument {
        aliases: &["methotrexate", "metotrexato", "metotrexate", "mtx"],
        source: "data/ficha tecnica metotrexate.pdf",
    },
    ReferenceDocument {
        aliases: &["ibuprofen", "ibuprofeno"],
        source: "data/ibuprofeno.pdf",
    },
    ReferenceDocument {
        aliases: &["paracetamol", "acetaminophen", "acetaminofen"],
        source: "data/paracetamol.pdf",
    },
    ReferenceDocument {
        aliases: &["prednisone", "prednisona"],
        source: "data/prednisona.pdf",
    },
    ReferenceDocument {
        aliases: &["tocilizumab"],
        source: "data/Tocilizumab.pdf",
    },
    ReferenceDocument {
        aliases: &["adalimumab", "humira"],
        source: "data/Adalimumab.pdf",
    },
];

/// Source identifier of the reference document mapped to `name`, if any.
pub fn reference_document(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    REFERENCE_DOCUMENTS
        .iter()
        .find(|doc| doc.aliases.iter().any(|a| *a == lower))
        .map(|doc| doc.source)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOptions {
    pub targeted_top_k: usize,
    pub general_top_k: usize,
    /// Words appended to general queries, e.g. the clinical population.
    pub query_context: String,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            targeted_top_k: config::TARGETED_TOP_K,
            general_top_k: config::GENERAL_TOP_K,
            query_context: config::DEFAULT_QUERY_CONTEXT.to_string(),
        }
    }
}

impl From<&EvidenceConfig> for RetrievalOptions {
    fn from(config: &EvidenceConfig) -> Self {
        Self {
            targeted_top_k: config.targeted_top_k,
            general_top_k: config.general_top_k,
            query_context: config.query_context.clone(),
        }
    }
}

/// Gather guideline evidence for `drug`.
///
/// Each spelling of the drug is tried in turn: a query restricted to its
/// reference document first, then an unrestricted one. The first on-topic
/// bundle is returned; otherwise the first non-empty one, flagged off-topic.
/// A store failure stops the search and is reported in the bundle, never
/// returned as an error.
pub fn retrieve(store: &dyn EvidenceStore, drug: &str, options: &RetrievalOptions) -> EvidenceBundle {
    let variants = search_variants(drug);
    let mut fallback: Option<EvidenceBundle> = None;
    let mut last_query = String::new();

    for variant in &variants {
        match search_variant(store, variant, options) {
            Ok((query, hits)) => {
                let bundle = build_bundle(drug, &variants, query, hits);
                if bundle.on_topic {
                    tracing::info!(drug = %drug, variant = %variant, hits = bundle.hits.len(), "On-topic evidence found");
                    return bundle;
                }
                last_query = bundle.query.clone();
                if fallback.is_none() && !bundle.is_empty() {
                    fallback = Some(bundle);
                }
            }
            Err((query, e)) => {
                tracing::warn!(drug = %drug, variant = %variant, error = %e, "Evidence store unavailable");
                return fallback.unwrap_or_else(|| EvidenceBundle::failed(drug, &query, e.to_string()));
            }
        }
    }

    match fallback {
        Some(bundle) => {
            tracing::info!(drug = %drug, hits = bundle.hits.len(), "Only off-topic evidence found");
            bundle
        }
        None => {
            tracing::info!(drug = %drug, "No evidence found");
            EvidenceBundle::empty(drug, &last_query)
        }
    }
}

/// Targeted-then-general search for one spelling.
fn search_variant(
    store: &dyn EvidenceStore,
    variant: &str,
    options: &RetrievalOptions,
) -> Result<(String, Vec<EvidenceHit>), (String, EvidenceError)> {
    if let Some(source) = reference_document(variant) {
        let query = format!("maximum dose {variant} mg kg children");
        let filter = SourceFilter::new(source);
        match store.search(&query, options.targeted_top_k, Some(&filter)) {
            Ok(hits) if !hits.is_empty() => return Ok((query, hits)),
            Ok(_) => {
                tracing::debug!(variant = %variant, source = %source, "Targeted search empty, widening");
            }
            Err(e) => {
                tracing::debug!(variant = %variant, error = %e, "Targeted search failed, widening");
            }
        }
    }

    let query = format!("{variant} dose {}", options.query_context)
        .trim()
        .to_string();
    match store.search(&query, options.general_top_k, None) {
        Ok(hits) => Ok((query, hits)),
        Err(e) => Err((query, e)),
    }
}

fn build_bundle(drug: &str, variants: &[String], query: String, hits: Vec<EvidenceHit>) -> EvidenceBundle {
    let text = hits
        .iter()
        .map(|h| h.text.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    let drug_lower = drug.to_lowercase();
    let on_topic = !hits.is_empty()
        && (text.contains(&drug_lower) || variants.iter().any(|v| text.contains(v.as_str())));

    EvidenceBundle {
        drug: drug.to_string(),
        query,
        hits,
        on_topic,
        error: None,
    }
}
