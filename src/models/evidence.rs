use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel phrases some stores return in place of an empty result.
const NOT_FOUND_MARKERS: &[&str] = &[
    "no information found",
    "no evidence found",
    "no se encontr",
];

/// Rendered in place of evidence when a bundle holds no hits.
pub const NO_EVIDENCE_MESSAGE: &str = "No information found in the medical guidelines.";

/// Source restriction for an evidence query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub source: String,
}

impl SourceFilter {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
        }
    }
}

/// One passage returned by the evidence store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceHit {
    pub text: String,
    #[serde(alias = "source")]
    pub source_label: String,
    /// Page or section label. Stores report either numbers or strings.
    #[serde(default, deserialize_with = "page_label")]
    pub page: Option<String>,
}

fn page_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl EvidenceHit {
    pub fn new(source_label: &str, page: Option<&str>, text: &str) -> Self {
        Self {
            text: text.to_string(),
            source_label: source_label.to_string(),
            page: page.map(str::to_string),
        }
    }

    /// File name of the source without its directory.
    pub fn source_name(&self) -> &str {
        self.source_label
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_label)
    }
}

/// Evidence gathered for one drug during one decision call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub drug: String,
    /// Query that produced `hits`.
    pub query: String,
    pub hits: Vec<EvidenceHit>,
    /// Drug name or one of its aliases appears literally in the hits.
    pub on_topic: bool,
    /// Set when the store could not be queried.
    pub error: Option<String>,
}

impl EvidenceBundle {
    pub fn empty(drug: &str, query: &str) -> Self {
        Self {
            drug: drug.to_string(),
            query: query.to_string(),
            hits: Vec::new(),
            on_topic: false,
            error: None,
        }
    }

    pub fn failed(drug: &str, query: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(drug, query)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hit texts joined in rank order. This is what threshold and rule
    /// patterns are matched against.
    pub fn combined_text(&self) -> String {
        self.hits
            .iter()
            .map(|h| h.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Auditable rendering with source and page labels.
    pub fn render(&self) -> String {
        if self.hits.is_empty() {
            return NO_EVIDENCE_MESSAGE.to_string();
        }
        let mut out = String::from("--- EVIDENCE FOUND ---");
        for hit in &self.hits {
            out.push_str(&format!(
                "\n[Source: {} - p. {}]:\n{}\n",
                hit.source_name(),
                hit.page.as_deref().unwrap_or("?"),
                hit.text.trim()
            ));
        }
        out
    }

    /// False when the store failed, returned nothing, or returned only a
    /// "not found" sentinel.
    pub fn is_usable(&self) -> bool {
        if self.error.is_some() {
            return false;
        }
        let text = self.combined_text();
        if text.trim().is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        !NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m))
    }
}
