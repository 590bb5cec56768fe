use serde::{Deserialize, Serialize};

use crate::models::{EvidenceHit, SourceFilter};

use super::store::EvidenceStore;
use super::EvidenceError;

/// Client for a remote semantic-search service.
///
/// `POST {base_url}/search` with `{query, top_k, filter}`; the service answers
/// `{results: [{text, source_label, page}]}`.
pub struct HttpEvidenceStore {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpEvidenceStore {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, EvidenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EvidenceError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a SourceFilter>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<EvidenceHit>,
}

impl EvidenceStore for HttpEvidenceStore {
    fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SourceFilter>,
    ) -> Result<Vec<EvidenceHit>, EvidenceError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            query,
            top_k,
            filter,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    EvidenceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    EvidenceError::Timeout(self.timeout_secs)
                } else {
                    EvidenceError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EvidenceError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| EvidenceError::ResponseParsing(e.to_string()))?;

        tracing::debug!(url = %url, hits = parsed.results.len(), "Evidence search completed");
        Ok(parsed.results.into_iter().take(top_k).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let store = HttpEvidenceStore::new("http://localhost:8000/", 5).unwrap();
        assert_eq!(store.base_url(), "http://localhost:8000");
        assert_eq!(store.timeout_secs, 5);
    }

    #[test]
    fn request_omits_absent_filter() {
        let body = SearchRequest {
            query: "ibuprofen",
            top_k: 5,
            filter: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["top_k"], 5);
        assert!(json.get("filter").is_none());
    }

    #[test]
    fn request_carries_source_filter() {
        let filter = SourceFilter::new("data/ibuprofeno.pdf");
        let body = SearchRequest {
            query: "maximum dose ibuprofen",
            top_k: 6,
            filter: Some(&filter),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["filter"]["source"], "data/ibuprofeno.pdf");
    }

    #[test]
    fn response_without_results_is_empty() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn unreachable_store_is_an_error_not_a_panic() {
        let store = HttpEvidenceStore::new("http://127.0.0.1:9", 2).unwrap();
        let result = store.search("ibuprofen", 5, None);
        assert!(matches!(
            result,
            Err(EvidenceError::Connection(_))
                | Err(EvidenceError::Timeout(_))
                | Err(EvidenceError::HttpClient(_))
        ));
    }
}
