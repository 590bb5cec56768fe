//! Caller-facing entry points.
//!
//! Every `validate*` call returns a [`DecisionResult`]; evidence, model and
//! internal failures all surface as ALERT results rather than errors.

use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::models::{
    Decision, DecisionResult, EvidenceBundle, ExtractedFields, ValidationRequest, UNKNOWN_DRUG,
};
use crate::pipeline::decision::decide;
use crate::pipeline::dosage::calculate;
use crate::pipeline::evidence::{
    retrieve, EvidenceError, EvidenceIndex, EvidenceStore, HttpEvidenceStore, RetrievalOptions,
};
use crate::pipeline::llm::{build_review_prompt, merge_verdict, parse_verdict, CompletionClient};
use crate::pipeline::normalize::truncate_chars;
use crate::pipeline::prescription::extract_fields;
use crate::pipeline::report::{build_record, AuditRecord};
use crate::pipeline::threshold::parse_threshold;

pub struct Validator {
    store: Arc<dyn EvidenceStore>,
    config: EngineConfig,
}

impl Validator {
    pub fn new(store: Arc<dyn EvidenceStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Remote search service when an endpoint is configured, otherwise the
    /// process-wide index over the local corpus.
    pub fn from_config(config: EngineConfig) -> Result<Self, EvidenceError> {
        let store: Arc<dyn EvidenceStore> = match config.evidence.endpoint.as_deref() {
            Some(url) => {
                tracing::info!(url = %url, "Using remote evidence store");
                Arc::new(HttpEvidenceStore::new(url, config.evidence.timeout_secs)?)
            }
            None => {
                tracing::info!(
                    path = %config.evidence.corpus_path.display(),
                    "Using local evidence corpus"
                );
                Arc::new(EvidenceIndex::global(&config.evidence.corpus_path))
            }
        };
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate one prescription for a patient of `weight_kg`.
    pub fn validate(&self, prescription_text: &str, weight_kg: f64, patient_id: &str) -> DecisionResult {
        self.validate_request(&ValidationRequest::new(prescription_text, weight_kg, patient_id))
    }

    pub fn validate_request(&self, request: &ValidationRequest) -> DecisionResult {
        tracing::debug!(patient_id = %request.patient_id, "Validating prescription");
        guarded(UNKNOWN_DRUG, || {
            let fields = extract_fields(&request.prescription_text);
            let evidence = self.lookup(&fields.drug);
            self.evaluate(request, &fields, &evidence)
        })
    }

    /// Validate many prescriptions. Evidence is fetched once per distinct
    /// drug, concurrently on the blocking pool. Results keep input order.
    pub async fn validate_batch(&self, requests: Vec<ValidationRequest>) -> Vec<DecisionResult> {
        let extracted: Vec<Option<ExtractedFields>> = requests
            .iter()
            .map(|r| catch_unwind(AssertUnwindSafe(|| extract_fields(&r.prescription_text))).ok())
            .collect();

        let drugs: BTreeSet<String> = extracted
            .iter()
            .flatten()
            .filter(|f| !f.is_unknown_drug())
            .map(|f| f.drug.clone())
            .collect();
        tracing::info!(requests = requests.len(), drugs = drugs.len(), "Starting batch validation");

        let mut lookups = JoinSet::new();
        for drug in drugs {
            let store = Arc::clone(&self.store);
            let options = self.retrieval_options();
            lookups.spawn_blocking(move || {
                let bundle = catch_unwind(AssertUnwindSafe(|| retrieve(store.as_ref(), &drug, &options)))
                    .unwrap_or_else(|payload| {
                        EvidenceBundle::failed(&drug, "", format!("evidence lookup panicked: {}", panic_message(payload.as_ref())))
                    });
                (drug, bundle)
            });
        }

        let mut bundles: HashMap<String, EvidenceBundle> = HashMap::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((drug, bundle)) => {
                    bundles.insert(drug, bundle);
                }
                Err(e) => tracing::warn!(error = %e, "Evidence lookup task failed"),
            }
        }

        requests
            .iter()
            .zip(extracted)
            .map(|(request, fields)| match fields {
                Some(fields) => {
                    let evidence = if fields.is_unknown_drug() {
                        EvidenceBundle::empty(UNKNOWN_DRUG, "")
                    } else {
                        bundles.get(&fields.drug).cloned().unwrap_or_else(|| {
                            EvidenceBundle::failed(&fields.drug, "", "evidence lookup did not complete")
                        })
                    };
                    guarded(&fields.drug, || self.evaluate(request, &fields, &evidence))
                }
                None => DecisionResult::fault(UNKNOWN_DRUG, "prescription text could not be read"),
            })
            .collect()
    }

    /// Rule pipeline followed by a model review that can only escalate.
    ///
    /// A rule-engine REJECTED is returned without consulting the model.
    pub fn validate_with_llm(&self, request: &ValidationRequest, client: &dyn CompletionClient) -> DecisionResult {
        guarded(UNKNOWN_DRUG, || {
            let fields = extract_fields(&request.prescription_text);
            let evidence = self.lookup(&fields.drug);
            let rule = self.evaluate(request, &fields, &evidence);
            if rule.decision == Decision::Rejected {
                return rule;
            }

            let prompt = build_review_prompt(
                &request.prescription_text,
                request.biometrics().weight_kg,
                &rule,
                &evidence.combined_text(),
            );

            let raw = match client.complete(&prompt) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(drug = %rule.drug, error = %e, "Model review unavailable");
                    return DecisionResult {
                        decision: rule.decision.most_cautious(Decision::Alert),
                        rationale: format!("{} Model review unavailable, verify manually: {e}", rule.rationale),
                        ..rule
                    };
                }
            };

            match parse_verdict(&raw) {
                Ok(verdict) => merge_verdict(rule, &verdict, &raw),
                Err(e) => {
                    tracing::warn!(drug = %rule.drug, error = %e, "Unusable model response");
                    DecisionResult {
                        decision: rule.decision.most_cautious(Decision::Alert),
                        rationale: format!("{} Model response could not be read, verify manually: {e}", rule.rationale),
                        raw_response: Some(raw),
                        ..rule
                    }
                }
            }
        })
    }

    /// Audit form of a result for `request`.
    pub fn audit_record(&self, request: &ValidationRequest, result: &DecisionResult) -> AuditRecord {
        build_record(
            &request.patient_id,
            &request.prescription_text,
            result,
            self.config.excerpt_chars,
        )
    }

    fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions::from(&self.config.evidence)
    }

    /// An unidentified drug gets an empty bundle without a search.
    fn lookup(&self, drug: &str) -> EvidenceBundle {
        if drug == UNKNOWN_DRUG {
            return EvidenceBundle::empty(drug, "");
        }
        retrieve(self.store.as_ref(), drug, &self.retrieval_options())
    }

    fn evaluate(
        &self,
        request: &ValidationRequest,
        fields: &ExtractedFields,
        evidence: &EvidenceBundle,
    ) -> DecisionResult {
        let biometrics = request.biometrics();
        let threshold = parse_threshold(&evidence.combined_text());
        let dose = calculate(fields, &biometrics);
        let mut result = decide(fields, evidence, threshold.as_ref(), dose.as_ref());

        if let Some(excerpt) = result.evidence_excerpt.as_mut() {
            *excerpt = truncate_chars(excerpt, self.config.excerpt_chars).to_string();
        }

        tracing::info!(
            drug = %result.drug,
            decision = %result.decision,
            threshold = ?result.guideline_threshold.as_ref().map(|t| t.max_dose_mg),
            "Prescription validated"
        );
        result
    }
}

/// Run `f`, turning a panic into a fault ALERT.
fn guarded(drug: &str, f: impl FnOnce() -> DecisionResult) -> DecisionResult {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(drug = %drug, error = %message, "Validation fault");
        DecisionResult::fault(drug, &message)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceHit, SourceFilter};
    use crate::pipeline::evidence::InMemoryEvidenceStore;
    use crate::pipeline::llm::{LlmError, MockCompletionClient};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn guideline_store() -> InMemoryEvidenceStore {
        let mut store = InMemoryEvidenceStore::new();
        store.add(
            "data/ficha tecnica metotrexate.pdf",
            Some("4"),
            "Methotrexate in JIA is used at low doses (less than 25 mg/week).",
        );
        store.add(
            "data/ibuprofeno.pdf",
            Some("2"),
            "Ibuprofen in children: up to 40 mg/kg/day divided every 6-8 hours.",
        );
        store
    }

    fn validator(store: impl EvidenceStore + 'static) -> Validator {
        Validator::new(Arc::new(store), EngineConfig::default())
    }

    struct CountingStore {
        inner: InMemoryEvidenceStore,
        calls: AtomicUsize,
    }

    impl EvidenceStore for CountingStore {
        fn search(
            &self,
            query: &str,
            top_k: usize,
            filter: Option<&SourceFilter>,
        ) -> Result<Vec<EvidenceHit>, EvidenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search(query, top_k, filter)
        }
    }

    struct PanickingStore;

    impl EvidenceStore for PanickingStore {
        fn search(&self, _: &str, _: usize, _: Option<&SourceFilter>) -> Result<Vec<EvidenceHit>, EvidenceError> {
            panic!("index corrupted")
        }
    }

    struct DownStore;

    impl EvidenceStore for DownStore {
        fn search(&self, _: &str, _: usize, _: Option<&SourceFilter>) -> Result<Vec<EvidenceHit>, EvidenceError> {
            Err(EvidenceError::Timeout(15))
        }
    }

    #[test]
    fn excessive_methotrexate_is_rejected() {
        let v = validator(guideline_store());
        let r = v.validate("Methotrexate 30mg weekly", 25.0, "P-001");
        assert_eq!(r.decision, Decision::Rejected);
        assert_eq!(r.calculated_dose_mg, Some(30.0));
        assert_eq!(r.guideline_threshold.as_ref().unwrap().max_dose_mg, 25.0);
        assert!(r.evidence_on_topic);
        assert!(r.evidence_excerpt.unwrap().starts_with("--- EVIDENCE FOUND ---"));
    }

    #[test]
    fn per_kg_prescription_compares_total_mg_with_limit() {
        // 10 mg/kg x 20 kg = 200 mg, at or above a limit of 40
        let v = validator(guideline_store());
        let r = v.validate("Ibuprofen 10mg/kg every 8h", 20.0, "P-002");
        assert_eq!(r.decision, Decision::Rejected);
        assert_eq!(r.calculated_dose_mg, Some(200.0));
        assert_eq!(r.frequency_hours, Some(8));
        assert!(r.rationale.contains("prescribed 200 mg"), "{}", r.rationale);
    }

    fn counting(inner: InMemoryEvidenceStore) -> Arc<CountingStore> {
        Arc::new(CountingStore {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn unidentified_drug_is_alert_without_lookup() {
        let mut inner = guideline_store();
        inner.add("data/general.pdf", None, "Any drug: less than 25 mg/week.");
        let store = counting(inner);
        let v = Validator::new(store.clone(), EngineConfig::default());
        let r = v.validate("take 5 mg weekly", 20.0, "P-009");
        assert_eq!(r.drug, UNKNOWN_DRUG);
        assert_eq!(r.decision, Decision::Alert);
        assert!(r.guideline_threshold.is_none());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_skips_lookup_for_unidentified_drug() {
        let store = counting(guideline_store());
        let v = Validator::new(store.clone(), EngineConfig::default());
        let results = v
            .validate_batch(vec![
                ValidationRequest::new("take 5 mg weekly", 20.0, "P-009"),
                ValidationRequest::new("Methotrexate 15 mg weekly", 25.0, "P-003"),
            ])
            .await;
        assert_eq!(results[0].decision, Decision::Alert);
        assert_eq!(results[0].drug, UNKNOWN_DRUG);
        assert_eq!(results[1].decision, Decision::Approved);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_evidence_is_alert_with_dose() {
        let v = validator(InMemoryEvidenceStore::new());
        let r = v.validate("Ibuprofen 10mg/kg every 8h", 20.0, "P-002");
        assert_eq!(r.decision, Decision::Alert);
        assert_eq!(r.drug, "Ibuprofen");
        assert_eq!(r.calculated_dose_mg, Some(200.0));
        assert_eq!(r.frequency_text, "every 8 hours");
    }

    #[test]
    fn store_failure_is_alert() {
        let v = validator(DownStore);
        let r = v.validate("Methotrexate 30mg weekly", 25.0, "P-001");
        assert_eq!(r.decision, Decision::Alert);
        assert!(r.rationale.contains("timed out"), "{}", r.rationale);
    }

    #[test]
    fn panic_becomes_fault_alert() {
        let v = validator(PanickingStore);
        let r = v.validate("Methotrexate 30mg weekly", 25.0, "P-001");
        assert_eq!(r.decision, Decision::Alert);
        assert!(r.rationale.contains("index corrupted"), "{}", r.rationale);
    }

    #[test]
    fn repeated_validation_is_identical() {
        let v = validator(guideline_store());
        let a = v.validate("Methotrexate 15 mg weekly", 25.0, "P-001");
        let b = v.validate("Methotrexate 15 mg weekly", 25.0, "P-001");
        assert_eq!(a, b);
        assert_eq!(a.decision, Decision::Approved);
    }

    #[test]
    fn excerpt_follows_configured_budget() {
        let config = EngineConfig {
            excerpt_chars: 40,
            ..EngineConfig::default()
        };
        let v = Validator::new(Arc::new(guideline_store()), config);
        let r = v.validate("Methotrexate 30mg weekly", 25.0, "P-001");
        assert_eq!(r.evidence_excerpt.unwrap().chars().count(), 40);
    }

    #[tokio::test]
    async fn batch_keeps_order_and_deduplicates_lookups() {
        let store = counting(guideline_store());
        let v = Validator::new(store.clone(), EngineConfig::default());

        let results = v
            .validate_batch(vec![
                ValidationRequest::new("Methotrexate 30mg weekly", 25.0, "P-001"),
                ValidationRequest::new("Ibuprofen 10mg/kg every 8h", 20.0, "P-002"),
                ValidationRequest::new("Methotrexate 15 mg weekly", 25.0, "P-003"),
            ])
            .await;

        let decisions: Vec<Decision> = results.iter().map(|r| r.decision).collect();
        assert_eq!(decisions, vec![Decision::Rejected, Decision::Rejected, Decision::Approved]);
        assert_eq!(results[1].drug, "Ibuprofen");
        // One targeted search per distinct drug.
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_matches_single_validation() {
        let v = validator(guideline_store());
        let request = ValidationRequest::new("Methotrexate 30mg weekly", 25.0, "P-001");
        let batch = v.validate_batch(vec![request.clone()]).await;
        assert_eq!(batch, vec![v.validate_request(&request)]);
    }

    #[tokio::test]
    async fn batch_survives_panicking_store() {
        let v = validator(PanickingStore);
        let results = v
            .validate_batch(vec![ValidationRequest::new("Methotrexate 30mg weekly", 25.0, "P-001")])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].decision, Decision::Alert);
        assert!(results[0].rationale.contains("index corrupted"));
    }

    #[test]
    fn model_escalates_approval() {
        let v = validator(guideline_store());
        let client = MockCompletionClient::new(
            r#"Review: {"drug": "Methotrexate", "indicated": true, "rationale": "Renal function not stated.", "decision": "REJECTED"}"#,
        );
        let request = ValidationRequest::new("Methotrexate 15 mg weekly", 25.0, "P-003");
        let r = v.validate_with_llm(&request, &client);
        assert_eq!(r.decision, Decision::Rejected);
        assert!(r.raw_response.is_some());
    }

    #[test]
    fn rule_rejection_skips_model() {
        let v = validator(guideline_store());
        let client = MockCompletionClient::new(r#"{"decision": "APPROVED"}"#);
        let request = ValidationRequest::new("Methotrexate 30mg weekly", 25.0, "P-001");
        let r = v.validate_with_llm(&request, &client);
        assert_eq!(r.decision, Decision::Rejected);
        assert!(r.raw_response.is_none());
        assert!(!r.rationale.contains("Model review"));
    }

    #[test]
    fn malformed_model_output_is_alert_with_raw_text() {
        let v = validator(guideline_store());
        let client = MockCompletionClient::new("I am not sure about this one.");
        let request = ValidationRequest::new("Methotrexate 15 mg weekly", 25.0, "P-003");
        let r = v.validate_with_llm(&request, &client);
        assert_eq!(r.decision, Decision::Alert);
        assert_eq!(r.raw_response.as_deref(), Some("I am not sure about this one."));
    }

    #[test]
    fn model_transport_error_is_alert() {
        let v = validator(guideline_store());
        let client = MockCompletionClient::failing(LlmError::Connection("http://localhost:11434".into()));
        let request = ValidationRequest::new("Methotrexate 15 mg weekly", 25.0, "P-003");
        let r = v.validate_with_llm(&request, &client);
        assert_eq!(r.decision, Decision::Alert);
        assert!(r.rationale.contains("not running"), "{}", r.rationale);
    }

    #[test]
    fn audit_record_for_result() {
        let v = validator(guideline_store());
        let request = ValidationRequest::new("Methotrexate 30mg weekly", 25.0, "P-001");
        let result = v.validate_request(&request);
        let record = v.audit_record(&request, &result);
        assert_eq!(record.status, "Rejected");
        assert_eq!(record.patient_id, "P-001");
        assert_eq!(record.analysis.calculated_dose, "30 mg");
        assert_eq!(record.audit.max_guideline_dose_mg, Some(25.0));
    }

    #[test]
    fn from_config_with_endpoint_uses_http() {
        let mut config = EngineConfig::default();
        config.evidence.endpoint = Some("http://127.0.0.1:9".into());
        config.evidence.timeout_secs = 1;
        let v = Validator::from_config(config).unwrap();
        let r = v.validate("Methotrexate 30mg weekly", 25.0, "P-001");
        assert_eq!(r.decision, Decision::Alert);
    }
}
