use crate::config::{AMBIGUOUS_EXCERPT_CHARS, AUDIT_EXCERPT_CHARS};
use crate::models::{Decision, DecisionResult, EvidenceBundle, ExtractedFields, GuidelineThreshold};
use crate::pipeline::dosage::DoseCalculation;
use crate::pipeline::normalize::{format_number, single_line, truncate_chars};
use crate::pipeline::prescription::search_variants;

use super::rules::find_contraindication;

/// Words that show evidence concerns the clinical context even when it never
/// names the drug.
const CONTEXT_KEYWORDS: &[&str] = &["arthritis", "artritis"];

/// Render the decision for one prescription.
///
/// Cases are evaluated in a fixed order and the first that applies wins:
/// contraindication, unidentified drug, threshold comparison, missing
/// evidence, evidence without a threshold. Deterministic for identical inputs.
pub fn decide(
    fields: &ExtractedFields,
    evidence: &EvidenceBundle,
    threshold: Option<&GuidelineThreshold>,
    prescribed: Option<&DoseCalculation>,
) -> DecisionResult {
    let drug = fields.drug.as_str();
    let text = evidence.combined_text();

    let (decision, rationale) = if let Some(found) = find_contraindication(&text) {
        (
            Decision::Rejected,
            format!(
                "{drug} contraindicated for pediatric / JIA use according to the guideline ({}). Evidence: \"...{}...\"",
                found.rule, found.excerpt
            ),
        )
    } else if fields.is_unknown_drug() {
        (
            Decision::Alert,
            "Drug could not be identified in the prescription. Verify manually.".to_string(),
        )
    } else if let Some(threshold) = threshold {
        let (decision, rationale) = judge_against_threshold(drug, threshold, prescribed);
        (decision, with_topic_caveat(rationale, drug, evidence))
    } else if !evidence.is_usable() {
        let mut rationale = format!("No guideline evidence found for {drug}. Verify manually.");
        if let Some(error) = &evidence.error {
            rationale.push_str(&format!(" Evidence store error: {error}"));
        }
        (Decision::Alert, rationale)
    } else if mentions_drug_or_context(&text, drug) {
        let excerpt = single_line(truncate_chars(&text, AMBIGUOUS_EXCERPT_CHARS));
        (
            Decision::Alert,
            format!(
                "{drug} is referenced in the guidelines but no maximum dose could be extracted. Evidence: \"{}...\"",
                excerpt.trim()
            ),
        )
    } else {
        (
            Decision::Alert,
            format!("No clear evidence found for {drug} in the guidelines."),
        )
    };

    tracing::debug!(drug = %drug, decision = %decision, "Decision rendered");

    DecisionResult {
        decision,
        drug: fields.drug.clone(),
        calculated_dose_mg: prescribed.map(|p| p.total_mg),
        dose_per_kg: fields.dose_per_kg,
        dose_absolute_mg: fields.dose_absolute_mg,
        dose_by_bsa: fields.dose_by_bsa,
        calculation_note: prescribed.map(|p| p.explanation.clone()),
        frequency_text: fields.frequency_text.clone(),
        frequency_hours: fields.frequency_hours,
        rationale,
        guideline_threshold: threshold.cloned(),
        evidence_excerpt: (!evidence.is_empty())
            .then(|| truncate_chars(&evidence.render(), AUDIT_EXCERPT_CHARS).to_string()),
        evidence_on_topic: evidence.on_topic,
        raw_response: None,
    }
}

/// Compare the prescribed total in mg with the guideline maximum.
///
/// The limit's unit class only labels the rationale; it never rescales either
/// side of the comparison.
fn judge_against_threshold(
    drug: &str,
    threshold: &GuidelineThreshold,
    prescribed: Option<&DoseCalculation>,
) -> (Decision, String) {
    let limit = format!(
        "{} {}",
        format_number(threshold.max_dose_mg),
        threshold.unit_class.unit_label()
    );
    let Some(prescribed) = prescribed else {
        return (
            Decision::Alert,
            format!("{drug} indicated per guideline (limit {limit}), but the prescribed dose could not be verified."),
        );
    };
    let total = format_number(prescribed.total_mg);

    // At the limit counts as excessive.
    if prescribed.total_mg >= threshold.max_dose_mg {
        (
            Decision::Rejected,
            format!(
                "EXCESSIVE DOSE: prescribed {total} mg but the guideline limit is {limit} ({}).",
                threshold.matched_pattern
            ),
        )
    } else {
        (
            Decision::Approved,
            format!("Dose {total} mg within the safe range (limit: {limit} per guideline)."),
        )
    }
}

fn with_topic_caveat(rationale: String, drug: &str, evidence: &EvidenceBundle) -> String {
    if evidence.on_topic || evidence.is_empty() {
        rationale
    } else {
        format!("{rationale} Caution: the evidence does not name {drug} explicitly; confirm it applies.")
    }
}

fn mentions_drug_or_context(text: &str, drug: &str) -> bool {
    let lower = text.to_lowercase();
    CONTEXT_KEYWORDS.iter().any(|k| lower.contains(k))
        || search_variants(drug)
            .iter()
            .any(|v| !v.is_empty() && lower.contains(v.as_str()))
}
