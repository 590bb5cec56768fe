//! Auditable record of one validation, for the host to persist or display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Decision, DecisionResult, GuidelineThreshold};
use crate::pipeline::normalize::{format_number, truncate_chars};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Stable for identical patient id and prescription text.
    pub record_id: Uuid,
    pub patient_id: String,
    pub decision: Decision,
    /// "Approved", "Alert" or "Rejected".
    pub status: String,
    pub analysis: Analysis,
    pub audit: Audit,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub drug: String,
    /// "200 mg", "7.5 mg" or "N/A".
    pub calculated_dose: String,
    pub calculated_dose_mg: Option<f64>,
    pub dose_per_kg: Option<f64>,
    pub dose_absolute_mg: Option<f64>,
    pub dose_by_bsa: Option<f64>,
    pub frequency: String,
    pub frequency_hours: Option<u32>,
    pub calculation_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub approved: bool,
    pub rationale: String,
    pub threshold: Option<GuidelineThreshold>,
    pub max_guideline_dose_mg: Option<f64>,
    pub evidence_excerpt: Option<String>,
    pub evidence_on_topic: bool,
}

/// Presentation form of a dose: whole numbers without decimals, one decimal
/// otherwise, "N/A" when absent.
pub fn format_dose_mg(dose_mg: Option<f64>) -> String {
    match dose_mg {
        Some(mg) => format!("{} mg", format_number(mg)),
        None => "N/A".to_string(),
    }
}

pub fn record_id(patient_id: &str, prescription_text: &str) -> Uuid {
    let key = format!("{patient_id}\u{1f}{prescription_text}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// Wrap a decision for audit. The evidence excerpt is cut to `excerpt_chars`.
pub fn build_record(
    patient_id: &str,
    prescription_text: &str,
    result: &DecisionResult,
    excerpt_chars: usize,
) -> AuditRecord {
    AuditRecord {
        record_id: record_id(patient_id, prescription_text),
        patient_id: patient_id.to_string(),
        decision: result.decision,
        status: result.decision.status_label().to_string(),
        analysis: Analysis {
            drug: result.drug.clone(),
            calculated_dose: format_dose_mg(result.calculated_dose_mg),
            calculated_dose_mg: result.calculated_dose_mg,
            dose_per_kg: result.dose_per_kg,
            dose_absolute_mg: result.dose_absolute_mg,
            dose_by_bsa: result.dose_by_bsa,
            frequency: result.frequency_text.clone(),
            frequency_hours: result.frequency_hours,
            calculation_note: result.calculation_note.clone(),
        },
        audit: Audit {
            approved: result.is_approved(),
            rationale: result.rationale.clone(),
            threshold: result.guideline_threshold.clone(),
            max_guideline_dose_mg: result.guideline_threshold.as_ref().map(|t| t.max_dose_mg),
            evidence_excerpt: result
                .evidence_excerpt
                .as_deref()
                .map(|e| truncate_chars(e, excerpt_chars).to_string()),
            evidence_on_topic: result.evidence_on_topic,
        },
        assessed_at: Utc::now(),
    }
}
