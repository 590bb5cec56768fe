use crate::models::DecisionResult;
use crate::pipeline::normalize::format_number;

pub const REVIEW_SYSTEM_PROMPT: &str = r#"
You are a pediatric rheumatology pharmacist reviewing a prescription against
guideline excerpts for juvenile idiopathic arthritis (JIA).

RULES:
1. Use ONLY the guideline text provided. Do not rely on outside knowledge.
2. If the guideline does not state a limit for this drug, say so and answer ALERT.
3. If the dose is at or above the guideline limit, answer REJECTED.
4. Answer with a single JSON object and nothing else.
"#;

/// Build the review prompt for one prescription.
pub fn build_review_prompt(
    prescription_text: &str,
    weight_kg: Option<f64>,
    rule_result: &DecisionResult,
    evidence_text: &str,
) -> String {
    let weight = weight_kg
        .map(|w| format!("{} kg", format_number(w)))
        .unwrap_or_else(|| "unknown".to_string());
    let opt = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| "null".to_string());
    let evidence = if evidence_text.trim().is_empty() {
        "(no guideline text retrieved)"
    } else {
        evidence_text
    };

    format!(
        r#"<prescription>
{prescription_text}
</prescription>

Patient weight: {weight}

Fields read by the rule engine:
- drug: {drug}
- dose_per_kg: {per_kg}
- dose_absolute_mg: {absolute}
- calculated_dose_mg: {calculated}
- frequency: {frequency}
- rule decision: {decision}

<guideline>
{evidence}
</guideline>

Reply with this JSON object:
{{
  "drug": "drug name",
  "dose_per_kg": 0.0,
  "frequency_text": "e.g. every 8 hours",
  "frequency_hours": 8,
  "indicated": true,
  "rationale": "one or two sentences citing the guideline",
  "decision": "APPROVED | ALERT | REJECTED"
}}"#,
        drug = rule_result.drug,
        per_kg = opt(rule_result.dose_per_kg),
        absolute = opt(rule_result.dose_absolute_mg),
        calculated = opt(rule_result.calculated_dose_mg),
        frequency = if rule_result.frequency_text.is_empty() {
            "unknown"
        } else {
            rule_result.frequency_text.as_str()
        },
        decision = rule_result.decision,
    )
}
