use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{Decision, DecisionResult};

use super::LlmError;

/// The model's answer. Every field is optional; models drift from the schema.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmVerdict {
    pub drug: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dose_per_kg: Option<f64>,
    pub frequency_text: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub frequency_hours: Option<u32>,
    pub indicated: Option<bool>,
    pub rationale: Option<String>,
    pub decision: Option<String>,
}

impl LlmVerdict {
    /// Parsed decision; `None` for a missing or unrecognised value.
    pub fn decision(&self) -> Option<Decision> {
        self.decision.as_deref().and_then(|d| d.trim().parse().ok())
    }
}

/// Numbers sometimes arrive quoted ("10", "7,5") or as null.
fn lenient_number(value: Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    number.filter(|v: &f64| v.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_number(Value::deserialize(deserializer)?))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_number(Value::deserialize(deserializer)?)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32))
}

/// Slice from the first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Result<&str, LlmError> {
    let start = response
        .find('{')
        .ok_or_else(|| LlmError::MalformedResponse("No JSON object found in response".into()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LlmError::MalformedResponse("No closing brace found in response".into()))?;
    Ok(&response[start..=end])
}

pub fn parse_verdict(response: &str) -> Result<LlmVerdict, LlmError> {
    let json = extract_json_object(response)?;
    serde_json::from_str(json).map_err(|e| LlmError::JsonParsing(e.to_string()))
}

/// Combine the rule result with the model verdict.
///
/// The final decision is the more cautious of the two. A verdict without a
/// usable decision, or one saying the drug is not indicated, counts as ALERT.
pub fn merge_verdict(rule: DecisionResult, verdict: &LlmVerdict, raw_response: &str) -> DecisionResult {
    let model_decision = match (verdict.decision(), verdict.indicated) {
        (Some(d), Some(false)) => d.most_cautious(Decision::Alert),
        (Some(d), _) => d,
        (None, _) => Decision::Alert,
    };
    let decision = rule.decision.most_cautious(model_decision);
    let model_rationale = verdict
        .rationale
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("no rationale given");

    let rationale = if decision != rule.decision {
        format!(
            "{} Model review escalated the decision to {decision}: {model_rationale}",
            rule.rationale
        )
    } else {
        format!("{} Model review: {model_rationale}", rule.rationale)
    };

    tracing::debug!(
        rule_decision = %rule.decision,
        model_decision = %model_decision,
        decision = %decision,
        "Merged model verdict"
    );

    DecisionResult {
        decision,
        rationale,
        raw_response: Some(raw_response.to_string()),
        ..rule
    }
}
