use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tri-state outcome of a validation.
///
/// Variants are ordered by caution: `Approved < Alert < Rejected`, so the
/// most cautious of two decisions is their `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Alert,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Alert => "ALERT",
            Self::Rejected => "REJECTED",
        }
    }

    /// Human-facing status label used in audit records.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Alert => "Alert",
            Self::Rejected => "Rejected",
        }
    }

    pub fn most_cautious(self, other: Self) -> Self {
        self.max(other)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown decision value: {0}")]
pub struct UnknownDecision(pub String);

impl std::str::FromStr for Decision {
    type Err = UnknownDecision;

    /// Accepts English and Spanish labels in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" | "approve" | "aprobada" | "aprobado" => Ok(Self::Approved),
            "alert" | "alerta" | "review" => Ok(Self::Alert),
            "rejected" | "reject" | "rechazada" | "rechazado" => Ok(Self::Rejected),
            _ => Err(UnknownDecision(s.to_string())),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a guideline limit is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitClass {
    Weekly,
    Daily,
    PerKgPerDay,
    PerSquareMetre,
    Range,
}

impl UnitClass {
    pub fn unit_label(&self) -> &'static str {
        match self {
            Self::Weekly => "mg/week",
            Self::Daily => "mg/day",
            Self::PerKgPerDay => "mg/kg/day",
            Self::PerSquareMetre => "mg/m²",
            Self::Range => "mg",
        }
    }
}

/// Maximum dose extracted from guideline text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineThreshold {
    pub max_dose_mg: f64,
    pub unit_class: UnitClass,
    /// Name of the pattern that matched.
    pub matched_pattern: String,
    /// Literal span of evidence text the pattern matched.
    pub matched_text: String,
    /// Lower bound when the limit came from a range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_floor_mg: Option<f64>,
}

/// The only artifact that crosses the engine boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    pub drug: String,
    pub calculated_dose_mg: Option<f64>,
    pub dose_per_kg: Option<f64>,
    pub dose_absolute_mg: Option<f64>,
    pub dose_by_bsa: Option<f64>,
    /// How `calculated_dose_mg` was obtained, e.g. "10 mg/kg x 20 kg".
    pub calculation_note: Option<String>,
    pub frequency_text: String,
    pub frequency_hours: Option<u32>,
    pub rationale: String,
    pub guideline_threshold: Option<GuidelineThreshold>,
    pub evidence_excerpt: Option<String>,
    pub evidence_on_topic: bool,
    /// Unparsed model output, kept for manual review on the LLM path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl DecisionResult {
    /// ALERT produced when the engine itself failed. Never approves.
    pub fn fault(drug: &str, message: &str) -> Self {
        Self {
            decision: Decision::Alert,
            drug: drug.to_string(),
            calculated_dose_mg: None,
            dose_per_kg: None,
            dose_absolute_mg: None,
            dose_by_bsa: None,
            calculation_note: None,
            frequency_text: String::new(),
            frequency_hours: None,
            rationale: format!("Internal validation error, verify manually: {message}"),
            guideline_threshold: None,
            evidence_excerpt: None,
            evidence_on_topic: false,
            raw_response: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Decision::Approved).unwrap(), "\"APPROVED\"");
        assert_eq!(serde_json::to_string(&Decision::Rejected).unwrap(), "\"REJECTED\"");
        let parsed: Decision = serde_json::from_str("\"ALERT\"").unwrap();
        assert_eq!(parsed, Decision::Alert);
    }

    #[test]
    fn most_cautious_never_relaxes() {
        use Decision::*;
        assert_eq!(Approved.most_cautious(Alert), Alert);
        assert_eq!(Rejected.most_cautious(Approved), Rejected);
        assert_eq!(Alert.most_cautious(Rejected), Rejected);
        assert_eq!(Approved.most_cautious(Approved), Approved);
    }

    #[test]
    fn decision_parses_english_and_spanish() {
        assert_eq!("approved".parse::<Decision>().unwrap(), Decision::Approved);
        assert_eq!(" Rechazada ".parse::<Decision>().unwrap(), Decision::Rejected);
        assert_eq!("ALERTA".parse::<Decision>().unwrap(), Decision::Alert);
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[test]
    fn unit_class_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&UnitClass::PerKgPerDay).unwrap(), "\"perKgPerDay\"");
        assert_eq!(serde_json::to_string(&UnitClass::Weekly).unwrap(), "\"weekly\"");
    }

    #[test]
    fn fault_is_alert_with_message() {
        let r = DecisionResult::fault("Unknown", "index out of bounds");
        assert_eq!(r.decision, Decision::Alert);
        assert!(r.rationale.contains("index out of bounds"));
        assert!(!r.is_approved());
    }

    #[test]
    fn raw_response_omitted_when_absent() {
        let json = serde_json::to_value(DecisionResult::fault("X", "boom")).unwrap();
        assert!(json.get("raw_response").is_none());
        assert!(json.get("calculated_dose_mg").unwrap().is_null());
    }
}
