use serde::{Deserialize, Serialize};

/// Drug name reported when neither the curated table nor the capitalised-word
/// fallback yields anything.
pub const UNKNOWN_DRUG: &str = "Unknown";

/// Fields pulled out of one free-text prescription.
///
/// Produced once per input and never mutated afterwards. Every field that
/// could not be resolved is `None` (or blank for `frequency_text`) rather than
/// a guessed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub drug: String,
    /// mg per kg of body weight.
    pub dose_per_kg: Option<f64>,
    /// Flat mg dose. Only set when no weight- or surface-normalised dose was found.
    pub dose_absolute_mg: Option<f64>,
    /// mg per m² of body surface area.
    pub dose_by_bsa: Option<f64>,
    pub frequency_text: String,
    pub frequency_hours: Option<u32>,
}

impl ExtractedFields {
    /// Fields for text that yielded nothing usable.
    pub fn unknown() -> Self {
        Self {
            drug: UNKNOWN_DRUG.to_string(),
            dose_per_kg: None,
            dose_absolute_mg: None,
            dose_by_bsa: None,
            frequency_text: String::new(),
            frequency_hours: None,
        }
    }

    pub fn has_dose(&self) -> bool {
        self.dose_per_kg.is_some() || self.dose_absolute_mg.is_some() || self.dose_by_bsa.is_some()
    }

    pub fn is_unknown_drug(&self) -> bool {
        self.drug == UNKNOWN_DRUG
    }
}

/// Patient measurements used to scale weight- or surface-based doses.
///
/// Zero, negative and non-finite inputs are stored as absent so that no
/// downstream calculation ever produces a "wrong zero".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Biometrics {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub bsa_m2: Option<f64>,
}

impl Biometrics {
    pub fn new(weight_kg: Option<f64>, height_cm: Option<f64>, bsa_m2: Option<f64>) -> Self {
        let weight_kg = weight_kg.filter(|v| is_usable_measure(*v));
        let height_cm = height_cm.filter(|v| is_usable_measure(*v));
        let bsa_m2 = bsa_m2
            .filter(|v| is_usable_measure(*v))
            .or_else(|| match (weight_kg, height_cm) {
                (Some(w), Some(h)) => Some(mosteller_bsa(w, h)),
                _ => None,
            });

        Self {
            weight_kg,
            height_cm,
            bsa_m2,
        }
    }

    pub fn from_weight(weight_kg: f64) -> Self {
        Self::new(Some(weight_kg), None, None)
    }
}

fn is_usable_measure(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Mosteller body-surface-area estimate in m².
pub fn mosteller_bsa(weight_kg: f64, height_cm: f64) -> f64 {
    (height_cm * weight_kg / 3600.0).sqrt()
}

/// One prescription to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub prescription_text: String,
    pub patient_id: String,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub bsa_m2: Option<f64>,
}

impl ValidationRequest {
    pub fn new(prescription_text: &str, weight_kg: f64, patient_id: &str) -> Self {
        Self {
            prescription_text: prescription_text.to_string(),
            patient_id: patient_id.to_string(),
            weight_kg: Some(weight_kg),
            height_cm: None,
            bsa_m2: None,
        }
    }

    pub fn with_height(mut self, height_cm: f64) -> Self {
        self.height_cm = Some(height_cm);
        self
    }

    pub fn with_bsa(mut self, bsa_m2: f64) -> Self {
        self.bsa_m2 = Some(bsa_m2);
        self
    }

    pub fn biometrics(&self) -> Biometrics {
        Biometrics::new(self.weight_kg, self.height_cm, self.bsa_m2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_have_no_dose() {
        let fields = ExtractedFields::unknown();
        assert!(fields.is_unknown_drug());
        assert!(!fields.has_dose());
        assert!(fields.frequency_text.is_empty());
    }

    #[test]
    fn zero_and_negative_weight_are_absent() {
        assert_eq!(Biometrics::from_weight(0.0).weight_kg, None);
        assert_eq!(Biometrics::from_weight(-4.0).weight_kg, None);
        assert_eq!(Biometrics::from_weight(f64::NAN).weight_kg, None);
        assert_eq!(Biometrics::from_weight(25.0).weight_kg, Some(25.0));
    }

    #[test]
    fn bsa_derived_from_weight_and_height() {
        let bio = Biometrics::new(Some(20.0), Some(115.0), None);
        let bsa = bio.bsa_m2.unwrap();
        // sqrt(115 * 20 / 3600) ≈ 0.799
        assert!((bsa - 0.7993).abs() < 0.001, "bsa = {bsa}");
    }

    #[test]
    fn explicit_bsa_wins_over_derived() {
        let bio = Biometrics::new(Some(20.0), Some(115.0), Some(0.8));
        assert_eq!(bio.bsa_m2, Some(0.8));
    }

    #[test]
    fn bsa_absent_without_height() {
        let bio = Biometrics::new(Some(20.0), None, None);
        assert_eq!(bio.bsa_m2, None);
    }

    #[test]
    fn request_deserializes_with_optional_biometrics() {
        let req: ValidationRequest = serde_json::from_str(
            r#"{"prescription_text": "Ibuprofen 10mg/kg every 8h", "patient_id": "p-1", "weight_kg": 20}"#,
        )
        .unwrap();
        assert_eq!(req.weight_kg, Some(20.0));
        assert_eq!(req.bsa_m2, None);
        assert_eq!(req.biometrics().weight_kg, Some(20.0));
    }
}
