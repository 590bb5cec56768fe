use serde::{Deserialize, Serialize};

use crate::models::{Biometrics, ExtractedFields};
use crate::pipeline::normalize::format_number;

/// Which extracted dose the total was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseBasis {
    PerKg,
    PerSquareMetre,
    Absolute,
}

/// Prescribed total dose with its derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseCalculation {
    pub total_mg: f64,
    pub basis: DoseBasis,
    /// e.g. "10 mg/kg x 20 kg"
    pub explanation: String,
}

/// Prescribed total dose in mg, unrounded.
///
/// Precedence: per-kg × weight, else per-m² × BSA, else the flat dose. A
/// per-unit dose without its biometric yields `None`; it never falls through
/// to a lower-precedence dose.
pub fn compute_dose(fields: &ExtractedFields, weight_kg: Option<f64>, bsa_m2: Option<f64>) -> Option<f64> {
    let biometrics = Biometrics::new(weight_kg, None, bsa_m2);
    calculate(fields, &biometrics).map(|c| c.total_mg)
}

/// Same as [`compute_dose`], keeping the basis and a readable explanation.
pub fn calculate(fields: &ExtractedFields, biometrics: &Biometrics) -> Option<DoseCalculation> {
    if let Some(per_kg) = fields.dose_per_kg {
        let weight = biometrics.weight_kg?;
        return Some(DoseCalculation {
            total_mg: per_kg * weight,
            basis: DoseBasis::PerKg,
            explanation: format!("{} mg/kg x {} kg", format_number(per_kg), format_number(weight)),
        });
    }

    if let Some(per_m2) = fields.dose_by_bsa {
        let bsa = biometrics.bsa_m2?;
        return Some(DoseCalculation {
            total_mg: per_m2 * bsa,
            basis: DoseBasis::PerSquareMetre,
            explanation: format!("{} mg/m² x {:.2} m²", format_number(per_m2), bsa),
        });
    }

    fields.dose_absolute_mg.map(|mg| DoseCalculation {
        total_mg: mg,
        basis: DoseBasis::Absolute,
        explanation: format!("{} mg flat dose", format_number(mg)),
    })
}
