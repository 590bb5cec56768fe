use std::sync::LazyLock;

use regex::Regex;

use crate::models::ExtractedFields;
use crate::pipeline::normalize::{has_per_unit_suffix, parse_decimal};

use super::drugs::resolve_drug_name;
use super::frequency::parse_frequency;

static RE_DOSE_PER_KG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*mg\s*/\s*kg").unwrap());
static RE_DOSE_PER_M2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*mg\s*/\s*m(?:2|²)").unwrap());
static RE_DOSE_MG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*mg").unwrap());

/// Pull drug, dose and frequency out of a free-text prescription.
///
/// Never fails. Only the first dose in reading order is used; anything that
/// cannot be resolved is left empty.
pub fn extract_fields(text: &str) -> ExtractedFields {
    let dose_per_kg = first_number(&RE_DOSE_PER_KG, text);
    let dose_by_bsa = first_number(&RE_DOSE_PER_M2, text);
    let dose_absolute_mg = if dose_per_kg.is_none() && dose_by_bsa.is_none() {
        first_flat_mg(text)
    } else {
        None
    };
    let frequency = parse_frequency(text);

    ExtractedFields {
        drug: resolve_drug_name(text),
        dose_per_kg,
        dose_absolute_mg,
        dose_by_bsa,
        frequency_text: frequency.text,
        frequency_hours: frequency.hours,
    }
}

fn first_number(regex: &Regex, text: &str) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
}

/// First `N mg` not qualified as per-kg or per-m².
fn first_flat_mg(text: &str) -> Option<f64> {
    RE_DOSE_MG
        .captures_iter(text)
        .find(|caps| {
            caps.get(0)
                .map(|m| !has_per_unit_suffix(&text[m.end()..]))
                .unwrap_or(false)
        })
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
}
