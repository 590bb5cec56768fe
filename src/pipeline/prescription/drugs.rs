//! Curated substance table for pediatric rheumatology prescriptions.
//!
//! Order matters: when a prescription mentions several substances, the entry
//! listed first here wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::UNKNOWN_DRUG;

/// A known substance and the spellings it appears under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownDrug {
    /// Name reported in results.
    pub name: &'static str,
    /// Lower-case spellings matched as substrings. Includes the name itself.
    pub variants: &'static [&'static str],
}

pub static KNOWN_DRUGS: &[KnownDrug] = &[
    KnownDrug { name: "Ibuprofen", variants: &["ibuprofen", "ibuprofeno"] },
    KnownDrug { name: "Methotrexate", variants: &["methotrexate", "metotrexato", "metotrexate", "mtx"] },
    KnownDrug { name: "Naproxen", variants: &["naproxen", "naproxeno"] },
    KnownDrug { name: "Paracetamol", variants: &["paracetamol", "acetaminophen", "acetaminofen", "acetaminofén"] },
    KnownDrug { name: "Prednisone", variants: &["prednisone", "prednisona"] },
    KnownDrug { name: "Adalimumab", variants: &["adalimumab", "humira"] },
    KnownDrug { name: "Etanercept", variants: &["etanercept", "enbrel"] },
    KnownDrug { name: "Tocilizumab", variants: &["tocilizumab"] },
    KnownDrug { name: "Sulfasalazine", variants: &["sulfasalazine", "sulfasalazina"] },
    KnownDrug { name: "Leflunomide", variants: &["leflunomide", "leflunomida"] },
    KnownDrug { name: "Hydroxychloroquine", variants: &["hydroxychloroquine", "hidroxicloroquina"] },
    KnownDrug { name: "Azathioprine", variants: &["azathioprine", "azatioprina"] },
    KnownDrug { name: "Ciclosporin", variants: &["ciclosporin", "cyclosporine", "ciclosporina"] },
    KnownDrug { name: "Infliximab", variants: &["infliximab"] },
];

/// Capitalised word of at least four letters.
static RE_CAPITALISED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}\p{L}{3,}\b").unwrap());

/// First table entry with a variant occurring anywhere in `text`.
pub fn match_known_drug(text: &str) -> Option<&'static KnownDrug> {
    let lower = text.to_lowercase();
    KNOWN_DRUGS
        .iter()
        .find(|drug| drug.variants.iter().any(|v| lower.contains(v)))
}

/// Table entry whose name or variant equals `name` (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static KnownDrug> {
    let lower = name.trim().to_lowercase();
    KNOWN_DRUGS.iter().find(|drug| {
        drug.name.to_lowercase() == lower || drug.variants.iter().any(|v| *v == lower)
    })
}

/// Lower-case spellings to search evidence with, canonical first.
/// Drugs outside the table are searched under their own name only.
pub fn search_variants(drug: &str) -> Vec<String> {
    match lookup(drug) {
        Some(known) => known.variants.iter().map(|v| v.to_string()).collect(),
        None => vec![drug.trim().to_lowercase()],
    }
}

/// Resolve the drug name of a prescription.
pub fn resolve_drug_name(text: &str) -> String {
    if let Some(known) = match_known_drug(text) {
        return known.name.to_string();
    }
    RE_CAPITALISED_WORD
        .find(text)
        .map(|m| capitalise(m.as_str()))
        .unwrap_or_else(|| UNKNOWN_DRUG.to_string())
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
