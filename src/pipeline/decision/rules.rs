use std::sync::LazyLock;

use regex::Regex;

use crate::config::{CONTRAINDICATION_WINDOW_AFTER, CONTRAINDICATION_WINDOW_BEFORE};
use crate::pipeline::normalize::{char_window, single_line};

const POPULATION_EN: &str = r"(?:arthritis|jia|aij|children|juvenile|pediatric|paediatric)";
const POPULATION_ES: &str = r"(?:artritis|aij|niños|juvenil|pediátric[oa]s?)";

/// A guideline statement ruling a drug out for the pediatric / JIA population.
pub struct ContraindicationRule {
    regex: Regex,
    pub description: &'static str,
}

fn rule(regex_str: &str, description: &'static str) -> ContraindicationRule {
    let regex_str = regex_str
        .replace("{EN}", POPULATION_EN)
        .replace("{ES}", POPULATION_ES);
    ContraindicationRule {
        regex: Regex::new(&format!("(?i){regex_str}")).expect("Invalid contraindication regex pattern"),
        description,
    }
}

/// Evaluated top to bottom; the first rule with a match decides.
pub static CONTRAINDICATION_RULES: LazyLock<Vec<ContraindicationRule>> = LazyLock::new(|| {
    vec![
        rule(r"\bcontraindicated\s+(?:in|for)\s+{EN}", "contraindicated in/for"),
        rule(r"\bcontraindicado\s+(?:en|para)\s+{ES}", "contraindicado en/para"),
        rule(r"\bnot\s+(?:indicated|recommended)\s+(?:in|for)\s+{EN}", "not indicated/recommended in"),
        rule(r"\bno\s+(?:indicado|recomendado)\s+(?:en|para)\s+{ES}", "no indicado/recomendado en"),
        rule(r"\bdo\s+not\s+use\s+in\s+{EN}", "do not use in"),
        rule(r"\bno\s+usar\s+en\s+{ES}", "no usar en"),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContraindicationMatch {
    pub rule: &'static str,
    /// Byte offset of the match in the scanned text.
    pub offset: usize,
    /// Text from 30 characters before to 100 after the match start, on one line.
    pub excerpt: String,
}

pub fn find_contraindication(text: &str) -> Option<ContraindicationMatch> {
    CONTRAINDICATION_RULES.iter().find_map(|r| {
        r.regex.find(text).map(|m| ContraindicationMatch {
            rule: r.description,
            offset: m.start(),
            excerpt: single_line(char_window(
                text,
                m.start(),
                CONTRAINDICATION_WINDOW_BEFORE,
                CONTRAINDICATION_WINDOW_AFTER,
            ))
            .trim()
            .to_string(),
        })
    })
}
