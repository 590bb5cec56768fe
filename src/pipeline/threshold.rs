//! Maximum-dose extraction from guideline text.
//!
//! Patterns are tried in table order, most specific first. The first pattern
//! with an acceptable match decides; results are never merged across patterns.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{GuidelineThreshold, UnitClass};
use crate::pipeline::normalize::{has_per_unit_suffix, parse_decimal};

/// How the limit is read from a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LimitValue {
    /// Capture group 1.
    Single,
    /// Capture groups 1 and 2; the upper bound is the limit.
    UpperOfRange,
}

struct ThresholdPattern {
    regex: Regex,
    unit_class: UnitClass,
    name: &'static str,
    value: LimitValue,
    /// Skip matches whose bare `N mg` continues as "/kg" or "/m2".
    flat_mg_only: bool,
}

const NUM: &str = r"(\d+(?:[.,]\d+)?)";
/// "/week", "per week", "a la semana", or the adjective directly ("weekly",
/// "semanales").
const PER_WEEK: &str = r"\s*(?:/|per\s+|por\s+|a\s+la\s+)?\s*(?:week|semana)";

fn build(
    regex_str: &str,
    unit_class: UnitClass,
    name: &'static str,
    value: LimitValue,
    flat_mg_only: bool,
) -> ThresholdPattern {
    let regex_str = format!("(?i){}", regex_str.replace("{N}", NUM).replace("{PER_WEEK}", PER_WEEK));
    ThresholdPattern {
        regex: Regex::new(&regex_str).expect("Invalid threshold regex pattern"),
        unit_class,
        name,
        value,
        flat_mg_only,
    }
}

fn pattern(regex_str: &str, unit_class: UnitClass, name: &'static str) -> ThresholdPattern {
    build(regex_str, unit_class, name, LimitValue::Single, false)
}

fn flat_pattern(regex_str: &str, unit_class: UnitClass, name: &'static str) -> ThresholdPattern {
    build(regex_str, unit_class, name, LimitValue::Single, true)
}

fn range_pattern(
    regex_str: &str,
    unit_class: UnitClass,
    name: &'static str,
    flat_mg_only: bool,
) -> ThresholdPattern {
    build(regex_str, unit_class, name, LimitValue::UpperOfRange, flat_mg_only)
}

static THRESHOLD_PATTERNS: LazyLock<Vec<ThresholdPattern>> = LazyLock::new(|| {
    use UnitClass::*;
    vec![
        pattern(
            r"(?:less\s+than|menos\s+de)\s*{N}\s*mg{PER_WEEK}",
            Weekly,
            "less than N mg/week",
        ),
        flat_pattern(
            r"(?:low\s+doses?|dosis\s+bajas?)\s*\(?\s*(?:less\s+than|menos\s+de|<)\s*{N}\s*mg",
            Weekly,
            "low doses (less than N mg)",
        ),
        flat_pattern(
            r"(?:maximum\s*(?:weekly\s*)?dose|dosis\s*m[áa]xima\s*(?:semanal)?)\s*(?:(?:of|is|de|es)\s*)?[:=]?\s*{N}\s*mg",
            Weekly,
            "maximum (weekly) dose N mg",
        ),
        pattern(
            r"(?:maximum|m[áa]ximo)\s*(?:(?:of|de)\s*)?{N}\s*mg{PER_WEEK}",
            Weekly,
            "maximum N mg/week",
        ),
        flat_pattern(
            r"(?:maximum\s*(?:daily\s*)?dose|dosis\s*m[áa]xima\s*(?:diaria)?)\s*(?:(?:of|is|de|es)\s*)?[:=]?\s*{N}\s*mg",
            Daily,
            "maximum (daily) dose N mg",
        ),
        flat_pattern(
            r"(?:(?:should|must|do|does)\s+not\s+exceed|not\s+to\s+exceed|no\s*(?:debe\s*)?exceder)\s*(?:(?:of|de)\s*)?{N}\s*mg",
            Daily,
            "should not exceed N mg",
        ),
        flat_pattern(
            r"(?:up\s+to|hasta)\s*{N}\s*mg(?:\s*/\s*(?:day|d[íi]a))?",
            Daily,
            "up to N mg(/day)",
        ),
        pattern(
            r"{N}\s*mg\s*/\s*kg\s*(?:/|per|por|al)\s*(?:day|d[íi]a|d)\b",
            PerKgPerDay,
            "N mg/kg/day",
        ),
        range_pattern(
            r"{N}\s*(?:-|–|—|to|a)\s*{N}\s*mg{PER_WEEK}",
            Weekly,
            "N-M mg/week",
            false,
        ),
        pattern(
            r"(?:maximum|max\.?|up\s+to|not\s+(?:to\s+)?exceed|m[áa]xim[oa]|hasta)\D{0,40}?{N}\s*mg\s*/\s*m(?:2|²)",
            PerSquareMetre,
            "maximum N mg/m2",
        ),
        range_pattern(r"{N}\s*(?:-|–|—|to)\s*{N}\s*mg", Range, "N-M mg", true),
    ]
});

/// Find the maximum permitted dose stated in `evidence_text`.
///
/// `None` is the normal outcome for text without a recognised limit.
pub fn parse_threshold(evidence_text: &str) -> Option<GuidelineThreshold> {
    THRESHOLD_PATTERNS
        .iter()
        .find_map(|p| first_acceptable_match(p, evidence_text))
}

fn first_acceptable_match(p: &ThresholdPattern, text: &str) -> Option<GuidelineThreshold> {
    for caps in p.regex.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if p.flat_mg_only && has_per_unit_suffix(&text[whole.end()..]) {
            continue;
        }

        let (max, floor) = match p.value {
            LimitValue::Single => (caps.get(1).and_then(|m| parse_decimal(m.as_str())), None),
            LimitValue::UpperOfRange => (
                caps.get(2).and_then(|m| parse_decimal(m.as_str())),
                caps.get(1).and_then(|m| parse_decimal(m.as_str())),
            ),
        };

        if let Some(max) = max.filter(|v| *v > 0.0) {
            return Some(GuidelineThreshold {
                max_dose_mg: max,
                unit_class: p.unit_class,
                matched_pattern: p.name.to_string(),
                matched_text: whole.as_str().to_string(),
                range_floor_mg: floor,
            });
        }
    }
    None
}
