use std::sync::LazyLock;

use regex::Regex;

/// Dosing frequency read from a prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frequency {
    pub text: String,
    pub hours: Option<u32>,
}

impl Frequency {
    fn blank() -> Self {
        Self {
            text: String::new(),
            hours: None,
        }
    }
}

enum FrequencyRule {
    /// Explicit interval; the first capture group is the number of hours.
    Interval(Regex),
    Keyword {
        regex: Regex,
        hours: u32,
        label: &'static str,
    },
}

fn interval(pattern: &str) -> FrequencyRule {
    FrequencyRule::Interval(Regex::new(pattern).expect("Invalid frequency regex pattern"))
}

fn keyword(pattern: &str, hours: u32, label: &'static str) -> FrequencyRule {
    FrequencyRule::Keyword {
        regex: Regex::new(pattern).expect("Invalid frequency regex pattern"),
        hours,
        label,
    }
}

/// Evaluated top to bottom; the first rule that matches decides.
static FREQUENCY_RULES: LazyLock<Vec<FrequencyRule>> = LazyLock::new(|| {
    vec![
        interval(r"(?i)\b(?:every|cada)\s+(\d+)\s*h"),
        interval(r"(?i)\bq\s*(\d+)\s*h\b"),
        keyword(
            r"(?i)\b(?:weekly|semanal(?:mente)?|once\s+a\s+week|per\s+week|por\s+semana|a\s+la\s+semana)\b|/\s*(?:week|semana)\b",
            168,
            "weekly",
        ),
        keyword(
            r"(?i)\b(?:daily|diari[oa]|once\s+a\s+day|per\s+day|por\s+d[íi]a|al\s+d[íi]a)\b|/\s*(?:day|d[íi]a)\b",
            24,
            "daily",
        ),
    ]
});

/// Read the dosing frequency. Blank when no rule matches.
pub fn parse_frequency(text: &str) -> Frequency {
    for rule in FREQUENCY_RULES.iter() {
        match rule {
            FrequencyRule::Interval(regex) => {
                let hours = regex
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .filter(|h| *h > 0);
                if let Some(hours) = hours {
                    return Frequency {
                        text: format!("every {hours} hours"),
                        hours: Some(hours),
                    };
                }
            }
            FrequencyRule::Keyword {
                regex,
                hours,
                label,
            } => {
                if regex.is_match(text) {
                    return Frequency {
                        text: label.to_string(),
                        hours: Some(*hours),
                    };
                }
            }
        }
    }
    Frequency::blank()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_interval_sets_hours() {
        let f = parse_frequency("Ibuprofen 10mg/kg every 8h");
        assert_eq!(f.hours, Some(8));
        assert_eq!(f.text, "every 8 hours");
    }

    #[test]
    fn spanish_interval() {
        assert_eq!(parse_frequency("ibuprofeno 10 mg/kg cada 6 horas").hours, Some(6));
    }

    #[test]
    fn q_abbreviation() {
        assert_eq!(parse_frequency("Paracetamol 15 mg/kg q6h").hours, Some(6));
    }

    #[test]
    fn weekly_keyword() {
        let f = parse_frequency("Methotrexate 30mg weekly");
        assert_eq!(f.hours, Some(168));
        assert_eq!(f.text, "weekly");
        assert_eq!(parse_frequency("metotrexato 15 mg semanal").hours, Some(168));
    }

    #[test]
    fn daily_keyword() {
        assert_eq!(parse_frequency("Prednisone 5 mg daily").hours, Some(24));
        assert_eq!(parse_frequency("prednisona 5 mg diaria").hours, Some(24));
        assert_eq!(parse_frequency("Naproxen 10 mg/kg/day").text, "daily");
    }

    #[test]
    fn interval_takes_precedence_over_keywords() {
        assert_eq!(parse_frequency("every 12h, weekly review").hours, Some(12));
    }

    #[test]
    fn weekly_takes_precedence_over_daily() {
        assert_eq!(parse_frequency("weekly dose, folic acid daily").hours, Some(168));
    }

    #[test]
    fn no_frequency_is_blank() {
        let f = parse_frequency("Follow up in clinic");
        assert!(f.text.is_empty());
        assert_eq!(f.hours, None);
    }

    #[test]
    fn zero_interval_is_ignored() {
        assert_eq!(parse_frequency("every 0 h").hours, None);
    }
}
