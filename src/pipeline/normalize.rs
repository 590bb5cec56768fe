use std::sync::LazyLock;

use regex::Regex;

static RE_DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d)").unwrap());
static RE_PER_UNIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*/\s*(?:kg|m2|m²)").unwrap());

/// Lower-case text and turn locale decimal commas ("2,5") into dots ("2.5").
pub fn normalize_text(raw: &str) -> String {
    RE_DECIMAL_COMMA
        .replace_all(&raw.to_lowercase(), "$1.$2")
        .into_owned()
}

/// Parse a number that may use either `.` or `,` as decimal separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// True when `rest` opens with a per-kg or per-m² qualifier ("/kg", "/ m2").
///
/// Stands in for the negative lookahead the regex engine does not support:
/// callers test the text right after an `N mg` match.
pub fn has_per_unit_suffix(rest: &str) -> bool {
    RE_PER_UNIT_SUFFIX.is_match(rest)
}

/// Render a dose value: integer when whole, else one decimal place.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Slice from `before` characters ahead of byte offset `start` to `after`
/// characters past it, clamped to the text.
pub fn char_window(text: &str, start: usize, before: usize, after: usize) -> &str {
    let start = floor_boundary(text, start.min(text.len()));
    let head = &text[..start];
    let from = head
        .char_indices()
        .rev()
        .nth(before.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let from = if before == 0 { start } else { from };
    let tail = &text[start..];
    let to = start + truncate_chars(tail, after).len();
    &text[from..to]
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Collapse newlines into spaces for single-line excerpts.
pub fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_fixes_decimal_comma() {
        assert_eq!(normalize_text("Metotrexato 7,5 MG semanal"), "metotrexato 7.5 mg semanal");
    }

    #[test]
    fn normalize_keeps_list_commas() {
        assert_eq!(normalize_text("ibuprofen, paracetamol"), "ibuprofen, paracetamol");
    }

    #[test]
    fn parse_decimal_accepts_both_separators() {
        assert_eq!(parse_decimal("7,5"), Some(7.5));
        assert_eq!(parse_decimal("7.5"), Some(7.5));
        assert_eq!(parse_decimal(" 30 "), Some(30.0));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn per_unit_suffix_detection() {
        assert!(has_per_unit_suffix("/kg/day"));
        assert!(has_per_unit_suffix(" / KG"));
        assert!(has_per_unit_suffix("/m²"));
        assert!(has_per_unit_suffix("/m2 weekly"));
        assert!(!has_per_unit_suffix("/week"));
        assert!(!has_per_unit_suffix(" weekly"));
    }

    #[test]
    fn format_number_integer_or_one_decimal() {
        assert_eq!(format_number(200.0), "200");
        assert_eq!(format_number(7.5), "7.5");
        assert_eq!(format_number(7.26), "7.3");
        assert_eq!(format_number(0.1 * 3.0 * 10.0), "3");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("niños", 3), "niñ");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn char_window_clamps_at_edges() {
        let text = "0123456789";
        assert_eq!(char_window(text, 5, 2, 3), "34567");
        assert_eq!(char_window(text, 1, 30, 100), "0123456789");
        assert_eq!(char_window(text, 5, 0, 2), "56");
    }

    #[test]
    fn char_window_counts_characters_not_bytes() {
        let text = "ñññXaaa";
        let start = text.find('X').unwrap();
        assert_eq!(char_window(text, start, 2, 2), "ññXa");
    }

    #[test]
    fn single_line_replaces_newlines() {
        assert_eq!(single_line("a\nb\r\nc"), "a b  c");
    }
}
