use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

lazy_static! {
    static ref MATHBF_REGEX: Regex = Regex::new(r"\\mathbf\{([^}]*)\}").unwrap();
    static ref DOLLAR_SPAN_REGEX: Regex = Regex::new(r"\$(.*?)\$").unwrap();
    static ref NON_NUMERIC_REGEX: Regex = Regex::new(r"[^\d\.\-]").unwrap();
    static ref LONG_DIGIT_RUN_REGEX: Regex = Regex::new(r"\d{3,}").unwrap();
    static ref BULLET_PREFIX_REGEX: Regex = Regex::new("^(-|•|→|->|–)\\s*").unwrap();
    static ref SCALED_NUMBER_REGEX: Regex = Regex::new(r"([\d.]+)\s*([BML]?)").unwrap();
    static ref JTBD_WORD_REGEX: Regex = Regex::new(r"\bjust\b").unwrap();
    static ref JTBD_TAIL_REGEX: Regex = Regex::new(r"done|to be done|tbd|jtbd").unwrap();
}

/// Parse a number out of sheet text: thousands separators, currency signs
/// and LaTeX markup are stripped before parsing. `"15,750"` → `15750.0`,
/// `"$\mathbf{5,250}$"` → `5250.0`, anything unparsable → `None` (missing).
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace(' ', "");
    let s = NON_NUMERIC_REGEX.replace_all(&s, "");
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Strip LaTeX math notation for display: `$17\%$` → `17%`,
/// `\rightarrow` → `→`, `\mathbf{bold}` → `bold`.
pub fn clean_latex(text: &str) -> String {
    let cleaned = MATHBF_REGEX.replace_all(text, "$1");
    let cleaned = cleaned.replace("\\rightarrow", "→");
    let cleaned = DOLLAR_SPAN_REGEX.replace_all(&cleaned, "$1");
    cleaned.trim().to_string()
}

/// Numbers with a magnitude suffix, e.g. `"3.7 B"` or `"180 L"`.
pub fn scaled_number(raw: &str) -> Option<f64> {
    let caps = SCALED_NUMBER_REGEX.captures(raw.trim())?;
    let num: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(match caps.get(2).map(|m| m.as_str()).unwrap_or("") {
        "B" => num * 1_000_000_000.0,
        "M" => num * 1_000_000.0,
        "L" => num * 100_000.0,
        _ => num,
    })
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };
    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*d);
    }
    let sign = if value < 0.0 && value.abs() >= 0.5 * 10f64.powi(-(decimals as i32)) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format like `1,234,567` with no decimals, `-` when there is no value.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) => group_thousands(v, 0),
        None => "-".to_string(),
    }
}

/// Format like `1,234,567.00`, empty when there is no value.
pub fn format_money(value: Option<f64>) -> String {
    match value {
        Some(v) => group_thousands(v, 2),
        None => String::new(),
    }
}

/// Format like `1,234,567` with `"0"` as the fallback.
pub fn format_int(value: Option<f64>) -> String {
    match value {
        Some(v) => group_thousands(v, 0),
        None => "0".to_string(),
    }
}

/// Percent display. Sheet values at or below 1 in magnitude are read as
/// fractions (0.17 → 17.0%), anything larger is already a percentage.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let pct = if v.abs() <= 1.0 { v * 100.0 } else { v };
            format!("{pct:.1}%")
        }
        None => "-".to_string(),
    }
}

/// Normalize the assorted line-break spellings that show up in cells.
pub fn clean_html_breaks(text: &str) -> String {
    text.replace("\\n", "<br>")
        .replace('\n', "<br>")
        .replace("&lt;br&gt;", "<br>")
        .replace("<br/>", "<br>")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewChunk {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Split free-form review text into bullet/plain chunks, one per non-empty
/// line. Lines opening with a list marker (-, •, →, ->, –) become bullets.
pub fn parse_review_text(text: &str) -> Vec<ReviewChunk> {
    let mut chunks = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if BULLET_PREFIX_REGEX.is_match(line) {
            chunks.push(ReviewChunk {
                kind: "bullet",
                text: BULLET_PREFIX_REGEX.replace(line, "").to_string(),
            });
        } else {
            chunks.push(ReviewChunk {
                kind: "text",
                text: line.to_string(),
            });
        }
    }
    chunks
}

/// True when the joined row text looks like a prose insight rather than a
/// data row: long enough and free of long digit runs.
pub fn looks_like_prose(joined: &str) -> bool {
    joined.len() > 40 && !LONG_DIGIT_RUN_REGEX.is_match(joined)
}

/// "Jobs to be done" category labels come in many spellings.
pub fn is_jtbd_category(category: &str) -> bool {
    (JTBD_WORD_REGEX.is_match(category) && JTBD_TAIL_REGEX.is_match(category))
        || category == "just"
        || category == "just to be done"
        || category.contains("jtbd")
}

pub type HeaderPredicate = fn(&str) -> bool;

/// An ordered list of (predicate, canonical-name) rules applied to each
/// lowercased header; the first matching rule wins and headers matching no
/// rule keep their original name. Several headers may map to the same
/// canonical name — no conflict detection, by construction.
pub fn map_headers(
    headers: &[String],
    rules: &[(HeaderPredicate, &'static str)],
) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for header in headers {
        let lc = header.to_lowercase();
        for (predicate, canonical) in rules {
            if predicate(&lc) {
                mapping.insert(header.clone(), (*canonical).to_string());
                break;
            }
        }
    }
    mapping
}

/// Month labels excluded from the minimum-month computation.
pub fn is_december(month: &str) -> bool {
    matches!(month.to_lowercase().as_str(), "dec" | "december")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_thousands_separators() {
        assert_eq!(parse_number("15,750"), Some(15750.0));
        assert_eq!(parse_number(" 1,234,567.89 "), Some(1234567.89));
        assert_eq!(parse_number("-42"), Some(-42.0));
    }

    #[test]
    fn parses_latex_wrapped_numbers() {
        assert_eq!(parse_number("$\\mathbf{5,250}$"), Some(5250.0));
    }

    #[test]
    fn unparsable_text_is_missing() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("TBD"), None);
    }

    #[test]
    fn latex_cleanup() {
        assert_eq!(clean_latex("$17\\%$"), "17\\%");
        assert_eq!(clean_latex("\\mathbf{Growth}"), "Growth");
        assert_eq!(clean_latex("A \\rightarrow B"), "A → B");
        assert_eq!(clean_latex("  plain  "), "plain");
    }

    #[test]
    fn scaled_suffixes() {
        assert_eq!(scaled_number("3.7 B"), Some(3_700_000_000.0));
        assert_eq!(scaled_number("2M"), Some(2_000_000.0));
        assert_eq!(scaled_number("180 L"), Some(18_000_000.0));
        assert_eq!(scaled_number("12"), Some(12.0));
        assert_eq!(scaled_number("none"), None);
    }

    #[test]
    fn money_and_number_formatting() {
        assert_eq!(format_money(Some(1234567.0)), "1,234,567.00");
        assert_eq!(format_money(None), "");
        assert_eq!(format_number(Some(9_000_000.0)), "9,000,000");
        assert_eq!(format_number(None), "-");
        assert_eq!(format_int(None), "0");
        assert_eq!(format_int(Some(-1234.0)), "-1,234");
    }

    #[test]
    fn percent_fraction_heuristic() {
        assert_eq!(format_percent(Some(0.17)), "17.0%");
        assert_eq!(format_percent(Some(42.0)), "42.0%");
        assert_eq!(format_percent(None), "-");
    }

    #[test]
    fn review_text_chunks() {
        let chunks = parse_review_text("- first win\nplain remark\n→ follow up\n\n");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].kind, "bullet");
        assert_eq!(chunks[0].text, "first win");
        assert_eq!(chunks[1].kind, "text");
        assert_eq!(chunks[2].text, "follow up");
    }

    #[test]
    fn header_rules_first_match_wins() {
        let rules: &[(HeaderPredicate, &'static str)] = &[
            (|h: &str| h.contains("qty"), "Current_Qty"),
            (|h: &str| h.contains("q1"), "Q1_Forecast"),
        ];
        let headers = vec!["2025 Qty (Q1)".to_string(), "Q1 Target".to_string()];
        let mapping = map_headers(&headers, rules);
        assert_eq!(mapping["2025 Qty (Q1)"], "Current_Qty");
        assert_eq!(mapping["Q1 Target"], "Q1_Forecast");
    }

    #[test]
    fn jtbd_spellings() {
        assert!(is_jtbd_category("just to be done"));
        assert!(is_jtbd_category("jobs jtbd"));
        assert!(is_jtbd_category("just things done"));
        assert!(!is_jtbd_category("gain creator"));
    }

    #[test]
    fn december_exclusion_labels() {
        assert!(is_december("Dec"));
        assert!(is_december("december"));
        assert!(!is_december("Nov"));
    }
}
