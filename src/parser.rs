use crate::errors::{AppError, AppResult};
use crate::models::Classification;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Numeric value used when a display string carries no number at all.
pub const DEFAULT_PARSE_FALLBACK: f64 = 100.0;

const CURRENCY_GLYPHS: [char; 5] = ['₹', '$', '€', '£', '¥'];

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedValue {
    pub numeric_value: f64,
    pub classification: Classification,
}

pub fn classify(raw: &str) -> Classification {
    if raw.contains('%') {
        Classification::Percentage
    } else if raw.contains("hrs") || raw.contains("days") {
        Classification::Time
    } else if raw.contains(CURRENCY_GLYPHS) {
        Classification::Currency
    } else {
        Classification::Number
    }
}

/// Parses a display string such as `"82%"`, `"₹45.2/km"` or `"1,250"`.
///
/// Only the first `/`-separated component is read, so `"76% / 82%"` yields 76.
/// Everything but digits, `.` and `-` is discarded before the leading number
/// is taken.
pub fn parse_value(raw: &str) -> AppResult<ParsedValue> {
    let first = raw.split('/').next().unwrap_or_default();
    let stripped: String = first
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let numeric_value = LEADING_NUMBER
        .find(&stripped)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::Parse(format!("no numeric component in {:?}", raw)))?;

    Ok(ParsedValue {
        numeric_value,
        classification: classify(raw),
    })
}

/// Like [`parse_value`] but never fails: an unparseable string is logged and
/// replaced by `fallback`, keeping its classification.
pub fn parse_value_or_fallback(raw: &str, fallback: f64) -> ParsedValue {
    match parse_value(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!(value = %raw, fallback, error = %error, "value parse fell back");
            ParsedValue {
                numeric_value: fallback,
                classification: classify(raw),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, parse_value, parse_value_or_fallback, DEFAULT_PARSE_FALLBACK};
    use crate::models::Classification;

    #[test]
    fn parses_percentage() {
        let parsed = parse_value("82%").expect("parse");
        assert_eq!(parsed.numeric_value, 82.0);
        assert_eq!(parsed.classification, Classification::Percentage);
    }

    #[test]
    fn parses_currency_rate() {
        let parsed = parse_value("₹45.2/km").expect("parse");
        assert_eq!(parsed.numeric_value, 45.2);
        assert_eq!(parsed.classification, Classification::Currency);
    }

    #[test]
    fn parses_time_units() {
        let days = parse_value("3.8 days").expect("parse");
        assert_eq!(days.numeric_value, 3.8);
        assert_eq!(days.classification, Classification::Time);

        let hours = parse_value("18.5 hrs").expect("parse");
        assert_eq!(hours.numeric_value, 18.5);
        assert_eq!(hours.classification, Classification::Time);
    }

    #[test]
    fn compound_value_uses_first_component() {
        let parsed = parse_value("76% / 82%").expect("parse");
        assert_eq!(parsed.numeric_value, 76.0);
        assert_eq!(parsed.classification, Classification::Percentage);
    }

    #[test]
    fn strips_thousands_separators_and_suffixes() {
        assert_eq!(parse_value("1,250").expect("parse").numeric_value, 1250.0);
        assert_eq!(parse_value("₹ 12.5 Cr").expect("parse").numeric_value, 12.5);
        assert_eq!(parse_value("42 active").expect("parse").numeric_value, 42.0);
        assert_eq!(parse_value("4.2 km/L").expect("parse").numeric_value, 4.2);
    }

    #[test]
    fn keeps_negative_sign() {
        assert_eq!(parse_value("-3.5%").expect("parse").numeric_value, -3.5);
    }

    #[test]
    fn no_digits_is_an_error() {
        let err = parse_value("N/A").expect_err("should fail");
        assert!(err.to_string().starts_with("PARSE_FAILED"));
    }

    #[test]
    fn fallback_replaces_unparseable_value() {
        let parsed = parse_value_or_fallback("N/A", DEFAULT_PARSE_FALLBACK);
        assert_eq!(parsed.numeric_value, 100.0);
        assert_eq!(parsed.classification, Classification::Number);
    }

    #[test]
    fn percent_wins_over_currency() {
        assert_eq!(classify("₹ 8.2%"), Classification::Percentage);
        assert_eq!(classify("₹ 42/km"), Classification::Currency);
        assert_eq!(classify("125 tons"), Classification::Number);
    }
}
