use std::sync::LazyLock;

use regex::Regex;

use super::model::CellValue;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("valid numeric regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Coerce cell text to a number.
///
/// Every character outside `[0-9.]` is stripped before parsing, so
/// `"£123,456"` reads as `123456.0`. Signs and exponents are stripped too.
/// Anything that still does not parse (`"N/A"`, `""`, `"1.2.3"`) is missing.
pub fn coerce_numeric(text: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(text, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric value of a raw cell. Native numbers pass through unchanged.
pub fn coerce_cell(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(v) => v.is_finite().then_some(*v),
        CellValue::Text(s) => coerce_numeric(s),
        CellValue::Missing => None,
    }
}

/// Signed coordinate (latitude/longitude). Text must be a plain number;
/// nothing is stripped, so `"-0.45"` keeps its sign.
pub fn parse_coordinate(cell: &CellValue) -> Option<f64> {
    let v = match cell {
        CellValue::Number(v) => *v,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Missing => return None,
    };
    v.is_finite().then_some(v)
}

/// Trim a header and collapse interior whitespace (including newlines).
pub fn normalize_header(name: &str) -> String {
    WHITESPACE_RUN.replace_all(name.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_currency_and_separators() {
        assert_eq!(coerce_numeric("£123,456"), Some(123456.0));
        assert_eq!(coerce_numeric(" 1,250.50 pcm"), Some(1250.5));
        assert_eq!(coerce_numeric("45 mins"), Some(45.0));
    }

    #[test]
    fn signs_and_exponents_are_stripped_like_any_other_character() {
        assert_eq!(coerce_numeric("-5"), Some(5.0));
        assert_eq!(coerce_numeric("-£250"), Some(250.0));
        assert_eq!(coerce_numeric("+7"), Some(7.0));
        assert_eq!(coerce_numeric("1e3"), Some(13.0));
        assert_eq!(coerce_numeric("NaN"), None);
    }

    #[test]
    fn coordinates_keep_their_sign() {
        assert_eq!(parse_coordinate(&CellValue::Text(" -0.45 ".into())), Some(-0.45));
        assert_eq!(parse_coordinate(&CellValue::Number(-1.05)), Some(-1.05));
        assert_eq!(parse_coordinate(&CellValue::Text("51.2 N".into())), None);
        assert_eq!(parse_coordinate(&CellValue::Missing), None);
    }

    #[test]
    fn invalid_text_is_missing() {
        assert_eq!(coerce_numeric("N/A"), None);
        assert_eq!(coerce_numeric(""), None);
        assert_eq!(coerce_numeric("1.2.3"), None);
        assert_eq!(coerce_numeric("."), None);
    }

    #[test]
    fn native_numbers_pass_through() {
        assert_eq!(coerce_cell(&CellValue::Number(-3.5)), Some(-3.5));
        assert_eq!(coerce_cell(&CellValue::Number(f64::NAN)), None);
        assert_eq!(coerce_cell(&CellValue::Missing), None);
        assert_eq!(coerce_cell(&CellValue::Text("£99".into())), Some(99.0));
    }

    #[test]
    fn headers_are_trimmed_and_collapsed() {
        assert_eq!(normalize_header("  Town "), "Town");
        assert_eq!(normalize_header("2 Bed\nAsking  Price"), "2 Bed Asking Price");
    }
}
