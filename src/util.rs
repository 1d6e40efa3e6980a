// Utility helpers for parsing cells and formatting numbers.
//
// Cell parsing is deliberately forgiving: source exports mix blanks, "NA"
// markers and thousands separators.
use num_format::{Locale, ToFormattedString};

/// Parse a cell into `f64`.
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Accepts scientific notation (`1.5e-3`), which model exports use for
///   small prevalences.
/// - Returns `None` for blanks and anything that cannot be parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Round half up to `decimals` places, in decimal.
///
/// The shift is done on the shortest decimal rendering (`1.005` becomes
/// `1.005e2`) rather than by multiplying, so `1.005` rounds to `1.01`
/// instead of the `1.00` a binary `* 100.0` would give.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let shifted: f64 = match format!("{value}e{decimals}").parse() {
        Ok(v) => v,
        Err(_) => return value,
    };
    let floor = shifted.floor();
    let rounded = if shifted - floor >= 0.5 { floor + 1.0 } else { floor };
    format!("{rounded}e{}", -decimals).parse().unwrap_or(value)
}

/// Keep only the digits of a column-name suffix (`"_2020"` -> `2020`).
pub fn year_from_suffix(suffix: &str) -> Option<i32> {
    let digits: String = suffix.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators
    // (e.g. `1,234,567.89`). Non-finite values render as the placeholder.
    if !n.is_finite() {
        return "–".to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forgiving_cells() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("1.5e-3")), Some(0.0015));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("NA")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn rounds_prevalence_percentages() {
        assert_eq!(round_to(0.05 * 100.0, 2), 5.0);
        assert_eq!(round_to(0.123456 * 100.0, 2), 12.35);
        assert_eq!(round_to(1234.6, 0), 1235.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn rounds_decimal_halves_up() {
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(1.015, 2), 1.02);
        assert_eq!(round_to(0.145, 2), 0.15);
        assert_eq!(round_to(2.675, 2), 2.68);
        assert_eq!(round_to(-2.5, 0), -2.0);
        assert_eq!(round_to(0.0000001, 2), 0.0);
    }

    #[test]
    fn extracts_year_digits() {
        assert_eq!(year_from_suffix("_2020"), Some(2020));
        assert_eq!(year_from_suffix("2031"), Some(2031));
        assert_eq!(year_from_suffix("_mean"), None);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-5.0, 2), "-5.00");
        assert_eq!(format_number(f64::NAN, 2), "–");
        assert_eq!(format_int(1_500_000i64), "1,500,000");
    }
}
