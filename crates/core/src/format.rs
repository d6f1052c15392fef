//! Display formatting for metric values. Unavailable values render as a
//! placeholder instead of `NaN` or `inf`.

use crate::schema::MetricFormat;

pub const PLACEHOLDER: &str = "—";

/// Round to 2 decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to `decimals` places; a result that rounds to zero loses its sign.
fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale + 0.0
}

pub fn format_currency(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => {
            let v = round_to(v, 2);
            let sign = if v < 0.0 { "-" } else { "" };
            format!("{sign}${}", group_thousands(v.abs(), 2))
        }
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.2}%", round_to(v, 2)),
        None => PLACEHOLDER.to_string(),
    }
}

/// Thousands-separated number with at most 3 fraction digits, trailing
/// zeros trimmed.
pub fn format_number(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => {
            let v = round_to(v, 3);
            let sign = if v < 0.0 { "-" } else { "" };
            let text = group_thousands(v.abs(), 3);
            let text = if text.contains('.') {
                text.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                text
            };
            format!("{sign}{text}")
        }
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_value(format: MetricFormat, value: Option<f64>) -> String {
    match format {
        MetricFormat::Number => format_number(value),
        MetricFormat::Currency => format_currency(value),
        MetricFormat::Percentage => format_percent(value),
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{value:.decimals$}");
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(33.3333), 33.33);
        assert_eq!(round2(-1.556), -1.56);
    }

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(Some(1234.5)), "$1,234.50");
        assert_eq!(format_currency(Some(0.0)), "$0.00");
        assert_eq!(format_currency(Some(-12.0)), "-$12.00");
        assert_eq!(format_currency(Some(1_000_000.0)), "$1,000,000.00");
        assert_eq!(format_currency(None), PLACEHOLDER);
        assert_eq!(format_currency(Some(f64::NAN)), PLACEHOLDER);
    }

    #[test]
    fn test_values_rounding_to_zero_drop_the_sign() {
        assert_eq!(format_currency(Some(-0.001)), "$0.00");
        assert_eq!(format_currency(Some(-0.005)), "-$0.01");
        assert_eq!(format_percent(Some(-0.001)), "0.00%");
        assert_eq!(format_number(Some(-0.0001)), "0");
        assert_eq!(format_number(Some(-1.5)), "-1.5");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(Some(10.0)), "10.00%");
        assert_eq!(format_percent(Some(3.14159)), "3.14%");
        assert_eq!(format_percent(Some(f64::INFINITY)), PLACEHOLDER);
        assert_eq!(format_percent(None), PLACEHOLDER);
    }

    #[test]
    fn test_number() {
        assert_eq!(format_number(Some(1234.0)), "1,234");
        assert_eq!(format_number(Some(1234.5)), "1,234.5");
        assert_eq!(format_number(Some(0.12345)), "0.123");
        assert_eq!(format_number(Some(999.0)), "999");
        assert_eq!(format_number(None), PLACEHOLDER);
    }

    #[test]
    fn test_format_value_dispatch() {
        assert_eq!(format_value(MetricFormat::Currency, Some(5.0)), "$5.00");
        assert_eq!(format_value(MetricFormat::Percentage, Some(5.0)), "5.00%");
        assert_eq!(format_value(MetricFormat::Number, Some(5.0)), "5");
    }
}
