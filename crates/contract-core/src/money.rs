//! Brazilian-style numeric formatting ("1.234,56"), independent of host locale

/// Two-decimal rendering of `|value|`, rounded from its exact binary value
/// with ties to even (`2.675` is stored below the tie and gives `2.67`).
fn fixed_two_decimals(value: f64) -> String {
    format!("{:.2}", value.abs())
}

fn is_negative_display(value: f64, fixed: &str) -> bool {
    value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

/// Whole cents shown by [`format_brl`]
pub fn to_cents(value: f64) -> i128 {
    let fixed = fixed_two_decimals(value);
    let cents = fixed.replace('.', "").parse::<i128>().unwrap_or(i128::MAX);
    if is_negative_display(value, &fixed) {
        -cents
    } else {
        cents
    }
}

/// Format an amount with `.` thousands and `,` decimal separators, two decimals
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = fixed_two_decimals(value);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if is_negative_display(value, &fixed) { "-" } else { "" };

    format!("{}{},{}", sign, group_thousands(int_part), frac_part)
}

/// Format a percentage rate, e.g. `4.0` -> `"4,00%"`
pub fn format_percent(rate: f64) -> String {
    format!("{}%", format_brl(rate))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl_small() {
        assert_eq!(format_brl(0.0), "0,00");
        assert_eq!(format_brl(5.5), "5,50");
        assert_eq!(format_brl(999.99), "999,99");
    }

    #[test]
    fn test_format_brl_thousands() {
        assert_eq!(format_brl(1234.5), "1.234,50");
        assert_eq!(format_brl(1234.56), "1.234,56");
        assert_eq!(format_brl(1_000_000.0), "1.000.000,00");
        assert_eq!(format_brl(600_822_115.84), "600.822.115,84");
    }

    #[test]
    fn test_format_brl_negative() {
        assert_eq!(format_brl(-1234.5), "-1.234,50");
        assert_eq!(format_brl(-0.001), "0,00");
    }

    #[test]
    fn test_format_brl_rounds_to_cents() {
        assert_eq!(format_brl(49.375), "49,38");
        assert_eq!(format_brl(0.129), "0,13");
    }

    #[test]
    fn test_format_brl_rounds_stored_value() {
        // 1.115 and 2.675 are stored just below the tie
        assert_eq!(format_brl(1.115), "1,11");
        assert_eq!(format_brl(2.675), "2,67");
        // 3.125 is an exact tie
        assert_eq!(format_brl(3.125), "3,12");
        assert_eq!(to_cents(3.125), 312);
        assert_eq!(to_cents(-1234.5), -123450);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(4.0), "4,00%");
        assert_eq!(format_percent(2.5), "2,50%");
        assert_eq!(format_percent(0.0), "0,00%");
    }
}
