//! Display formatting helpers.

/// Format a dollar amount with two decimals and thousands separators.
pub fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let mut digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    while digits.len() > 3 {
        let split = digits.len() - 3;
        grouped.insert_str(0, &format!(",{}", &digits[split..]));
        digits.truncate(split);
    }
    grouped.insert_str(0, &digits);

    format!(
        "{}${}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        frac
    )
}

/// Signed dollar amount with an explicit plus on gains.
pub fn format_signed_money(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", format_money(value))
    } else {
        format_money(value)
    }
}

/// Compact market cap: 2.41T, 312.5B, 875.0M.
pub fn format_market_cap(value: f64) -> String {
    const TRILLION: f64 = 1e12;
    const BILLION: f64 = 1e9;
    const MILLION: f64 = 1e6;

    if value >= TRILLION {
        format!("{:.2}T", value / TRILLION)
    } else if value >= BILLION {
        format!("{:.1}B", value / BILLION)
    } else if value >= MILLION {
        format!("{:.1}M", value / MILLION)
    } else {
        format!("{:.0}", value)
    }
}

/// Trim a fractional share count: 3 shares, 2.5 shares.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(1234.5), "$1,234.50");
        assert_eq!(format_money(1234567.891), "$1,234,567.89");
        assert_eq!(format_money(-42.0), "-$42.00");
    }

    #[test]
    fn test_format_signed_money() {
        assert_eq!(format_signed_money(12.5), "+$12.50");
        assert_eq!(format_signed_money(-12.5), "-$12.50");
        assert_eq!(format_signed_money(0.0), "$0.00");
    }

    #[test]
    fn test_format_market_cap_tiers() {
        assert_eq!(format_market_cap(2.41e12), "2.41T");
        assert_eq!(format_market_cap(3.125e11), "312.5B");
        assert_eq!(format_market_cap(8.75e8), "875.0M");
        assert_eq!(format_market_cap(5000.0), "5000");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(3.0), "3");
        assert_eq!(format_quantity(2.5), "2.5");
    }
}
