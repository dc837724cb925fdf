//! Fixed-locale currency formatting for amounts taken from structured data.
//!
//! Output matches an `en-US` currency formatter with zero fraction digits:
//! symbol first, comma thousands separators, amount rounded half away from
//! zero. Currencies without a well-known symbol fall back to `"<CODE> "`.

/// Formats `amount` in `currency` (ISO 4217 code), e.g. `2407.4, "ILS"` →
/// `"₪2,407"`.
#[must_use]
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    let prefix = match symbol_for(&code) {
        Some(symbol) => symbol.to_string(),
        None if code.is_empty() => String::new(),
        None => format!("{code} "),
    };

    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{prefix}{}", group_thousands(rounded.abs()))
}

fn symbol_for(code: &str) -> Option<&'static str> {
    let symbol = match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "ILS" => "₪",
        "JPY" => "¥",
        "CNY" => "CN¥",
        "INR" => "₹",
        "KRW" => "₩",
        "BRL" => "R$",
        "CAD" => "CA$",
        "AUD" => "A$",
        "NZD" => "NZ$",
        "HKD" => "HK$",
        "MXN" => "MX$",
        "VND" => "₫",
        "PHP" => "₱",
        "TWD" => "NT$",
        _ => return None,
    };
    Some(symbol)
}

/// Renders a non-negative whole number with comma separators.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn group_thousands(whole: f64) -> String {
    let digits = (whole as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_shekels_symbol_first() {
        assert_eq!(format_currency(2407.0, "ILS"), "₪2,407");
    }

    #[test]
    fn rounds_to_whole_units() {
        assert_eq!(format_currency(119.5, "USD"), "$120");
        assert_eq!(format_currency(84.49, "eur"), "€84");
    }

    #[test]
    fn groups_large_amounts() {
        assert_eq!(format_currency(1_234_567.0, "GBP"), "£1,234,567");
        assert_eq!(format_currency(999.0, "GBP"), "£999");
        assert_eq!(format_currency(1000.0, "GBP"), "£1,000");
    }

    #[test]
    fn unknown_currency_uses_code_prefix() {
        assert_eq!(format_currency(85.0, "CHF"), "CHF 85");
    }

    #[test]
    fn missing_currency_prints_bare_amount() {
        assert_eq!(format_currency(85.0, ""), "85");
    }

    #[test]
    fn negative_amount_keeps_sign_before_symbol() {
        assert_eq!(format_currency(-5.2, "USD"), "-$5");
    }
}
