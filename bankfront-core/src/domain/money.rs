//! Money parsing and formatting
//!
//! The ledger stores amounts as integer cents. User input arrives as a
//! decimal string ("12.50") and is converted by truncating toward zero.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Parse a user-entered amount
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| Error::validation(format!("{} is not a valid number", input)))
}

/// True when the input parses to a number strictly greater than zero
pub fn is_positive_amount(input: &str) -> bool {
    parse_amount(input)
        .map(|amount| amount > Decimal::ZERO)
        .unwrap_or(false)
}

/// Convert an amount to integer cents, truncating toward zero
pub fn to_cents(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or_else(|| Error::validation(format!("{} is out of range", amount)))
}

/// Render cents as `$1,234.56`; negative values get a leading `-`.
/// Unknown balances render as `$---`.
pub fn format_currency(cents: Option<i64>) -> String {
    let Some(cents) = cents else {
        return "$---".to_string();
    };

    let dollars = Decimal::from(cents.unsigned_abs()) / Decimal::ONE_HUNDRED;
    let plain = format!("{:.2}", dollars);
    let (whole, frac) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amounts() {
        assert!(is_positive_amount("12.50"));
        assert!(is_positive_amount(" 0.01 "));
        assert!(!is_positive_amount("0"));
        assert!(!is_positive_amount("0.00"));
        assert!(!is_positive_amount("-5"));
        assert!(!is_positive_amount("abc"));
        assert!(!is_positive_amount(""));
    }

    #[test]
    fn test_to_cents_truncates() {
        assert_eq!(to_cents(parse_amount("12.50").unwrap()).unwrap(), 1250);
        assert_eq!(to_cents(parse_amount("1.999").unwrap()).unwrap(), 199);
        assert_eq!(to_cents(parse_amount("-1.999").unwrap()).unwrap(), -199);
        assert_eq!(to_cents(parse_amount("1e2").unwrap()).unwrap(), 10000);
    }

    #[test]
    fn test_to_cents_out_of_range() {
        let huge = parse_amount("79228162514264337593543950335").unwrap();
        assert!(is_positive_amount("79228162514264337593543950335"));
        assert!(matches!(to_cents(huge), Err(Error::Validation(_))));

        // Fits a Decimal but not an i64 once scaled
        let wide = parse_amount("92233720368547758.08").unwrap();
        assert!(to_cents(wide).is_err());
        assert_eq!(
            to_cents(parse_amount("92233720368547758.07").unwrap()).unwrap(),
            i64::MAX
        );
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(None), "$---");
        assert_eq!(format_currency(Some(0)), "$0.00");
        assert_eq!(format_currency(Some(5)), "$0.05");
        assert_eq!(format_currency(Some(123456)), "$1,234.56");
        assert_eq!(format_currency(Some(-123456789)), "-$1,234,567.89");
        assert_eq!(format_currency(Some(100000)), "$1,000.00");
    }
}
