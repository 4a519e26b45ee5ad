//! Amount parsing for statement lines.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_TOKEN;
use super::{FieldExtractor, FieldMatch};

const CURRENCY_GLYPHS: [char; 6] = ['$', '€', '£', '¥', '₹', '₽'];

/// Amount field extractor for free text.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Value = Decimal;

    /// The largest positive amount in the text.
    fn find(&self, text: &str) -> Option<FieldMatch<Decimal>> {
        self.find_all(text)
            .into_iter()
            .filter(|m| m.value > Decimal::ZERO)
            .max_by(|a, b| a.value.cmp(&b.value))
    }

    fn find_all(&self, text: &str) -> Vec<FieldMatch<Decimal>> {
        AMOUNT_TOKEN
            .find_iter(text)
            .filter_map(|m| {
                parse_amount(m.as_str()).map(|amount| {
                    FieldMatch::new(amount, 0.8, m.as_str()).at(m.start(), m.end())
                })
            })
            .collect()
    }
}

/// Parse a monetary amount such as `$44,900.00`, `1.234,56` or `(12.50)`.
///
/// Currency glyphs and whitespace are ignored and parentheses mark a negative value.
/// When both separators appear the right-most one is the decimal point. With commas
/// only, a single comma followed by exactly two digits is the decimal point and any
/// other comma is a thousands separator. Several periods with no comma are treated as
/// thousands separators. Returns `None` for anything else.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let mut cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_GLYPHS.contains(c))
        .collect();

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() >= 2 {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    if let Some(rest) = cleaned.strip_prefix('-') {
        negative = !negative;
        cleaned = rest.to_string();
    }

    if cleaned.is_empty()
        || !cleaned.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
        || !cleaned.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let single = cleaned.matches(',').count() == 1;
            let decimals = cleaned.len() - comma - 1;
            if single && decimals == 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Format an amount with thousands commas and at least two decimals (44,900.00).
///
/// The output parses back to the same value with [`parse_amount`].
pub fn format_amount(amount: Decimal) -> String {
    let mut value = amount.abs();
    if value.scale() < 2 {
        value.rescale(2);
    }

    let s = value.to_string();
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}{}.{}", sign, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount_us_thousands() {
        assert_eq!(parse_amount("44,900.00"), Some(dec("44900.00")));
        assert_eq!(parse_amount("$44,900.00"), Some(dec("44900.00")));
        assert_eq!(parse_amount("$ 1,234,567.89"), Some(dec("1234567.89")));
    }

    #[test]
    fn test_parse_amount_european() {
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("€1.234.567,00"), Some(dec("1234567.00")));
    }

    #[test]
    fn test_parse_amount_comma_only() {
        assert_eq!(parse_amount("1234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1,234"), Some(dec("1234")));
        assert_eq!(parse_amount("1,234,56"), Some(dec("123456")));
    }

    #[test]
    fn test_parse_amount_period_only() {
        assert_eq!(parse_amount("26.19"), Some(dec("26.19")));
        assert_eq!(parse_amount("1.234.567"), Some(dec("1234567")));
    }

    #[test]
    fn test_parse_amount_negative() {
        assert_eq!(parse_amount("(12.50)"), Some(dec("-12.50")));
        assert_eq!(parse_amount("-$1,000.00"), Some(dec("-1000.00")));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12a.00"), None);
        assert_eq!(parse_amount(",."), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("44900")), "44,900.00");
        assert_eq!(format_amount(dec("1234567.891")), "1,234,567.891");
        assert_eq!(format_amount(dec("-12.5")), "-12.50");
        assert_eq!(format_amount(dec("0")), "0.00");
    }

    #[test]
    fn test_amount_format_parse_round_trip() {
        for input in ["44,900.00", "1.234,56", "1234,56", "1,234", "0.05", "(99.99)", "$1,000,000"] {
            let parsed = parse_amount(input).unwrap();
            assert_eq!(parse_amount(&format_amount(parsed)), Some(parsed), "input {}", input);
        }
    }

    #[test]
    fn test_extractor_picks_largest_amount() {
        let extractor = AmountExtractor::new();
        let found = extractor.find("PAYU*NETFLIX $44,900.00 $0.00 26.19").unwrap();
        assert_eq!(found.value, dec("44900.00"));
        assert_eq!(extractor.find_all("no money here").len(), 0);
    }
}
