//! Merchant description normalization.

use crate::models::pattern::CleanupRule;

use super::patterns::{
    MARKER_RUN, TRAILING_COUNTRY_CODE, TRAILING_LOCATION_CODE, TRAILING_PUNCTUATION,
    TRAILING_REFERENCE_NUMBERS, WHITESPACE,
};

/// Normalize a merchant description.
///
/// Collapses whitespace, collapses runs of `*` to one, strips trailing punctuation and
/// trailing location/reference codes (six or more digits, optionally followed by
/// uppercase letters), then uppercases. Cleaning a clean string returns it unchanged.
pub fn clean_description(description: &str) -> String {
    clean_description_with(description, &[])
}

/// Normalize a description and apply extra cleanup rules.
pub fn clean_description_with(description: &str, rules: &[CleanupRule]) -> String {
    // After the first pass a pass can only remove text, so this terminates
    let mut current = clean_pass(description, rules);
    loop {
        let next = clean_pass(&current, rules);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(description: &str, rules: &[CleanupRule]) -> String {
    let mut cleaned = WHITESPACE.replace_all(description.trim(), " ").into_owned();
    cleaned = MARKER_RUN.replace_all(&cleaned, "*").into_owned();
    cleaned = cleaned.to_uppercase();

    for rule in rules {
        cleaned = match rule {
            CleanupRule::RemoveTrailingNumbers => {
                TRAILING_REFERENCE_NUMBERS.replace(&cleaned, "").into_owned()
            }
            CleanupRule::CleanLocationCodes => {
                TRAILING_COUNTRY_CODE.replace(&cleaned, "").into_owned()
            }
        };
    }

    cleaned = TRAILING_LOCATION_CODE.replace(&cleaned, "").into_owned();
    cleaned = TRAILING_PUNCTUATION.replace(cleaned.trim_end(), "").into_owned();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_trailing_location_code() {
        assert_eq!(clean_description("PAYU*NETFLIX 110111BOGOTA"), "PAYU*NETFLIX");
        assert_eq!(clean_description("MERCADO PAGO 1234567"), "MERCADO PAGO");
    }

    #[test]
    fn test_collapses_whitespace_and_markers() {
        assert_eq!(clean_description("  uber   ***trip  "), "UBER *TRIP");
    }

    #[test]
    fn test_strips_trailing_punctuation() {
        assert_eq!(clean_description("ALMACEN EXITO;,"), "ALMACEN EXITO");
        assert_eq!(clean_description("ALMACEN - 123456"), "ALMACEN");
    }

    #[test]
    fn test_keeps_short_numbers() {
        assert_eq!(clean_description("TIENDA 123"), "TIENDA 123");
    }

    #[test]
    fn test_cleanup_rules() {
        let rules = [CleanupRule::RemoveTrailingNumbers, CleanupRule::CleanLocationCodes];
        assert_eq!(clean_description_with("RAPPI 4521 8890", &rules), "RAPPI");
        assert_eq!(clean_description_with("AMAZON PRIME CO", &rules), "AMAZON PRIME");
        assert_eq!(clean_description("AMAZON PRIME CO"), "AMAZON PRIME CO");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let rules = [CleanupRule::RemoveTrailingNumbers, CleanupRule::CleanLocationCodes];
        for input in [
            "PAYU*NETFLIX 110111BOGOTA",
            "store - 4521 ;",
            "  a**b  c 9999999X ,",
            "CAFÉ straße",
            "SHOP 111111 222222 333333 444444 555555 666666 777777 888888 999999 123456",
        ] {
            let once = clean_description_with(input, &rules);
            assert_eq!(clean_description_with(&once, &rules), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_strips_every_trailing_location_code() {
        let input = "SHOP 111111 222222 333333 444444 555555 666666 777777 888888 999999 123456";
        let once = clean_description(input);
        assert_eq!(once, "SHOP");
        assert_eq!(clean_description(&once), once);
        assert_eq!(clean_description("ALMACEN 110111BOGOTA 220222CALI,"), "ALMACEN");
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(clean_description("   "), "");
        assert_eq!(clean_description("1234567"), "");
    }
}
