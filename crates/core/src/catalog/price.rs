//! Normalization of free-form price strings ("€29.99", "29,99 €", "1.299,00").

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use super::ProviderId;
use crate::metrics::PRICE_PARSE_FAILURES;

/// Parse a free-form price.
///
/// Everything except digits and the separators `.`/`,` is stripped. When both
/// separators appear, the last one is the decimal separator and the other is
/// treated as grouping. A single separator kind occurring once is decimal;
/// occurring several times it is grouping.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (None, None) => cleaned,
        (Some(dot), Some(comma)) => {
            let (decimal, grouping) = if dot > comma { ('.', ',') } else { (',', '.') };
            let ungrouped: String = cleaned.chars().filter(|c| *c != grouping).collect();
            if ungrouped.matches(decimal).count() > 1 {
                return None;
            }
            ungrouped.replace(decimal, ".")
        }
        (Some(_), None) => single_separator(&cleaned, '.'),
        (None, Some(_)) => single_separator(&cleaned, ','),
    };

    Decimal::from_str(&normalized).ok()
}

fn single_separator(cleaned: &str, separator: char) -> String {
    if cleaned.matches(separator).count() == 1 {
        cleaned.replace(separator, ".")
    } else {
        cleaned.chars().filter(|c| *c != separator).collect()
    }
}

/// Parse a provider price, falling back to 0 for unparseable input.
///
/// The fallback is a data-quality problem, not a reason to drop the provider,
/// so it is logged and counted.
pub fn normalize_price(raw: &str, provider_id: ProviderId) -> Decimal {
    match parse_price(raw) {
        Some(price) => price,
        None => {
            warn!(provider_id, raw_price = raw, "Unparseable provider price, using 0");
            PRICE_PARSE_FAILURES.inc();
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_prefix() {
        assert_eq!(parse_price("€29.99"), Some(Decimal::new(2999, 2)));
    }

    #[test]
    fn test_parse_comma_decimal_with_suffix() {
        assert_eq!(parse_price("29,99 €"), Some(Decimal::new(2999, 2)));
    }

    #[test]
    fn test_parse_plain_integer() {
        assert_eq!(parse_price("30"), Some(Decimal::from(30)));
    }

    #[test]
    fn test_parse_grouped_european() {
        assert_eq!(parse_price("1.299,00 EUR"), Some(Decimal::new(129900, 2)));
    }

    #[test]
    fn test_parse_grouped_english() {
        assert_eq!(parse_price("$1,299.50"), Some(Decimal::new(129950, 2)));
    }

    #[test]
    fn test_parse_repeated_grouping() {
        assert_eq!(parse_price("1.000.000"), Some(Decimal::from(1_000_000)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("free"), None);
        assert_eq!(parse_price("."), None);
        assert_eq!(parse_price("1,2.3,4"), None);
    }

    #[test]
    fn test_normalize_falls_back_to_zero() {
        assert_eq!(normalize_price("n/a", 1), Decimal::ZERO);
        assert_eq!(normalize_price("9,99", 1), Decimal::new(999, 2));
    }
}
