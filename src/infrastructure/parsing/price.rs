//! Localized price normalization
//!
//! Listing prices come as `"91,99 €"`: currency symbol, whitespace and a
//! decimal comma.

use super::error::{ParsingError, ParsingResult};

const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£'];

/// Parse a localized price string into a non-negative decimal.
///
/// Strips currency symbols and whitespace, turns the decimal comma into a
/// point, and requires the residue to be plain digits with at most one point.
pub fn normalize_price(raw: &str) -> ParsingResult<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let digits = cleaned.chars().filter(char::is_ascii_digit).count();
    let points = cleaned.chars().filter(|&c| c == '.').count();
    let well_formed = digits > 0 && points <= 1 && digits + points == cleaned.chars().count();

    if !well_formed {
        return Err(ParsingError::invalid_price(raw));
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| ParsingError::invalid_price(raw))
}
