//! Locale-ambiguous price string parsing
//!
//! E-commerce sites render amounts as "1,234.56", "1.234,56", "199,99" or
//! "1 299 kr"; the normalizer strips everything but digits and separators
//! and then decides which separator is the decimal one.

/// Parse a raw price string into a currency-less amount.
///
/// When both separators are present, the one occurring later is the decimal
/// separator and the other is stripped as a thousands separator. Commas
/// without a period are thousands separators when the last one is followed
/// by exactly three digits with a digit before it; otherwise the comma is
/// the decimal separator. Returns `None` on anything unparseable, never
/// errors.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_period = cleaned.rfind('.');

    let normalized = match (last_comma, last_period) {
        (Some(comma), Some(period)) => {
            if comma > period {
                // "1.234,56" - comma is decimal, periods are thousands
                cleaned.replace('.', "").replace(',', ".")
            } else {
                // "1,234.56" - period is decimal, commas are thousands
                cleaned.replace(',', "")
            }
        }
        (Some(comma), None) => {
            let after = cleaned.len() - comma - 1;
            if after == 3 && comma > 0 {
                // "1,234" or "1,234,567" - thousands separators
                cleaned.replace(',', "")
            } else {
                // "199,99" - decimal separator
                cleaned.replace(',', ".")
            }
        }
        _ => cleaned,
    };

    normalized.trim_end_matches('.').parse::<f64>().ok()
}
