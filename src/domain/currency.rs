//! Dollar amounts: parsing extract cells and formatting report cells.

use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a dollar amount: {0:?}")]
pub struct CurrencyParseError(pub String);

/// Parses a currency cell. Blank cells are `Ok(None)`.
///
/// Accepts a leading `$`, thousands separators, a leading minus and
/// accounting negatives in parentheses (`(1,234.50)`).
pub fn parse_dollar_amount(raw: &str) -> Result<Option<Decimal>, CurrencyParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let err = || CurrencyParseError(raw.to_string());

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };
    let cleaned: String = body.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    if cleaned.is_empty() {
        return Err(err());
    }

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| err())?;
    Ok(Some(if negative { -value } else { value }))
}

/// Two decimal places, thousands separators, leading `$`.
///
/// Negative amounts carry a leading minus before the dollar sign
/// (`-$1,234.50`). Amounts that round to zero render as `$0.00`.
pub fn format_dollar_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if negative {
        out.push('-');
    }
    out.push('$');
    out.push_str(&group_thousands(whole));
    out.push('.');
    out.push_str(cents);
    out
}

/// Whole dollars with thousands separators (`$1,234`); cents are truncated.
pub fn format_whole_dollars(amount: Decimal) -> String {
    let whole = amount.trunc();
    let digits = whole.abs().to_string();
    if whole.is_sign_negative() && !whole.is_zero() {
        format!("-${}", group_thousands(&digits))
    } else {
        format!("${}", group_thousands(&digits))
    }
}

/// Missing values render as an empty cell.
pub fn format_optional(amount: Option<Decimal>) -> String {
    amount.map(format_dollar_amount).unwrap_or_default()
}

fn group_thousands(whole: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
