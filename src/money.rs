//! Fixed-point money helpers. Amounts are stored as `i64` minor units
//! (cents); parsing and formatting never pass through floating point.

use crate::errors::LedgerError;

const MINOR_UNITS: u32 = 2;

/// Parses a decimal string such as `"123.45"` or `"-7"` into cents.
///
/// Accepts at most two fractional digits; a single fractional digit is
/// treated as tens of cents (`"1.5"` -> 150).
pub fn parse_amount(input: &str) -> Result<i64, LedgerError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(LedgerError::Validation("amount is empty".into()));
    }
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(LedgerError::Validation(format!("invalid amount `{raw}`")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(LedgerError::Validation(format!("invalid amount `{raw}`")));
    }
    if frac_part.len() > MINOR_UNITS as usize {
        return Err(LedgerError::Validation(format!(
            "amount `{raw}` has more than {MINOR_UNITS} decimal places"
        )));
    }
    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| LedgerError::Validation(format!("amount `{raw}` out of range")))?
    };
    let mut cents: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().unwrap_or(0)
    };
    for _ in frac_part.len()..MINOR_UNITS as usize {
        cents *= 10;
    }
    let magnitude = whole
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(|| LedgerError::Validation(format!("amount `{raw}` out of range")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Renders cents as a plain decimal string (`12345` -> `"123.45"`).
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

/// Renders cents with thousands grouping for display (`1234567` -> `"12,345.67"`).
pub fn format_cents_grouped(cents: i64, separator: char) -> String {
    let plain = format_cents(cents);
    let (body, negative) = match plain.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (plain.as_str(), false),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let grouped = group_digits(int_part, separator);
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    out.push('.');
    out.push_str(frac_part);
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    let mut count = 0;
    for ch in digits.chars().rev() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
        count += 1;
    }
    grouped
}
