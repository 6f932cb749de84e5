//! Conversion of raw entity values into definite numbers.
//!
//! Sanitization is total: every input maps to a finite `f64`, and anything
//! missing, sentinel or unparseable maps to `0.0`. The [`Provenance`] of a value
//! records which of those cases applied, since the number alone cannot.

use crate::schema::{CanonicalEntity, EntitySnapshot, RawValue, NOT_FOUND};
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use std::collections::BTreeMap;

/// Characters stripped from text before parsing.
const THOUSANDS_SEPARATORS: &[char] = &[','];

pub fn sanitize(raw: &RawValue) -> f64 {
    let value = match raw {
        RawValue::Number(n) => *n,
        RawValue::NotFound | RawValue::Null => return 0.0,
        RawValue::Text(text) => parse_text(text).unwrap_or(0.0),
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sanitizes an optional value; absence counts as zero.
pub fn sanitize_opt(raw: Option<&RawValue>) -> f64 {
    raw.map(sanitize).unwrap_or(0.0)
}

/// Reads `entity` from a snapshot and sanitizes it.
pub fn read_entity(values: &EntitySnapshot, entity: CanonicalEntity) -> f64 {
    sanitize_opt(values.get(&entity))
}

fn parse_text(text: &str) -> Option<f64> {
    if text == NOT_FOUND {
        return None;
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !THOUSANDS_SEPARATORS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    parse_leading_decimal(cleaned)
}

/// Parses the longest decimal literal at the start of `text`.
///
/// Accepts an optional sign, digits with an optional fractional part, and an
/// optional exponent. Trailing characters after the literal are ignored, so
/// `"12.5%"` yields `12.5`. Returns `None` when no digits lead the text.
pub fn parse_leading_decimal(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - frac_start;
        if digits > 0 || frac_digits > 0 {
            end = frac_end;
            digits += frac_digits;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok()
}

/// What a raw value actually contained before sanitization erased the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Provenance {
    #[schemars(description = "A numeric value was supplied and used as-is")]
    Present,

    #[schemars(description = "The entity was not supplied at all (or was null); treated as zero")]
    Absent,

    #[schemars(description = "The extraction collaborator reported NOT_FOUND; treated as zero")]
    NotFound,

    #[schemars(description = "An empty or whitespace-only string was supplied; treated as zero")]
    Empty,

    #[schemars(description = "Text that does not start with a number was supplied; treated as zero")]
    Invalid,
}

pub fn assess(raw: Option<&RawValue>) -> Provenance {
    match raw {
        None | Some(RawValue::Null) => Provenance::Absent,
        Some(RawValue::NotFound) => Provenance::NotFound,
        Some(RawValue::Number(n)) if n.is_finite() => Provenance::Present,
        Some(RawValue::Number(_)) => Provenance::Invalid,
        Some(RawValue::Text(text)) => {
            if text == NOT_FOUND {
                Provenance::NotFound
            } else if text
                .chars()
                .filter(|c| !THOUSANDS_SEPARATORS.contains(c))
                .all(char::is_whitespace)
            {
                Provenance::Empty
            } else if parse_text(text).map(f64::is_finite).unwrap_or(false) {
                Provenance::Present
            } else {
                Provenance::Invalid
            }
        }
    }
}

/// Provenance for every canonical entity in a snapshot.
pub fn assess_snapshot(values: &EntitySnapshot) -> BTreeMap<CanonicalEntity, Provenance> {
    CanonicalEntity::ALL
        .iter()
        .map(|entity| (*entity, assess(values.get(entity))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_sentinels_and_blanks_are_zero() {
        assert_eq!(sanitize(&RawValue::NotFound), 0.0);
        assert_eq!(sanitize(&RawValue::Null), 0.0);
        assert_eq!(sanitize(&text("")), 0.0);
        assert_eq!(sanitize(&text("   ")), 0.0);
        assert_eq!(sanitize(&text(NOT_FOUND)), 0.0);
        assert_eq!(sanitize_opt(None), 0.0);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(sanitize(&RawValue::Number(1234.5)), 1234.5);
        assert_eq!(sanitize(&RawValue::Number(-7.0)), -7.0);
    }

    #[test]
    fn test_non_finite_numbers_become_zero() {
        assert_eq!(sanitize(&RawValue::Number(f64::NAN)), 0.0);
        assert_eq!(sanitize(&RawValue::Number(f64::INFINITY)), 0.0);
        assert_eq!(sanitize(&text("1e999")), 0.0);
    }

    #[test]
    fn test_thousands_separators_are_stripped() {
        assert_eq!(sanitize(&text("1,234,567.89")), 1_234_567.89);
        assert_eq!(sanitize(&text("  -12,000 ")), -12_000.0);
    }

    #[test]
    fn test_leading_literal_is_parsed() {
        assert_eq!(sanitize(&text("12.5%")), 12.5);
        assert_eq!(sanitize(&text("300 crore")), 300.0);
        assert_eq!(sanitize(&text(".5")), 0.5);
        assert_eq!(sanitize(&text("5.")), 5.0);
        assert_eq!(sanitize(&text("1.5e3")), 1500.0);
        assert_eq!(sanitize(&text("2e")), 2.0);
    }

    #[test]
    fn test_unparseable_text_is_zero() {
        assert_eq!(sanitize(&text("abc")), 0.0);
        assert_eq!(sanitize(&text("(1,200)")), 0.0);
        assert_eq!(sanitize(&text("-")), 0.0);
        assert_eq!(sanitize(&text(".")), 0.0);
        assert_eq!(sanitize(&text("$100")), 0.0);
    }

    #[test]
    fn test_provenance() {
        assert_eq!(assess(None), Provenance::Absent);
        assert_eq!(assess(Some(&RawValue::Null)), Provenance::Absent);
        assert_eq!(assess(Some(&RawValue::NotFound)), Provenance::NotFound);
        assert_eq!(assess(Some(&text(""))), Provenance::Empty);
        assert_eq!(assess(Some(&text("n/a"))), Provenance::Invalid);
        assert_eq!(assess(Some(&text("0"))), Provenance::Present);
        assert_eq!(assess(Some(&RawValue::Number(0.0))), Provenance::Present);
    }

    #[test]
    fn test_assess_snapshot_covers_every_entity() {
        let mut values = EntitySnapshot::new();
        values.insert(CanonicalEntity::Revenue, text("1,000"));
        let report = assess_snapshot(&values);
        assert_eq!(report.len(), CanonicalEntity::ALL.len());
        assert_eq!(report[&CanonicalEntity::Revenue], Provenance::Present);
        assert_eq!(report[&CanonicalEntity::Cogs], Provenance::Absent);
    }
}
