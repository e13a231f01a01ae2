//! Canonical `(mantissa, exponent)` form of decimal literals.
//!
//! The pair produced here is baked into the emitted metadata as a field's
//! initial value, so the runtime codec sees exactly this representation on the
//! wire. Trailing zeros are always moved from the mantissa into the exponent:
//! `"100"` and `"100.00"` both become `1 x 10^2`.

use std::fmt;

use serde::Serialize;

use crate::error::{GenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecimalValue {
    pub mantissa: i64,
    pub exponent: i32,
}

impl DecimalValue {
    pub const ZERO: DecimalValue = DecimalValue {
        mantissa: 0,
        exponent: 0,
    };
}

pub fn canonicalize(literal: &str) -> Result<DecimalValue> {
    let invalid = || GenError::InvalidDecimal {
        literal: literal.to_string(),
    };

    let text = literal.trim();
    if !is_decimal_literal(text) {
        return Err(invalid());
    }

    let point = text.find('.');
    // The sign counts as "significant" here; the integer branch below copes with it.
    let last_sig = text.rfind(|c: char| c != '.' && c != '0');

    let fractional = match (point, last_sig) {
        (Some(p), Some(sig)) if sig > p => Some((p, sig)),
        _ => None,
    };

    let Some((p, sig)) = fractional else {
        let int_part = match point {
            Some(p) => &text[..p],
            None => text,
        };
        let Some(nz) = int_part.rfind(|c: char| matches!(c, '1'..='9')) else {
            return Ok(DecimalValue::ZERO);
        };
        let exponent = i32::try_from(int_part.len() - 1 - nz).map_err(|_| invalid())?;
        let mantissa = int_part[..=nz].parse::<i64>().map_err(|_| invalid())?;
        return Ok(DecimalValue { mantissa, exponent });
    };

    let truncated = &text[..=sig];
    let exponent = i32::try_from(p as i64 - truncated.len() as i64 + 1).map_err(|_| invalid())?;
    let digits: String = truncated.chars().filter(|c| *c != '.').collect();
    let mantissa = digits.parse::<i64>().map_err(|_| invalid())?;
    Ok(DecimalValue { mantissa, exponent })
}

/// `[+-]? (digits ('.' digits?)? | '.' digits)`
fn is_decimal_literal(text: &str) -> bool {
    let body = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    let (int_digits, frac_digits) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_digits) {
        return false;
    }
    match frac_digits {
        None => !int_digits.is_empty(),
        Some(f) => all_digits(f) && !(int_digits.is_empty() && f.is_empty()),
    }
}

impl fmt::Display for DecimalValue {
    /// Shortest plain decimal text with the same value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa == 0 {
            return f.write_str("0");
        }
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.exponent >= 0 {
            let zeros = "0".repeat(self.exponent as usize);
            return write!(f, "{sign}{digits}{zeros}");
        }
        let scale = self.exponent.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            let pad = "0".repeat(scale - digits.len());
            write!(f, "{sign}0.{pad}{digits}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(literal: &str) -> (i64, i32) {
        let v = canonicalize(literal).expect("valid decimal");
        (v.mantissa, v.exponent)
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(dec("123.45"), (12345, -2));
        assert_eq!(dec("0.001"), (1, -3));
        assert_eq!(dec("100"), (1, 2));
        assert_eq!(dec("100.00"), (1, 2));
        assert_eq!(dec("42"), (42, 0));
        assert_eq!(dec("-1.50"), (-15, -1));
        assert_eq!(dec("-100"), (-1, 2));
        assert_eq!(dec("+7.25"), (725, -2));
        assert_eq!(dec("5."), (5, 0));
        assert_eq!(dec(".5"), (5, -1));
    }

    #[test]
    fn zero_has_a_single_form() {
        for lit in ["0", "0.0", "000", "-0.00", ".0", "0."] {
            assert_eq!(canonicalize(lit).expect(lit), DecimalValue::ZERO, "{lit}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(dec("  12.5\n"), (125, -1));
    }

    #[test]
    fn malformed_literals_name_the_literal() {
        for lit in ["", "abc", "1.2.3", "1e5", "--1", ".", "-", "12a"] {
            let err = canonicalize(lit).expect_err(lit);
            assert!(
                matches!(&err, GenError::InvalidDecimal { literal } if literal == lit),
                "unexpected error for {lit:?}: {err}"
            );
        }
    }

    #[test]
    fn mantissa_overflow_is_a_format_error() {
        let err = canonicalize("123456789012345678901234567890").expect_err("overflow");
        assert!(err.to_string().contains("is not a valid decimal number"));
    }

    #[test]
    fn reparsing_the_printed_form_is_idempotent() {
        for lit in [
            "123.45", "0.001", "100", "100.00", "-1.50", "7", "-0.0300", "98765.4321", "1000000",
        ] {
            let first = canonicalize(lit).expect(lit);
            let printed = first.to_string();
            let second = canonicalize(&printed).expect(&printed);
            assert_eq!(first, second, "{lit} -> {printed}");
        }
    }
}
