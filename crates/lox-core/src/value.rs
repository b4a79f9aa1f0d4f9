//! Runtime values as seen by the constant pool.
//!
//! The bytecode layer only stores and prints values; it never inspects them.
//! The object subsystem (strings, closures, …) lives elsewhere.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Significant digits used when printing numbers (C `%g`).
const NUMBER_PRECISION: usize = 6;

/// Immutable, copyable runtime datum.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "lowercase"))]
pub enum Value {
    /// `nil` literal.
    Nil,
    /// Boolean literal.
    Bool(bool),
    /// Double precision number.
    Number(f64),
}

impl Value {
    /// Short type name used by tooling.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<()> for Value { fn from((): ()) -> Self { Value::Nil } }

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write_number(f, *n),
        }
    }
}

/// Render `value` the way the disassembler prints constants.
pub fn print_value(value: &Value) -> String { value.to_string() }

/// `%g` rendering: 6 significant digits, trailing zeros stripped, scientific
/// notation when the exponent is below -4 or at least the precision.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("nan");
    }
    if n.is_infinite() {
        return f.write_str(if n.is_sign_negative() { "-inf" } else { "inf" });
    }
    if n == 0.0 {
        return f.write_str(if n.is_sign_negative() { "-0" } else { "0" });
    }

    // Rounding to the precision first decides the exponent (999999.5 -> 1e+06).
    let scientific = format!("{:.*e}", NUMBER_PRECISION - 1, n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    #[allow(clippy::cast_possible_wrap)]
    let precision = NUMBER_PRECISION as i32;
    if exponent < -4 || exponent >= precision {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{}e{sign}{:02}", trim_fraction(mantissa), exponent.unsigned_abs())
    } else {
        #[allow(clippy::cast_sign_loss)]
        let decimals = (precision - 1 - exponent) as usize;
        let fixed = format!("{n:.decimals$}");
        f.write_str(trim_fraction(&fixed))
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literals_print_like_source() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from(false).to_string(), "false");
    }

    #[test]
    fn numbers_follow_printf_g() {
        let cases = [
            (1.2, "1.2"),
            (100.0, "100"),
            (-3.0, "-3"),
            (0.5, "0.5"),
            (1234567.0, "1.23457e+06"),
            (999_999.5, "1e+06"),
            (123_456.0, "123456"),
            (0.0001, "0.0001"),
            (0.000_012_5, "1.25e-05"),
            (1.0 / 3.0, "0.333333"),
            (1e100, "1e+100"),
        ];
        for (input, expected) in cases {
            assert_eq!(Value::Number(input).to_string(), expected, "formatting {input}");
        }
    }

    #[test]
    fn special_numbers() {
        assert_eq!(print_value(&Value::Number(f64::NAN)), "nan");
        assert_eq!(print_value(&Value::Number(f64::INFINITY)), "inf");
        assert_eq!(print_value(&Value::Number(f64::NEG_INFINITY)), "-inf");
        assert_eq!(print_value(&Value::Number(0.0)), "0");
        assert_eq!(print_value(&Value::Number(-0.0)), "-0");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_tagged_layout() {
        let json = serde_json::to_string(&Value::Number(2.5)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":2.5}"#);
        let nil = serde_json::to_string(&Value::Nil).unwrap();
        assert_eq!(nil, r#"{"type":"nil"}"#);
    }
}
