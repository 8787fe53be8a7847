//! Numeric literal text → typed constant.
//!
//! The tokenizer keeps the literal's text (including suffix) untouched; the
//! binder calls [`parse_number`] to decide its type the way C# does: an
//! unsuffixed integer is the first of `int`, `uint`, `long`, `ulong` that can
//! hold it, `u`/`l`/`ul` narrow that list, and a literal with a decimal point
//! or exponent is `double` unless suffixed `f` or `m`.

use thiserror::Error;

use crate::values::Decimal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLiteral {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberLiteralError {
    #[error("integral constant is too large")]
    IntegerTooLarge,
    #[error("floating-point constant is outside the range of type '{0}'")]
    RealOutOfRange(&'static str),
    #[error("invalid numeric suffix '{0}'")]
    InvalidSuffix(String),
    #[error("malformed numeric literal '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffix {
    None,
    U,
    L,
    UL,
    F,
    D,
    M,
}

/// Splits the trailing suffix letters off a literal, case-insensitively.
fn split_suffix(text: &str, hex: bool) -> Result<(&str, Suffix), NumberLiteralError> {
    let is_suffix_char = |c: char| {
        let c = c.to_ascii_lowercase();
        if hex {
            c == 'u' || c == 'l'
        } else {
            matches!(c, 'u' | 'l' | 'f' | 'd' | 'm')
        }
    };
    let body_len = text.trim_end_matches(is_suffix_char).len();
    let (body, suffix) = text.split_at(body_len);
    let suffix = match suffix.to_ascii_lowercase().as_str() {
        "" => Suffix::None,
        "u" => Suffix::U,
        "l" => Suffix::L,
        "ul" | "lu" => Suffix::UL,
        "f" => Suffix::F,
        "d" => Suffix::D,
        "m" => Suffix::M,
        _ => return Err(NumberLiteralError::InvalidSuffix(suffix.to_string())),
    };
    Ok((body, suffix))
}

/// Checks that a literal's suffix is one C# accepts for its shape. Used by
/// the tokenizer so that a malformed suffix is a lexical error.
pub fn validate_suffix(text: &str) -> Result<(), NumberLiteralError> {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    let (body, suffix) = split_suffix(text, hex)?;
    let body_ok = if hex {
        body.len() > 2 && body[2..].chars().all(|c| c.is_ascii_hexdigit() || c == '_')
    } else {
        body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_'))
    };
    if !body_ok {
        return Err(NumberLiteralError::Malformed(text.to_string()));
    }
    let real = !hex && body.contains(['.', 'e', 'E']);
    if real && matches!(suffix, Suffix::U | Suffix::L | Suffix::UL) {
        return Err(NumberLiteralError::InvalidSuffix(text[body.len()..].to_string()));
    }
    Ok(())
}

/// Parses literal text. With `negated`, the value is the literal preceded by
/// unary minus, which is how `-2147483648` and `-9223372036854775808` become
/// `int.MinValue` and `long.MinValue` rather than overflowing.
pub fn parse_number(text: &str, negated: bool) -> Result<NumberLiteral, NumberLiteralError> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let hex = cleaned.starts_with("0x") || cleaned.starts_with("0X");
    let (body, suffix) = split_suffix(&cleaned, hex)?;
    let malformed = || NumberLiteralError::Malformed(text.to_string());

    if hex {
        let digits = &body[2..];
        if digits.is_empty() {
            return Err(malformed());
        }
        let value = u64::from_str_radix(digits, 16).map_err(|_| NumberLiteralError::IntegerTooLarge)?;
        let lit = integral(value as u128, suffix).ok_or(NumberLiteralError::IntegerTooLarge)?;
        return Ok(if negated { negate(lit)? } else { lit });
    }

    let real = body.contains(['.', 'e', 'E']);
    match suffix {
        Suffix::F => {
            let v: f32 = body.parse().map_err(|_| malformed())?;
            if v.is_infinite() {
                return Err(NumberLiteralError::RealOutOfRange("float"));
            }
            Ok(NumberLiteral::Single(if negated { -v } else { v }))
        }
        Suffix::D => parse_double(body, negated, text),
        Suffix::M => {
            let d = Decimal::parse(body).ok_or(NumberLiteralError::RealOutOfRange("decimal"))?;
            Ok(NumberLiteral::Decimal(if negated { d.neg() } else { d }))
        }
        _ if real => {
            if suffix != Suffix::None {
                return Err(NumberLiteralError::InvalidSuffix(
                    cleaned[body.len()..].to_string(),
                ));
            }
            parse_double(body, negated, text)
        }
        _ => {
            if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            let value: u128 = body.parse().map_err(|_| NumberLiteralError::IntegerTooLarge)?;
            if value > u64::MAX as u128 {
                return Err(NumberLiteralError::IntegerTooLarge);
            }
            if negated {
                // The two literals that only exist as the negated minimum.
                if suffix == Suffix::None && value == 1u128 << 31 {
                    return Ok(NumberLiteral::Int32(i32::MIN));
                }
                if matches!(suffix, Suffix::None | Suffix::L) && value == 1u128 << 63 {
                    return Ok(NumberLiteral::Int64(i64::MIN));
                }
            }
            let lit = integral(value, suffix).ok_or(NumberLiteralError::IntegerTooLarge)?;
            if negated { negate(lit) } else { Ok(lit) }
        }
    }
}

fn parse_double(body: &str, negated: bool, text: &str) -> Result<NumberLiteral, NumberLiteralError> {
    let v: f64 = body
        .parse()
        .map_err(|_| NumberLiteralError::Malformed(text.to_string()))?;
    if v.is_infinite() {
        return Err(NumberLiteralError::RealOutOfRange("double"));
    }
    Ok(NumberLiteral::Double(if negated { -v } else { v }))
}

fn integral(value: u128, suffix: Suffix) -> Option<NumberLiteral> {
    let candidates: &[fn(u128) -> Option<NumberLiteral>] = match suffix {
        Suffix::None => &[as_int, as_uint, as_long, as_ulong],
        Suffix::U => &[as_uint, as_ulong],
        Suffix::L => &[as_long, as_ulong],
        Suffix::UL => &[as_ulong],
        Suffix::F | Suffix::D | Suffix::M => return None,
    };
    candidates.iter().find_map(|f| f(value))
}

fn as_int(v: u128) -> Option<NumberLiteral> {
    i32::try_from(v).ok().map(NumberLiteral::Int32)
}
fn as_uint(v: u128) -> Option<NumberLiteral> {
    u32::try_from(v).ok().map(NumberLiteral::UInt32)
}
fn as_long(v: u128) -> Option<NumberLiteral> {
    i64::try_from(v).ok().map(NumberLiteral::Int64)
}
fn as_ulong(v: u128) -> Option<NumberLiteral> {
    u64::try_from(v).ok().map(NumberLiteral::UInt64)
}

/// Unary minus applied to a literal, following the operator's own typing:
/// `-uint` widens to `long`, `-ulong` has no operator.
fn negate(lit: NumberLiteral) -> Result<NumberLiteral, NumberLiteralError> {
    Ok(match lit {
        NumberLiteral::Int32(v) => NumberLiteral::Int32(-v),
        NumberLiteral::UInt32(v) => NumberLiteral::Int64(-(v as i64)),
        NumberLiteral::Int64(v) => NumberLiteral::Int64(-v),
        NumberLiteral::UInt64(_) => return Err(NumberLiteralError::IntegerTooLarge),
        NumberLiteral::Single(v) => NumberLiteral::Single(-v),
        NumberLiteral::Double(v) => NumberLiteral::Double(-v),
        NumberLiteral::Decimal(d) => NumberLiteral::Decimal(d.neg()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> NumberLiteral {
        parse_number(text, false).unwrap()
    }

    #[test]
    fn test_integer_typing() {
        assert_eq!(parse("1"), NumberLiteral::Int32(1));
        assert_eq!(parse("2147483648"), NumberLiteral::UInt32(2147483648));
        assert_eq!(parse("4294967296"), NumberLiteral::Int64(4294967296));
        assert_eq!(parse("9223372036854775808"), NumberLiteral::UInt64(9223372036854775808));
        assert_eq!(parse("1u"), NumberLiteral::UInt32(1));
        assert_eq!(parse("1L"), NumberLiteral::Int64(1));
        assert_eq!(parse("1UL"), NumberLiteral::UInt64(1));
        assert_eq!(parse("1lu"), NumberLiteral::UInt64(1));
        assert_eq!(parse("1_000"), NumberLiteral::Int32(1000));
    }

    #[test]
    fn test_hex() {
        assert_eq!(parse("0xFF"), NumberLiteral::Int32(255));
        assert_eq!(parse("0xFFFFFFFF"), NumberLiteral::UInt32(u32::MAX));
        assert_eq!(parse("0x10L"), NumberLiteral::Int64(16));
    }

    #[test]
    fn test_real_typing() {
        assert_eq!(parse("1.5"), NumberLiteral::Double(1.5));
        assert_eq!(parse("1e3"), NumberLiteral::Double(1000.0));
        assert_eq!(parse("1.5f"), NumberLiteral::Single(1.5));
        assert_eq!(parse("2d"), NumberLiteral::Double(2.0));
        assert_eq!(parse("2.50m"), NumberLiteral::Decimal(Decimal::parse("2.50").unwrap()));
    }

    #[test]
    fn test_negated_minimums() {
        assert_eq!(parse_number("2147483648", true), Ok(NumberLiteral::Int32(i32::MIN)));
        assert_eq!(
            parse_number("9223372036854775808", true),
            Ok(NumberLiteral::Int64(i64::MIN))
        );
        assert_eq!(parse_number("5u", true), Ok(NumberLiteral::Int64(-5)));
        assert_eq!(parse_number("3000000000", true), Ok(NumberLiteral::Int64(-3000000000)));
    }

    #[test]
    fn test_extreme_literals_are_errors() {
        assert_eq!(
            parse_number("18446744073709551616", false),
            Err(NumberLiteralError::IntegerTooLarge)
        );
        assert_eq!(
            parse_number("1e400", false),
            Err(NumberLiteralError::RealOutOfRange("double"))
        );
        assert_eq!(
            parse_number("1e39f", false),
            Err(NumberLiteralError::RealOutOfRange("float"))
        );
        assert_eq!(
            parse_number("1e29m", false),
            Err(NumberLiteralError::RealOutOfRange("decimal"))
        );
    }

    #[test]
    fn test_suffix_validation() {
        assert!(validate_suffix("1ul").is_ok());
        assert!(validate_suffix("1.5m").is_ok());
        assert!(validate_suffix("0xABC").is_ok());
        assert!(validate_suffix("1.5u").is_err());
        assert!(validate_suffix("1uu").is_err());
        assert!(validate_suffix("1lf").is_err());
        assert!(validate_suffix("1abc").is_err());
    }
}
