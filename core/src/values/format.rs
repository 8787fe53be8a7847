//! `ToString()` formatting with CLR conventions (invariant culture).

use chrono::{NaiveDateTime, TimeDelta};

use crate::values::Value;

/// Text of `value.ToString()`; `null` formats as the empty string.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Char(c) => char_to_string(*c),
        Value::SByte(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Int16(v) => v.to_string(),
        Value::UInt16(v) => v.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::UInt32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::UInt64(v) => v.to_string(),
        Value::Single(v) => format_float(*v as f64, format!("{:e}", v), 7),
        Value::Double(v) => format_float(*v, format!("{:e}", v), 15),
        Value::Decimal(d) => d.to_string(),
        Value::String(s) => s.to_string(),
        Value::DateTime(dt) => format_date_time(dt),
        Value::TimeSpan(ts) => format_time_span(ts),
        Value::Enum(info, raw) => info
            .name_of(*raw)
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        Value::Array(a) => format!("{}[]", a.element.full_name()),
        Value::Object(o) => o.to_display(),
        Value::Delegate(d) => d.function_type().full_name(),
        Value::Type(t) => t.full_name(),
    }
}

pub fn char_to_string(c: u16) -> String {
    char::decode_utf16([c])
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Shortest round-trip digits; scientific notation (`1E+15`, `1E-05`) once
/// the decimal exponent reaches `precision` or drops below -5.
fn format_float(v: f64, scientific: String, precision: i32) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map(|(m, e)| (m.to_string(), e.parse::<i32>().unwrap_or(0)))
        .unwrap_or((scientific.clone(), 0));
    if v != 0.0 && (exponent >= precision || exponent < -5) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}E{}{:02}", mantissa, sign, exponent.abs());
    }
    if precision == 7 {
        // Display of the f32 itself keeps its own shortest digits.
        return scientific_to_fixed(&mantissa, exponent);
    }
    format!("{}", v)
}

/// Expands `d.ddd` × 10^exponent into positional notation.
fn scientific_to_fixed(mantissa: &str, exponent: i32) -> String {
    let (negative, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let digits: String = digits.chars().filter(|c| *c != '.').collect();
    let point = exponent + 1;
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if point <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-point) as usize));
        out.push_str(&digits);
    } else if point as usize >= digits.len() {
        out.push_str(&digits);
        out.push_str(&"0".repeat(point as usize - digits.len()));
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    out
}

fn format_date_time(dt: &NaiveDateTime) -> String {
    dt.format("%m/%d/%Y %H:%M:%S").to_string()
}

/// `[-][d.]hh:mm:ss[.fffffff]`.
pub fn format_time_span(ts: &TimeDelta) -> String {
    let negative = *ts < TimeDelta::zero();
    let abs = ts.abs();
    let ticks = abs.num_microseconds().map(|us| us * 10).unwrap_or(i64::MAX);
    let days = abs.num_days();
    let hours = abs.num_hours() % 24;
    let minutes = abs.num_minutes() % 60;
    let seconds = abs.num_seconds() % 60;
    let fraction = ticks % 10_000_000;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if fraction > 0 {
        out.push_str(&format!(".{:07}", fraction));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::decimal::Decimal;

    #[test]
    fn test_booleans_and_integers() {
        assert_eq!(format_value(&Value::Bool(true)), "True");
        assert_eq!(format_value(&Value::Int32(-5)), "-5");
        assert_eq!(format_value(&Value::UInt64(u64::MAX)), "18446744073709551615");
        assert_eq!(format_value(&Value::char('x')), "x");
    }

    #[test]
    fn test_doubles() {
        assert_eq!(format_value(&Value::Double(1.5)), "1.5");
        assert_eq!(format_value(&Value::Double(2.0)), "2");
        assert_eq!(format_value(&Value::Double(1e15)), "1E+15");
        assert_eq!(format_value(&Value::Double(1e14)), "100000000000000");
        assert_eq!(format_value(&Value::Double(0.0001)), "0.0001");
        assert_eq!(format_value(&Value::Double(0.00001)), "1E-05");
        assert_eq!(
            format_value(&Value::Double(1.2345678901234568e20)),
            "1.2345678901234568E+20"
        );
        assert_eq!(format_value(&Value::Double(f64::NAN)), "NaN");
        assert_eq!(format_value(&Value::Double(0.1 + 0.2)), "0.30000000000000004");
    }

    #[test]
    fn test_singles() {
        assert_eq!(format_value(&Value::Single(0.1)), "0.1");
        assert_eq!(format_value(&Value::Single(1e7)), "1E+07");
        assert_eq!(format_value(&Value::Single(123.25)), "123.25");
    }

    #[test]
    fn test_decimal_keeps_scale() {
        assert_eq!(
            format_value(&Value::Decimal(Decimal::parse("1.50").unwrap())),
            "1.50"
        );
    }

    #[test]
    fn test_time_span() {
        assert_eq!(format_time_span(&TimeDelta::seconds(90)), "00:01:30");
        assert_eq!(
            format_time_span(&(TimeDelta::days(1) + TimeDelta::milliseconds(5))),
            "1.00:00:00.0050000"
        );
        assert_eq!(format_time_span(&TimeDelta::minutes(-2)), "-00:02:00");
    }
}
