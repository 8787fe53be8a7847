//! `System.DateTime`, `System.TimeSpan` and `System.DayOfWeek`.
//!
//! Both are backed by chrono: `DateTime` by `NaiveDateTime` (no time zone),
//! `TimeSpan` by `TimeDelta`. Ticks are 100-nanosecond units.

use alloc::sync::Arc;
use core::cmp::Ordering;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::evaluator::Fault;
use crate::stdlib::{arg, f64_arg, i32_arg, str_arg};
use crate::types::{EnumInfo, Method, MemberTable, NativeFn, Parameter, PrimitiveType, Property, Type, getter, native};
use crate::values::{Value, format_time_span, min_date_time};

const TICKS_PER_MILLISECOND: i64 = 10_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
const TICKS_PER_HOUR: i64 = TICKS_PER_MINUTE * 60;
const TICKS_PER_DAY: i64 = TICKS_PER_HOUR * 24;

lazy_static::lazy_static! {
    pub static ref DAY_OF_WEEK: Arc<EnumInfo> = EnumInfo::new(
        "System",
        "DayOfWeek",
        PrimitiveType::Int32,
        &[
            ("Sunday", 0),
            ("Monday", 1),
            ("Tuesday", 2),
            ("Wednesday", 3),
            ("Thursday", 4),
            ("Friday", 5),
            ("Saturday", 6),
        ],
    );
    pub static ref DATE_TIME_MEMBERS: Arc<MemberTable> = Arc::new(date_time_members());
    pub static ref TIME_SPAN_MEMBERS: Arc<MemberTable> = Arc::new(time_span_members());
}

fn max_date_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_900))
        .unwrap_or(NaiveDateTime::MAX)
}

fn unrepresentable() -> Fault {
    Fault::Argument("the result is an unrepresentable DateTime".to_string())
}

fn in_range(dt: NaiveDateTime) -> Result<Value, Fault> {
    if dt < min_date_time() || dt > max_date_time() {
        return Err(unrepresentable());
    }
    Ok(Value::DateTime(dt))
}

pub(crate) fn ticks(span: &TimeDelta) -> i64 {
    span.num_seconds() * TICKS_PER_SECOND + (span.subsec_nanos() / 100) as i64
}

pub(crate) fn from_ticks(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * 100)
}

/// A span of `value` units of `unit_ticks`, rounded to the millisecond.
fn span_of(value: f64, unit_ticks: i64) -> Result<TimeDelta, Fault> {
    if value.is_nan() {
        return Err(Fault::Argument("TimeSpan does not accept floating point Not-a-Number values".to_string()));
    }
    let millis = (value * (unit_ticks / TICKS_PER_MILLISECOND) as f64).round();
    if millis.abs() >= (i64::MAX / TICKS_PER_MILLISECOND) as f64 {
        return Err(Fault::Overflow);
    }
    Ok(TimeDelta::milliseconds(millis as i64))
}

fn this_dt(this: &Value) -> Result<NaiveDateTime, Fault> {
    match this {
        Value::DateTime(dt) => Ok(*dt),
        Value::Null => Err(Fault::NullReference),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.DateTime")),
    }
}

fn this_ts(this: &Value) -> Result<TimeDelta, Fault> {
    match this {
        Value::TimeSpan(ts) => Ok(*ts),
        Value::Null => Err(Fault::NullReference),
        other => Err(Fault::invalid_cast(other.runtime_type(), "System.TimeSpan")),
    }
}

fn dt_arg(args: &[Value], i: usize) -> Result<NaiveDateTime, Fault> {
    this_dt(arg(args, i)?)
}

fn ts_arg(args: &[Value], i: usize) -> Result<TimeDelta, Fault> {
    this_ts(arg(args, i)?)
}

fn i64_arg(args: &[Value], i: usize) -> Result<i64, Fault> {
    let v = arg(args, i)?;
    v.as_i64()
        .ok_or_else(|| Fault::invalid_cast(v.runtime_type(), "System.Int64"))
}

fn date(year: i32, month: i32, day: i32) -> Result<NaiveDate, Fault> {
    let bad = || Fault::Argument("year, month, and day parameters describe an unrepresentable DateTime".to_string());
    if !(1..=9999).contains(&year) {
        return Err(bad());
    }
    let month = u32::try_from(month).map_err(|_| bad())?;
    let day = u32::try_from(day).map_err(|_| bad())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
}

fn time(hour: i32, minute: i32, second: i32, milli: i32) -> Result<NaiveTime, Fault> {
    let bad = || Fault::Argument("hour, minute, and second parameters describe an unrepresentable DateTime".to_string());
    let part = |v: i32| u32::try_from(v).map_err(|_| bad());
    if !(0..1000).contains(&milli) {
        return Err(bad());
    }
    NaiveTime::from_hms_milli_opt(part(hour)?, part(minute)?, part(second)?, part(milli)?).ok_or_else(bad)
}

/// `DateTime.Parse` for the invariant round-trip and US short formats.
fn parse_date_time(text: &str) -> Result<NaiveDateTime, Fault> {
    let s = text.trim();
    const DATE_TIME_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Ok(d.and_time(NaiveTime::MIN));
        }
    }
    Err(Fault::Argument(format!("string '{}' was not recognized as a valid DateTime", text)))
}

/// Custom format strings: `yyyy`, `yy`, `MM`, `M`, `dd`, `d`, `HH`, `H`,
/// `hh`, `h`, `mm`, `m`, `ss`, `s`, `fff`, `tt`, and quoted literals.
fn format_date_time(dt: &NaiveDateTime, format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|x| **x == c).count();
        match c {
            'y' => {
                if run >= 4 {
                    out.push_str(&format!("{:04}", dt.year()));
                } else {
                    out.push_str(&format!("{:02}", dt.year() % 100));
                }
            }
            'M' => out.push_str(&pad(dt.month(), run)),
            'd' => out.push_str(&pad(dt.day(), run)),
            'H' => out.push_str(&pad(dt.hour(), run)),
            'h' => out.push_str(&pad((dt.hour() + 11) % 12 + 1, run)),
            'm' => out.push_str(&pad(dt.minute(), run)),
            's' => out.push_str(&pad(dt.second(), run)),
            'f' => {
                let digits = format!("{:09}", dt.nanosecond() % 1_000_000_000);
                out.push_str(&digits[..run.min(7)]);
            }
            't' => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
            '\'' | '"' => {
                let end = chars[i + 1..].iter().position(|x| *x == c).map(|p| i + 1 + p);
                let stop = end.unwrap_or(chars.len());
                out.extend(&chars[i + 1..stop]);
                i = stop + 1;
                continue;
            }
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            other => {
                for _ in 0..run {
                    out.push(other);
                }
            }
        }
        i += run;
    }
    out
}

fn pad(v: u32, run: usize) -> String {
    if run >= 2 { format!("{:02}", v) } else { v.to_string() }
}

fn property(name: &str, ty: Type, f: fn(NaiveDateTime) -> Value) -> Property {
    Property::new(name, ty, getter(move |this| Ok(f(this_dt(this)?))))
}

fn add_method(name: &str, unit_ticks: i64) -> Method {
    Method::instance(
        name,
        vec![Parameter::new("value", Type::DOUBLE)],
        Type::DateTime,
        native(move |this, args| {
            let span = span_of(f64_arg(args, 0)?, unit_ticks)?;
            in_range(this_dt(this)?.checked_add_signed(span).ok_or_else(unrepresentable)?)
        }),
    )
}

fn add_months(dt: NaiveDateTime, months: i32) -> Result<Value, Fault> {
    let shifted = if months >= 0 {
        dt.checked_add_months(Months::new(months as u32))
    } else {
        dt.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    in_range(shifted.ok_or_else(unrepresentable)?)
}

fn comparisons(table: MemberTable, ty: Type) -> MemberTable {
    let ops: [(&str, fn(Ordering) -> bool); 6] = [
        ("op_Equality", Ordering::is_eq),
        ("op_Inequality", Ordering::is_ne),
        ("op_LessThan", Ordering::is_lt),
        ("op_LessThanOrEqual", Ordering::is_le),
        ("op_GreaterThan", Ordering::is_gt),
        ("op_GreaterThanOrEqual", Ordering::is_ge),
    ];
    let mut table = table;
    for (name, test) in ops {
        table = table.operator(Method::new(
            name,
            vec![Parameter::new("t1", ty.clone()), Parameter::new("t2", ty.clone())],
            Type::BOOL,
            native(move |_, args| {
                let ord = match (arg(args, 0)?, arg(args, 1)?) {
                    (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
                    (Value::TimeSpan(a), Value::TimeSpan(b)) => a.cmp(b),
                    (a, _) => return Err(Fault::invalid_cast(a.runtime_type(), "System.DateTime")),
                };
                Ok(Value::Bool(test(ord)))
            }),
        ));
    }
    table.method(Method::instance(
        "CompareTo",
        vec![Parameter::new("value", ty)],
        Type::INT32,
        native(|this, args| {
            let ord = match (this, arg(args, 0)?) {
                (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
                (Value::TimeSpan(a), Value::TimeSpan(b)) => a.cmp(b),
                (_, Value::Null) => Ordering::Greater,
                (a, _) => return Err(Fault::invalid_cast(a.runtime_type(), "System.DateTime")),
            };
            Ok(Value::Int32(ord as i32))
        }),
    ))
}

fn date_time_members() -> MemberTable {
    fn int(v: u32) -> Value {
        Value::Int32(v as i32)
    }
    let ctor = |parameters: &[&str], body: NativeFn| {
        let parameters = parameters.iter().map(|n| Parameter::new(n, Type::INT32)).collect();
        Method::new(".ctor", parameters, Type::DateTime, body)
    };
    fn statics(name: &str, f: fn() -> Value) -> Property {
        Property::new(name, Type::DateTime, getter(move |_| Ok(f()))).static_member()
    }

    let table = MemberTable::new()
        .constructor(ctor(
            &["year", "month", "day"],
            native(|_, args| {
                let d = date(i32_arg(args, 0)?, i32_arg(args, 1)?, i32_arg(args, 2)?)?;
                Ok(Value::DateTime(d.and_time(NaiveTime::MIN)))
            }),
        ))
        .constructor(ctor(
            &["year", "month", "day", "hour", "minute", "second"],
            native(|_, args| {
                let d = date(i32_arg(args, 0)?, i32_arg(args, 1)?, i32_arg(args, 2)?)?;
                let t = time(i32_arg(args, 3)?, i32_arg(args, 4)?, i32_arg(args, 5)?, 0)?;
                Ok(Value::DateTime(d.and_time(t)))
            }),
        ))
        .constructor(ctor(
            &["year", "month", "day", "hour", "minute", "second", "millisecond"],
            native(|_, args| {
                let d = date(i32_arg(args, 0)?, i32_arg(args, 1)?, i32_arg(args, 2)?)?;
                let t = time(i32_arg(args, 3)?, i32_arg(args, 4)?, i32_arg(args, 5)?, i32_arg(args, 6)?)?;
                Ok(Value::DateTime(d.and_time(t)))
            }),
        ))
        .constructor(Method::new(
            ".ctor",
            vec![Parameter::new("ticks", Type::INT64)],
            Type::DateTime,
            native(|_, args| {
                let span = from_ticks(i64_arg(args, 0)?);
                in_range(min_date_time().checked_add_signed(span).ok_or_else(unrepresentable)?)
            }),
        ))
        .field(statics("MinValue", || Value::DateTime(min_date_time())))
        .field(statics("MaxValue", || Value::DateTime(max_date_time())))
        .property(statics("Now", || Value::DateTime(chrono::Local::now().naive_local())))
        .property(statics("UtcNow", || Value::DateTime(chrono::Utc::now().naive_utc())))
        .property(statics("Today", || {
            Value::DateTime(chrono::Local::now().date_naive().and_time(NaiveTime::MIN))
        }))
        .property(property("Year", Type::INT32, |dt| Value::Int32(dt.year())))
        .property(property("Month", Type::INT32, |dt| int(dt.month())))
        .property(property("Day", Type::INT32, |dt| int(dt.day())))
        .property(property("Hour", Type::INT32, |dt| int(dt.hour())))
        .property(property("Minute", Type::INT32, |dt| int(dt.minute())))
        .property(property("Second", Type::INT32, |dt| int(dt.second())))
        .property(property("Millisecond", Type::INT32, |dt| {
            Value::Int32((dt.nanosecond() / 1_000_000) as i32)
        }))
        .property(property("DayOfYear", Type::INT32, |dt| int(dt.ordinal())))
        .property(property("DayOfWeek", Type::Enum(DAY_OF_WEEK.clone()), |dt| {
            Value::Enum(DAY_OF_WEEK.clone(), dt.weekday().num_days_from_sunday() as i64)
        }))
        .property(property("Date", Type::DateTime, |dt| {
            Value::DateTime(dt.date().and_time(NaiveTime::MIN))
        }))
        .property(property("TimeOfDay", Type::TimeSpan, |dt| {
            Value::TimeSpan(dt.time().signed_duration_since(NaiveTime::MIN))
        }))
        .property(property("Ticks", Type::INT64, |dt| {
            Value::Int64(ticks(&dt.signed_duration_since(min_date_time())))
        }))
        .method(add_method("AddDays", TICKS_PER_DAY))
        .method(add_method("AddHours", TICKS_PER_HOUR))
        .method(add_method("AddMinutes", TICKS_PER_MINUTE))
        .method(add_method("AddSeconds", TICKS_PER_SECOND))
        .method(add_method("AddMilliseconds", TICKS_PER_MILLISECOND))
        .method(Method::instance(
            "AddTicks",
            vec![Parameter::new("value", Type::INT64)],
            Type::DateTime,
            native(|this, args| {
                let span = from_ticks(i64_arg(args, 0)?);
                in_range(this_dt(this)?.checked_add_signed(span).ok_or_else(unrepresentable)?)
            }),
        ))
        .method(Method::instance(
            "AddMonths",
            vec![Parameter::new("months", Type::INT32)],
            Type::DateTime,
            native(|this, args| add_months(this_dt(this)?, i32_arg(args, 0)?)),
        ))
        .method(Method::instance(
            "AddYears",
            vec![Parameter::new("value", Type::INT32)],
            Type::DateTime,
            native(|this, args| {
                let years = i32_arg(args, 0)?;
                let months = years.checked_mul(12).ok_or_else(unrepresentable)?;
                add_months(this_dt(this)?, months)
            }),
        ))
        .method(Method::instance(
            "Add",
            vec![Parameter::new("value", Type::TimeSpan)],
            Type::DateTime,
            native(|this, args| {
                in_range(this_dt(this)?.checked_add_signed(ts_arg(args, 0)?).ok_or_else(unrepresentable)?)
            }),
        ))
        .method(Method::instance(
            "Subtract",
            vec![Parameter::new("value", Type::DateTime)],
            Type::TimeSpan,
            native(|this, args| Ok(Value::TimeSpan(this_dt(this)? - dt_arg(args, 0)?))),
        ))
        .method(Method::instance(
            "Subtract",
            vec![Parameter::new("value", Type::TimeSpan)],
            Type::DateTime,
            native(|this, args| {
                in_range(this_dt(this)?.checked_sub_signed(ts_arg(args, 0)?).ok_or_else(unrepresentable)?)
            }),
        ))
        .method(Method::instance(
            "ToString",
            vec![Parameter::new("format", Type::String)],
            Type::String,
            native(|this, args| Ok(Value::string(format_date_time(&this_dt(this)?, str_arg(args, 0)?)))),
        ))
        .method(Method::new(
            "Parse",
            vec![Parameter::new("s", Type::String)],
            Type::DateTime,
            native(|_, args| Ok(Value::DateTime(parse_date_time(str_arg(args, 0)?)?))),
        ))
        .method(Method::new(
            "IsLeapYear",
            vec![Parameter::new("year", Type::INT32)],
            Type::BOOL,
            native(|_, args| {
                let year = i32_arg(args, 0)?;
                date(year, 1, 1)?;
                Ok(Value::Bool((year % 4 == 0 && year % 100 != 0) || year % 400 == 0))
            }),
        ))
        .method(Method::new(
            "DaysInMonth",
            vec![Parameter::new("year", Type::INT32), Parameter::new("month", Type::INT32)],
            Type::INT32,
            native(|_, args| {
                let first = date(i32_arg(args, 0)?, i32_arg(args, 1)?, 1)?;
                let next = first.checked_add_months(Months::new(1)).ok_or_else(unrepresentable)?;
                Ok(Value::Int32((next - first).num_days() as i32))
            }),
        ))
        .operator(Method::new(
            "op_Addition",
            vec![Parameter::new("d", Type::DateTime), Parameter::new("t", Type::TimeSpan)],
            Type::DateTime,
            native(|_, args| {
                in_range(dt_arg(args, 0)?.checked_add_signed(ts_arg(args, 1)?).ok_or_else(unrepresentable)?)
            }),
        ))
        .operator(Method::new(
            "op_Subtraction",
            vec![Parameter::new("d1", Type::DateTime), Parameter::new("d2", Type::DateTime)],
            Type::TimeSpan,
            native(|_, args| Ok(Value::TimeSpan(dt_arg(args, 0)? - dt_arg(args, 1)?))),
        ))
        .operator(Method::new(
            "op_Subtraction",
            vec![Parameter::new("d", Type::DateTime), Parameter::new("t", Type::TimeSpan)],
            Type::DateTime,
            native(|_, args| {
                in_range(dt_arg(args, 0)?.checked_sub_signed(ts_arg(args, 1)?).ok_or_else(unrepresentable)?)
            }),
        ));
    comparisons(table, Type::DateTime)
}

fn time_span_members() -> MemberTable {
    let ts = |v: TimeDelta| Value::TimeSpan(v);
    let int_params = |names: &[&str]| -> Vec<Parameter> {
        names.iter().map(|n| Parameter::new(n, Type::INT32)).collect()
    };
    let from = |name: &str, unit_ticks: i64| {
        Method::new(
            name,
            vec![Parameter::new("value", Type::DOUBLE)],
            Type::TimeSpan,
            native(move |_, args| Ok(Value::TimeSpan(span_of(f64_arg(args, 0)?, unit_ticks)?))),
        )
    };
    let from_parts = |d: i64, h: i64, m: i64, s: i64, ms: i64| -> Result<Value, Fault> {
        let total = d
            .checked_mul(TICKS_PER_DAY)
            .and_then(|t| t.checked_add(h.checked_mul(TICKS_PER_HOUR)?))
            .and_then(|t| t.checked_add(m.checked_mul(TICKS_PER_MINUTE)?))
            .and_then(|t| t.checked_add(s.checked_mul(TICKS_PER_SECOND)?))
            .and_then(|t| t.checked_add(ms.checked_mul(TICKS_PER_MILLISECOND)?))
            .ok_or(Fault::Overflow)?;
        Ok(Value::TimeSpan(from_ticks(total)))
    };
    let constant = |name: &str, v: TimeDelta| {
        Property::new(name, Type::TimeSpan, getter(move |_| Ok(Value::TimeSpan(v)))).static_member()
    };

    let table = MemberTable::new()
        .constructor(Method::new(
            ".ctor",
            vec![Parameter::new("ticks", Type::INT64)],
            Type::TimeSpan,
            native(move |_, args| Ok(ts(from_ticks(i64_arg(args, 0)?)))),
        ))
        .constructor(Method::new(
            ".ctor",
            int_params(&["hours", "minutes", "seconds"]),
            Type::TimeSpan,
            native(move |_, args| {
                let p = |i| i32_arg(args, i).map(i64::from);
                from_parts(0, p(0)?, p(1)?, p(2)?, 0)
            }),
        ))
        .constructor(Method::new(
            ".ctor",
            int_params(&["days", "hours", "minutes", "seconds"]),
            Type::TimeSpan,
            native(move |_, args| {
                let p = |i| i32_arg(args, i).map(i64::from);
                from_parts(p(0)?, p(1)?, p(2)?, p(3)?, 0)
            }),
        ))
        .constructor(Method::new(
            ".ctor",
            int_params(&["days", "hours", "minutes", "seconds", "milliseconds"]),
            Type::TimeSpan,
            native(move |_, args| {
                let p = |i| i32_arg(args, i).map(i64::from);
                from_parts(p(0)?, p(1)?, p(2)?, p(3)?, p(4)?)
            }),
        ))
        .field(constant("Zero", TimeDelta::zero()))
        .field(constant("MaxValue", from_ticks(i64::MAX)))
        .field(constant("MinValue", from_ticks(i64::MIN)))
        .method(from("FromDays", TICKS_PER_DAY))
        .method(from("FromHours", TICKS_PER_HOUR))
        .method(from("FromMinutes", TICKS_PER_MINUTE))
        .method(from("FromSeconds", TICKS_PER_SECOND))
        .method(from("FromMilliseconds", TICKS_PER_MILLISECOND))
        .method(Method::new(
            "FromTicks",
            vec![Parameter::new("value", Type::INT64)],
            Type::TimeSpan,
            native(move |_, args| Ok(ts(from_ticks(i64_arg(args, 0)?)))),
        ))
        .property(component("Days", |t| t / TICKS_PER_DAY))
        .property(component("Hours", |t| (t / TICKS_PER_HOUR) % 24))
        .property(component("Minutes", |t| (t / TICKS_PER_MINUTE) % 60))
        .property(component("Seconds", |t| (t / TICKS_PER_SECOND) % 60))
        .property(component("Milliseconds", |t| (t / TICKS_PER_MILLISECOND) % 1000))
        .property(Property::new(
            "Ticks",
            Type::INT64,
            getter(|this| Ok(Value::Int64(ticks(&this_ts(this)?)))),
        ))
        .property(total("TotalDays", TICKS_PER_DAY))
        .property(total("TotalHours", TICKS_PER_HOUR))
        .property(total("TotalMinutes", TICKS_PER_MINUTE))
        .property(total("TotalSeconds", TICKS_PER_SECOND))
        .property(total("TotalMilliseconds", TICKS_PER_MILLISECOND))
        .method(Method::instance(
            "Add",
            vec![Parameter::new("ts", Type::TimeSpan)],
            Type::TimeSpan,
            native(|this, args| add_spans(this_ts(this)?, ts_arg(args, 0)?)),
        ))
        .method(Method::instance(
            "Subtract",
            vec![Parameter::new("ts", Type::TimeSpan)],
            Type::TimeSpan,
            native(|this, args| add_spans(this_ts(this)?, -ts_arg(args, 0)?)),
        ))
        .method(Method::instance(
            "Negate",
            vec![],
            Type::TimeSpan,
            native(|this, _| Ok(Value::TimeSpan(-this_ts(this)?))),
        ))
        .method(Method::instance(
            "Duration",
            vec![],
            Type::TimeSpan,
            native(|this, _| Ok(Value::TimeSpan(this_ts(this)?.abs()))),
        ))
        .method(Method::instance(
            "ToString",
            vec![],
            Type::String,
            native(|this, _| Ok(Value::string(format_time_span(&this_ts(this)?)))),
        ))
        .operator(Method::new(
            "op_Addition",
            vec![Parameter::new("t1", Type::TimeSpan), Parameter::new("t2", Type::TimeSpan)],
            Type::TimeSpan,
            native(|_, args| add_spans(ts_arg(args, 0)?, ts_arg(args, 1)?)),
        ))
        .operator(Method::new(
            "op_Subtraction",
            vec![Parameter::new("t1", Type::TimeSpan), Parameter::new("t2", Type::TimeSpan)],
            Type::TimeSpan,
            native(|_, args| add_spans(ts_arg(args, 0)?, -ts_arg(args, 1)?)),
        ))
        .operator(Method::new(
            "op_UnaryNegation",
            vec![Parameter::new("t", Type::TimeSpan)],
            Type::TimeSpan,
            native(|_, args| Ok(Value::TimeSpan(-ts_arg(args, 0)?))),
        ))
        .operator(Method::new(
            "op_UnaryPlus",
            vec![Parameter::new("t", Type::TimeSpan)],
            Type::TimeSpan,
            native(|_, args| Ok(Value::TimeSpan(ts_arg(args, 0)?))),
        ));
    comparisons(table, Type::TimeSpan)
}

fn component(name: &str, f: fn(i64) -> i64) -> Property {
    Property::new(
        name,
        Type::INT32,
        getter(move |this| Ok(Value::Int32(f(ticks(&this_ts(this)?)) as i32))),
    )
}

fn total(name: &str, unit_ticks: i64) -> Property {
    Property::new(
        name,
        Type::DOUBLE,
        getter(move |this| Ok(Value::Double(ticks(&this_ts(this)?) as f64 / unit_ticks as f64))),
    )
}

fn add_spans(a: TimeDelta, b: TimeDelta) -> Result<Value, Fault> {
    a.checked_add(&b).map(Value::TimeSpan).ok_or(Fault::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_ticks_round_trip() {
        let span = TimeDelta::days(3) + TimeDelta::microseconds(7);
        assert_eq!(ticks(&span), 3 * TICKS_PER_DAY + 70);
        assert_eq!(from_ticks(ticks(&span)), span);
        assert_eq!(ticks(&-span), -(3 * TICKS_PER_DAY + 70));
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(dt(2024, 1, 31), 1).unwrap(), Value::DateTime(dt(2024, 2, 29)));
        assert_eq!(add_months(dt(2024, 3, 31), -1).unwrap(), Value::DateTime(dt(2024, 2, 29)));
        assert!(add_months(dt(9999, 12, 1), 1).is_err());
    }

    #[test]
    fn test_custom_format() {
        let value = dt(2024, 3, 5) + TimeDelta::hours(14) + TimeDelta::minutes(7);
        assert_eq!(format_date_time(&value, "yyyy-MM-dd HH:mm"), "2024-03-05 14:07");
        assert_eq!(format_date_time(&value, "d/M/yy h tt"), "5/3/24 2 PM");
        assert_eq!(format_date_time(&value, "'at' HH"), "at 14");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_date_time("2024-03-05").unwrap(), dt(2024, 3, 5));
        assert_eq!(
            parse_date_time("03/05/2024 10:00:00").unwrap(),
            dt(2024, 3, 5) + TimeDelta::hours(10)
        );
        assert!(parse_date_time("yesterday").is_err());
    }

    #[test]
    fn test_time_span_components() {
        let table = time_span_members();
        let span = Value::TimeSpan(TimeDelta::hours(26) + TimeDelta::minutes(3));
        let read = |name: &str| (table.find_property(name).unwrap().getter)(&span).unwrap();
        assert_eq!(read("Days"), Value::Int32(1));
        assert_eq!(read("Hours"), Value::Int32(2));
        assert_eq!(read("Minutes"), Value::Int32(3));
        assert_eq!(read("TotalHours"), Value::Double(26.05));
    }
}
