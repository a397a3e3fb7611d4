//! Date and enum conversion.
//!
//! Date patterns are written in the familiar `yyyy-MM-dd HH:mm:ss` letter notation and
//! translated to `strftime` specifiers before being handed to chrono.

use crate::error::ClientError;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::any::type_name;

pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";
pub const DEFAULT_DATETIME_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";

/// The supported families of date types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateKind {
    /// A calendar date, [`NaiveDate`].
    Date,
    /// A local date and time, [`NaiveDateTime`].
    DateTime,
    /// An instant, [`DateTime<Utc>`].
    Timestamp,
}

impl DateKind {
    pub fn default_format(self) -> &'static str {
        match self {
            DateKind::Date => DEFAULT_DATE_FORMAT,
            DateKind::DateTime | DateKind::Timestamp => DEFAULT_DATETIME_FORMAT,
        }
    }
}

/// Marks a chrono type usable as a date parameter.
pub trait DateType: Send + 'static {
    const KIND: DateKind;
}

impl DateType for NaiveDate {
    const KIND: DateKind = DateKind::Date;
}

impl DateType for NaiveDateTime {
    const KIND: DateKind = DateKind::DateTime;
}

impl DateType for DateTime<Utc> {
    const KIND: DateKind = DateKind::Timestamp;
}

/// Parses `value` as a date of the given kind.
///
/// A blank `format` falls back to [`DateKind::default_format`]. A timestamp also accepts a
/// date-only pattern, taking midnight as its time.
pub fn convert_date(kind: DateKind, value: &str, format: &str) -> Result<Value, ClientError> {
    let pattern = if format.trim().is_empty() { kind.default_format() } else { format };
    let strftime = java_pattern_to_strftime(pattern);

    let parsed = match kind {
        DateKind::Date => NaiveDate::parse_from_str(value, &strftime).map(Value::Date),
        DateKind::DateTime => NaiveDateTime::parse_from_str(value, &strftime).map(Value::DateTime),
        DateKind::Timestamp => NaiveDateTime::parse_from_str(value, &strftime)
            .or_else(|e| NaiveDate::parse_from_str(value, &strftime).map(|d| d.and_time(NaiveTime::MIN)).map_err(|_| e))
            .map(|dt| Value::Timestamp(dt.and_utc())),
    };

    parsed.map_err(|_| ClientError::ParseDate { value: value.to_string(), pattern: pattern.to_string() })
}

/// Formats a date value with the given pattern, blank meaning the kind's default.
pub fn format_date(value: &Value, format: &str) -> Option<String> {
    let strftime = |kind: DateKind| {
        let pattern = if format.trim().is_empty() { kind.default_format() } else { format };
        java_pattern_to_strftime(pattern)
    };

    match value {
        Value::Date(d) => Some(d.format(&strftime(DateKind::Date)).to_string()),
        Value::DateTime(d) => Some(d.format(&strftime(DateKind::DateTime)).to_string()),
        Value::Timestamp(d) => Some(d.format(&strftime(DateKind::Timestamp)).to_string()),
        _ => None,
    }
}

/// Translates a letter based date pattern (`yyyy-MM-dd`) into chrono's `strftime` syntax.
///
/// Text inside single quotes is copied literally, `''` is a literal quote.
pub fn java_pattern_to_strftime(pattern: &str) -> String {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            if chars.get(i) == Some(&'\'') {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut count = 1;
        while chars.get(i + count) == Some(&c) {
            count += 1;
        }

        match c {
            'y' | 'u' => out.push_str(if count == 2 { "%y" } else { "%Y" }),
            'M' | 'L' => out.push_str(match count {
                1 => "%-m",
                2 => "%m",
                3 => "%b",
                _ => "%B",
            }),
            'd' => out.push_str(if count == 1 { "%-d" } else { "%d" }),
            'D' => out.push_str("%j"),
            'H' => out.push_str(if count == 1 { "%-H" } else { "%H" }),
            'h' => out.push_str(if count == 1 { "%-I" } else { "%I" }),
            'm' => out.push_str(if count == 1 { "%-M" } else { "%M" }),
            's' => out.push_str(if count == 1 { "%-S" } else { "%S" }),
            'S' => out.push_str(match count {
                6 => "%6f",
                9 => "%9f",
                _ => "%3f",
            }),
            'a' => out.push_str("%p"),
            'E' => out.push_str(if count >= 4 { "%A" } else { "%a" }),
            'Z' | 'X' | 'x' => out.push_str("%z"),
            _ => {
                for _ in 0..count {
                    push_literal(&mut out, c);
                }
            }
        }
        i += count;
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// A fieldless enum addressable by the exact names of its constants.
pub trait NamedEnum: Copy + Send + 'static {
    fn variants() -> &'static [Self];

    fn name(&self) -> &'static str;
}

/// Resolves `value` to the constant with exactly that name, case-sensitive.
pub fn convert_to_enum<E: NamedEnum>(value: &str) -> Result<Value, ClientError> {
    E::variants()
        .iter()
        .find(|variant| variant.name() == value)
        .map(|variant| Value::Enum(variant.name()))
        .ok_or_else(|| ClientError::UnknownConstant { type_name: type_name::<E>(), value: value.to_string() })
}
