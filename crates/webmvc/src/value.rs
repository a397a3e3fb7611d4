//! Dynamically typed values produced by conversion and consumed by handlers.
//!
//! Conversion and validation need to look at a bound value without knowing the
//! handler's concrete parameter type, so every argument travels as a [`Value`]
//! until the handler asks for it back through [`FromValue`].

use crate::convert::NamedEnum;
use crate::error::ServerError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::{Any, type_name};

#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Enum(&'static str),
    List(Vec<Value>),
    Record(Box<dyn Any + Send>),
    Custom(Box<dyn Any + Send>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Timestamp(_) => "timestamp",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Custom(_) => "custom",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integral projection of numeric values, truncating floats toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            Value::UInt(n) => Some(i64::try_from(n).unwrap_or(i64::MAX)),
            #[allow(clippy::cast_possible_truncation, reason = "range checks compare the integral part only")]
            Value::Float(n) => Some(n as i64),
            _ => None,
        }
    }

    /// Textual form used by rule checks, `None` for values without one.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Char(c) => Some(c.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::UInt(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Date(d) => Some(d.to_string()),
            Value::DateTime(d) => Some(d.to_string()),
            Value::Timestamp(d) => Some(d.to_rfc3339()),
            Value::Enum(name) => Some((*name).to_string()),
            Value::Null | Value::List(_) | Value::Record(_) | Value::Custom(_) => None,
        }
    }

    /// Json form used when assembling a record, `None` for opaque values.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        match self {
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Char(c) => Some(Json::String(c.to_string())),
            Value::Int(n) => Some(Json::from(*n)),
            Value::UInt(n) => Some(Json::from(*n)),
            Value::Float(n) => Some(serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)),
            Value::Str(s) => Some(Json::String(s.clone())),
            Value::Date(d) => serde_json::to_value(d).ok(),
            Value::DateTime(d) => serde_json::to_value(d).ok(),
            Value::Timestamp(d) => serde_json::to_value(d).ok(),
            Value::Enum(name) => Some(Json::String((*name).to_string())),
            Value::List(items) => items.iter().map(Value::to_json).collect::<Option<Vec<_>>>().map(Json::Array),
            Value::Record(_) | Value::Custom(_) => None,
        }
    }

    pub fn into_enum<E: NamedEnum>(self) -> Result<E, ServerError> {
        match self {
            Value::Enum(name) => E::variants()
                .iter()
                .find(|variant| variant.name() == name)
                .copied()
                .ok_or_else(|| ServerError::type_mismatch(type_name::<E>(), "enum")),
            other => Err(mismatch::<E>(&other)),
        }
    }

    pub fn into_record<T: 'static>(self) -> Result<T, ServerError> {
        match self {
            Value::Record(boxed) => downcast::<T>(boxed, "record"),
            other => Err(mismatch::<T>(&other)),
        }
    }

    pub fn into_custom<T: 'static>(self) -> Result<T, ServerError> {
        match self {
            Value::Custom(boxed) => downcast::<T>(boxed, "custom"),
            other => Err(mismatch::<T>(&other)),
        }
    }
}

fn downcast<T: 'static>(boxed: Box<dyn Any + Send>, found: &'static str) -> Result<T, ServerError> {
    boxed.downcast::<T>().map(|value| *value).map_err(|_| ServerError::type_mismatch(type_name::<T>(), found))
}

fn mismatch<T>(found: &Value) -> ServerError {
    ServerError::type_mismatch(type_name::<T>(), found.kind_name())
}

/// Extraction of a concrete Rust value out of a bound [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ServerError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        Ok(value)
    }
}

macro_rules! from_value_for_integers {
    ($($ty:ty),* $(,)?) => {
        $(
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, ServerError> {
                match value {
                    Value::Int(n) => <$ty>::try_from(n).map_err(|_| mismatch::<$ty>(&value)),
                    Value::UInt(n) => <$ty>::try_from(n).map_err(|_| mismatch::<$ty>(&value)),
                    other => Err(mismatch::<$ty>(&other)),
                }
            }
        }
        )*
    };
}

from_value_for_integers!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss, reason = "integral values widen the same way the parser does")]
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            Value::UInt(n) => Ok(n as f64),
            other => Err(mismatch::<f64>(&other)),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation, reason = "f32 parameters are parsed as f32 before widening")]
    fn from_value(value: Value) -> Result<Self, ServerError> {
        f64::from_value(value).map(|n| n as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<bool>(&other)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(mismatch::<char>(&other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Date(d) => Ok(d),
            other => Err(mismatch::<NaiveDate>(&other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::DateTime(d) => Ok(d),
            other => Err(mismatch::<NaiveDateTime>(&other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Timestamp(d) => Ok(d),
            other => Err(mismatch::<DateTime<Utc>>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ServerError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Vec<T>>(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red,
        Green,
    }

    impl NamedEnum for Color {
        fn variants() -> &'static [Self] {
            &[Color::Red, Color::Green]
        }

        fn name(&self) -> &'static str {
            match self {
                Color::Red => "RED",
                Color::Green => "GREEN",
            }
        }
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        assert_eq!(i32::from_value(Value::Int(42)).unwrap(), 42);
        assert_eq!(u8::from_value(Value::UInt(255)).unwrap(), 255);
        assert!(matches!(u8::from_value(Value::Int(-1)), Err(ServerError::TypeMismatch { .. })));
        assert!(matches!(i64::from_value(Value::Str("1".into())), Err(ServerError::TypeMismatch { .. })));
    }

    #[test]
    fn option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<String>::from_value(Value::Str("x".into())).unwrap(), Some("x".to_string()));
    }

    #[test]
    fn list_extracts_each_item() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(Vec::<i32>::from_value(list).unwrap(), vec![1, 2]);
    }

    #[test]
    fn enum_round_trips_by_name() {
        assert_eq!(Value::Enum("GREEN").into_enum::<Color>().unwrap(), Color::Green);
        assert!(Value::Enum("BLUE").into_enum::<Color>().is_err());
    }

    #[test]
    fn record_downcasts_to_its_type() {
        let value = Value::Record(Box::new(7_u16));
        assert_eq!(value.into_record::<u16>().unwrap(), 7);

        let value = Value::Record(Box::new(7_u16));
        assert!(value.into_record::<String>().is_err());
    }

    #[test]
    fn float_projection_truncates() {
        assert_eq!(Value::Float(9.9).as_i64(), Some(9));
        assert_eq!(Value::Float(-9.9).as_i64(), Some(-9));
        assert_eq!(Value::Str("9".into()).as_i64(), None);
    }

    #[test]
    fn json_form_of_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 24).unwrap();
        assert_eq!(Value::Date(date).to_json(), Some(serde_json::json!("2026-01-24")));
        assert_eq!(Value::Custom(Box::new(1)).to_json(), None);
    }
}
