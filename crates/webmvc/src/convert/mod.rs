//! String to typed value conversion.
//!
//! [`TypeConverter`] is the extensible table used for scalar parameters, dates and enums
//! are handled by the helpers in [`date`].

pub mod date;

pub use date::{
    DEFAULT_DATE_FORMAT, DEFAULT_DATETIME_FORMAT, DateKind, DateType, NamedEnum, convert_date, convert_to_enum,
    format_date, java_pattern_to_strftime,
};

use crate::error::ConvertError;
use crate::value::{FromValue, Value};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub type ConvertFn = dyn Fn(&str) -> Result<Value, ConvertError> + Send + Sync;

#[derive(Clone)]
struct TypeHandler {
    type_name: &'static str,
    convert: Arc<ConvertFn>,
    custom: bool,
}

/// Registry mapping a target type to its string parser.
///
/// [`TypeConverter::new`] registers `String`, `bool`, `char` and every primitive integer
/// and float type. Applications add their own scalar types through
/// [`register`](TypeConverter::register) or [`register_custom`](TypeConverter::register_custom).
#[derive(Clone)]
pub struct TypeConverter {
    handlers: HashMap<TypeId, TypeHandler>,
}

macro_rules! register_numbers {
    ($converter:ident, $variant:ident: $($ty:ty),* $(,)?) => {
        $(
        $converter.register::<$ty, _>(|value| parse_number::<$ty>(value).map(|n| Value::$variant(n.into())));
        )*
    };
}

impl TypeConverter {
    /// A converter preloaded with the built-in scalar types.
    pub fn new() -> Self {
        let mut converter = Self::empty();

        converter.register::<String, _>(|value| Ok(Value::Str(value.to_string())));
        register_numbers!(converter, Int: i8, i16, i32, i64);
        register_numbers!(converter, UInt: u8, u16, u32, u64);
        register_numbers!(converter, Float: f32, f64);
        converter.register::<bool, _>(|value| Ok(Value::Bool(parse_bool(value))));
        converter.register::<char, _>(parse_char);

        converter
    }

    /// A converter without any registered type.
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registers the parser producing values of type `T`.
    ///
    /// Registering a type twice replaces the previous parser.
    pub fn register<T, F>(&mut self, convert: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&str) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        self.insert::<T>(Arc::new(convert), false)
    }

    fn insert<T: 'static>(&mut self, convert: Arc<ConvertFn>, custom: bool) -> &mut Self {
        let handler = TypeHandler { type_name: type_name::<T>(), convert, custom };
        if self.handlers.insert(TypeId::of::<T>(), handler).is_some() {
            debug!(type_name = type_name::<T>(), "replaced type converter");
        }
        self
    }

    /// Registers an application type, stored as [`Value::Custom`].
    ///
    /// Custom values have no json form, so they can bind scalar parameters but not record fields.
    pub fn register_custom<T, F>(&mut self, convert: F) -> &mut Self
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, ConvertError> + Send + Sync + 'static,
    {
        let convert = move |value: &str| convert(value).map(|custom| Value::Custom(Box::new(custom)));
        self.insert::<T>(Arc::new(convert), true)
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.handlers.contains_key(&type_id)
    }

    /// Whether `type_id` was registered through [`TypeConverter::register_custom`].
    pub fn is_custom(&self, type_id: TypeId) -> bool {
        self.handlers.get(&type_id).is_some_and(|handler| handler.custom)
    }

    /// Parses `value` as the type identified by `type_id`.
    ///
    /// `type_name` is only used to describe the failure of an unregistered type.
    pub fn convert(&self, type_id: TypeId, type_name: &'static str, value: &str) -> Result<Value, ConvertError> {
        match self.handlers.get(&type_id) {
            Some(handler) => (handler.convert)(value),
            None => Err(ConvertError::unsupported_type(type_name)),
        }
    }

    /// Parses `value` straight into `T`.
    pub fn convert_to<T: FromValue + 'static>(&self, value: &str) -> Result<T, ConvertError> {
        let converted = self.convert(TypeId::of::<T>(), type_name::<T>(), value)?;
        T::from_value(converted).map_err(|_| ConvertError::unsupported_type(type_name::<T>()))
    }
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TypeConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = self.handlers.values().map(|handler| handler.type_name).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("TypeConverter").field("types", &names).finish()
    }
}

/// Whether `type_id` is one of the scalar types registered by [`TypeConverter::new`].
pub fn is_primitive(type_id: TypeId) -> bool {
    [
        TypeId::of::<String>(),
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
    ]
    .contains(&type_id)
}

/// Blank input parses as zero.
fn parse_number<T>(value: &str) -> Result<T, ConvertError>
where
    T: FromStr + Default,
    T::Err: Display,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse::<T>().map_err(|e| ConvertError::invalid_argument(value, e))
}

/// Blank input is `false`, otherwise only a case-insensitive `"true"` is `true`.
fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_char(value: &str) -> Result<Value, ConvertError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => Err(ConvertError::invalid_argument(value, "expected exactly one character")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Celsius(i32);

    #[test]
    fn builtin_numbers() {
        let converter = TypeConverter::new();
        assert_eq!(converter.convert_to::<i32>("42").unwrap(), 42);
        assert_eq!(converter.convert_to::<i64>("-7").unwrap(), -7);
        assert_eq!(converter.convert_to::<u16>("65535").unwrap(), 65535);
        assert!((converter.convert_to::<f32>("1.25").unwrap() - 1.25).abs() < f32::EPSILON);
        assert!((converter.convert_to::<f64>("2.5").unwrap() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_number_is_zero() {
        let converter = TypeConverter::new();
        assert_eq!(converter.convert_to::<i32>("").unwrap(), 0);
        assert_eq!(converter.convert_to::<u8>("  ").unwrap(), 0);
        assert!(converter.convert_to::<f64>("").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_number_is_invalid_argument() {
        let converter = TypeConverter::new();
        let err = converter.convert_to::<i32>("abc").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidArgument { .. }));

        let err = converter.convert_to::<u8>("300").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidArgument { .. }));
    }

    #[test]
    fn booleans() {
        let converter = TypeConverter::new();
        assert!(converter.convert_to::<bool>("true").unwrap());
        assert!(converter.convert_to::<bool>("TRUE").unwrap());
        assert!(!converter.convert_to::<bool>("").unwrap());
        assert!(!converter.convert_to::<bool>("yes").unwrap());
    }

    #[test]
    fn characters() {
        let converter = TypeConverter::new();
        assert_eq!(converter.convert_to::<char>("x").unwrap(), 'x');
        assert!(converter.convert_to::<char>("xy").is_err());
        assert!(converter.convert_to::<char>("").is_err());
    }

    #[test]
    fn strings_are_kept_verbatim() {
        let converter = TypeConverter::new();
        assert_eq!(converter.convert_to::<String>(" a b ").unwrap(), " a b ");
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let converter = TypeConverter::new();
        let err = converter.convert(TypeId::of::<Celsius>(), "Celsius", "1").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedType { type_name: "Celsius" }));
    }

    #[test]
    fn custom_types_can_be_registered() {
        let mut converter = TypeConverter::new();
        converter.register_custom::<Celsius, _>(|value| {
            let degrees = value
                .trim_end_matches('C')
                .parse::<i32>()
                .map_err(|e| ConvertError::invalid_argument(value, e))?;
            Ok(Celsius(degrees))
        });

        assert!(converter.contains(TypeId::of::<Celsius>()));
        assert!(converter.is_custom(TypeId::of::<Celsius>()));
        assert!(!converter.is_custom(TypeId::of::<i32>()));
        let value = converter.convert(TypeId::of::<Celsius>(), "Celsius", "21C").unwrap();
        assert_eq!(value.into_custom::<Celsius>().unwrap(), Celsius(21));
        // built-ins are untouched
        assert_eq!(converter.convert_to::<i32>("1").unwrap(), 1);
    }

    #[test]
    fn primitive_classification() {
        assert!(is_primitive(TypeId::of::<i32>()));
        assert!(is_primitive(TypeId::of::<String>()));
        assert!(!is_primitive(TypeId::of::<Celsius>()));
        assert!(!is_primitive(TypeId::of::<Vec<i32>>()));
    }
}
