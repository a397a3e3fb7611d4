//! Declarations of handler parameters and their constraints.
//!
//! A handler declares one [`ParamSpec`] per argument. The declared type decides how the raw
//! request text is converted, the optional [`Constraints`] decide how it is validated.

use crate::convert::{DateKind, DateType, NamedEnum, convert_to_enum, is_primitive};
use crate::error::ClientError;
use crate::request::RequestContext;
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId, type_name};

/// Declarative constraints attached to a parameter or a record field.
///
/// Defaults: required, no default value, no size limit, no allowed-value list, no rule,
/// and the full `i64` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    default_value: String,
    required: bool,
    name: String,
    format: String,
    size: usize,
    allowed_values: Vec<String>,
    min: i64,
    max: i64,
    rule: String,
    description: String,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            default_value: String::new(),
            required: true,
            name: String::new(),
            format: String::new(),
            size: 0,
            allowed_values: Vec::new(),
            min: i64::MIN,
            max: i64::MAX,
            rule: String::new(),
            description: String::new(),
        }
    }
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text used when the parameter is absent, converted like request input.
    #[must_use]
    pub fn default_value<S: Into<String>>(mut self, default_value: S) -> Self {
        self.default_value = default_value.into();
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Reads the parameter from a request key different from its declared name.
    #[must_use]
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Date pattern, blank meaning the default for the date kind.
    #[must_use]
    pub fn format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = format.into();
        self
    }

    /// Maximum character count of a string, or item count of a list. Zero disables the check.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn min(mut self, min: i64) -> Self {
        self.min = min;
        self
    }

    #[must_use]
    pub fn max(mut self, max: i64) -> Self {
        self.max = max;
        self
    }

    #[must_use]
    pub fn rule<S: Into<String>>(mut self, rule: S) -> Self {
        self.rule = rule.into();
        self
    }

    #[must_use]
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn get_default_value(&self) -> &str {
        &self.default_value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_format(&self) -> &str {
        &self.format
    }

    pub fn get_size(&self) -> usize {
        self.size
    }

    pub fn get_allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    pub fn get_min(&self) -> i64 {
        self.min
    }

    pub fn get_max(&self) -> i64 {
        self.max
    }

    pub fn get_rule(&self) -> &str {
        &self.rule
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }
}

pub type EnumConvertFn = fn(&str) -> Result<Value, ClientError>;
pub type RecordDeserializeFn = fn(serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error>;

/// A structured type bound from several request values at once.
///
/// The record is assembled from the request keys matching its declared [`fields`](Record::fields)
/// and then deserialized with serde, so field names must agree with the serde names.
pub trait Record: DeserializeOwned + Send + 'static {
    fn fields() -> Vec<FieldSpec>;
}

#[derive(Debug, Clone)]
pub struct RecordBinder {
    fields: Vec<FieldSpec>,
    deserialize: RecordDeserializeFn,
}

impl RecordBinder {
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn deserialize(&self, object: serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error> {
        (self.deserialize)(object)
    }
}

fn deserialize_record<R: Record>(object: serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error> {
    serde_json::from_value::<R>(object).map(|record| Box::new(record) as Box<dyn Any + Send>)
}

/// How a declared type is turned into a value.
#[derive(Debug, Clone)]
pub enum TypeClass {
    /// The request context itself, passed through.
    Context,
    /// A type looked up in the [`TypeConverter`](crate::convert::TypeConverter).
    Scalar,
    Date(DateKind),
    Enum(EnumConvertFn),
    /// A json array whose items are of the inner type.
    List(Box<DeclaredType>),
    /// Rejected on validation.
    Array,
    Record(RecordBinder),
}

#[derive(Debug, Clone)]
pub struct DeclaredType {
    id: TypeId,
    name: &'static str,
    class: TypeClass,
}

impl DeclaredType {
    pub fn context() -> Self {
        Self::of::<RequestContext>(TypeClass::Context)
    }

    pub fn scalar<T: 'static>() -> Self {
        Self::of::<T>(TypeClass::Scalar)
    }

    pub fn date<D: DateType>() -> Self {
        Self::of::<D>(TypeClass::Date(D::KIND))
    }

    pub fn enumeration<E: NamedEnum>() -> Self {
        Self::of::<E>(TypeClass::Enum(convert_to_enum::<E>))
    }

    pub fn list<T: 'static>() -> Self {
        Self::list_of::<T>(Self::scalar::<T>())
    }

    /// A list with an explicitly declared item type, e.g. a list of dates.
    pub fn list_of<T: 'static>(item: DeclaredType) -> Self {
        Self::of::<Vec<T>>(TypeClass::List(Box::new(item)))
    }

    pub fn array<T: 'static>() -> Self {
        Self::of::<T>(TypeClass::Array)
    }

    pub fn record<R: Record>() -> Self {
        Self::of::<R>(TypeClass::Record(RecordBinder { fields: R::fields(), deserialize: deserialize_record::<R> }))
    }

    fn of<T: 'static>(class: TypeClass) -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>(), class }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn class(&self) -> &TypeClass {
        &self.class
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.class, TypeClass::Scalar) && is_primitive(self.id)
    }

    pub fn is_date(&self) -> bool {
        matches!(self.class, TypeClass::Date(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.class, TypeClass::List(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.class, TypeClass::Array)
    }
}

/// How a parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    ContextPassthrough,
    StructuredRecord,
    Scalar,
}

/// A declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    declared: DeclaredType,
    constraints: Option<Constraints>,
}

impl ParamSpec {
    pub fn new<S: Into<String>>(name: S, declared: DeclaredType) -> Self {
        Self { name: name.into(), declared, constraints: None }
    }

    pub fn context() -> Self {
        Self::new("context", DeclaredType::context())
    }

    pub fn scalar<T: 'static>(name: &str) -> Self {
        Self::new(name, DeclaredType::scalar::<T>())
    }

    pub fn date<D: DateType>(name: &str) -> Self {
        Self::new(name, DeclaredType::date::<D>())
    }

    pub fn enumeration<E: NamedEnum>(name: &str) -> Self {
        Self::new(name, DeclaredType::enumeration::<E>())
    }

    pub fn list<T: 'static>(name: &str) -> Self {
        Self::new(name, DeclaredType::list::<T>())
    }

    pub fn array<T: 'static>(name: &str) -> Self {
        Self::new(name, DeclaredType::array::<T>())
    }

    pub fn record<R: Record>(name: &str) -> Self {
        Self::new(name, DeclaredType::record::<R>())
    }

    #[must_use]
    pub fn with(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The request key this parameter is read from.
    pub fn source_name(&self) -> &str {
        source_name(&self.name, self.constraints.as_ref())
    }

    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn constraints(&self) -> Option<&Constraints> {
        self.constraints.as_ref()
    }

    pub fn kind(&self) -> ParamKind {
        match self.declared.class {
            TypeClass::Context => ParamKind::ContextPassthrough,
            TypeClass::Record(_) => ParamKind::StructuredRecord,
            _ => ParamKind::Scalar,
        }
    }
}

/// A declared field of a [`Record`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    declared: DeclaredType,
    constraints: Option<Constraints>,
}

impl FieldSpec {
    pub fn new<S: Into<String>>(name: S, declared: DeclaredType) -> Self {
        Self { name: name.into(), declared, constraints: None }
    }

    pub fn scalar<T: 'static>(name: &str) -> Self {
        Self::new(name, DeclaredType::scalar::<T>())
    }

    pub fn date<D: DateType>(name: &str) -> Self {
        Self::new(name, DeclaredType::date::<D>())
    }

    pub fn enumeration<E: NamedEnum>(name: &str) -> Self {
        Self::new(name, DeclaredType::enumeration::<E>())
    }

    pub fn list<T: 'static>(name: &str) -> Self {
        Self::new(name, DeclaredType::list::<T>())
    }

    #[must_use]
    pub fn with(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_name(&self) -> &str {
        source_name(&self.name, self.constraints.as_ref())
    }

    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn constraints(&self) -> Option<&Constraints> {
        self.constraints.as_ref()
    }
}

fn source_name<'a>(declared_name: &'a str, constraints: Option<&'a Constraints>) -> &'a str {
    match constraints {
        Some(constraints) if !constraints.get_name().trim().is_empty() => constraints.get_name(),
        _ => declared_name,
    }
}
