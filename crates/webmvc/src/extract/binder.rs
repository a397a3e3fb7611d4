use crate::convert::{TypeConverter, convert_date};
use crate::error::{ClientError, ConvertError, ServerError, WebError};
use crate::extract::args::{Arg, Args};
use crate::extract::value_set::RequestValueSet;
use crate::param::{Constraints, DeclaredType, ParamKind, ParamSpec, RecordBinder, TypeClass};
use crate::rule::RuleChecker;
use crate::validate::ConstraintValidator;
use crate::value::Value;
use tracing::trace;

/// Binds declared parameters from a merged [`RequestValueSet`].
///
/// - the context parameter becomes [`Arg::Context`]
/// - a record is assembled from its declared fields and deserialized
/// - any other parameter is converted from the value under its source name
///
/// A value that is absent and carries no constraints fails binding. With constraints the
/// absent value goes to validation as a null, which applies the declared default.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBinder<'a> {
    converter: &'a TypeConverter,
    validator: ConstraintValidator<'a>,
}

impl<'a> ArgumentBinder<'a> {
    pub fn new(converter: &'a TypeConverter, rules: &'a dyn RuleChecker) -> Self {
        Self { converter, validator: ConstraintValidator::new(converter, rules) }
    }

    pub fn bind(&self, params: &[ParamSpec], values: &RequestValueSet) -> Result<Args, WebError> {
        let mut args = Vec::with_capacity(params.len());

        for param in params {
            let arg = match param.kind() {
                ParamKind::ContextPassthrough => Arg::Context,
                ParamKind::StructuredRecord => {
                    let TypeClass::Record(record) = param.declared_type().class() else {
                        return Err(ServerError::internal("record parameter without record declaration").into());
                    };
                    let value = self.bind_record(param.declared_type(), record, values)?;
                    Arg::Bound { name: param.name().to_string(), value }
                }
                ParamKind::Scalar => {
                    let value = self.resolve(
                        param.source_name(),
                        param.declared_type(),
                        param.constraints(),
                        values.get(param.source_name()),
                        || ClientError::MissingParameter { name: param.source_name().to_string() },
                    )?;
                    Arg::Bound { name: param.name().to_string(), value }
                }
            };
            trace!(param = param.name(), ?arg, "bound argument");
            args.push(arg);
        }

        Ok(Args::new(args))
    }

    fn bind_record(
        &self,
        declared: &DeclaredType,
        record: &RecordBinder,
        values: &RequestValueSet,
    ) -> Result<Value, WebError> {
        let mut object = serde_json::Map::with_capacity(record.fields().len());

        for field in record.fields() {
            let value = self.resolve(
                field.source_name(),
                field.declared_type(),
                field.constraints(),
                values.get(field.source_name()),
                || ClientError::MissingField { record: declared.name(), field: field.name().to_string() },
            )?;
            let json = value
                .to_json()
                .ok_or(ServerError::UnsupportedType { type_name: field.declared_type().name() })?;
            object.insert(field.name().to_string(), json);
        }

        let record = record
            .deserialize(serde_json::Value::Object(object))
            .map_err(|e| ClientError::Record { record: declared.name(), reason: e.to_string() })?;
        Ok(Value::Record(record))
    }

    fn resolve<F>(
        &self,
        name: &str,
        declared: &DeclaredType,
        constraints: Option<&Constraints>,
        raw: Option<&str>,
        missing: F,
    ) -> Result<Value, WebError>
    where
        F: FnOnce() -> ClientError,
    {
        let format = constraints.map(Constraints::get_format).unwrap_or_default();

        let value = match (raw, constraints) {
            (Some(raw), _) => self.convert(name, declared, raw, format)?,
            (None, None) => return Err(missing().into()),
            (None, Some(_)) => Value::Null,
        };

        match constraints {
            Some(constraints) => self.validator.validate(constraints, declared, value),
            None => Ok(value),
        }
    }

    fn convert(&self, name: &str, declared: &DeclaredType, raw: &str, format: &str) -> Result<Value, WebError> {
        match declared.class() {
            TypeClass::Scalar => self.converter.convert(declared.type_id(), declared.name(), raw).map_err(|e| match e {
                ConvertError::UnsupportedType { type_name } => ServerError::UnsupportedType { type_name }.into(),
                invalid @ ConvertError::InvalidArgument { .. } => ClientError::bad_parameter(name, invalid).into(),
            }),
            TypeClass::Date(kind) => Ok(convert_date(*kind, raw, format)?),
            TypeClass::Enum(convert) => Ok(convert(raw)?),
            TypeClass::List(item) => {
                let items = serde_json::from_str::<Vec<serde_json::Value>>(raw)
                    .map_err(|e| ClientError::bad_parameter(name, ConvertError::invalid_argument(raw, e)))?;
                items
                    .into_iter()
                    .map(|item_json| {
                        let text = match item_json {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        self.convert(name, item, &text, format)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List)
            }
            TypeClass::Array => Err(ServerError::UnsupportedArray { type_name: declared.name() }.into()),
            TypeClass::Context | TypeClass::Record(_) => {
                Err(ServerError::UnsupportedType { type_name: declared.name() }.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NamedEnum;
    use crate::param::{FieldSpec, Record};
    use crate::rule::RegexRuleChecker;
    use chrono::NaiveDate;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        code: i32,
        msg: String,
        note: Option<String>,
    }

    impl Record for Order {
        fn fields() -> Vec<FieldSpec> {
            vec![
                FieldSpec::scalar::<i32>("code"),
                FieldSpec::scalar::<String>("msg").with(Constraints::new().default_value("none")),
                FieldSpec::scalar::<String>("note").with(Constraints::new().required(false)),
            ]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Sort {
        Asc,
        Desc,
    }

    impl NamedEnum for Sort {
        fn variants() -> &'static [Self] {
            &[Sort::Asc, Sort::Desc]
        }

        fn name(&self) -> &'static str {
            match self {
                Sort::Asc => "ASC",
                Sort::Desc => "DESC",
            }
        }
    }

    fn bind(params: &[ParamSpec], values: &[(&str, &str)]) -> Result<Args, WebError> {
        let converter = TypeConverter::new();
        let rules = RegexRuleChecker::new();
        let values = values.iter().copied().collect::<RequestValueSet>();
        ArgumentBinder::new(&converter, &rules).bind(params, &values)
    }

    #[test]
    fn scalar_from_values() {
        let mut args = bind(&[ParamSpec::scalar::<String>("msg")], &[("msg", "2026")]).unwrap();
        assert_eq!(args.take::<String>("msg").unwrap(), "2026");
    }

    #[test]
    fn scalar_is_converted() {
        let mut args = bind(&[ParamSpec::scalar::<i32>("age")], &[("age", "18")]).unwrap();
        assert_eq!(args.take::<i32>("age").unwrap(), 18);
    }

    #[test]
    fn missing_scalar_without_constraints_fails() {
        let err = bind(&[ParamSpec::scalar::<String>("msg")], &[]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::MissingParameter { ref name }) if name == "msg"));
    }

    #[test]
    fn missing_optional_scalar_is_null() {
        let spec = ParamSpec::scalar::<String>("msg").with(Constraints::new().required(false));
        let mut args = bind(&[spec, ParamSpec::context()], &[]).unwrap();
        assert_eq!(args.take::<Option<String>>("msg").unwrap(), None);
    }

    #[test]
    fn missing_scalar_uses_default() {
        let spec = ParamSpec::scalar::<i32>("page").with(Constraints::new().default_value("1"));
        let mut args = bind(&[spec], &[]).unwrap();
        assert_eq!(args.take::<i32>("page").unwrap(), 1);
    }

    #[test]
    fn missing_optional_scalar_ignores_default() {
        let spec = ParamSpec::scalar::<i32>("page").with(Constraints::new().default_value("1").required(false));
        let mut args = bind(&[spec, ParamSpec::context()], &[]).unwrap();
        assert_eq!(args.take::<Option<i32>>("page").unwrap(), None);
    }

    #[test]
    fn default_is_not_checked_against_constraints() {
        let spec = ParamSpec::scalar::<i32>("limit").with(Constraints::new().default_value("150").min(1).max(100));
        let mut args = bind(&[spec], &[]).unwrap();
        assert_eq!(args.take::<i32>("limit").unwrap(), 150);

        let spec = ParamSpec::scalar::<i32>("limit").with(Constraints::new().default_value("150").max(100));
        let err = bind(&[spec], &[("limit", "150")]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::OutOfRange)));
    }

    #[test]
    fn renamed_parameter() {
        let spec = ParamSpec::scalar::<String>("message").with(Constraints::new().name("msg"));
        let mut args = bind(&[spec], &[("msg", "x")]).unwrap();
        assert_eq!(args.take::<String>("message").unwrap(), "x");
    }

    #[test]
    fn invalid_number_is_bad_parameter() {
        let err = bind(&[ParamSpec::scalar::<i32>("age")], &[("age", "old")]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::BadParameter { .. })));
    }

    #[test]
    fn unregistered_type_is_server_error() {
        struct Unknown;
        let err = bind(&[ParamSpec::scalar::<Unknown>("u")], &[("u", "x")]).unwrap_err();
        assert!(matches!(err, WebError::Server(ServerError::UnsupportedType { .. })));
    }

    #[test]
    fn array_is_server_error() {
        let err = bind(&[ParamSpec::array::<[i32; 2]>("a")], &[("a", "[1,2]")]).unwrap_err();
        assert!(matches!(err, WebError::Server(ServerError::UnsupportedArray { .. })));
    }

    #[test]
    fn enum_and_date() {
        let params = [ParamSpec::enumeration::<Sort>("sort"), ParamSpec::date::<NaiveDate>("day")];
        let mut args = bind(&params, &[("sort", "DESC"), ("day", "2026-01-24")]).unwrap();
        assert_eq!(args.take_enum::<Sort>("sort").unwrap(), Some(Sort::Desc));
        assert_eq!(args.take::<NaiveDate>("day").unwrap(), NaiveDate::from_ymd_opt(2026, 1, 24).unwrap());
    }

    #[test]
    fn date_with_format() {
        let spec = ParamSpec::date::<NaiveDate>("day").with(Constraints::new().format("dd.MM.yyyy"));
        let mut args = bind(&[spec], &[("day", "24.01.2026")]).unwrap();
        assert_eq!(args.take::<NaiveDate>("day").unwrap(), NaiveDate::from_ymd_opt(2026, 1, 24).unwrap());
    }

    #[test]
    fn unknown_enum_constant_is_client_error() {
        let err = bind(&[ParamSpec::enumeration::<Sort>("sort")], &[("sort", "asc")]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::UnknownConstant { .. })));
    }

    #[test]
    fn list_from_json_array() {
        let mut args = bind(&[ParamSpec::list::<i32>("ids")], &[("ids", "[1,2,3]")]).unwrap();
        assert_eq!(args.take::<Vec<i32>>("ids").unwrap(), vec![1, 2, 3]);

        let mut args = bind(&[ParamSpec::list::<String>("tags")], &[("tags", r#"["a","b"]"#)]).unwrap();
        assert_eq!(args.take::<Vec<String>>("tags").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn list_size_is_validated() {
        let spec = ParamSpec::list::<i32>("ids").with(Constraints::new().size(2));
        let err = bind(&[spec], &[("ids", "[1,2,3]")]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::SizeExceeded)));
    }

    #[test]
    fn record_projects_declared_fields() {
        let values = [("code", "12"), ("msg", "fd232"), ("other", "ignored")];
        let mut args = bind(&[ParamSpec::record::<Order>("order")], &values).unwrap();
        let order = args.take_record::<Order>("order").unwrap().unwrap();
        assert_eq!(order, Order { code: 12, msg: "fd232".into(), note: None });
    }

    #[test]
    fn record_field_default() {
        let mut args = bind(&[ParamSpec::record::<Order>("order")], &[("code", "1")]).unwrap();
        let order = args.take_record::<Order>("order").unwrap().unwrap();
        assert_eq!(order.msg, "none");
    }

    #[test]
    fn record_field_without_value_or_default_fails() {
        let err = bind(&[ParamSpec::record::<Order>("order")], &[("msg", "x")]).unwrap_err();
        assert!(matches!(err, WebError::Client(ClientError::MissingField { ref field, .. }) if field == "code"));
    }

    #[test]
    fn argument_order_follows_declaration() {
        let params = [ParamSpec::scalar::<String>("b"), ParamSpec::context(), ParamSpec::scalar::<String>("a")];
        let args = bind(&params, &[("a", "1"), ("b", "2")]).unwrap();
        let names = args
            .iter()
            .map(|arg| match arg {
                Arg::Context => "context",
                Arg::Bound { name, .. } => name.as_str(),
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "context", "a"]);
    }
}
