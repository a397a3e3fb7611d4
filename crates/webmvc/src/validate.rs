use crate::convert::{TypeConverter, convert_date};
use crate::error::{ClientError, ConvertError, ServerError, WebError};
use crate::param::{Constraints, DeclaredType, TypeClass};
use crate::rule::RuleChecker;
use crate::value::Value;

/// Applies [`Constraints`] to a converted value.
///
/// Checks run in a fixed order and the first failure wins: array rejection, null
/// handling, size, allowed values, rule, numeric range. A null replaced by its default and a
/// string found in the allowed values are accepted without running the later checks.
#[derive(Clone, Copy)]
pub struct ConstraintValidator<'a> {
    converter: &'a TypeConverter,
    rules: &'a dyn RuleChecker,
}

impl std::fmt::Debug for ConstraintValidator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintValidator").field("converter", self.converter).finish_non_exhaustive()
    }
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(converter: &'a TypeConverter, rules: &'a dyn RuleChecker) -> Self {
        Self { converter, rules }
    }

    pub fn validate(
        &self,
        constraints: &Constraints,
        declared: &DeclaredType,
        value: Value,
    ) -> Result<Value, WebError> {
        if declared.is_array() {
            return Err(ServerError::UnsupportedArray { type_name: declared.name() }.into());
        }

        if value.is_null() {
            if !constraints.is_required() {
                return Ok(Value::Null);
            }
            let default_value = constraints.get_default_value();
            if default_value.trim().is_empty() {
                return Err(ClientError::RequiredEmpty.into());
            }
            return self.convert_default(constraints, declared, default_value);
        }

        let size = constraints.get_size();
        if size != 0 {
            let exceeded = match &value {
                Value::Str(s) => s.chars().count() > size,
                Value::List(items) => items.len() > size,
                _ => false,
            };
            if exceeded {
                return Err(ClientError::SizeExceeded.into());
            }
        }

        let allowed_values = constraints.get_allowed_values();
        if !allowed_values.is_empty()
            && let Value::Str(s) = &value
        {
            if allowed_values.iter().any(|allowed| allowed == s) {
                return Ok(value);
            }
            return Err(ClientError::UnsupportedValue.into());
        }

        let rule = constraints.get_rule();
        if !rule.trim().is_empty() && !self.rules.exec(rule, &value) {
            return Err(ClientError::RuleCheckFailed.into());
        }

        if out_of_range(&value, constraints.get_min(), constraints.get_max()) {
            return Err(ClientError::OutOfRange.into());
        }

        Ok(value)
    }

    /// Converts a default value. Only registered scalars, enums and dates can have one.
    fn convert_default(
        &self,
        constraints: &Constraints,
        declared: &DeclaredType,
        default_value: &str,
    ) -> Result<Value, WebError> {
        match declared.class() {
            TypeClass::Scalar => {
                self.converter.convert(declared.type_id(), declared.name(), default_value).map_err(|e| match e {
                    ConvertError::UnsupportedType { type_name } => ServerError::UnsupportedType { type_name }.into(),
                    invalid @ ConvertError::InvalidArgument { .. } => {
                        ClientError::bad_parameter(declared.name(), invalid).into()
                    }
                })
            }
            TypeClass::Enum(convert) => Ok(convert(default_value)?),
            TypeClass::Date(kind) => Ok(convert_date(*kind, default_value, constraints.get_format())?),
            _ => Err(ServerError::UnsupportedType { type_name: declared.name() }.into()),
        }
    }
}

/// A declared bound is violated, a non-finite float violating any declared bound.
fn out_of_range(value: &Value, min: i64, max: i64) -> bool {
    if let Value::Float(f) = value
        && !f.is_finite()
    {
        return min != i64::MIN || max != i64::MAX;
    }
    value.as_i64().is_some_and(|n| n > max || n < min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NamedEnum;
    use crate::rule::{MockRuleChecker, RegexRuleChecker};
    use chrono::NaiveDate;
    use mockall::predicate::eq;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Fast,
    }

    impl NamedEnum for Mode {
        fn variants() -> &'static [Self] {
            &[Mode::Fast]
        }

        fn name(&self) -> &'static str {
            "FAST"
        }
    }

    fn validate(constraints: &Constraints, declared: &DeclaredType, value: Value) -> Result<Value, WebError> {
        let converter = TypeConverter::new();
        let rules = RegexRuleChecker::new();
        ConstraintValidator::new(&converter, &rules).validate(constraints, declared, value)
    }

    fn client_error(result: Result<Value, WebError>) -> ClientError {
        match result {
            Err(WebError::Client(e)) => e,
            other => panic!("expected a client error, got {other:?}"),
        }
    }

    #[test]
    fn optional_null_stays_null() {
        let result = validate(&Constraints::new().required(false), &DeclaredType::scalar::<String>(), Value::Null);
        assert!(result.unwrap().is_null());
    }

    #[test]
    fn required_null_without_default_fails() {
        let err = client_error(validate(&Constraints::new(), &DeclaredType::scalar::<String>(), Value::Null));
        assert!(matches!(err, ClientError::RequiredEmpty));

        let blank = Constraints::new().default_value("  ");
        let err = client_error(validate(&blank, &DeclaredType::scalar::<String>(), Value::Null));
        assert!(matches!(err, ClientError::RequiredEmpty));
    }

    #[test]
    fn required_null_uses_converted_default() {
        let constraints = Constraints::new().default_value("15");
        let value = validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Null).unwrap();
        assert!(matches!(value, Value::Int(15)));
    }

    #[test]
    fn default_skips_later_checks() {
        let constraints = Constraints::new().default_value("150").max(100);
        let value = validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Null).unwrap();
        assert!(matches!(value, Value::Int(150)));

        let constraints = Constraints::new().default_value("abcdef").size(2);
        let value = validate(&constraints, &DeclaredType::scalar::<String>(), Value::Null).unwrap();
        assert_eq!(value.as_str(), Some("abcdef"));

        let constraints = Constraints::new().default_value("x").allowed_values(["a"]).rule("[0-9]+");
        let value = validate(&constraints, &DeclaredType::scalar::<String>(), Value::Null).unwrap();
        assert_eq!(value.as_str(), Some("x"));
    }

    #[test]
    fn non_finite_floats_break_declared_bounds() {
        let bounded = Constraints::new().min(-10).max(10);
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = client_error(validate(&bounded, &DeclaredType::scalar::<f64>(), Value::Float(n)));
            assert!(matches!(err, ClientError::OutOfRange));
        }
        assert!(validate(&Constraints::new(), &DeclaredType::scalar::<f64>(), Value::Float(f64::NAN)).is_ok());
    }

    #[test]
    fn enum_and_date_defaults() {
        let constraints = Constraints::new().default_value("FAST");
        let value = validate(&constraints, &DeclaredType::enumeration::<Mode>(), Value::Null).unwrap();
        assert!(matches!(value, Value::Enum("FAST")));

        let constraints = Constraints::new().default_value("2026-01-24");
        let value = validate(&constraints, &DeclaredType::date::<NaiveDate>(), Value::Null).unwrap();
        assert!(matches!(value, Value::Date(_)));
    }

    #[test]
    fn default_for_list_is_unsupported() {
        let result = validate(&Constraints::new().default_value("[1]"), &DeclaredType::list::<i32>(), Value::Null);
        assert!(matches!(result, Err(WebError::Server(ServerError::UnsupportedType { .. }))));
    }

    #[test]
    fn arrays_are_rejected() {
        let result = validate(&Constraints::new(), &DeclaredType::array::<[i32; 2]>(), Value::Str("1".into()));
        assert!(matches!(result, Err(WebError::Server(ServerError::UnsupportedArray { .. }))));
    }

    #[test]
    fn size_counts_characters() {
        let constraints = Constraints::new().size(3);
        assert!(validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("äöü".into())).is_ok());
        let err = client_error(validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("abcd".into())));
        assert!(matches!(err, ClientError::SizeExceeded));
    }

    #[test]
    fn size_counts_list_items() {
        let constraints = Constraints::new().size(1);
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let err = client_error(validate(&constraints, &DeclaredType::list::<i32>(), list));
        assert!(matches!(err, ClientError::SizeExceeded));
    }

    #[test]
    fn allowed_value_short_circuits_later_checks() {
        let constraints = Constraints::new().allowed_values(["a", "b"]).rule("[0-9]+");
        let value = validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("a".into())).unwrap();
        assert_eq!(value.as_str(), Some("a"));
    }

    #[test]
    fn value_outside_allowed_list_fails() {
        let constraints = Constraints::new().allowed_values(["a", "b"]);
        let err = client_error(validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("c".into())));
        assert!(matches!(err, ClientError::UnsupportedValue));
    }

    #[test]
    fn allowed_values_ignore_non_strings() {
        let constraints = Constraints::new().allowed_values(["1"]).max(10);
        let err = client_error(validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Int(11)));
        assert!(matches!(err, ClientError::OutOfRange));
    }

    #[test]
    fn rule_is_delegated_to_the_checker() {
        let converter = TypeConverter::new();
        let mut rules = MockRuleChecker::new();
        rules.expect_exec().with(eq("phone"), mockall::predicate::always()).times(1).return_const(false);

        let validator = ConstraintValidator::new(&converter, &rules);
        let constraints = Constraints::new().rule("phone");
        let result = validator.validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("x".into()));
        assert!(matches!(result, Err(WebError::Client(ClientError::RuleCheckFailed))));
    }

    #[test]
    fn blank_rule_is_skipped() {
        let converter = TypeConverter::new();
        let mut rules = MockRuleChecker::new();
        rules.expect_exec().never();

        let validator = ConstraintValidator::new(&converter, &rules);
        let constraints = Constraints::new().rule(" ");
        assert!(validator.validate(&constraints, &DeclaredType::scalar::<String>(), Value::Str("x".into())).is_ok());
    }

    #[test]
    fn numeric_range() {
        let constraints = Constraints::new().min(1).max(10);
        assert!(validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Int(10)).is_ok());
        assert!(validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Int(1)).is_ok());
        for n in [11, 0] {
            let err = client_error(validate(&constraints, &DeclaredType::scalar::<i32>(), Value::Int(n)));
            assert!(matches!(err, ClientError::OutOfRange));
        }
    }

    #[test]
    fn float_range_uses_the_integral_part() {
        let constraints = Constraints::new().max(10);
        assert!(validate(&constraints, &DeclaredType::scalar::<f64>(), Value::Float(10.9)).is_ok());
        assert!(validate(&constraints, &DeclaredType::scalar::<f64>(), Value::Float(11.0)).is_err());
    }
}
