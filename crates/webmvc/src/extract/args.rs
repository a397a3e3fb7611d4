use crate::convert::NamedEnum;
use crate::error::ServerError;
use crate::value::{FromValue, Value};

/// One bound handler argument.
#[derive(Debug)]
pub enum Arg {
    /// Placeholder for the request context, which the handler receives directly.
    Context,
    Bound { name: String, value: Value },
}

impl Arg {
    pub fn is_null(&self) -> bool {
        match self {
            Arg::Context => false,
            Arg::Bound { value, .. } => value.is_null(),
        }
    }
}

/// The ordered arguments a handler is invoked with, one per declared parameter.
///
/// Values are moved out by name, so each argument can be taken once.
#[derive(Debug, Default)]
pub struct Args {
    args: Vec<Arg>,
}

impl Args {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// True when no argument carries a value, which includes having no argument at all.
    pub fn is_all_null(&self) -> bool {
        self.args.iter().all(Arg::is_null)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.args.iter().find_map(|arg| match arg {
            Arg::Bound { name: n, value } if n == name => Some(value),
            _ => None,
        })
    }

    /// Moves the value of `name` out, leaving null behind.
    pub fn take_value(&mut self, name: &str) -> Result<Value, ServerError> {
        self.args
            .iter_mut()
            .find_map(|arg| match arg {
                Arg::Bound { name: n, value } if n == name => Some(std::mem::replace(value, Value::Null)),
                _ => None,
            })
            .ok_or_else(|| ServerError::NoSuchArgument { name: name.to_string() })
    }

    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, ServerError> {
        T::from_value(self.take_value(name)?)
    }

    pub fn take_enum<E: NamedEnum>(&mut self, name: &str) -> Result<Option<E>, ServerError> {
        match self.take_value(name)? {
            Value::Null => Ok(None),
            value => value.into_enum::<E>().map(Some),
        }
    }

    pub fn take_record<R: 'static>(&mut self, name: &str) -> Result<Option<R>, ServerError> {
        match self.take_value(name)? {
            Value::Null => Ok(None),
            value => value.into_record::<R>().map(Some),
        }
    }

    pub fn take_custom<T: 'static>(&mut self, name: &str) -> Result<Option<T>, ServerError> {
        match self.take_value(name)? {
            Value::Null => Ok(None),
            value => value.into_custom::<T>().map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(name: &str, value: Value) -> Arg {
        Arg::Bound { name: name.to_string(), value }
    }

    #[test]
    fn empty_args_are_all_null() {
        assert!(Args::default().is_all_null());
    }

    #[test]
    fn context_is_never_null() {
        let args = Args::new(vec![Arg::Context, bound("a", Value::Null)]);
        assert!(!args.is_all_null());
    }

    #[test]
    fn null_values_only() {
        let args = Args::new(vec![bound("a", Value::Null), bound("b", Value::Null)]);
        assert!(args.is_all_null());
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn take_by_name() {
        let mut args = Args::new(vec![bound("msg", Value::Str("hi".into())), bound("n", Value::Int(3))]);
        assert_eq!(args.take::<String>("msg").unwrap(), "hi");
        assert_eq!(args.take::<i32>("n").unwrap(), 3);
        // taken values leave null behind
        assert_eq!(args.take::<Option<String>>("msg").unwrap(), None);
        assert!(matches!(args.take::<i32>("missing"), Err(ServerError::NoSuchArgument { .. })));
    }

    #[test]
    fn take_record_and_custom() {
        let mut args = Args::new(vec![bound("r", Value::Record(Box::new(5_i64))), bound("c", Value::Null)]);
        assert_eq!(args.take_record::<i64>("r").unwrap(), Some(5));
        assert_eq!(args.take_custom::<String>("c").unwrap(), None);
    }
}
