//! Conversion of handler return values into a [`Reply`].
//!
//! The [`Responder`] trait is the handler side of the response pipeline: it turns whatever
//! a handler returns into a content-type independent [`Reply`], which the
//! [`Renderer`](crate::render::Renderer) then writes according to the route's declared
//! content type.

use crate::error::ServerError;
use serde::Serialize;

/// A handler result before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to write, the exchange ends with an empty body.
    Empty,
    Text(String),
    Json(serde_json::Value),
}

impl Reply {
    /// Textual form, json values as compact json.
    pub fn into_text(self) -> String {
        match self {
            Reply::Empty => String::new(),
            Reply::Text(text) => text,
            Reply::Json(serde_json::Value::String(s)) => s,
            Reply::Json(value) => value.to_string(),
        }
    }
}

/// A trait for types that can be returned from handler methods.
pub trait Responder {
    fn into_reply(self) -> Result<Reply, ServerError>;
}

impl Responder for Reply {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(self)
    }
}

/// The unit type ends the exchange without a body.
impl Responder for () {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Empty)
    }
}

/// None case ends the exchange without a body.
impl<T: Responder> Responder for Option<T> {
    fn into_reply(self) -> Result<Reply, ServerError> {
        match self {
            Some(t) => t.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl Responder for String {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Text(self))
    }
}

impl Responder for &'static str {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Text(self.to_string()))
    }
}

impl Responder for serde_json::Value {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Json(self))
    }
}

impl Responder for serde_json::Map<String, serde_json::Value> {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Json(serde_json::Value::Object(self)))
    }
}

macro_rules! responder_by_display {
    ($($ty:ty),* $(,)?) => {
        $(
        impl Responder for $ty {
            fn into_reply(self) -> Result<Reply, ServerError> {
                Ok(Reply::Text(self.to_string()))
            }
        }
        )*
    };
}

responder_by_display!(bool, char, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64);

/// Any serializable value, written as json.
///
/// # Example
/// ```
/// # use micro_webmvc::responder::{Json, Reply, Responder};
/// #[derive(serde::Serialize)]
/// struct Greeting {
///     msg: String,
/// }
///
/// let reply = Json(Greeting { msg: "hi".into() }).into_reply().unwrap();
/// assert_eq!(reply, Reply::Json(serde_json::json!({"msg": "hi"})));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn into_reply(self) -> Result<Reply, ServerError> {
        Ok(Reply::Json(serde_json::to_value(self.0)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    #[test]
    fn text_values() {
        assert_eq!("hi".into_reply().unwrap(), Reply::Text("hi".into()));
        assert_eq!(String::from("x").into_reply().unwrap(), Reply::Text("x".into()));
        assert_eq!(42.into_reply().unwrap(), Reply::Text("42".into()));
    }

    #[test]
    fn empty_values() {
        assert_eq!(().into_reply().unwrap(), Reply::Empty);
        assert_eq!(None::<String>.into_reply().unwrap(), Reply::Empty);
    }

    #[test]
    fn json_values() {
        assert_eq!(Json(vec![1, 2]).into_reply().unwrap(), Reply::Json(json!([1, 2])));
        assert_eq!(json!({"a": 1}).into_reply().unwrap(), Reply::Json(json!({"a": 1})));
    }

    #[test]
    fn serialize_failure_is_server_error() {
        assert!(matches!(Json(Broken).into_reply(), Err(ServerError::Serialize(_))));
    }

    #[test]
    fn reply_text() {
        assert_eq!(Reply::Json(json!("plain")).into_text(), "plain");
        assert_eq!(Reply::Json(json!({"a": [1]})).into_text(), r#"{"a":[1]}"#);
        assert_eq!(Reply::Empty.into_text(), "");
    }
}
