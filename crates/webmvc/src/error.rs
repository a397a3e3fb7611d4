//! Error taxonomy for binding, validation, dispatch and route registration.
//!
//! Request-time failures fall in two families:
//! - [`ClientError`]: the request itself is unacceptable, answered with `400`
//! - [`ServerError`]: anything else, answered with `500`
//!
//! [`WebError`] is the union the dispatcher classifies, and the only place a status code is chosen.
//! [`RegistryError`] is raised while the router is being built, before any request is served.

use http::{Method, StatusCode};
use std::error::Error as StdError;
use thiserror::Error;

/// The error type handler methods may return.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure of the string to typed value conversion table.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("invalid argument '{value}': {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("unsupported type: {type_name}")]
    UnsupportedType { type_name: &'static str },
}

impl ConvertError {
    pub fn invalid_argument<V: ToString, R: ToString>(value: V, reason: R) -> Self {
        Self::InvalidArgument { value: value.to_string(), reason: reason.to_string() }
    }

    pub fn unsupported_type(type_name: &'static str) -> Self {
        Self::UnsupportedType { type_name }
    }
}

/// A client input error, always mapped to `400 Bad Request`.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("missing parameter: {name}")]
    MissingParameter { name: String },

    #[error("missing field: {record}.{field}")]
    MissingField { record: &'static str, field: String },

    #[error("required parameter is empty")]
    RequiredEmpty,

    #[error("exceeds the maximum size limit")]
    SizeExceeded,

    #[error("unsupported values")]
    UnsupportedValue,

    #[error("rule check failed")]
    RuleCheckFailed,

    #[error("exceeds the value limit")]
    OutOfRange,

    #[error("parse date failed: '{value}' does not match '{pattern}'")]
    ParseDate { value: String, pattern: String },

    #[error("no enum constant {type_name}.{value}")]
    UnknownConstant { type_name: &'static str, value: String },

    #[error("bad parameter {name}: {source}")]
    BadParameter {
        name: String,
        #[source]
        source: ConvertError,
    },

    #[error("parse record {record} error: {reason}")]
    Record { record: &'static str, reason: String },

    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },

    #[error("request parameter is empty")]
    EmptyArguments,

    #[error("{0}")]
    Message(String),
}

impl ClientError {
    pub fn bad_parameter<S: ToString>(name: S, source: ConvertError) -> Self {
        Self::BadParameter { name: name.to_string(), source }
    }

    pub fn malformed_body<S: ToString>(reason: S) -> Self {
        Self::MalformedBody { reason: reason.to_string() }
    }

    /// A free-form client error, for handlers rejecting input on their own terms.
    pub fn message<S: ToString>(message: S) -> Self {
        Self::Message(message.to_string())
    }
}

/// A server side failure, mapped to `500 Internal Server Error`.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("unsupported type: {type_name}")]
    UnsupportedType { type_name: &'static str },

    #[error("array parameters are not supported: {type_name}")]
    UnsupportedArray { type_name: &'static str },

    #[error("expected a value of type {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("no argument named '{name}'")]
    NoSuchArgument { name: String },

    #[error("serialize response failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{reason}")]
    Template { reason: String },

    #[error("{0}")]
    Handler(BoxError),

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl ServerError {
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn internal<S: ToString>(reason: S) -> Self {
        Self::Internal { reason: reason.to_string() }
    }
}

/// Every failure a dispatched request can end in.
#[derive(Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl WebError {
    /// Classifies an error raised by a handler body.
    ///
    /// Client and web errors returned as-is keep their family. Everything else is a
    /// [`ServerError::Handler`], whose status still becomes `400` when its direct cause
    /// is a client error.
    pub fn from_handler(err: BoxError) -> Self {
        match err.downcast::<ClientError>() {
            Ok(client) => WebError::Client(*client),
            Err(err) => match err.downcast::<WebError>() {
                Ok(web) => *web,
                Err(err) => WebError::Server(ServerError::Handler(err)),
            },
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            WebError::Client(_) => true,
            WebError::Server(ServerError::Handler(err)) => err.source().is_some_and(|cause| {
                cause.is::<ClientError>()
                    || cause.downcast_ref::<WebError>().is_some_and(|web| matches!(web, WebError::Client(_)))
            }),
            WebError::Server(_) => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        if self.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR }
    }
}

/// Errors detected while building the routing table.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { path: String, method: String },

    #[error("invalid route path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("route {path}: parameter '{param}' has unsupported type {type_name}")]
    UnsupportedType { path: String, param: String, type_name: &'static str },
}

impl RegistryError {
    pub(crate) fn duplicate_route(path: &str, method: Option<&Method>) -> Self {
        let method = method.map_or_else(|| "*".to_string(), ToString::to_string);
        Self::DuplicateRoute { path: path.to_string(), method }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("wrapped: {source}")]
    struct Wrapped {
        #[source]
        source: ClientError,
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        let err = WebError::from(ClientError::RequiredEmpty);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "required parameter is empty");
    }

    #[test]
    fn server_errors_map_to_internal_error() {
        let err = WebError::from(ServerError::UnsupportedType { type_name: "Foo" });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn handler_client_error_is_unwrapped() {
        let boxed: BoxError = Box::new(ClientError::message("bad input"));
        let err = WebError::from_handler(boxed);
        assert!(matches!(err, WebError::Client(ClientError::Message(_))));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad input");
    }

    #[test]
    fn handler_error_caused_by_client_error_is_bad_request() {
        let boxed: BoxError = Box::new(Wrapped { source: ClientError::OutOfRange });
        let err = WebError::from_handler(boxed);
        assert!(matches!(err, WebError::Server(ServerError::Handler(_))));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "wrapped: exceeds the value limit");
    }

    #[test]
    fn arbitrary_handler_error_is_internal() {
        let boxed: BoxError = "disk on fire".into();
        let err = WebError::from_handler(boxed);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "disk on fire");
    }
}
