//! Declarative handler dispatch for http services.
//!
//! Handler methods are grouped in [`Controller`]s and described by a [`HandlerDescriptor`] and
//! their declared [`ParamSpec`]s. For every request the [`Application`] merges the query string,
//! form or json body and path parameters into one value set, binds and validates the declared
//! arguments, invokes the handler and renders its reply according to the route's content type.
//! Failures become `400` for bad client input and `500` for everything else.
//!
//! The crate does not serve connections: a server hands it buffered [`http::Request`]s and
//! writes back the returned responses.

pub mod application;
pub mod body;
pub mod config;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod handler;
pub mod param;
pub mod render;
pub mod request;
pub mod responder;
pub mod router;
pub mod rule;
pub mod validate;
pub mod value;

pub use application::{Application, ApplicationBuilder};
pub use body::ResponseBody;
pub use config::AppConfig;
pub use error::{BoxError, ClientError, ServerError, WebError};
pub use extract::Args;
pub use param::{Constraints, FieldSpec, ParamSpec, Record};
pub use request::{PathParams, RequestContext};
pub use router::{Controller, HandlerDescriptor};
pub use value::Value;
