//! Content type driven rendering of handler replies and dispatch failures.
//!
//! The declared content type of a route picks one of three modes:
//! - contains `application/json`: the reply is written as json
//! - contains `text/html`: the reply names a template rendered with the request's template
//!   data, or is written as plain text when no [`TemplateEngine`] is configured
//! - anything else: the reply is written as plain text

use crate::body::ResponseBody;
use crate::error::{ServerError, WebError};
use crate::responder::Reply;
use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use minijinja::Environment;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub type TemplateVars = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
#[error("{reason}")]
pub struct TemplateError {
    reason: String,
}

impl TemplateError {
    pub fn new<S: ToString>(reason: S) -> Self {
        Self { reason: reason.to_string() }
    }
}

/// Renders a named template against template variables.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEngine: Send + Sync {
    fn render(&self, vars: &TemplateVars, template_name: &str) -> Result<Bytes, TemplateError>;
}

/// A [`TemplateEngine`] backed by a `minijinja` environment.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new(env: Environment<'static>) -> Self {
        Self { env }
    }

    /// Loads templates from files below `dir`, named by their relative path.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref()));
        Self { env }
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, vars: &TemplateVars, template_name: &str) -> Result<Bytes, TemplateError> {
        let template = self.env.get_template(template_name).map_err(TemplateError::new)?;
        let rendered = template.render(vars).map_err(TemplateError::new)?;
        Ok(Bytes::from(rendered))
    }
}

/// Turns replies and failures into responses.
#[derive(Clone)]
pub struct Renderer {
    engine: Option<Arc<dyn TemplateEngine>>,
    template_prefix: String,
}

impl Debug for Renderer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("engine", &self.engine.is_some())
            .field("template_prefix", &self.template_prefix)
            .finish()
    }
}

impl Renderer {
    pub fn new<S: Into<String>>(template_prefix: S) -> Self {
        Self { engine: None, template_prefix: template_prefix.into() }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn render(
        &self,
        reply: Reply,
        content_type: &str,
        vars: &TemplateVars,
    ) -> Result<Response<ResponseBody>, WebError> {
        if reply == Reply::Empty {
            return Ok(Response::new(ResponseBody::empty()));
        }

        if content_type.contains(mime::APPLICATION_JSON.essence_str()) {
            return Ok(response(StatusCode::OK, content_type, ResponseBody::from(reply.into_text())));
        }

        if content_type.contains(mime::TEXT_HTML.essence_str()) {
            let name = reply.into_text();
            let Some(engine) = &self.engine else {
                return Ok(plain(StatusCode::OK, name));
            };
            let template = format!("{}{}", self.template_prefix, name);
            return match engine.render(vars, &template) {
                Ok(bytes) => Ok(response(StatusCode::OK, content_type, ResponseBody::from(bytes))),
                Err(e) => {
                    error!(template = %template, cause = %e, "render template error");
                    Err(ServerError::Template { reason: e.to_string() }.into())
                }
            };
        }

        Ok(plain(StatusCode::OK, reply.into_text()))
    }

    /// The response of a failed dispatch: the classified status and the error message.
    pub fn render_error(&self, err: &WebError) -> Response<ResponseBody> {
        plain(err.status(), err.to_string())
    }
}

pub(crate) fn plain(status: StatusCode, body: String) -> Response<ResponseBody> {
    response(status, mime::TEXT_PLAIN_UTF_8.as_ref(), ResponseBody::from(body))
}

/// Builds a response, degrading to a bare 500 when `content_type` is not a valid header value.
pub(crate) fn response(status: StatusCode, content_type: &str, body: ResponseBody) -> Response<ResponseBody> {
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            let mut response = Response::new(body);
            *response.status_mut() = status;
            response.headers_mut().insert(header::CONTENT_TYPE, value);
            response
        }
        Err(e) => {
            error!(content_type, cause = %e, "invalid content type");
            let mut response = Response::new(ResponseBody::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}
