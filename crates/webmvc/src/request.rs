//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with a dispatched request:
//! - `RequestContext`: the request head and body, path parameters, template data and an
//!   optional response written directly by the handler
//! - `PathParams`: URL path parameters extracted from request paths

use crate::body::ResponseBody;
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Response, Uri, Version, header};
use matchit::Params;
use tracing::warn;

/// Represents the context of an HTTP request while it is being dispatched.
///
/// Handlers receive it by mutable reference: they may read anything from the request, store
/// template data with [`put`](RequestContext::put), or [`end`](RequestContext::end) the
/// exchange with a response of their own, in which case the returned value is not rendered.
#[derive(Debug)]
pub struct RequestContext {
    head: Parts,
    body: Bytes,
    path_params: PathParams,
    data: serde_json::Map<String, serde_json::Value>,
    response: Option<Response<ResponseBody>>,
}

impl RequestContext {
    /// Creates a new RequestContext owning the given request
    pub fn new(request: Request<Bytes>) -> Self {
        let (head, body) = request.into_parts();
        Self { head, body, path_params: PathParams::empty(), data: serde_json::Map::new(), response: None }
    }

    pub(crate) fn set_path_params(&mut self, path_params: PathParams) {
        self.path_params = path_params;
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.head.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Returns the `Content-Type` header, if present and valid text
    pub fn content_type(&self) -> Option<&str> {
        self.head.headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    /// Returns the buffered request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Stores a template variable
    pub fn put<K: Into<String>, V: Into<serde_json::Value>>(&mut self, key: K, value: V) {
        self.data.insert(key.into(), value.into());
    }

    /// Returns a template variable
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Returns all template variables
    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }

    /// Ends the exchange with `response`.
    ///
    /// Only the first response is kept, later calls return `false` and are ignored.
    pub fn end(&mut self, response: Response<ResponseBody>) -> bool {
        if self.response.is_some() {
            warn!(uri = %self.head.uri, "response already ended, ignoring");
            return false;
        }
        self.response = Some(response);
        true
    }

    /// Returns true if a handler already ended the exchange
    pub fn is_ended(&self) -> bool {
        self.response.is_some()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response<ResponseBody>> {
        self.response.take()
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the URL path that can be extracted and accessed
/// by name. For example, in the path "/users/{id}", "id" is a path parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Iterates over the parameters in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<Params<'_, '_>> for PathParams {
    fn from(params: Params<'_, '_>) -> Self {
        Self { params: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RequestContext {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/main/hi?msg=1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        RequestContext::new(request)
    }

    #[test]
    fn exposes_the_request() {
        let ctx = request();
        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.uri().path(), "/main/hi");
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(ctx.body().as_ref(), b"{}");
        assert!(ctx.path_params().is_empty());
    }

    #[test]
    fn template_data() {
        let mut ctx = request();
        ctx.put("name", "micro");
        ctx.put("count", 2);
        assert_eq!(ctx.get("name"), Some(&serde_json::json!("micro")));
        assert_eq!(ctx.data().len(), 2);
    }

    #[test]
    fn first_response_wins() {
        let mut ctx = request();
        assert!(!ctx.is_ended());
        assert!(ctx.end(Response::new(ResponseBody::from("first"))));
        assert!(!ctx.end(Response::new(ResponseBody::from("second"))));
        assert!(ctx.is_ended());

        let response = ctx.take_response().unwrap();
        assert_eq!(response.body().bytes().map(Bytes::as_ref), Some(b"first".as_ref()));
    }

    #[test]
    fn path_params_from_router() {
        let mut router = matchit::Router::new();
        router.insert("/users/{id}/{tab}", ()).unwrap();
        let matched = router.at("/users/42/posts").unwrap();

        let params = PathParams::from(matched.params);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("tab"), Some("posts"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["id", "tab"]);
    }
}
