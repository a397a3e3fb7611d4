//! Request filtering module that selects a route among those sharing a path.
//!
//! Routes registered under the same path are told apart by their HTTP methods: every
//! route holds a [`Filter`] built from its method set, and the first route whose filter
//! matches the request is dispatched.
//!
//! ## Thread Safety
//!
//! All filters must implement the `Filter` trait, which requires `Send + Sync`,
//! so a built router can be shared across threads.
//!
//! # Examples
//!
//! ```
//! use http::Method;
//! use micro_webmvc::router::filter::{any_filter, method_filter};
//!
//! // Create a filter that matches GET or POST requests
//! let mut filter = any_filter();
//! filter.or(method_filter(Method::GET)).or(method_filter(Method::POST));
//! ```

use crate::request::RequestContext;
use http::Method;

/// Core trait for request filtering.
///
/// Filters can be composed using [`AnyFilter`].
pub trait Filter: Send + Sync {
    /// Check if the request matches this filter's criteria.
    ///
    /// Returns `true` if the request should be allowed, `false` otherwise.
    fn matches(&self, req: &RequestContext) -> bool;
}

/// Creates a filter that always returns true.
pub fn true_filter() -> TrueFilter {
    TrueFilter
}

/// A filter that always returns true.
#[derive(Debug, Clone, Copy)]
pub struct TrueFilter;

impl Filter for TrueFilter {
    #[inline]
    fn matches(&self, _req: &RequestContext) -> bool {
        true
    }
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// Compose filters with OR logic.
///
/// If any inner filter succeeds, the whole filter succeeds.
/// An empty filter chain returns true by default.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl std::fmt::Debug for AnyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyFilter").field("filters", &self.filters.len()).finish()
    }
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the OR chain.
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// A filter that matches HTTP methods.
#[derive(Debug, Clone)]
pub struct MethodFilter(Method);

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.0.eq(req.method())
    }
}

/// Creates a filter that matches requests of the given HTTP method.
#[inline]
pub fn method_filter(method: Method) -> MethodFilter {
    MethodFilter(method)
}
