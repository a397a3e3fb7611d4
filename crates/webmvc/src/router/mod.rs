//! Route registry: maps a request path and method to a handler method.
//!
//! Controllers are collected by a [`RouterBuilder`]; [`RouterBuilder::build`] resolves every
//! route's method set and content type, rejects duplicates and parameter types the
//! converter cannot produce, and produces an immutable [`Router`].

mod controller;
pub mod filter;

pub use controller::{Controller, HandlerDescriptor, RouteDefinition};

use crate::config::AppConfig;
use crate::convert::TypeConverter;
use crate::error::RegistryError;
use crate::handler::RequestHandler;
use crate::param::{DeclaredType, ParamSpec, TypeClass};
use crate::request::{PathParams, RequestContext};
use filter::{Filter, any_filter, method_filter, true_filter};
use http::Method;
use std::fmt::{Debug, Formatter};
use tracing::{debug, info};

type RouterFilter = dyn Filter + Send + Sync + 'static;
type InnerRouter<T> = matchit::Router<T>;

/// Main router structure that handles HTTP request routing
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
    len: usize,
}

/// A router item containing a filter and the route it guards
pub struct RouterItem {
    filter: Box<RouterFilter>,
    methods: MethodSet,
    route: Route,
}

/// A registered handler method with everything needed to dispatch to it
pub struct Route {
    path: String,
    descriptor: HandlerDescriptor,
    content_type: String,
    params: Vec<ParamSpec>,
    handler: Box<dyn RequestHandler>,
}

/// The methods a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    Any,
    Only(Vec<Method>),
}

impl MethodSet {
    /// Resolves the declared methods of a handler.
    ///
    /// With strict methods, an empty declaration means `GET` and `POST`. Otherwise anything
    /// but exactly one declared method matches every method.
    pub fn resolve(declared: &[Method], strict_methods: bool) -> Self {
        if strict_methods {
            if declared.is_empty() {
                MethodSet::Only(vec![Method::GET, Method::POST])
            } else {
                MethodSet::Only(declared.to_vec())
            }
        } else if declared.len() == 1 {
            MethodSet::Only(declared.to_vec())
        } else {
            MethodSet::Any
        }
    }

    pub fn contains(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(methods) => methods.contains(method),
        }
    }

    /// A method both sets answer to, `None` as the method when both match any.
    fn overlap<'a>(&'a self, other: &'a MethodSet) -> Option<Option<&'a Method>> {
        match (self, other) {
            (MethodSet::Any, MethodSet::Any) => Some(None),
            (MethodSet::Any, MethodSet::Only(methods)) | (MethodSet::Only(methods), MethodSet::Any) => {
                methods.first().map(Some)
            }
            (MethodSet::Only(methods), MethodSet::Only(others)) => {
                methods.iter().find(|m| others.contains(m)).map(Some)
            }
        }
    }

    fn filter(&self) -> Box<RouterFilter> {
        match self {
            MethodSet::Any => Box::new(true_filter()),
            MethodSet::Only(methods) if methods.len() == 1 => Box::new(method_filter(methods[0].clone())),
            MethodSet::Only(methods) => {
                let mut filter = any_filter();
                for method in methods {
                    filter.or(method_filter(method.clone()));
                }
                Box::new(filter)
            }
        }
    }
}

/// Result of matching a route, containing matched items and path parameters
pub struct RouteResult<'router> {
    router_items: &'router [RouterItem],
    params: PathParams,
}

impl Router {
    /// Creates a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches a path against the router's routes
    ///
    /// Returns a `RouteResult` containing matched handlers and path parameters
    ///
    /// # Arguments
    /// * `path` - The path to match against
    pub fn at(&self, path: &str) -> RouteResult<'_> {
        self.inner_router
            .at(path)
            .map(|matched| RouteResult { router_items: matched.value.as_slice(), params: matched.params.into() })
            .unwrap_or_else(|e| {
                debug!(path, cause = %e, "no route matched");
                RouteResult::empty()
            })
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("routes", &self.len).finish_non_exhaustive()
    }
}

impl RouterItem {
    /// Gets the filter for this router item
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    pub fn route(&self) -> &Route {
        &self.route
    }
}

impl Debug for RouterItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItem").field("methods", &self.methods).field("route", &self.route).finish_non_exhaustive()
    }
}

impl Route {
    /// The full path, controller prefix included
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// The content type responses of this route are rendered as
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Gets the request handler for this route
    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    pub fn is_blocking(&self) -> bool {
        self.descriptor.is_blocking()
    }
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

impl<'router> RouteResult<'router> {
    fn empty() -> Self {
        Self { router_items: &[], params: PathParams::empty() }
    }

    /// Returns true if no routes were matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router_items.is_empty()
    }

    /// Gets the path parameters from the matched route
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }

    /// Gets the matched router items
    pub fn router_items(&self) -> &'router [RouterItem] {
        self.router_items
    }

    /// The first route whose filter accepts the request
    pub fn find(&self, req: &RequestContext) -> Option<&'router Route> {
        self.router_items.iter().find(|item| item.filter.matches(req)).map(RouterItem::route)
    }
}

/// Collects controllers and builds a [`Router`].
pub struct RouterBuilder {
    definitions: Vec<RouteDefinition>,
    config: AppConfig,
}

impl Debug for RouterBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder").field("definitions", &self.definitions).field("config", &self.config).finish()
    }
}

impl RouterBuilder {
    fn new() -> Self {
        Self { definitions: Vec::new(), config: AppConfig::default() }
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn controller<C: Send + Sync + 'static>(mut self, controller: Controller<C>) -> Self {
        self.definitions.extend(controller.into_routes());
        self
    }

    /// Builds the router from the accumulated routes
    ///
    /// Fails on a path and method pair registered twice, on an invalid or conflicting path
    /// pattern, and on a parameter whose type `converter` has no parser for.
    pub fn build(self, converter: &TypeConverter) -> Result<Router, RegistryError> {
        let mut grouped: Vec<(String, Vec<RouterItem>)> = Vec::new();
        let len = self.definitions.len();

        for definition in self.definitions {
            check_params(&definition.path, &definition.params, converter)?;

            let methods = MethodSet::resolve(definition.descriptor.get_methods(), self.config.strict_methods());
            let content_type = definition
                .descriptor
                .get_content_type()
                .map_or_else(|| self.config.default_content_type().to_string(), ToString::to_string);

            let index = match grouped.iter().position(|(path, _)| *path == definition.path) {
                Some(index) => index,
                None => {
                    grouped.push((definition.path.clone(), Vec::new()));
                    grouped.len() - 1
                }
            };
            let items = &mut grouped[index].1;

            if let Some(method) = items.iter().find_map(|item| item.methods.overlap(&methods)) {
                return Err(RegistryError::duplicate_route(&definition.path, method));
            }

            info!(
                path = %definition.path,
                methods = ?methods,
                content_type = %content_type,
                blocking = definition.descriptor.is_blocking(),
                "register route"
            );

            items.push(RouterItem {
                filter: methods.filter(),
                methods,
                route: Route {
                    path: definition.path,
                    descriptor: definition.descriptor,
                    content_type,
                    params: definition.params,
                    handler: definition.handler,
                },
            });
        }

        let mut inner_router = InnerRouter::new();
        for (path, items) in grouped {
            inner_router.insert(path.as_str(), items).map_err(|source| RegistryError::InvalidPath { path, source })?;
        }

        Ok(Router { inner_router, len })
    }
}

fn check_params(path: &str, params: &[ParamSpec], converter: &TypeConverter) -> Result<(), RegistryError> {
    for param in params {
        check_type(param.declared_type(), converter, false).map_err(|type_name| RegistryError::UnsupportedType {
            path: path.to_string(),
            param: param.name().to_string(),
            type_name,
        })?;
    }
    Ok(())
}

/// Record fields are assembled as json, so custom registered types are refused inside records.
fn check_type(declared: &DeclaredType, converter: &TypeConverter, in_record: bool) -> Result<(), &'static str> {
    match declared.class() {
        TypeClass::Scalar if !converter.contains(declared.type_id()) => Err(declared.name()),
        TypeClass::Scalar if in_record && converter.is_custom(declared.type_id()) => Err(declared.name()),
        TypeClass::List(item) => check_type(item, converter, in_record),
        TypeClass::Record(record) => {
            record.fields().iter().try_for_each(|field| check_type(field.declared_type(), converter, true))
        }
        _ => Ok(()),
    }
}
