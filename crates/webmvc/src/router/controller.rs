use crate::error::BoxError;
use crate::extract::Args;
use crate::handler::{RequestHandler, method_handler};
use crate::param::ParamSpec;
use crate::request::RequestContext;
use crate::responder::Responder;
use http::Method;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Routing metadata of one handler method.
///
/// An empty method set and an unset content type are resolved when the router is built,
/// see [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    path: String,
    methods: Vec<Method>,
    content_type: Option<String>,
    blocking: bool,
}

impl HandlerDescriptor {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into(), methods: Vec::new(), content_type: None, blocking: false }
    }

    pub fn get<S: Into<String>>(path: S) -> Self {
        Self::new(path).method(Method::GET)
    }

    pub fn post<S: Into<String>>(path: S) -> Self {
        Self::new(path).method(Method::POST)
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    #[must_use]
    pub fn methods<I: IntoIterator<Item = Method>>(self, methods: I) -> Self {
        methods.into_iter().fold(self, Self::method)
    }

    #[must_use]
    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Marks the handler as doing blocking work, a hint for the serving layer.
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get_methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }
}

/// A handler method registered on a controller, not yet placed in a router.
pub struct RouteDefinition {
    pub(crate) path: String,
    pub(crate) descriptor: HandlerDescriptor,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) handler: Box<dyn RequestHandler>,
}

impl Debug for RouteDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("path", &self.path)
            .field("descriptor", &self.descriptor)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A group of handler methods sharing one owner instance and one path prefix.
///
/// The owner is created once, when the controller is created, and every method of the
/// controller is invoked on that same instance.
///
/// # Example
/// ```
/// use micro_webmvc::error::BoxError;
/// use micro_webmvc::extract::Args;
/// use micro_webmvc::param::ParamSpec;
/// use micro_webmvc::request::RequestContext;
/// use micro_webmvc::router::{Controller, HandlerDescriptor};
///
/// #[derive(Default)]
/// struct Greeter;
///
/// impl Greeter {
///     fn hi(&self, _ctx: &mut RequestContext, mut args: Args) -> Result<String, BoxError> {
///         Ok(format!("hi {}", args.take::<String>("msg")?))
///     }
/// }
///
/// let controller = Controller::<Greeter>::new()
///     .prefix("/main")
///     .handler(HandlerDescriptor::get("/hi"), [ParamSpec::scalar::<String>("msg")], Greeter::hi);
/// assert_eq!(controller.len(), 1);
/// ```
pub struct Controller<C> {
    prefix: String,
    owner: Arc<C>,
    routes: Vec<RouteDefinition>,
}

impl<C> Debug for Controller<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("owner", &std::any::type_name::<C>())
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .finish()
    }
}

impl<C: Default + Send + Sync + 'static> Controller<C> {
    /// Creates the controller with a default-constructed owner.
    pub fn new() -> Self {
        Self::with_owner(C::default())
    }
}

impl<C: Default + Send + Sync + 'static> Default for Controller<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> Controller<C> {
    pub fn with_owner(owner: C) -> Self {
        Self { prefix: String::new(), owner: Arc::new(owner), routes: Vec::new() }
    }

    /// Path prefix applied to every handler of this controller.
    #[must_use]
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn handler<P, F, R, E>(mut self, descriptor: HandlerDescriptor, params: P, f: F) -> Self
    where
        P: IntoIterator<Item = ParamSpec>,
        F: Fn(&C, &mut RequestContext, Args) -> Result<R, E> + Send + Sync + 'static,
        R: Responder + 'static,
        E: Into<BoxError> + 'static,
    {
        let handler = method_handler(Arc::clone(&self.owner), f);
        self.routes.push(RouteDefinition {
            path: join_path(&self.prefix, descriptor.path()),
            descriptor,
            params: params.into_iter().collect(),
            handler: Box::new(handler),
        });
        self
    }

    pub fn owner(&self) -> &Arc<C> {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<RouteDefinition> {
        self.routes
    }
}

pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if prefix.is_empty() && path.is_empty() {
        return "/".to_string();
    }
    if prefix.is_empty() {
        return format!("/{path}");
    }
    let prefix = if prefix.starts_with('/') { prefix.to_string() } else { format!("/{prefix}") };
    if path.is_empty() { prefix } else { format!("{prefix}/{path}") }
}
