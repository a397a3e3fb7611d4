//! The entry point handed to a server: routes a buffered request and dispatches it.
//!
//! # Example
//! ```
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//! use micro_webmvc::application::Application;
//! use micro_webmvc::error::BoxError;
//! use micro_webmvc::extract::Args;
//! use micro_webmvc::param::ParamSpec;
//! use micro_webmvc::request::RequestContext;
//! use micro_webmvc::router::{Controller, HandlerDescriptor};
//!
//! #[derive(Default)]
//! struct Main;
//!
//! impl Main {
//!     fn hi(&self, _ctx: &mut RequestContext, mut args: Args) -> Result<String, BoxError> {
//!         Ok(format!("hi {}", args.take::<i64>("msg")?))
//!     }
//! }
//!
//! let app = Application::builder()
//!     .controller(Controller::<Main>::new().prefix("/main").handler(
//!         HandlerDescriptor::get("/hi"),
//!         [ParamSpec::scalar::<i64>("msg")],
//!         Main::hi,
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let request = Request::get("/main/hi?msg=2026").body(Bytes::new()).unwrap();
//! let response = app.dispatch(request);
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use crate::body::ResponseBody;
use crate::config::AppConfig;
use crate::convert::TypeConverter;
use crate::dispatcher::Dispatcher;
use crate::error::{ConvertError, RegistryError};
use crate::render::{MiniJinjaEngine, Renderer, TemplateEngine};
use crate::request::RequestContext;
use crate::router::{Controller, Route, Router, RouterBuilder};
use crate::rule::{RegexRuleChecker, RuleChecker};
use crate::value::Value;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{info, warn};

/// A built router together with the dispatcher running its routes.
#[derive(Debug)]
pub struct Application {
    router: Router,
    dispatcher: Dispatcher,
    config: AppConfig,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Handles one request and always produces a response.
    ///
    /// An unknown path gets `404`, a known path without a route for the request method gets `405`.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let mut ctx = RequestContext::new(request);

        let route_result = self.router.at(ctx.uri().path());
        if route_result.is_empty() {
            warn!(method = %ctx.method(), uri = %ctx.uri(), "no route found");
            return crate::render::plain(StatusCode::NOT_FOUND, "not found".to_string());
        }

        let Some(route) = route_result.find(&ctx) else {
            warn!(method = %ctx.method(), uri = %ctx.uri(), "method not allowed");
            return crate::render::plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string());
        };

        ctx.set_path_params(route_result.into_params());
        self.dispatcher.dispatch(route, ctx)
    }

    /// The route a request with `method` and `path` would be dispatched to.
    ///
    /// Servers use it to choose where to run the request, see [`Route::is_blocking`].
    pub fn route(&self, method: &Method, path: &str) -> Option<&Route> {
        let request = Request::builder().method(method.clone()).uri(path).body(Bytes::new()).ok()?;
        let ctx = RequestContext::new(request);
        self.router.at(path).find(&ctx)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Collects configuration, collaborators and controllers of an [`Application`].
pub struct ApplicationBuilder {
    config: AppConfig,
    converter: TypeConverter,
    rules: Option<Arc<dyn RuleChecker>>,
    engine: Option<Arc<dyn TemplateEngine>>,
    router: RouterBuilder,
}

impl Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("converter", &self.converter)
            .field("rules", &self.rules.is_some())
            .field("engine", &self.engine.is_some())
            .field("router", &self.router)
            .finish()
    }
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config: AppConfig::default(),
            converter: TypeConverter::new(),
            rules: None,
            engine: None,
            router: Router::builder(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the whole type converter, builtin parsers included.
    #[must_use]
    pub fn type_converter(mut self, converter: TypeConverter) -> Self {
        self.converter = converter;
        self
    }

    #[must_use]
    pub fn register_type<T, F>(mut self, convert: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        self.converter.register::<T, F>(convert);
        self
    }

    #[must_use]
    pub fn register_custom<T, F>(mut self, convert: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, ConvertError> + Send + Sync + 'static,
    {
        self.converter.register_custom::<T, F>(convert);
        self
    }

    /// Checker of constraint rules, a [`RegexRuleChecker`] if not set.
    #[must_use]
    pub fn rule_checker<R: RuleChecker + 'static>(mut self, rules: R) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    /// Engine of html routes. Without one, templates are loaded from the configured template
    /// directory if any, else html routes render plain text.
    #[must_use]
    pub fn template_engine<E: TemplateEngine + 'static>(mut self, engine: E) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    #[must_use]
    pub fn controller<C: Send + Sync + 'static>(mut self, controller: Controller<C>) -> Self {
        self.router = self.router.controller(controller);
        self
    }

    /// Builds the router and the dispatcher, see [`RouterBuilder::build`] for the failures.
    pub fn build(self) -> Result<Application, RegistryError> {
        let router = self.router.config(self.config.clone()).build(&self.converter)?;
        info!(routes = router.len(), "router built");

        let engine = self.engine.or_else(|| {
            self.config.template_dir().map(|dir| {
                info!(dir = %dir.display(), "loading templates from directory");
                Arc::new(MiniJinjaEngine::from_dir(dir)) as Arc<dyn TemplateEngine>
            })
        });
        let mut renderer = Renderer::new(self.config.template_prefix());
        if let Some(engine) = engine {
            renderer = renderer.with_engine(engine);
        }

        let rules = self.rules.unwrap_or_else(|| Arc::new(RegexRuleChecker::new()) as Arc<dyn RuleChecker>);
        let dispatcher = Dispatcher::new(self.converter, rules, renderer);
        Ok(Application { router, dispatcher, config: self.config })
    }
}
