//! Per-request orchestration of a matched route.
//!
//! A request moves through [`DispatchState`]s: values are merged, arguments bound and checked,
//! the handler invoked and its reply rendered. Any failure on the way ends in
//! [`DispatchState::Failed`], where the error is classified and written once as a plain text
//! response, unless the handler already ended the exchange itself.

use crate::body::ResponseBody;
use crate::convert::TypeConverter;
use crate::error::{ClientError, ServerError, WebError};
use crate::extract::{ArgumentBinder, RequestValueSet};
use crate::render::Renderer;
use crate::request::RequestContext;
use crate::router::Route;
use crate::rule::RuleChecker;
use http::Response;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    ValuesMerged,
    ArgsBound,
    ArgsChecked,
    Invoked,
    Rendered,
    Failed,
}

/// Runs matched routes: binds their arguments, invokes their handler and renders the result.
///
/// A dispatcher holds no per-request state and can be shared by any number of threads.
pub struct Dispatcher {
    converter: TypeConverter,
    rules: Arc<dyn RuleChecker>,
    renderer: Renderer,
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("converter", &self.converter)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(converter: TypeConverter, rules: Arc<dyn RuleChecker>, renderer: Renderer) -> Self {
        Self { converter, rules, renderer }
    }

    pub fn converter(&self) -> &TypeConverter {
        &self.converter
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn dispatch(&self, route: &Route, ctx: RequestContext) -> Response<ResponseBody> {
        self.dispatch_with_state(route, ctx).1
    }

    /// Dispatches and reports the final state, [`DispatchState::Rendered`] or [`DispatchState::Failed`].
    pub fn dispatch_with_state(
        &self,
        route: &Route,
        mut ctx: RequestContext,
    ) -> (DispatchState, Response<ResponseBody>) {
        let mut state = DispatchState::Received;
        match self.process(route, &mut ctx, &mut state) {
            Ok(response) => (DispatchState::Rendered, response),
            Err(e) => {
                error!(
                    path = route.path(),
                    state = ?state,
                    status = e.status().as_u16(),
                    cause = %e,
                    "dispatch request error"
                );
                let response = ctx.take_response().unwrap_or_else(|| self.renderer.render_error(&e));
                (DispatchState::Failed, response)
            }
        }
    }

    fn process(
        &self,
        route: &Route,
        ctx: &mut RequestContext,
        state: &mut DispatchState,
    ) -> Result<Response<ResponseBody>, WebError> {
        let values = RequestValueSet::from_request(ctx)?;
        transition(state, DispatchState::ValuesMerged);

        let args = ArgumentBinder::new(&self.converter, self.rules.as_ref()).bind(route.params(), &values)?;
        transition(state, DispatchState::ArgsBound);

        if args.is_all_null() {
            return Err(ClientError::EmptyArguments.into());
        }
        transition(state, DispatchState::ArgsChecked);

        let handler = route.handler();
        let reply = catch_unwind(AssertUnwindSafe(|| handler.invoke(ctx, args)))
            .map_err(|payload| ServerError::internal(format!("handler panicked: {}", panic_message(payload.as_ref()))))?
            .map_err(WebError::from_handler)?;
        transition(state, DispatchState::Invoked);

        if let Some(response) = ctx.take_response() {
            debug!(path = route.path(), "response ended by handler");
            return Ok(response);
        }

        let response = self.renderer.render(reply, route.content_type(), ctx.data())?;
        transition(state, DispatchState::Rendered);
        Ok(response)
    }
}

fn transition(state: &mut DispatchState, next: DispatchState) {
    debug!(from = ?*state, to = ?next, "dispatch state");
    *state = next;
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
