use crate::error::BoxError;
use crate::extract::Args;
use crate::request::RequestContext;
use crate::responder::{Reply, Responder};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// A type-erased handler method, invoked with bound arguments.
pub trait RequestHandler: Send + Sync {
    fn invoke(&self, ctx: &mut RequestContext, args: Args) -> Result<Reply, BoxError>;
}

/// A method of a shared owner instance.
///
/// Every route of a controller holds the same `Arc` of the owner, so state kept in the
/// owner is shared by all of its handler methods and all requests.
pub struct MethodHandler<C, F, R, E> {
    owner: Arc<C>,
    f: F,
    _phantom: PhantomData<fn() -> (R, E)>,
}

impl<C, F, R, E> MethodHandler<C, F, R, E>
where
    F: Fn(&C, &mut RequestContext, Args) -> Result<R, E>,
{
    fn new(owner: Arc<C>, f: F) -> Self {
        Self { owner, f, _phantom: PhantomData }
    }
}

pub fn method_handler<C, F, R, E>(owner: Arc<C>, f: F) -> MethodHandler<C, F, R, E>
where
    F: Fn(&C, &mut RequestContext, Args) -> Result<R, E>,
{
    MethodHandler::new(owner, f)
}

impl<C, F, R, E> Debug for MethodHandler<C, F, R, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandler").field("owner", &std::any::type_name::<C>()).finish_non_exhaustive()
    }
}

impl<C, F, R, E> RequestHandler for MethodHandler<C, F, R, E>
where
    C: Send + Sync,
    F: Fn(&C, &mut RequestContext, Args) -> Result<R, E> + Send + Sync,
    R: Responder,
    E: Into<BoxError>,
{
    fn invoke(&self, ctx: &mut RequestContext, args: Args) -> Result<Reply, BoxError> {
        let responder = (self.f)(&self.owner, ctx, args).map_err(Into::into)?;
        Ok(responder.into_reply()?)
    }
}
