//! Defines the handler contract shared by every pipeline category.
//!
//! A function can be used directly as a handler via the blanket
//! implementation of [`RouteHandler`] for async functions and closures, or
//! the trait can be implemented directly for handlers that carry state (the
//! bundled middlewares do the latter).

use std::future::Future;
use std::pin::Pin;

use hyper::{Body, Response};

use crate::context::Context;

mod error;

pub use self::error::HandlerError;

/// What a handler decided to do with the request.
///
/// Every handler resolves to exactly one of these. Failures are not an
/// `Outcome`; they travel through the `Err` arm of [`HandlerResult`] and are
/// diverted to the catcher category.
pub enum Outcome {
    /// Finalize the pipeline with this response. Ignored when returned from
    /// a hook or an after-handler, which cannot short-circuit.
    Respond(Response<Body>),

    /// Halt the current category without producing a response, skipping the
    /// remaining handlers and remaining matched routes of that category
    /// only. Execution continues with the next category.
    Stop,

    /// Fall through to the next handler in the same category, then the next
    /// matched route, then the next category.
    Continue,
}

/// The resolution of a single handler invocation.
///
/// The context is threaded through by value in both arms so that the
/// executor always gets it back, whatever the handler did.
pub type HandlerResult = Result<(Context, Outcome), (Context, HandlerError)>;

/// The boxed future type returned by [`RouteHandler::call`].
pub type HandlerFuture = dyn Future<Output = HandlerResult> + Send;

/// A unit of work attached to a route in one of the six pipeline
/// categories.
///
/// Handlers are invoked through a shared reference, so one handler value may
/// serve many concurrent requests; any per-request state belongs in the
/// [`Context`].
pub trait RouteHandler: Send + Sync {
    /// Handles the request, returning a boxed future resolving to the
    /// handler's outcome.
    fn call(&self, ctx: Context) -> Pin<Box<HandlerFuture>>;
}

impl<F, R> RouteHandler for F
where
    F: Fn(Context) -> R + Send + Sync,
    R: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<HandlerFuture>> {
        Box::pin(self(ctx))
    }
}
