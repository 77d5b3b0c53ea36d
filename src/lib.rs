//! Junction &ndash; a server-independent HTTP request router.
//!
//! Junction matches incoming requests against a path trie, builds a
//! per-request [`Context`](context::Context) and drives the handlers
//! registered for the matched routes through a fixed pipeline of categories:
//! hook, filter, handler, fallback and after, with catchers interposing when
//! a handler fails.
//!
//! The crate deliberately stops at the request/response boundary. Accepting
//! connections, TLS and timeouts belong to the host server; Junction only
//! turns a `hyper::Request<Body>` into a `hyper::Response<Body>`.
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod handler;
pub mod helpers;
pub mod middleware;
pub mod router;

/// Re-export of the `hyper` crate, which provides the request and response
/// types consumed and produced by the router.
pub use hyper;

/// Re-export of the `mime` crate for use with the response helpers.
pub use mime;

/// A collection of types that nearly every application using Junction needs
/// in scope.
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::error::SetupError;
    pub use crate::handler::{HandlerResult, Outcome, RouteHandler};
    pub use crate::router::builder::RouterBuilder;
    pub use crate::router::route::Category;
    pub use crate::router::Router;
}
