//! Errors surfaced while a router or middleware is being configured.
//!
//! Everything in this module is reported at setup time. Failures that occur
//! while a request is in flight travel as
//! [`HandlerError`](crate::handler::HandlerError) instead.

use hyper::Method;
use thiserror::Error;

use crate::router::route::Category;

/// A configuration mistake detected while building a router or constructing
/// a middleware.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The route spec was not of the form `"METHOD /path"`.
    #[error("route spec `{0}` must be of the form `METHOD /path`")]
    MalformedSpec(String),

    /// The method token was not one of the recognised set.
    #[error("unknown method token `{0}` in route spec")]
    InvalidMethod(String),

    /// The route path did not begin with `/`.
    #[error("route path `{0}` must begin with `/`")]
    MissingLeadingSlash(String),

    /// A wildcard or glob segment appeared before the final segment.
    #[error("segment `{segment}` may only appear in terminal position in `{path}`")]
    MidPathWildcard {
        /// The offending route path.
        path: String,
        /// The wildcard segment found mid-path.
        segment: String,
    },

    /// A named parameter segment had no name, e.g. `/users/:`.
    #[error("parameter segment in `{0}` must have a name")]
    UnnamedParameter(String),

    /// The `(method, path, category)` cell is already populated and
    /// overwrite was not requested.
    #[error("duplicate route: {method} {path} already has {category} handlers")]
    DuplicateRoute {
        /// Method of the colliding registration.
        method: Method,
        /// Path of the colliding registration.
        path: String,
        /// Pipeline category of the colliding registration.
        category: Category,
    },

    /// Two routes tried to attach differently named parameters at the same
    /// trie position.
    #[error("parameter name conflict at `{path}`: `:{existing}` is already registered, cannot add `:{offered}`")]
    ParameterConflict {
        /// Path of the rejected registration.
        path: String,
        /// The parameter name already present at the node.
        existing: String,
        /// The conflicting name from the new registration.
        offered: String,
    },

    /// A rate limiter was constructed with neither a refill interval nor a
    /// refill rate.
    #[error("rate limiter requires a refill interval or a refill rate")]
    RateLimitConfig,

    /// CORS was configured with a wildcard origin and credentials, which the
    /// Fetch specification forbids.
    #[error("CORS with a wildcard origin cannot allow credentials")]
    CorsConfig,

    /// `authorize` was given required permissions without a `has_permission`
    /// callback to check them with.
    #[error("authorize with required permissions needs a has_permission callback")]
    AuthorizeConfig,
}
