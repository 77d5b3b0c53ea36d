//! Composable middlewares for the pipeline categories.
//!
//! Every middleware here is an ordinary
//! [`RouteHandler`](crate::handler::RouteHandler), usually registered as a
//! filter so it can short-circuit the pipeline. Middlewares publish their
//! results into the [`Context`](crate::context::Context) extension storage
//! for downstream handlers to borrow.

pub mod auth;
pub mod cors;
pub mod multipart;
pub mod rate_limit;
