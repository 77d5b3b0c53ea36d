//! Helpers for HTTP request processing.

pub mod path;
