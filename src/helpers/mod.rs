//! Helpers used across the crate and exposed for application use.

pub mod http;
