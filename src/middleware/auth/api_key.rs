//! API-key authentication via the `X-API-Key` header.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::future;
use hyper::StatusCode;
use log::trace;

use crate::context::Context;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};
use crate::helpers::http::header::X_API_KEY;
use crate::helpers::http::response::create_empty_response;

/// The accepted API key published into the context on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey(pub String);

/// `X-API-Key` authentication middleware around a caller-supplied verifier.
/// Register it as a filter; a missing or rejected key responds 401.
pub struct ApiKeyAuth {
    verify: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl ApiKeyAuth {
    /// Wraps `verify` as a filter handler.
    pub fn new<F>(verify: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        ApiKeyAuth {
            verify: Arc::new(verify),
        }
    }
}

impl RouteHandler for ApiKeyAuth {
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let key = ctx
            .headers()
            .get(X_API_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let outcome = match key {
            Some(key) if (self.verify)(&key) => {
                ctx.put(ApiKey(key));
                Outcome::Continue
            }
            Some(_) => {
                trace!("[{}] api key rejected", ctx.request_id());
                Outcome::Respond(create_empty_response(&ctx, StatusCode::UNAUTHORIZED))
            }
            None => {
                trace!("[{}] no api key presented", ctx.request_id());
                Outcome::Respond(create_empty_response(&ctx, StatusCode::UNAUTHORIZED))
            }
        };
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}
