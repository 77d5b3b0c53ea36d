//! Bearer-token authentication delegating to an external JWT verifier.
//!
//! Signature checking is deliberately not implemented here; the verifier
//! callback owns it, and this middleware owns header parsing, payload
//! validation and context publication.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::future;
use hyper::header::AUTHORIZATION;
use hyper::StatusCode;
use log::trace;
use serde_json::Value;

use crate::context::Context;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};
use crate::helpers::http::response::{create_empty_response, create_response};

/// The result of the external verifier: a payload on success, an error
/// message otherwise.
#[derive(Clone, Debug, Default)]
pub struct JwtVerification {
    /// The decoded claims when the token verified.
    pub payload: Option<Value>,
    /// The failure message when it did not.
    pub error: Option<String>,
}

/// Configuration for [`JwtAuth`].
#[derive(Clone)]
pub struct JwtSettings {
    /// The black-box verifier for the bearer token.
    pub verify: Arc<dyn Fn(&str) -> JwtVerification + Send + Sync>,
    /// Optional extra validation over the verified payload.
    pub validate: Option<Arc<dyn Fn(&Value) -> bool + Send + Sync>>,
}

/// The verified token published into the context on success.
#[derive(Clone, Debug)]
pub struct JwtClaims {
    /// The raw bearer token as presented.
    pub token: String,
    /// The verified payload.
    pub payload: Value,
}

/// `Authorization: Bearer` authentication middleware. Register it as a
/// filter; failures respond 401.
pub struct JwtAuth {
    settings: JwtSettings,
}

impl JwtAuth {
    /// Builds the middleware.
    pub fn new(settings: JwtSettings) -> Self {
        JwtAuth { settings }
    }

    fn verify(&self, ctx: &Context) -> Result<JwtClaims, Option<String>> {
        let header = ctx
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(None)?;
        let token = header.strip_prefix("Bearer ").ok_or(None)?.trim();
        if token.is_empty() {
            return Err(None);
        }

        let verification = (self.settings.verify)(token);
        if let Some(error) = verification.error {
            return Err(Some(error));
        }
        let payload = verification.payload.ok_or(None)?;

        if let Some(validate) = &self.settings.validate {
            if !validate(&payload) {
                return Err(Some("token payload rejected".to_string()));
            }
        }

        Ok(JwtClaims {
            token: token.to_string(),
            payload,
        })
    }
}

impl RouteHandler for JwtAuth {
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = match self.verify(&ctx) {
            Ok(claims) => {
                ctx.put(claims);
                Outcome::Continue
            }
            Err(Some(message)) => {
                trace!("[{}] jwt rejected: {}", ctx.request_id(), message);
                let response =
                    create_response(&ctx, StatusCode::UNAUTHORIZED, mime::TEXT_PLAIN, message);
                Outcome::Respond(response)
            }
            Err(None) => {
                trace!("[{}] no bearer token presented", ctx.request_id());
                Outcome::Respond(create_empty_response(&ctx, StatusCode::UNAUTHORIZED))
            }
        };
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}
