//! Cross-origin resource sharing middleware.
//!
//! Writes its headers into the context's response-header accumulator so they
//! ride on whatever response the pipeline produces; `OPTIONS` preflights are
//! answered directly with a 204.

use std::pin::Pin;

use futures_util::future;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN, VARY,
};
use hyper::{Body, Method, Response, StatusCode};
use log::trace;

use crate::context::Context;
use crate::error::SetupError;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};

/// Which origins are allowed to make cross-origin requests.
#[derive(Clone, Debug)]
pub enum Origins {
    /// Any origin (`Access-Control-Allow-Origin: *`).
    Any,
    /// A single exact origin.
    One(String),
    /// A list of exact origins.
    List(Vec<String>),
}

/// Configuration for [`Cors`].
#[derive(Clone, Debug)]
pub struct CorsSettings {
    /// Allowed origins. Defaults to any.
    pub origins: Origins,
    /// Methods advertised on preflight. Defaults to CRUD plus HEAD.
    pub methods: Vec<Method>,
    /// Headers advertised on preflight; when empty, the preflight's
    /// requested headers are echoed.
    pub allowed_headers: Vec<String>,
    /// Headers exposed to cross-origin scripts.
    pub exposed_headers: Vec<String>,
    /// Allow credentialed requests. Incompatible with a wildcard origin.
    pub credentials: bool,
    /// Preflight cache lifetime in seconds. Defaults to 86400.
    pub max_age: u32,
    /// Append `Vary: Origin` so caches keep per-origin responses apart.
    pub vary_origin: bool,
    /// Stop the filter category after a matching non-preflight request
    /// instead of falling through.
    pub end_here: bool,
}

impl Default for CorsSettings {
    fn default() -> Self {
        CorsSettings {
            origins: Origins::Any,
            methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::HEAD,
            ],
            allowed_headers: Vec::new(),
            exposed_headers: Vec::new(),
            credentials: false,
            max_age: 86400,
            vary_origin: true,
            end_here: false,
        }
    }
}

/// The CORS middleware. Register it as a filter, typically at `"*"`.
pub struct Cors {
    settings: CorsSettings,
}

impl Cors {
    /// Validates the settings and builds the middleware.
    pub fn new(settings: CorsSettings) -> Result<Self, SetupError> {
        if settings.credentials && matches!(settings.origins, Origins::Any) {
            return Err(SetupError::CorsConfig);
        }
        Ok(Cors { settings })
    }

    fn allowed_origin_value(&self, origin: &str) -> Option<String> {
        match &self.settings.origins {
            Origins::Any => Some("*".to_string()),
            Origins::One(allowed) if allowed == origin => Some(origin.to_string()),
            Origins::One(_) => None,
            Origins::List(allowed) if allowed.iter().any(|a| a == origin) => {
                Some(origin.to_string())
            }
            Origins::List(_) => None,
        }
    }

    fn apply(&self, ctx: &mut Context) -> Outcome {
        let origin = match ctx.headers().get(ORIGIN).and_then(|v| v.to_str().ok()) {
            Some(origin) => origin.to_string(),
            None => return Outcome::Continue,
        };

        let allowed = match self.allowed_origin_value(&origin) {
            Some(value) => value,
            None => {
                trace!("[{}] origin `{}` not allowed", ctx.request_id(), origin);
                if self.settings.vary_origin {
                    ctx.response_headers_mut()
                        .append(VARY, HeaderValue::from_static("Origin"));
                }
                return Outcome::Continue;
            }
        };

        let is_preflight = *ctx.method() == Method::OPTIONS;
        let requested_headers = ctx
            .headers()
            .get(ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned();

        let headers = ctx.response_headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allowed.parse().unwrap());
        if self.settings.credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if !self.settings.exposed_headers.is_empty() {
            let exposed = self.settings.exposed_headers.join(", ");
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, exposed.parse().unwrap());
        }
        if self.settings.vary_origin {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }

        if is_preflight {
            let methods = self
                .settings
                .methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.parse().unwrap());

            if !self.settings.allowed_headers.is_empty() {
                let allowed = self.settings.allowed_headers.join(", ");
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.parse().unwrap());
            } else if let Some(requested) = requested_headers {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested);
            }

            headers.insert(
                ACCESS_CONTROL_MAX_AGE,
                self.settings.max_age.to_string().parse().unwrap(),
            );

            let response = Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Body::empty())
                .expect("Response built from a compatible type");
            return Outcome::Respond(response);
        }

        if self.settings.end_here {
            Outcome::Stop
        } else {
            Outcome::Continue
        }
    }
}

impl RouteHandler for Cors {
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = self.apply(&mut ctx);
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}
