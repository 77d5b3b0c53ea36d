//! HTTP Basic authentication against a static credentials map.

use std::collections::HashMap;
use std::pin::Pin;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::future;
use hyper::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use hyper::{Body, Response, StatusCode};
use log::trace;

use crate::context::Context;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};

/// How the credential pair in the `Authorization` header is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialEncoding {
    /// Standard base64, per RFC 7617.
    Base64,
    /// The raw `user:password` pair, unencoded.
    Raw,
}

/// Configuration for [`BasicAuth`].
#[derive(Clone)]
pub struct BasicAuthSettings {
    /// The accepted `user → password` pairs.
    pub users: HashMap<String, String>,
    /// The realm announced in the `WWW-Authenticate` challenge.
    pub realm: String,
    /// Credential encoding; base64 by default.
    pub encoding: CredentialEncoding,
    /// The separator between user and password; `:` by default.
    pub separator: char,
}

impl Default for BasicAuthSettings {
    fn default() -> Self {
        BasicAuthSettings {
            users: HashMap::new(),
            realm: "Restricted".to_string(),
            encoding: CredentialEncoding::Base64,
            separator: ':',
        }
    }
}

/// The authenticated user published into the context on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicUser {
    /// The user name the credentials matched.
    pub name: String,
}

/// `Authorization: Basic` authentication middleware. Register it as a
/// filter; failures respond 401 with a `WWW-Authenticate` challenge.
pub struct BasicAuth {
    settings: BasicAuthSettings,
}

impl BasicAuth {
    /// Builds the middleware.
    pub fn new(settings: BasicAuthSettings) -> Self {
        BasicAuth { settings }
    }

    fn verify(&self, ctx: &Context) -> Option<String> {
        let header = ctx.headers().get(AUTHORIZATION)?.to_str().ok()?;
        let encoded = header.strip_prefix("Basic ")?;

        let decoded = match self.settings.encoding {
            CredentialEncoding::Base64 => {
                String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?
            }
            CredentialEncoding::Raw => encoded.to_string(),
        };

        let (user, password) = decoded.split_once(self.settings.separator)?;
        if self.settings.users.get(user)? == password {
            Some(user.to_string())
        } else {
            None
        }
    }

    fn challenge(&self, ctx: &Context) -> Response<Body> {
        let mut response = Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .body(Body::empty())
            .expect("Response built from a compatible type");
        let value = format!("Basic realm=\"{}\"", self.settings.realm);
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, value.parse().unwrap());
        trace!("[{}] basic auth challenge issued", ctx.request_id());
        response
    }
}

impl RouteHandler for BasicAuth {
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = match self.verify(&ctx) {
            Some(name) => {
                ctx.put(BasicUser { name });
                Outcome::Continue
            }
            None => Outcome::Respond(self.challenge(&ctx)),
        };
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}
