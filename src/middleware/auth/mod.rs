//! Authentication and authorization primitives.
//!
//! The concrete schemes ([`basic`], [`api_key`], [`jwt`]) parse credentials
//! out of request headers and publish a value into the context; the generic
//! [`Authenticate`] does the same for any caller-supplied parser, and
//! [`Authorize`] checks roles and permissions on a previously published
//! subject.

use std::any::Any;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::future;
use hyper::StatusCode;
use log::trace;

use crate::context::Context;
use crate::error::SetupError;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};
use crate::helpers::http::response::{create_empty_response, create_response};

pub mod api_key;
pub mod basic;
pub mod jwt;

pub use self::api_key::{ApiKey, ApiKeyAuth};
pub use self::basic::{BasicAuth, BasicAuthSettings, BasicUser, CredentialEncoding};
pub use self::jwt::{JwtAuth, JwtClaims, JwtSettings, JwtVerification};

/// What an [`Authenticate`] parser made of the request.
pub enum AuthAttempt<A> {
    /// Credentials parsed and accepted; the value is published into the
    /// context.
    Granted(A),
    /// Credentials present but rejected; the message becomes the 401 body.
    Denied(String),
    /// No credentials present; an empty 401 is returned.
    Absent,
}

/// Generic authentication middleware around a caller-supplied parser.
pub struct Authenticate<A> {
    parse: Arc<dyn Fn(&Context) -> AuthAttempt<A> + Send + Sync>,
}

impl<A> Authenticate<A>
where
    A: Any + Send,
{
    /// Wraps `parse` as a filter handler.
    pub fn new<F>(parse: F) -> Self
    where
        F: Fn(&Context) -> AuthAttempt<A> + Send + Sync + 'static,
    {
        Authenticate {
            parse: Arc::new(parse),
        }
    }
}

impl<A> RouteHandler for Authenticate<A>
where
    A: Any + Send,
{
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = match (self.parse)(&ctx) {
            AuthAttempt::Granted(subject) => {
                ctx.put(subject);
                Outcome::Continue
            }
            AuthAttempt::Denied(message) => {
                trace!("[{}] authentication denied", ctx.request_id());
                let response =
                    create_response(&ctx, StatusCode::UNAUTHORIZED, mime::TEXT_PLAIN, message);
                Outcome::Respond(response)
            }
            AuthAttempt::Absent => {
                trace!("[{}] no credentials presented", ctx.request_id());
                Outcome::Respond(create_empty_response(&ctx, StatusCode::UNAUTHORIZED))
            }
        };
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}

/// An authenticated subject that [`Authorize`] can interrogate.
///
/// Implement this on whatever value your authentication step publishes into
/// the context.
pub trait Subject: Any + Send {
    /// Whether the subject holds the named role.
    fn has_role(&self, role: &str) -> bool {
        let _ = role;
        false
    }
}

/// Configuration for [`Authorize`].
pub struct AuthorizeSettings<A> {
    /// The subject must hold this role.
    pub allow_role: Option<String>,
    /// The subject must not hold this role.
    pub forbid_role: Option<String>,
    /// Permissions the subject must all hold, checked via `has_permission`.
    pub for_permissions: Vec<String>,
    /// Callback deciding whether the subject holds a permission. Required
    /// when `for_permissions` is non-empty.
    pub has_permission: Option<Arc<dyn Fn(&A, &str) -> bool + Send + Sync>>,
}

impl<A> Default for AuthorizeSettings<A> {
    fn default() -> Self {
        AuthorizeSettings {
            allow_role: None,
            forbid_role: None,
            for_permissions: Vec::new(),
            has_permission: None,
        }
    }
}

/// Role/permission checks over a previously authenticated [`Subject`].
///
/// Responds 401 when no subject of type `A` is in the context, 403 when a
/// role or permission requirement fails.
pub struct Authorize<A> {
    settings: AuthorizeSettings<A>,
    _subject: PhantomData<fn(A)>,
}

impl<A> Authorize<A>
where
    A: Subject,
{
    /// Validates the settings and builds the middleware.
    pub fn new(settings: AuthorizeSettings<A>) -> Result<Self, SetupError> {
        if !settings.for_permissions.is_empty() && settings.has_permission.is_none() {
            return Err(SetupError::AuthorizeConfig);
        }
        Ok(Authorize {
            settings,
            _subject: PhantomData,
        })
    }

    fn decide(&self, ctx: &Context) -> Result<(), StatusCode> {
        let subject = match ctx.try_borrow::<A>() {
            Some(subject) => subject,
            None => return Err(StatusCode::UNAUTHORIZED),
        };

        if let Some(role) = &self.settings.allow_role {
            if !subject.has_role(role) {
                return Err(StatusCode::FORBIDDEN);
            }
        }
        if let Some(role) = &self.settings.forbid_role {
            if subject.has_role(role) {
                return Err(StatusCode::FORBIDDEN);
            }
        }
        if let Some(check) = &self.settings.has_permission {
            for permission in &self.settings.for_permissions {
                if !check(subject, permission) {
                    return Err(StatusCode::FORBIDDEN);
                }
            }
        }
        Ok(())
    }
}

impl<A> RouteHandler for Authorize<A>
where
    A: Subject,
{
    fn call(&self, ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = match self.decide(&ctx) {
            Ok(()) => Outcome::Continue,
            Err(status) => {
                trace!("[{}] authorization refused: {}", ctx.request_id(), status);
                Outcome::Respond(create_empty_response(&ctx, status))
            }
        };
        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}
