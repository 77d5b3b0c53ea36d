//! Helpers for HTTP response generation.

use std::borrow::Cow;
use std::time::SystemTime;

use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE, DATE, LOCATION};
use hyper::{Body, Method, Response, StatusCode};
use mime::Mime;

use crate::context::Context;
use crate::helpers::http::header::X_REQUEST_ID;

mod cookies;

pub use self::cookies::{clear_cookie, set_cookie, CookieOptions, SameSite};

/// Creates a `Response` object with the given body and content type,
/// carrying the request id assigned by the router.
///
/// For `HEAD` requests the body is discarded, mirroring what a conforming
/// server must send on the wire.
pub fn create_response<B: Into<Body>>(
    ctx: &Context,
    status: StatusCode,
    mime: Mime,
    body: B,
) -> Response<Body> {
    construct_response(ctx, status, Some(body), Some(mime))
}

/// Produces a simple empty `Response` with the provided status.
pub fn create_empty_response(ctx: &Context, status: StatusCode) -> Response<Body> {
    construct_response::<&str>(ctx, status, None, None)
}

/// Produces an empty `Response` with a `Location` header and a 308 status.
pub fn create_permanent_redirect<L: Into<Cow<'static, str>>>(
    ctx: &Context,
    location: L,
) -> Response<Body> {
    let mut res = create_empty_response(ctx, StatusCode::PERMANENT_REDIRECT);
    set_redirect_headers(ctx, &mut res, location);
    res
}

/// Produces an empty `Response` with a `Location` header and a 307 status.
pub fn create_temporary_redirect<L: Into<Cow<'static, str>>>(
    ctx: &Context,
    location: L,
) -> Response<Body> {
    let mut res = create_empty_response(ctx, StatusCode::TEMPORARY_REDIRECT);
    set_redirect_headers(ctx, &mut res, location);
    res
}

/// Sets redirect headers on a given `Response`.
pub fn set_redirect_headers<B, L: Into<Cow<'static, str>>>(
    ctx: &Context,
    res: &mut Response<B>,
    location: L,
) {
    let headers = res.headers_mut();
    set_request_id(ctx, headers);
    headers.insert(LOCATION, location.into().to_string().parse().unwrap());
}

/// Inserts a `Date` header carrying the current time into the given map.
///
/// Suitable for use inside a default-headers closure on the router builder.
pub fn set_date_header(headers: &mut HeaderMap) {
    let formatted = httpdate::fmt_http_date(SystemTime::now());
    headers.insert(DATE, formatted.parse().unwrap());
}

/// Simple response construction.
fn construct_response<B: Into<Body>>(
    ctx: &Context,
    status: StatusCode,
    body: Option<B>,
    mime: Option<Mime>,
) -> Response<Body> {
    let mut builder = Response::builder().status(status);

    if let Some(mime) = mime {
        builder = builder.header(CONTENT_TYPE, mime.as_ref());
    }

    let built = if body.is_some() && *ctx.method() != Method::HEAD {
        builder.body(body.unwrap().into())
    } else {
        builder.body(Body::empty())
    };

    let mut response = built.expect("Response built from a compatible type");
    set_request_id(ctx, response.headers_mut());
    response
}

/// Sets the request id inside a given `HeaderMap`.
fn set_request_id(ctx: &Context, headers: &mut HeaderMap) {
    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        headers.insert(X_REQUEST_ID, value);
    }
}
