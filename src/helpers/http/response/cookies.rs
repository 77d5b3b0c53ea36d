//! Forms `Set-Cookie` headers from name/value/options tuples.

use cookie::Cookie;
use hyper::header::{HeaderMap, SET_COOKIE};
use time::{Duration, OffsetDateTime};

pub use cookie::SameSite;

/// Attributes applied to a cookie when it is set.
#[derive(Clone, Debug, Default)]
pub struct CookieOptions {
    /// The `Path` attribute.
    pub path: Option<String>,
    /// The `Domain` attribute.
    pub domain: Option<String>,
    /// The `Expires` attribute.
    pub expires: Option<OffsetDateTime>,
    /// The `Max-Age` attribute.
    pub max_age: Option<Duration>,
    /// The `HttpOnly` attribute.
    pub http_only: bool,
    /// The `Secure` attribute.
    pub secure: bool,
    /// The `SameSite` attribute.
    pub same_site: Option<SameSite>,
}

/// Appends a `Set-Cookie` header for the given cookie to the map, which may
/// be a response's headers or the context's response-header accumulator.
pub fn set_cookie(headers: &mut HeaderMap, name: &str, value: &str, options: &CookieOptions) {
    let cookie = build_cookie(name, value, options);
    headers.append(SET_COOKIE, cookie.to_string().parse().unwrap());
}

/// Appends a `Set-Cookie` header that removes the named cookie: an empty
/// value with an expiry in the past.
///
/// The path and domain from `options` are kept so the removal targets the
/// same cookie scope it was set with.
pub fn clear_cookie(headers: &mut HeaderMap, name: &str, options: &CookieOptions) {
    let options = CookieOptions {
        expires: Some(OffsetDateTime::UNIX_EPOCH),
        max_age: None,
        ..options.clone()
    };
    set_cookie(headers, name, "", &options);
}

fn build_cookie(name: &str, value: &str, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build(name.to_owned(), value.to_owned())
        .http_only(options.http_only)
        .secure(options.secure);

    if let Some(path) = &options.path {
        builder = builder.path(path.clone());
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(expires) = options.expires {
        builder = builder.expires(expires);
    }
    if let Some(max_age) = options.max_age {
        builder = builder.max_age(max_age);
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site);
    }

    builder.finish()
}
