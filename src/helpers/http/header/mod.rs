//! Headers recognised by Junction which do not exist in the standard headers
//! provided by the Hyper library.

/// Marks the identifier assigned to a request by the router.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The target path of an internal forward.
pub const X_FORWARDED_PATH: &str = "x-forwarded-path";

/// The path of the request that triggered an internal forward.
pub const X_ORIGINAL_PATH: &str = "x-original-path";

/// The overriding method of an internal forward, present only when the
/// forward changed the request method.
pub const X_FORWARDED_METHOD: &str = "x-forwarded-method";

/// The capacity of the rate-limit bucket that admitted the request.
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";

/// The tokens remaining in the rate-limit bucket after the request.
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// The API key presented by a client to the `api_key` middleware.
pub const X_API_KEY: &str = "x-api-key";
