//! Token-bucket rate limiting keyed by a caller-supplied identity.
//!
//! Each identity owns a bucket of tokens; a request consumes one. Buckets
//! refill either at fixed intervals or continuously, and live in a
//! concurrent cache with TTL eviction so dynamic keys (per-user, per-IP) do
//! not grow without bound.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures_util::future;
use hyper::header::RETRY_AFTER;
use hyper::{Body, Response, StatusCode};
use log::trace;

use crate::context::Context;
use crate::error::SetupError;
use crate::handler::{HandlerFuture, Outcome, RouteHandler};
use crate::helpers::http::header::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};

/// Computes the bucket identity for a request.
pub type KeyFn = dyn Fn(&Context) -> String + Send + Sync;

/// An injectable millisecond clock.
pub type ClockFn = dyn Fn() -> u64 + Send + Sync;

/// Tuning for the identity → bucket cache.
#[derive(Clone, Debug)]
pub struct CacheSettings {
    /// Entries idle longer than this many milliseconds are evicted.
    pub ttl: u64,
    /// Minimum milliseconds between eviction sweeps.
    pub sweep_interval: u64,
    /// Hard cap on cached buckets; the oldest beyond it are force-evicted.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl: 10 * 60 * 1000,
            sweep_interval: 60 * 1000,
            max_entries: 100_000,
        }
    }
}

/// Configuration for [`RateLimit`].
///
/// Either `refill_interval` or `refill_rate` (or both) must be provided;
/// [`RateLimit::new`] fails otherwise. With an interval, the bucket gains
/// `refill_rate` tokens (default: back to full) once per elapsed interval;
/// without one, tokens accrue continuously at `refill_rate` per denominator
/// unit of time.
#[derive(Clone)]
pub struct RateLimitSettings {
    /// Bucket identity; defaults to the request path.
    pub key: Option<Arc<KeyFn>>,
    /// Bucket capacity.
    pub max_tokens: f64,
    /// Milliseconds between refills (fixed-interval mode).
    pub refill_interval: Option<u64>,
    /// Tokens added per refill, or per denominator unit in continuous mode.
    pub refill_rate: Option<f64>,
    /// Denominator for rate math in milliseconds; 1000 means tokens/second.
    pub refill_time_seconds_denominator: u64,
    /// Injectable clock returning milliseconds; defaults to wall time.
    pub now: Option<Arc<ClockFn>>,
    /// Adds `X-RateLimit-Limit` and `X-RateLimit-Remaining` to responses.
    pub set_x_rate_limit_headers: bool,
    /// Bucket cache tuning.
    pub cache: CacheSettings,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            key: None,
            max_tokens: 60.0,
            refill_interval: None,
            refill_rate: None,
            refill_time_seconds_denominator: 1000,
            now: None,
            set_x_rate_limit_headers: false,
            cache: CacheSettings::default(),
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: u64,
    last_access: u64,
}

enum Admission {
    Allowed { remaining: f64 },
    Rejected { retry_after_secs: u64 },
}

/// The token-bucket rate limiting middleware. Register it as a filter.
pub struct RateLimit {
    key: Arc<KeyFn>,
    now: Arc<ClockFn>,
    max_tokens: f64,
    refill_interval: Option<u64>,
    refill_rate: Option<f64>,
    denominator: u64,
    set_headers: bool,
    cache: CacheSettings,
    buckets: DashMap<String, Bucket>,
    last_sweep: AtomicU64,
}

impl RateLimit {
    /// Validates the settings and builds the limiter.
    pub fn new(settings: RateLimitSettings) -> Result<Self, SetupError> {
        if settings.refill_interval.is_none() && settings.refill_rate.is_none() {
            return Err(SetupError::RateLimitConfig);
        }

        Ok(RateLimit {
            key: settings
                .key
                .unwrap_or_else(|| Arc::new(|ctx: &Context| ctx.uri().path().to_string())),
            now: settings.now.unwrap_or_else(|| Arc::new(wall_clock_ms)),
            max_tokens: settings.max_tokens,
            refill_interval: settings.refill_interval,
            refill_rate: settings.refill_rate,
            denominator: settings.refill_time_seconds_denominator.max(1),
            set_headers: settings.set_x_rate_limit_headers,
            cache: settings.cache,
            buckets: DashMap::new(),
            last_sweep: AtomicU64::new(0),
        })
    }

    fn admit(&self, ctx: &Context) -> Admission {
        let now = (self.now)();
        self.maybe_sweep(now);

        let key = (self.key)(ctx);
        let mut entry = self.buckets.entry(key).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_refill: now,
            last_access: now,
        });
        let bucket = entry.value_mut();
        bucket.last_access = now;

        let elapsed = now.saturating_sub(bucket.last_refill);
        if let Some(interval) = self.refill_interval {
            if interval > 0 && elapsed >= interval {
                let refills = (elapsed / interval) as f64;
                let rate = self.refill_rate.unwrap_or(self.max_tokens);
                bucket.tokens = (bucket.tokens + rate * refills).min(self.max_tokens);
                bucket.last_refill = now;
            }
        } else if let Some(rate) = self.refill_rate {
            bucket.tokens =
                (bucket.tokens + rate * elapsed as f64 / self.denominator as f64)
                    .min(self.max_tokens);
            bucket.last_refill = now;
        }

        if bucket.tokens <= 0.0 {
            let retry_after_secs = match self.refill_interval {
                Some(interval) => {
                    let since = now.saturating_sub(bucket.last_refill);
                    let wait = interval.saturating_sub(since);
                    (wait as f64 / self.denominator as f64).ceil() as u64
                }
                None => {
                    let rate = self.refill_rate.unwrap_or(1.0);
                    (1.0 / rate).ceil() as u64
                }
            };
            Admission::Rejected { retry_after_secs }
        } else {
            bucket.tokens = (bucket.tokens - 1.0).max(0.0);
            Admission::Allowed {
                remaining: bucket.tokens,
            }
        }
    }

    /// Evicts idle buckets, amortized onto the request path so the limiter
    /// works without a background runtime.
    fn maybe_sweep(&self, now: u64) {
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.saturating_sub(last) < self.cache.sweep_interval {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let ttl = self.cache.ttl;
        self.buckets
            .retain(|_, bucket| now.saturating_sub(bucket.last_access) < ttl);

        if self.buckets.len() > self.cache.max_entries {
            let overflow = self.buckets.len() - self.cache.max_entries;
            let mut entries: Vec<(String, u64)> = self
                .buckets
                .iter()
                .map(|r| {
                    let age = now.saturating_sub(r.value().last_access);
                    (r.key().clone(), age)
                })
                .collect();
            entries.sort_unstable_by(|a, b| b.1.cmp(&a.1));
            for (key, _) in entries.into_iter().take(overflow) {
                self.buckets.remove(&key);
            }
        }
    }
}

impl RouteHandler for RateLimit {
    fn call(&self, mut ctx: Context) -> Pin<Box<HandlerFuture>> {
        let outcome = match self.admit(&ctx) {
            Admission::Allowed { remaining } => {
                if self.set_headers {
                    let headers = ctx.response_headers_mut();
                    headers.insert(
                        X_RATELIMIT_LIMIT,
                        (self.max_tokens as u64).to_string().parse().unwrap(),
                    );
                    headers.insert(
                        X_RATELIMIT_REMAINING,
                        (remaining.floor() as u64).to_string().parse().unwrap(),
                    );
                }
                Outcome::Continue
            }
            Admission::Rejected { retry_after_secs } => {
                trace!("[{}] rate limit exceeded", ctx.request_id());
                let mut response = Response::builder()
                    .status(StatusCode::TOO_MANY_REQUESTS)
                    .body(Body::empty())
                    .expect("Response built from a compatible type");
                let headers = response.headers_mut();
                headers.insert(RETRY_AFTER, retry_after_secs.to_string().parse().unwrap());
                if self.set_headers {
                    headers.insert(
                        X_RATELIMIT_LIMIT,
                        (self.max_tokens as u64).to_string().parse().unwrap(),
                    );
                    headers.insert(X_RATELIMIT_REMAINING, "0".parse().unwrap());
                }
                Outcome::Respond(response)
            }
        };

        Box::pin(future::ready(Ok((ctx, outcome))))
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
