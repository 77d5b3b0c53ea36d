//! Defines the Junction `Router` and its pipeline executor.

pub mod builder;
pub mod route;
pub mod tree;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::header::{HeaderName, HeaderValue, ALLOW};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{error, trace};

use crate::context::Context;
use crate::handler::{HandlerError, Outcome, RouteHandler};
use crate::helpers::http::header::X_REQUEST_ID;
use crate::helpers::http::request::path::RequestPathSegments;
use crate::router::route::Category;
use crate::router::tree::{Match, Tree};

pub use self::builder::RouterBuilder;

/// Headers applied to every response the router finalizes, where the
/// response does not already carry them.
pub enum DefaultHeaders {
    /// A fixed list applied to each response.
    Fixed(Vec<(HeaderName, HeaderValue)>),
    /// A function computing the list per request.
    Computed(Arc<dyn Fn(&Context) -> Vec<(HeaderName, HeaderValue)> + Send + Sync>),
}

impl DefaultHeaders {
    fn resolve(&self, ctx: &Context) -> Vec<(HeaderName, HeaderValue)> {
        match self {
            DefaultHeaders::Fixed(headers) => headers.clone(),
            DefaultHeaders::Computed(f) => f(ctx),
        }
    }
}

/// Placed into the context before the configured default fallback runs,
/// naming the status the router is about to synthesize: 404 when no route
/// matched, 405 when the path matched but the method did not, 204 when the
/// pipeline produced no response.
pub struct FallbackStatus(pub StatusCode);

pub(crate) struct RouterOptions {
    pub(crate) normalize_trailing_slash: bool,
    pub(crate) enabled: [bool; Category::COUNT],
    pub(crate) default_headers: Option<DefaultHeaders>,
    pub(crate) default_fallback: Option<Arc<dyn RouteHandler>>,
    pub(crate) default_catcher: Option<Arc<dyn RouteHandler>>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        RouterOptions {
            normalize_trailing_slash: false,
            enabled: [true; Category::COUNT],
            default_headers: None,
            default_fallback: None,
            default_catcher: None,
        }
    }
}

impl RouterOptions {
    fn enabled(&self, category: Category) -> bool {
        self.enabled[category.index()]
    }
}

struct RouterData {
    tree: Tree,
    options: RouterOptions,
}

/// Responsible for dispatching HTTP requests to registered pipelines, and
/// responding with the appropriate error status when no pipeline applies.
///
/// A `Router` is assembled through
/// [`RouterBuilder`](crate::router::builder::RouterBuilder) and is immutable
/// afterwards; it clones cheaply and serves any number of concurrent
/// requests, each with its own [`Context`].
#[derive(Clone)]
pub struct Router {
    data: Arc<RouterData>,
}

impl Router {
    pub(crate) fn new(tree: Tree, options: RouterOptions) -> Router {
        Router {
            data: Arc::new(RouterData { tree, options }),
        }
    }

    /// Dispatches a request through the pipeline and produces its response.
    pub async fn respond(&self, req: Request<Body>) -> Response<Body> {
        self.dispatch(Context::from_request(req)).await.1
    }

    /// Dispatches a pre-built context, returning it alongside the response.
    ///
    /// Use this instead of [`respond`](Router::respond) when the context
    /// needs to be seeded with data before the pipeline observes it, or
    /// inspected afterwards.
    pub fn dispatch(
        &self,
        ctx: Context,
    ) -> Pin<Box<dyn Future<Output = (Context, Response<Body>)> + Send>> {
        let router = self.clone();
        Box::pin(async move { run(router, ctx).await })
    }
}

enum CategoryOutcome {
    Completed,
    Responded(Response<Body>),
    Failed(HandlerError),
}

enum Recovery {
    Recovered(Response<Body>),
    Unhandled(StatusCode),
    Terminal,
}

/// The per-request pipeline state machine.
async fn run(router: Router, mut ctx: Context) -> (Context, Response<Body>) {
    ctx.set_router(router.clone());
    let data = &*router.data;

    trace!(
        "[{}] dispatching {} {}",
        ctx.request_id(),
        ctx.method(),
        ctx.uri().path()
    );

    let segments =
        RequestPathSegments::new(ctx.uri().path(), data.options.normalize_trailing_slash);
    let matches = data.tree.lookup(segments.segments());

    let method = ctx.method().clone();
    let allowed = matches.iter().any(|m| m.table.has_method(&method));

    // Produce a response: through the pipeline when the method is routable,
    // through the unrouted defaults otherwise.
    let (c, produced) = if allowed {
        let (c, result) = run_pre_categories(data, ctx, &matches).await;
        match result {
            Ok(Some(response)) => (c, Ok(response)),
            Ok(None) => resolve_default(data, c, StatusCode::NO_CONTENT, None).await,
            Err(e) => (c, Err(e)),
        }
    } else if matches.is_empty() {
        trace!("[{}] no matching route", ctx.request_id());
        resolve_default(data, ctx, StatusCode::NOT_FOUND, None).await
    } else {
        trace!("[{}] path matched but method did not", ctx.request_id());
        let allow = allowed_methods(&matches);
        resolve_default(data, ctx, StatusCode::METHOD_NOT_ALLOWED, Some(allow)).await
    };
    ctx = c;

    let mut terminal = false;
    let mut response = match produced {
        Ok(response) => response,
        Err(e) => {
            let (c, recovery) = recover(data, ctx, &matches, e).await;
            ctx = c;
            match recovery {
                Recovery::Recovered(response) => response,
                Recovery::Unhandled(status) => synthesize(status),
                Recovery::Terminal => {
                    terminal = true;
                    synthesize(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
    };

    finalize_headers(data, &mut ctx, &mut response);

    // The catcher chain failing terminally is the one case where
    // after-handlers are skipped.
    if terminal || !data.options.enabled(Category::After) {
        return (ctx, response);
    }

    ctx.set_response(response);
    let (c, outcome) = run_category(ctx, &matches, Category::After).await;
    ctx = c;

    if let CategoryOutcome::Failed(e) = outcome {
        let (c, recovery) = recover(data, ctx, &matches, e).await;
        ctx = c;
        let mut response = match recovery {
            Recovery::Recovered(response) => response,
            Recovery::Unhandled(status) => synthesize(status),
            Recovery::Terminal => return (ctx, synthesize(StatusCode::INTERNAL_SERVER_ERROR)),
        };
        finalize_headers(data, &mut ctx, &mut response);
        return (ctx, response);
    }

    let response = match ctx.take_response() {
        Some(response) => response,
        None => synthesize(StatusCode::INTERNAL_SERVER_ERROR),
    };
    (ctx, response)
}

/// Runs hook, filter, handler and fallback in order, stopping at the first
/// response or failure.
async fn run_pre_categories(
    data: &RouterData,
    mut ctx: Context,
    matches: &[Match<'_>],
) -> (Context, Result<Option<Response<Body>>, HandlerError>) {
    for &category in Category::PRE_RESPONSE.iter() {
        if !data.options.enabled(category) {
            continue;
        }
        let (c, outcome) = run_category(ctx, matches, category).await;
        ctx = c;
        match outcome {
            CategoryOutcome::Completed => {}
            CategoryOutcome::Responded(response) => return (ctx, Ok(Some(response))),
            CategoryOutcome::Failed(e) => return (ctx, Err(e)),
        }
    }
    (ctx, Ok(None))
}

/// Runs one category across the matched routes, leaf-first, each route's
/// handlers in registration order.
async fn run_category(
    mut ctx: Context,
    matches: &[Match<'_>],
    category: Category,
) -> (Context, CategoryOutcome) {
    // Hooks and afters observe; their returned responses are dropped.
    let observe_only = matches!(category, Category::Hook | Category::After);
    let method = ctx.method().clone();

    for m in matches {
        let handlers = m.table.get(&method, category);
        if handlers.is_empty() {
            continue;
        }
        ctx.set_params(m.params.clone());

        for handler in handlers {
            trace!("[{}] running {} handler", ctx.request_id(), category);
            match handler.call(ctx).await {
                Ok((c, Outcome::Continue)) => ctx = c,
                Ok((c, Outcome::Stop)) => {
                    trace!("[{}] {} pipeline stopped", c.request_id(), category);
                    return (c, CategoryOutcome::Completed);
                }
                Ok((c, Outcome::Respond(response))) => {
                    if observe_only {
                        trace!(
                            "[{}] ignoring response returned from {} handler",
                            c.request_id(),
                            category
                        );
                        ctx = c;
                    } else {
                        trace!("[{}] {} handler responded", c.request_id(), category);
                        return (c, CategoryOutcome::Responded(response));
                    }
                }
                Err((c, e)) => return (c, CategoryOutcome::Failed(e)),
            }
        }
    }
    (ctx, CategoryOutcome::Completed)
}

/// Diverts a failure to the catcher category, then the configured default
/// catcher, then a synthesized status.
async fn recover(
    data: &RouterData,
    mut ctx: Context,
    matches: &[Match<'_>],
    err: HandlerError,
) -> (Context, Recovery) {
    error!("[{}] {}", ctx.request_id(), err);
    let mut status = err.status();
    ctx.set_error(err);

    if data.options.enabled(Category::Catcher) {
        let (c, outcome) = run_category(ctx, matches, Category::Catcher).await;
        ctx = c;
        match outcome {
            CategoryOutcome::Responded(response) => return (ctx, Recovery::Recovered(response)),
            CategoryOutcome::Completed => {}
            CategoryOutcome::Failed(e) => {
                error!("[{}] catcher failed: {}", ctx.request_id(), e);
                status = e.status();
                ctx.set_error(e);
            }
        }
    }

    if let Some(catcher) = &data.options.default_catcher {
        match catcher.call(ctx).await {
            Ok((c, Outcome::Respond(response))) => return (c, Recovery::Recovered(response)),
            Ok((c, _)) => ctx = c,
            Err((c, e)) => {
                error!("[{}] default catcher failed: {}", c.request_id(), e);
                return (c, Recovery::Terminal);
            }
        }
    }

    (ctx, Recovery::Unhandled(status))
}

/// Produces the response for a pipeline that yielded nothing: the configured
/// default fallback first, a synthesized status otherwise.
async fn resolve_default(
    data: &RouterData,
    mut ctx: Context,
    status: StatusCode,
    allow: Option<Vec<Method>>,
) -> (Context, Result<Response<Body>, HandlerError>) {
    if let Some(fallback) = &data.options.default_fallback {
        ctx.put(FallbackStatus(status));
        match fallback.call(ctx).await {
            Ok((c, Outcome::Respond(response))) => return (c, Ok(response)),
            Ok((c, _)) => ctx = c,
            Err((c, e)) => return (c, Err(e)),
        }
    }

    let mut response = synthesize(status);
    if let Some(methods) = allow {
        let list = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = list.parse() {
            response.headers_mut().insert(ALLOW, value);
        }
    }
    (ctx, Ok(response))
}

/// Merges the context's response-header accumulator, then applies default
/// headers and the request id where absent.
fn finalize_headers(data: &RouterData, ctx: &mut Context, response: &mut Response<Body>) {
    let accumulated = ctx.drain_response_headers();
    let mut current: Option<HeaderName> = None;
    for (name, value) in accumulated {
        if let Some(name) = name {
            current = Some(name);
        }
        if let Some(name) = &current {
            response.headers_mut().append(name.clone(), value);
        }
    }

    if let Some(defaults) = &data.options.default_headers {
        for (name, value) in defaults.resolve(ctx) {
            if !response.headers().contains_key(&name) {
                response.headers_mut().insert(name, value);
            }
        }
    }

    if !response.headers().contains_key(X_REQUEST_ID) {
        if let Ok(value) = ctx.request_id().parse() {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
}

fn allowed_methods(matches: &[Match<'_>]) -> Vec<Method> {
    let mut methods: Vec<Method> = Vec::new();
    for m in matches {
        for method in m.table.methods() {
            if !methods.contains(method) {
                methods.push(method.clone());
            }
        }
    }
    methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    methods
}

fn synthesize(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .expect("Response built from a compatible type")
}
