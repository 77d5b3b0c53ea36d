//! Assembles routers.
//!
//! All registration and configuration happens on a [`RouterBuilder`];
//! [`finish`](RouterBuilder::finish) freezes the trie into an immutable
//! [`Router`](crate::router::Router) that can serve requests concurrently.
//! Registering routes after requests are being served is not supported —
//! build first, then serve.

use std::sync::Arc;

use hyper::header::{HeaderName, HeaderValue};
use hyper::Method;

use crate::context::Context;
use crate::error::SetupError;
use crate::handler::RouteHandler;
use crate::router::route::spec::{parse_path, render_path, IntoRouteSpecs};
use crate::router::route::{Category, HandlerSeq};
use crate::router::tree::segment::SegmentType;
use crate::router::tree::Tree;
use crate::router::{DefaultHeaders, Router, RouterOptions};

/// Collects routes, middlewares and configuration, then finishes into a
/// [`Router`].
///
/// Set configuration flags (notably
/// [`normalize_trailing_slash`](RouterBuilder::normalize_trailing_slash))
/// before registering routes; normalization is applied at insertion time.
pub struct RouterBuilder {
    tree: Tree,
    options: RouterOptions,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        RouterBuilder::new()
    }
}

impl RouterBuilder {
    /// Creates an empty builder with default configuration.
    pub fn new() -> Self {
        RouterBuilder {
            tree: Tree::new(),
            options: RouterOptions::default(),
        }
    }

    /// Registers a hook: a pre-processing observer that runs before any
    /// other category. Responses returned from hooks are ignored.
    pub fn hook<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::Hook, handler, false)
    }

    /// Registers a filter: a gatekeeper that may short-circuit the pipeline
    /// with a response. The bundled middlewares are usually placed here.
    pub fn filter<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::Filter, handler, false)
    }

    /// Registers a handler: a primary responder.
    pub fn handle<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::Handler, handler, false)
    }

    /// Registers a fallback, which runs only when no handler produced a
    /// response.
    pub fn fallback<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::Fallback, handler, false)
    }

    /// Registers a catcher, which runs when a handler in any category of a
    /// matched route fails. The failure is available through
    /// [`Context::error`](crate::context::Context::error).
    pub fn catch<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::Catcher, handler, false)
    }

    /// Registers an after-handler, which observes the finalized response and
    /// may mutate or replace it through the context.
    pub fn after<S, H>(&mut self, spec: S, handler: H) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register(spec, Category::After, handler, false)
    }

    /// Registers a single handler into an arbitrary category, optionally
    /// overwriting an already-populated `(method, path, category)` cell.
    pub fn register<S, H>(
        &mut self,
        spec: S,
        category: Category,
        handler: H,
        overwrite: bool,
    ) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
        H: RouteHandler + 'static,
    {
        self.register_pipeline(spec, category, vec![Arc::new(handler)], overwrite)
    }

    /// Registers an ordered handler sequence into a category cell. The
    /// sequence runs first-to-last when the route matches.
    pub fn register_pipeline<S>(
        &mut self,
        spec: S,
        category: Category,
        handlers: Vec<Arc<dyn RouteHandler>>,
        overwrite: bool,
    ) -> Result<&mut Self, SetupError>
    where
        S: IntoRouteSpecs,
    {
        for mut route in spec.into_route_specs()? {
            if self.options.normalize_trailing_slash {
                route.normalize();
            }
            let path = route.path();
            let (methods, segments) = route.into_parts();
            for method in methods {
                self.tree
                    .insert(method, &segments, category, handlers.clone(), overwrite, &path)?;
            }
        }
        Ok(self)
    }

    /// Copies every route of `child` into this builder under `prefix`.
    ///
    /// Only routes carry over: the child's configuration (default headers,
    /// default catcher, default fallback, category flags) is discarded.
    /// Handlers needing their owning router at request time resolve it
    /// through the context, which always names the executing router.
    pub fn append(&mut self, prefix: &str, child: RouterBuilder) -> Result<&mut Self, SetupError> {
        let mut prefix_segments = parse_path(prefix)?;
        while prefix_segments.last() == Some(&SegmentType::Static(String::new())) {
            prefix_segments.pop();
        }
        if let Some(segment) = prefix_segments.iter().find(|s| s.is_terminal_only()) {
            return Err(SetupError::MidPathWildcard {
                path: prefix.to_string(),
                segment: segment.to_string(),
            });
        }

        let mut entries: Vec<(Vec<SegmentType>, Method, Category, HandlerSeq)> = Vec::new();
        child.tree.visit(&mut |segments, method, category, handlers| {
            let mut joined = prefix_segments.clone();
            joined.extend_from_slice(segments);
            entries.push((joined, method.clone(), category, handlers.clone()));
        });

        for (mut segments, method, category, handlers) in entries {
            if self.options.normalize_trailing_slash
                && segments.last() == Some(&SegmentType::Static(String::new()))
            {
                segments.pop();
            }
            let path = render_path(&segments);
            self.tree
                .insert(method, &segments, category, handlers, false, &path)?;
        }
        Ok(self)
    }

    /// Collapses `/api/` and `/api` to the same route at both insertion and
    /// lookup. Off by default. Set this before registering routes.
    pub fn normalize_trailing_slash(&mut self, enabled: bool) -> &mut Self {
        self.options.normalize_trailing_slash = enabled;
        self
    }

    /// Disables an entire pipeline category; the executor will skip it.
    pub fn disable(&mut self, category: Category) -> &mut Self {
        self.options.enabled[category.index()] = false;
        self
    }

    /// Sets a fixed list of headers applied to every response that does not
    /// already carry them.
    pub fn default_headers(&mut self, headers: Vec<(HeaderName, HeaderValue)>) -> &mut Self {
        self.options.default_headers = Some(DefaultHeaders::Fixed(headers));
        self
    }

    /// Sets a function computing per-request default headers.
    pub fn default_headers_with<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Context) -> Vec<(HeaderName, HeaderValue)> + Send + Sync + 'static,
    {
        self.options.default_headers = Some(DefaultHeaders::Computed(Arc::new(f)));
        self
    }

    /// Sets the handler consulted when the pipeline yields no response: on
    /// 404 (no route), 405 (no method) and the no-response 204. The status
    /// about to be synthesized is placed in the context as
    /// [`FallbackStatus`](crate::router::FallbackStatus).
    pub fn default_fallback<H>(&mut self, handler: H) -> &mut Self
    where
        H: RouteHandler + 'static,
    {
        self.options.default_fallback = Some(Arc::new(handler));
        self
    }

    /// Sets the handler of last resort for failures no route catcher
    /// converted into a response. If it also fails, the router synthesizes
    /// a 500.
    pub fn default_catcher<H>(&mut self, handler: H) -> &mut Self
    where
        H: RouteHandler + 'static,
    {
        self.options.default_catcher = Some(Arc::new(handler));
        self
    }

    /// Freezes the trie and produces the immutable, cloneable [`Router`].
    pub fn finish(self) -> Router {
        Router::new(self.tree, self.options)
    }
}
