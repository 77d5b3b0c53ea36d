//! Defines the per-request `Context` threaded through handler pipelines.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use hyper::{Body, HeaderMap, Method, Request, Response, Uri};
use log::trace;
use uuid::Uuid;

use crate::handler::{HandlerError, HandlerResult, Outcome};
use crate::helpers::http::header::{X_FORWARDED_METHOD, X_FORWARDED_PATH, X_ORIGINAL_PATH};
use crate::router::Router;

/// Path parameters captured while matching a request against the route trie.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Looks up a captured parameter by the name it was declared with
    /// (without the leading `:`).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterates over all captured `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The number of captured parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.values.insert(name, value);
    }
}

/// Provides storage for request state as it travels through the pipeline.
///
/// Alongside the fixed request fields (method, URI, headers, body, captured
/// params), a `Context` stores one value of each type put into it, which is
/// how middlewares publish their output: `authBasic` stores a
/// [`BasicUser`](crate::middleware::auth::BasicUser), `upload` stores an
/// [`Upload`](crate::middleware::multipart::Upload), and so on.
///
/// A context is created fresh for each request, either internally by
/// [`Router::respond`](crate::router::Router::respond) or by the caller via
/// [`Context::from_request`] when seed data needs to be attached before
/// dispatch.
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Body>,
    params: Params,
    request_id: String,
    response_headers: HeaderMap,
    response: Option<Response<Body>>,
    error: Option<HandlerError>,
    router: Option<Router>,
    data: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("request_id", &self.request_id)
            .field("response_headers", &self.response_headers)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Context {
    /// Builds a fresh context from a request, assigning it a new request id.
    ///
    /// The request body is stowed in the body slot, from which exactly one
    /// consumer (typically a body-parsing middleware) may take it.
    pub fn from_request(req: Request<Body>) -> Self {
        let (parts, body) = req.into_parts();
        Context {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Some(body),
            params: Params::default(),
            request_id: Uuid::new_v4().to_string(),
            response_headers: HeaderMap::new(),
            response: None,
            error: None,
            router: None,
            data: HashMap::new(),
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Takes the request body out of the context, leaving the slot empty.
    ///
    /// Returns `None` if the body was already consumed.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// The path parameters captured for the route currently executing.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// The identifier assigned to this request, echoed as `X-Request-ID`.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The response-header accumulator.
    ///
    /// Headers placed here by hooks and filters are merged onto whatever
    /// response the pipeline eventually produces.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Mutable access to the response-header accumulator.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    pub(crate) fn drain_response_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.response_headers)
    }

    /// The response produced by the pipeline, populated before
    /// after-handlers run.
    pub fn response(&self) -> Option<&Response<Body>> {
        self.response.as_ref()
    }

    /// Mutable access to the pipeline's response, for after-handlers that
    /// adjust status or headers in place.
    pub fn response_mut(&mut self) -> Option<&mut Response<Body>> {
        self.response.as_mut()
    }

    /// Replaces the pipeline's response. Meaningful from after-handlers;
    /// other categories short-circuit with
    /// [`Outcome::Respond`](crate::handler::Outcome::Respond) instead.
    pub fn set_response(&mut self, response: Response<Body>) {
        self.response = Some(response);
    }

    pub(crate) fn take_response(&mut self) -> Option<Response<Body>> {
        self.response.take()
    }

    /// The error being handled, present while the catcher category runs.
    pub fn error(&self) -> Option<&HandlerError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: HandlerError) {
        self.error = Some(error);
    }

    /// The router executing this request, once dispatch has begun.
    pub fn router(&self) -> Option<&Router> {
        self.router.as_ref()
    }

    pub(crate) fn set_router(&mut self, router: Router) {
        self.router = Some(router);
    }

    /// Puts a value into the context's extension storage. One value of each
    /// type is retained; successive calls with the same type overwrite.
    pub fn put<T>(&mut self, t: T)
    where
        T: Any + Send,
    {
        let type_id = TypeId::of::<T>();
        trace!(" inserting record to context for type_id `{:?}`", type_id);
        self.data.insert(type_id, Box::new(t));
    }

    /// Determines if a value of type `T` is present.
    pub fn has<T>(&self) -> bool
    where
        T: Any + Send,
    {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Tries to borrow a value of type `T` from the extension storage.
    pub fn try_borrow<T>(&self) -> Option<&T>
    where
        T: Any + Send,
    {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    /// Borrows a value of type `T`.
    ///
    /// # Panics
    ///
    /// If a value of type `T` is not present.
    pub fn borrow<T>(&self) -> &T
    where
        T: Any + Send,
    {
        self.try_borrow()
            .expect("required type is not present in Context container")
    }

    /// Tries to mutably borrow a value of type `T`.
    pub fn try_borrow_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Any + Send,
    {
        self.data
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut())
    }

    /// Mutably borrows a value of type `T`.
    ///
    /// # Panics
    ///
    /// If a value of type `T` is not present.
    pub fn borrow_mut<T>(&mut self) -> &mut T
    where
        T: Any + Send,
    {
        self.try_borrow_mut()
            .expect("required type is not present in Context container")
    }

    /// Tries to move a value of type `T` out of the extension storage.
    pub fn try_take<T>(&mut self) -> Option<T>
    where
        T: Any + Send,
    {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok())
            .map(|b| *b)
    }

    /// Moves a value of type `T` out of the extension storage.
    ///
    /// # Panics
    ///
    /// If a value of type `T` is not present.
    pub fn take<T>(&mut self) -> T
    where
        T: Any + Send,
    {
        self.try_take()
            .expect("required type is not present in Context container")
    }

    /// Re-dispatches this request internally through the executing router at
    /// a different path, preserving the request and its extension data.
    ///
    /// The forwarded request gains `X-Forwarded-Path` (the target path) and
    /// `X-Original-Path` (the path of the request that triggered the
    /// forward). The response produced by the inner dispatch becomes this
    /// handler's outcome.
    pub fn forward(self, path: &str) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> {
        self.forward_with(path, None)
    }

    /// Like [`forward`](Context::forward), additionally overriding the
    /// request method. The override is recorded as `X-Forwarded-Method`.
    pub fn forward_with(
        mut self,
        path: &str,
        method: Option<Method>,
    ) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> {
        let router = match self.router.clone() {
            Some(router) => router,
            None => {
                let err = HandlerError::msg("forward is only available during router dispatch");
                return Box::pin(futures_util::future::ready(Err((self, err))));
            }
        };

        let target: Uri = match path.parse() {
            Ok(uri) => uri,
            Err(e) => {
                let err = HandlerError::from(e);
                return Box::pin(futures_util::future::ready(Err((self, err))));
            }
        };

        let original = self.uri.path().to_string();
        if let Ok(value) = path.parse() {
            self.headers.insert(X_FORWARDED_PATH, value);
        }
        if let Ok(value) = original.parse() {
            self.headers.insert(X_ORIGINAL_PATH, value);
        }
        if let Some(method) = method {
            if let Ok(value) = method.as_str().parse() {
                self.headers.insert(X_FORWARDED_METHOD, value);
            }
            self.method = method;
        }

        trace!(
            "[{}] forwarding {} -> {}",
            self.request_id,
            original,
            path
        );

        self.uri = target;
        self.params = Params::default();
        self.response = None;

        Box::pin(async move {
            let (ctx, response) = router.dispatch(self).await;
            Ok((ctx, Outcome::Respond(response)))
        })
    }
}
