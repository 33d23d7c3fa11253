use http::{Extensions, Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use ulid::Ulid;

use super::response::Response;
use crate::error::ResponseError;
use crate::handler::HandlerResult;
use crate::router::{normalize_path, Captures, RouteInfo};

/// Inbound request handed to the dispatcher by the transport
pub type Request = http::Request<Vec<u8>>;

/// Per-request state threaded through middleware and the handler.
///
/// Contexts are pooled. A context is exclusively owned by one request between
/// [`ContextPool::acquire`](super::ContextPool::acquire) and
/// [`ContextPool::release`](super::ContextPool::release), and
/// [`reset`](Self::reset) overwrites every field before it is handed to a new
/// request: parameters, bound route, allowed methods and extensions from the
/// previous request are never observable.
///
/// Parameter values are stored as byte ranges into the normalized request
/// path, so reading them never allocates.
#[derive(Debug)]
pub struct Context {
    request: Request,
    response: Response,
    method: Method,
    path: String,
    captures: Captures,
    route: Option<Arc<RouteInfo>>,
    allowed: Vec<Method>,
    extensions: Extensions,
    request_id: Ulid,
    debug: bool,
    pub(crate) generation: u64,
}

impl Context {
    pub(crate) fn new(generation: u64, param_capacity: usize) -> Self {
        Self {
            request: Request::default(),
            response: Response::new(),
            method: Method::GET,
            path: String::new(),
            captures: Captures::with_capacity(param_capacity),
            route: None,
            allowed: Vec::new(),
            extensions: Extensions::new(),
            request_id: Ulid::nil(),
            debug: false,
            generation,
        }
    }

    /// Rebind the context to a new request.
    ///
    /// Copies the method and the normalized path (trailing slashes stripped,
    /// root kept) and clears all per-request state.
    pub fn reset(&mut self, request: Request, debug: bool) {
        self.clear();
        self.method = request.method().clone();
        self.path.push_str(normalize_path(request.uri().path()));
        self.request = request;
        self.request_id = Ulid::new();
        self.debug = debug;
    }

    /// Drop all per-request state, including the request body
    pub(crate) fn clear(&mut self) {
        self.request = Request::default();
        self.response.reset();
        self.method = Method::GET;
        self.path.clear();
        self.captures.clear();
        self.route = None;
        self.allowed.clear();
        self.extensions.clear();
        self.request_id = Ulid::nil();
        self.debug = false;
    }

    pub(crate) fn routing_parts(&mut self) -> (&Method, &str, &mut Captures) {
        (&self.method, &self.path, &mut self.captures)
    }

    pub(crate) fn bind_route(&mut self, route: Arc<RouteInfo>) {
        self.route = Some(route);
    }

    pub(crate) fn bind_allowed<'m>(&mut self, methods: impl Iterator<Item = &'m Method>) {
        self.allowed.clear();
        self.allowed.extend(methods.cloned());
    }

    pub(crate) fn capture_capacity(&self) -> usize {
        self.captures.capacity()
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Borrow the request and the response writer at the same time
    pub fn request_and_response_mut(&mut self) -> (&Request, &mut Response) {
        (&self.request, &mut self.response)
    }

    /// Method used for routing
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Normalized request path used for routing
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of the parameter `name`.
    ///
    /// If a template repeats a name, the last occurrence wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        let route = self.route.as_ref()?;
        let idx = route.param_names.iter().rposition(|n| n.as_ref() == name)?;
        self.p(idx)
    }

    /// Value of the parameter at position `index` in the template
    #[must_use]
    pub fn p(&self, index: usize) -> Option<&str> {
        self.captures
            .get(index)
            .map(|&(start, end)| &self.path[start..end])
    }

    /// All captured parameters as `(name, value)` in template order
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.param_names()
            .iter()
            .zip(self.captures.iter())
            .map(|(name, &(start, end))| (name.as_ref(), &self.path[start..end]))
    }

    /// Number of parameters captured for the current request
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.captures.len()
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        self.route
            .as_ref()
            .map(|r| r.param_names.as_slice())
            .unwrap_or_default()
    }

    /// Route matched for this request, `None` for not-found and
    /// method-not-allowed
    #[must_use]
    pub fn route(&self) -> Option<&RouteInfo> {
        self.route.as_deref()
    }

    /// Methods registered for the path when the method did not match
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed
    }

    /// Store a typed value for later middleware or the handler
    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    #[must_use]
    pub fn request_id(&self) -> Ulid {
        self.request_id
    }

    pub fn set_request_id(&mut self, id: Ulid) {
        self.request_id = id;
    }

    /// Whether the dispatcher runs in debug mode
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Send a `text/plain` body with `status`
    pub fn string(&mut self, status: StatusCode, body: &str) -> HandlerResult {
        self.write_with_type(status, "text/plain; charset=utf-8", body.as_bytes());
        Ok(())
    }

    /// Serialize `value` as JSON and send it with `status`
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.write_with_type(status, "application/json; charset=utf-8", &body);
        Ok(())
    }

    /// Send `status` without a body
    pub fn no_content(&mut self, status: StatusCode) -> HandlerResult {
        self.response.write_header(status);
        Ok(())
    }

    /// Redirect to `location`. Only 300..=308 are accepted.
    pub fn redirect(&mut self, status: StatusCode, location: &str) -> HandlerResult {
        if !(300..=308).contains(&status.as_u16()) {
            return Err(ResponseError::InvalidRedirectCode(status).into());
        }
        let value = http::HeaderValue::from_str(location)?;
        self.response
            .headers_mut()
            .insert(http::header::LOCATION, value);
        self.response.write_header(status);
        Ok(())
    }

    fn write_with_type(&mut self, status: StatusCode, content_type: &'static str, body: &[u8]) {
        self.response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(content_type),
        );
        self.response.write_header(status);
        self.response.write(body);
    }
}
