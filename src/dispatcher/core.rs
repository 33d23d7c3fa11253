//! Setup-phase dispatcher: route registration, middleware and handlers.

use http::{Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::group::Group;
use super::service::DispatchService;
use crate::config::DispatchConfig;
use crate::context::{Context, ContextPool, Request};
use crate::error::{HttpError, RouteError};
use crate::handler::Handler;
use crate::middleware::{Middleware, MiddlewareFunc};
use crate::router::{join_paths, Route, Router};

/// Central error handler, invoked once per failed request
pub type ErrorHandler = Arc<dyn Fn(&anyhow::Error, &mut Context) + Send + Sync>;

/// Callback run on the raw request before routing
pub type HookFunc = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Methods registered by [`RouteRegistrar::any`]
pub const ANY_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// Route registration shared by [`Dispatcher`] and [`Group`].
///
/// Only [`add`](Self::add) must be implemented; the verb helpers delegate to it.
pub trait RouteRegistrar {
    /// Register `handler` for `method` on `path`
    fn add(&mut self, method: Method, path: &str, handler: Handler) -> Result<(), RouteError>;

    fn get(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::GET, path, handler)
    }

    fn post(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::POST, path, handler)
    }

    fn put(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::PUT, path, handler)
    }

    fn delete(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::DELETE, path, handler)
    }

    fn patch(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::PATCH, path, handler)
    }

    fn head(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::HEAD, path, handler)
    }

    fn options(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::OPTIONS, path, handler)
    }

    fn connect(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::CONNECT, path, handler)
    }

    fn trace(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add(Method::TRACE, path, handler)
    }

    /// Register for every method in [`ANY_METHODS`]
    fn any(&mut self, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.match_methods(&ANY_METHODS, path, handler)
    }

    /// Register for each of `methods`; an empty list means `GET`.
    ///
    /// Stops at the first failing method; methods registered before it stay
    /// registered.
    fn match_methods(
        &mut self,
        methods: &[Method],
        path: &str,
        handler: Handler,
    ) -> Result<(), RouteError> {
        if methods.is_empty() {
            return self.add(Method::GET, path, handler);
        }
        for method in methods {
            self.add(method.clone(), path, handler.clone())?;
        }
        Ok(())
    }
}

/// Maps errors to responses.
///
/// [`HttpError`]s keep their status and message. Anything else is a `500`
/// whose message is the error text in debug mode and a generic phrase
/// otherwise. A committed response is left untouched; the error is only
/// logged.
pub fn default_error_handler(err: &anyhow::Error, ctx: &mut Context) {
    let (status, message) = match err.downcast_ref::<HttpError>() {
        Some(http) => (http.code(), http.message().to_string()),
        None if ctx.is_debug() => (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        ),
    };
    let committed = ctx.response().is_committed();

    if status.is_server_error() {
        error!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            committed,
            error = %format!("{err:#}"),
            "Request failed"
        );
    } else {
        debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            committed,
            error = %err,
            "Request rejected"
        );
    }

    if committed {
        return;
    }
    if let Err(e) = ctx.json(status, &serde_json::json!({ "error": message })) {
        error!(error = %e, "Failed to write error response");
    }
}

/// Setup-phase builder for a [`DispatchService`].
///
/// Register routes, groups and middleware, then call
/// [`build`](Self::build). The dispatcher itself never serves requests, so
/// registration needs no synchronization; a built service is immutable.
///
/// ```
/// use radix_dispatch::{Dispatcher, Handler, RouteRegistrar};
/// use http::StatusCode;
///
/// let mut d = Dispatcher::new();
/// d.get("/users/:id", Handler::func(|ctx| {
///     let body = format!("user {}", ctx.param("id").unwrap_or_default());
///     ctx.string(StatusCode::OK, &body)
/// }))
/// .unwrap();
///
/// let service = d.build();
/// let res = service.serve(
///     http::Request::get("/users/42").body(Vec::new()).unwrap(),
/// );
/// assert_eq!(res.status(), StatusCode::OK);
/// assert_eq!(res.body(), b"user 42");
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    router: Router,
    middleware: Vec<MiddlewareFunc>,
    middleware_names: Vec<Arc<str>>,
    /// Middleware of each group, indexed by group id
    scopes: Vec<Vec<MiddlewareFunc>>,
    error_handler: ErrorHandler,
    hook: Option<HookFunc>,
    config: DispatchConfig,
    pool: Arc<ContextPool>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            router: Router::new(),
            middleware: Vec::new(),
            middleware_names: Vec::new(),
            scopes: Vec::new(),
            error_handler: Arc::new(default_error_handler),
            hook: None,
            pool: Arc::new(ContextPool::new(&config.pool)),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn set_debug(&mut self, on: bool) {
        self.config.debug = on;
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.config.debug
    }

    /// Append a global middleware.
    ///
    /// Global middleware wraps every route and both fallback handlers,
    /// regardless of when the route was registered, and sits outside any
    /// group middleware.
    pub fn add_middleware(&mut self, middleware: Middleware) {
        info!(middleware = %middleware.name(), position = self.middleware.len(), "Middleware added");
        self.middleware_names.push(Arc::from(middleware.name()));
        self.middleware.push(middleware.into_func());
    }

    /// Names of the global middleware, outermost first
    #[must_use]
    pub fn middleware_names(&self) -> &[Arc<str>] {
        &self.middleware_names
    }

    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&anyhow::Error, &mut Context) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
    }

    /// Handler run when no route matches the path
    pub fn set_not_found_handler(&mut self, handler: Handler) {
        self.router.set_not_found_handler(handler.into_func());
    }

    /// Handler run when the path matches only under other methods.
    /// [`Context::allowed_methods`] lists them.
    pub fn set_method_not_allowed_handler(&mut self, handler: Handler) {
        self.router.set_method_not_allowed_handler(handler.into_func());
    }

    /// Run `hook` on every request before routing and middleware
    pub fn set_hook<F>(&mut self, hook: F)
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
    }

    /// Start a route group under `prefix`
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, join_paths("", prefix), None)
    }

    /// Every registered route, in registration order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        self.router.routes()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Pool shared by every service built from this dispatcher (and its clones)
    #[must_use]
    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    /// Open a new group scope starting from a copy of `parent`'s middleware
    pub(crate) fn open_scope(&mut self, parent: Option<usize>) -> usize {
        let inherited = parent
            .and_then(|id| self.scopes.get(id))
            .cloned()
            .unwrap_or_default();
        self.scopes.push(inherited);
        self.scopes.len() - 1
    }

    pub(crate) fn scope(&self, id: usize) -> &[MiddlewareFunc] {
        self.scopes.get(id).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn push_scope_middleware(&mut self, id: usize, middleware: MiddlewareFunc) {
        if let Some(scope) = self.scopes.get_mut(id) {
            scope.push(middleware);
        }
    }

    pub(crate) fn add_scoped(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        scope: Option<usize>,
    ) -> Result<(), RouteError> {
        let path = join_paths("", path);
        self.router.add_scoped(method, &path, handler, scope)?;
        Ok(())
    }

    /// Compose middleware into every route and freeze the result.
    ///
    /// The dispatcher stays usable: later registrations only show up in
    /// services built afterwards.
    #[must_use]
    pub fn build(&self) -> DispatchService {
        let mut router = self.router.clone();
        router.compose_middleware(&self.middleware, &self.scopes);
        self.pool.ensure_param_capacity(router.max_params());
        DispatchService::new(
            router,
            Arc::clone(&self.error_handler),
            self.hook.clone(),
            Arc::clone(&self.pool),
            self.config.debug,
        )
    }
}

impl RouteRegistrar for Dispatcher {
    fn add(&mut self, method: Method, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_scoped(method, path, handler, None)
    }
}
