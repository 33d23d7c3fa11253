//! Router core module - hot path for request routing.
//!
//! Registration (`add`) happens during setup and may allocate freely. Lookup
//! (`lookup`/`find`) runs once per request against an immutable tree and only
//! writes capture ranges into a buffer owned by the caller.

use http::header::{HeaderValue, ALLOW};
use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{debug, info};

use super::radix::{AllowedMethods, Captures, Endpoint, RadixNode};
use super::template::{self, Segment};
use crate::context::Context;
use crate::error::{HttpError, RouteError};
use crate::handler::{Handler, HandlerFunc};
use crate::middleware::{compose, MiddlewareFunc};

/// Metadata of a registered route, bound into the [`Context`] on a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method the route was registered for
    pub method: Method,
    /// Template as registered (e.g. `/users/:id`)
    pub template: Arc<str>,
    /// Parameter names in template order; a bare `*` catch-all is named `*`
    pub param_names: Vec<Arc<str>>,
    /// Diagnostic name of the handler
    pub handler_name: Arc<str>,
}

/// Flat introspection record for one registered route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler_name: String,
}

/// Outcome of a pure lookup
pub enum Lookup<'r> {
    /// A handler is registered for this method and path
    Found(&'r Endpoint),
    /// The path matches, but only under other methods; holds every one of them
    MethodNotAllowed(AllowedMethods),
    /// Nothing matches the path
    NotFound,
}

impl Lookup<'_> {
    /// Methods registered on the matched path, empty unless `MethodNotAllowed`
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        match self {
            Lookup::MethodNotAllowed(methods) => methods.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Status the default sentinels would answer with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Lookup::Found(_) => StatusCode::OK,
            Lookup::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Lookup::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

static DEFAULT_NOT_FOUND: Lazy<HandlerFunc> = Lazy::new(|| {
    Arc::new(|_ctx: &mut Context| Err(HttpError::new(StatusCode::NOT_FOUND).into()))
});

static DEFAULT_METHOD_NOT_ALLOWED: Lazy<HandlerFunc> = Lazy::new(|| {
    Arc::new(|ctx: &mut Context| {
        let mut methods: Vec<&str> = ctx.allowed_methods().iter().map(Method::as_str).collect();
        methods.sort_unstable();
        methods.dedup();
        let allow = HeaderValue::from_str(&methods.join(", "))?;
        ctx.response_mut().headers_mut().insert(ALLOW, allow);
        Err(HttpError::new(StatusCode::METHOD_NOT_ALLOWED).into())
    })
});

/// Router that matches HTTP requests to handlers using a radix tree
///
/// All methods share one tree; handlers are stored per method on the node
/// where their template ends. This is what lets a lookup tell
/// "no such path" apart from "path exists under another method".
///
/// # Performance
///
/// - Route matching: O(k) where k is path length, plus backtracking bounded
///   by the number of param/catch-all alternatives on the path
/// - No allocation per lookup for routes with up to
///   [`MAX_INLINE_PARAMS`](super::MAX_INLINE_PARAMS) captures
///
/// # Concurrency
///
/// The router is mutated only during setup. A built router is shared
/// read-only between request tasks; runtime changes go through
/// [`LiveService`](crate::LiveService), which swaps whole snapshots.
#[derive(Clone)]
pub struct Router {
    root: RadixNode,
    routes: Vec<Route>,
    max_params: usize,
    not_found_raw: HandlerFunc,
    method_not_allowed_raw: HandlerFunc,
    not_found: HandlerFunc,
    method_not_allowed: HandlerFunc,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RadixNode::root(),
            routes: Vec::new(),
            max_params: 0,
            not_found_raw: Arc::clone(&DEFAULT_NOT_FOUND),
            method_not_allowed_raw: Arc::clone(&DEFAULT_METHOD_NOT_ALLOWED),
            not_found: Arc::clone(&DEFAULT_NOT_FOUND),
            method_not_allowed: Arc::clone(&DEFAULT_METHOD_NOT_ALLOWED),
        }
    }

    /// Register `handler` for `method` on `path`.
    ///
    /// The template must already be in canonical form (see
    /// [`join_paths`](super::join_paths)); anything malformed, a catch-all that
    /// is not last, or a second handler for the same method and template
    /// shape is rejected.
    pub fn add(&mut self, method: Method, path: &str, handler: Handler) -> Result<(), RouteError> {
        self.add_scoped(method, path, handler, None).map(|_| ())
    }

    /// Register a route owned by the group middleware scope `scope`.
    ///
    /// The scope is resolved by index in [`compose_middleware`](Self::compose_middleware),
    /// so middleware a group adds later still wraps the route.
    pub(crate) fn add_scoped(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        scope: Option<usize>,
    ) -> Result<Arc<RouteInfo>, RouteError> {
        let segments = template::parse(path)?;
        let param_names: Vec<Arc<str>> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) | Segment::CatchAll(name) => Some(Arc::from(*name)),
                Segment::Static(_) => None,
            })
            .collect();
        let param_count = param_names.len();

        let route = Arc::new(RouteInfo {
            method: method.clone(),
            template: Arc::from(path),
            param_names,
            handler_name: Arc::from(handler.name()),
        });
        let raw = handler.into_func();
        let endpoint = Endpoint {
            route: Arc::clone(&route),
            handler: Arc::clone(&raw),
            raw,
            scope,
        };

        self.root.insert(&segments, method.clone(), endpoint)?;

        self.max_params = self.max_params.max(param_count);
        self.routes.push(Route {
            method: method.clone(),
            path: path.to_string(),
            handler_name: route.handler_name.to_string(),
        });
        debug!(
            method = %method,
            path = %path,
            handler = %route.handler_name,
            params = param_count,
            "Route registered"
        );
        Ok(route)
    }

    /// Resolve `method` and `path` without touching a context.
    ///
    /// On `Found`, `captures` holds one byte range into `path` per parameter of
    /// the matched template, in template order. Otherwise it is empty.
    pub fn lookup<'r>(&'r self, method: &Method, path: &str, captures: &mut Captures) -> Lookup<'r> {
        captures.clear();
        let mut allowed = AllowedMethods::new();
        match self.root.search(path, 0, method, captures, &mut allowed) {
            Some(endpoint) => Lookup::Found(endpoint),
            None if allowed.is_empty() => Lookup::NotFound,
            None => Lookup::MethodNotAllowed(allowed),
        }
    }

    /// Resolve the context's method and path to the handler to execute.
    ///
    /// Never fails: when nothing matches, the not-found or method-not-allowed
    /// handler is returned and runs through the same pipeline as any route.
    pub fn find<'r>(&'r self, ctx: &mut Context) -> &'r HandlerFunc {
        let (method, path, captures) = ctx.routing_parts();
        match self.lookup(method, path, captures) {
            Lookup::Found(endpoint) => {
                ctx.bind_route(Arc::clone(&endpoint.route));
                &endpoint.handler
            }
            Lookup::MethodNotAllowed(methods) => {
                ctx.bind_allowed(methods.iter());
                &self.method_not_allowed
            }
            Lookup::NotFound => &self.not_found,
        }
    }

    /// Every registered route, in registration order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Largest number of parameters any registered template captures
    #[must_use]
    pub fn max_params(&self) -> usize {
        self.max_params
    }

    pub fn set_not_found_handler(&mut self, handler: HandlerFunc) {
        self.not_found = Arc::clone(&handler);
        self.not_found_raw = handler;
    }

    pub fn set_method_not_allowed_handler(&mut self, handler: HandlerFunc) {
        self.method_not_allowed = Arc::clone(&handler);
        self.method_not_allowed_raw = handler;
    }

    /// Rebuild every executed handler from its raw handler: endpoints get their
    /// group's entry of `scopes` inside `global`, the two sentinels get `global`
    /// only.
    ///
    /// Always starts from the raw handlers, so calling it again replaces the
    /// previous composition instead of stacking on top of it.
    pub(crate) fn compose_middleware(
        &mut self,
        global: &[MiddlewareFunc],
        scopes: &[Vec<MiddlewareFunc>],
    ) {
        self.root.for_each_endpoint_mut(&mut |endpoint| {
            let scope = endpoint
                .scope
                .and_then(|id| scopes.get(id))
                .map_or(&[][..], Vec::as_slice);
            let scoped = compose(scope, Arc::clone(&endpoint.raw));
            endpoint.handler = compose(global, scoped);
        });
        self.not_found = compose(global, Arc::clone(&self.not_found_raw));
        self.method_not_allowed = compose(global, Arc::clone(&self.method_not_allowed_raw));
        info!(
            routes = self.routes.len(),
            middleware = global.len(),
            max_params = self.max_params,
            "Routing table composed"
        );
    }

    /// Human readable dump of the tree, one node per line
    #[must_use]
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.root.render(0, &mut out);
        out
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.root.assert_invariants(true);
    }
}
