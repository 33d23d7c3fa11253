//! # Handler Registry
//!
//! Named handlers and middleware, so routes can be described as data (see
//! [`RouteTable`](crate::RouteTable)) and resolved to code at setup time.
//!
//! A registry created with [`HandlerRegistry::with_builtins`] knows:
//!
//! | Kind | Name | Behavior |
//! |------|------|----------|
//! | handler | `ok` | `200` with `{"status":"ok"}` |
//! | handler | `echo` | `200` with a JSON description of the request |
//! | handler | `no_content` | `204` without body |
//! | middleware | `request_logger` | [`request_logger`] |
//! | middleware | `recover` | [`recover`] |
//! | middleware | `request_id` | [`request_id`] |
//! | middleware | `metrics` | counters in [`HandlerRegistry::metrics`] |

use http::StatusCode;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::RouteError;
use crate::handler::{Handler, HandlerResult};
use crate::middleware::{recover, request_id, request_logger, MetricsMiddleware, Middleware};

/// Name → handler and name → middleware lookup tables
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    middleware: HashMap<String, Middleware>,
    metrics: Arc<MetricsMiddleware>,
}

impl HandlerRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in handlers and middleware
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_handler("ok", Handler::func(ok_handler));
        registry.register_handler("echo", Handler::func(echo_handler));
        registry.register_handler("no_content", Handler::func(no_content_handler));

        registry.register_middleware("request_logger", request_logger());
        registry.register_middleware("recover", recover());
        registry.register_middleware("request_id", request_id());
        let metrics = registry.metrics.middleware();
        registry.register_middleware("metrics", metrics);
        registry
    }

    /// Register (or replace) a handler; it is renamed to `name`
    pub fn register_handler(&mut self, name: &str, handler: Handler) {
        self.handlers.insert(name.to_string(), handler.named(name));
    }

    /// Register (or replace) a middleware; it is renamed to `name`
    pub fn register_middleware(&mut self, name: &str, middleware: Middleware) {
        self.middleware
            .insert(name.to_string(), middleware.named(name));
    }

    pub fn handler(&self, name: &str) -> Result<Handler, RouteError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| RouteError::UnknownHandler(name.to_string()))
    }

    pub fn middleware(&self, name: &str) -> Result<Middleware, RouteError> {
        self.middleware
            .get(name)
            .cloned()
            .ok_or_else(|| RouteError::UnknownMiddleware(name.to_string()))
    }

    /// Counters fed by the `metrics` middleware
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsMiddleware> {
        &self.metrics
    }

    /// Sorted handler names
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sorted middleware names
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.middleware.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn ok_handler(ctx: &mut Context) -> HandlerResult {
    ctx.json(StatusCode::OK, &json!({ "status": "ok" }))
}

fn no_content_handler(ctx: &mut Context) -> HandlerResult {
    ctx.no_content(StatusCode::NO_CONTENT)
}

/// Describe the request back to the client
fn echo_handler(ctx: &mut Context) -> HandlerResult {
    let mut params = Map::new();
    for (name, value) in ctx.params() {
        params.insert(name.to_string(), Value::String(value.to_string()));
    }
    let route = ctx.route().map(|r| r.template.to_string());
    let handler = ctx.route().map(|r| r.handler_name.to_string());
    let body = json!({
        "handler": handler,
        "method": ctx.method().as_str(),
        "path": ctx.path(),
        "route": route,
        "params": params,
        "query": ctx.request().uri().query(),
        "request_id": ctx.request_id().to_string(),
        "body": String::from_utf8_lossy(ctx.request().body()),
    });
    ctx.json(StatusCode::OK, &body)
}
