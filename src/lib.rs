//! # radix_dispatch
//!
//! The request-dispatch core of an HTTP framework: a radix-tree router, pooled
//! per-request contexts and composable middleware.
//!
//! ## Overview
//!
//! Given a method and a path, the dispatcher finds the registered handler,
//! captures path parameters, runs the handler inside its middleware chain on a
//! pooled [`Context`] and turns any error into a response through one central
//! error handler. Transport (listening, TLS, HTTP parsing) stays outside: the
//! core takes an `http::Request<Vec<u8>>` and returns an
//! `http::Response<Vec<u8>>`.
//!
//! ## Architecture
//!
//! - **[`router`]** - radix tree with static, `:param` and `*catch-all`
//!   segments; lookup never fails, it yields a handler, a 404 or a 405
//! - **[`context`]** - per-request state, the buffered [`Response`] and the
//!   [`ContextPool`]
//! - **[`middleware`]** - middleware shapes, composition and built-ins
//! - **[`dispatcher`]** - setup-phase [`Dispatcher`], route [`Group`]s and the
//!   immutable [`DispatchService`]
//! - **[`live`]** - [`LiveService`], copy-on-write route updates while serving
//! - **[`registry`]** / **[`table`]** - routes described in YAML, resolved
//!   against named handlers
//! - **[`config`]** / **[`logging`]** - configuration and `tracing` setup
//!
//! ## Quick Start
//!
//! ```
//! use radix_dispatch::{middleware, Dispatcher, Handler, HttpError, RouteRegistrar};
//! use http::StatusCode;
//!
//! let mut d = Dispatcher::new();
//! d.add_middleware(middleware::recover());
//! d.get("/pets/:id", Handler::func(|ctx| {
//!     match ctx.param("id") {
//!         Some("0") => Err(HttpError::new(StatusCode::NOT_FOUND).into()),
//!         Some(id) => {
//!             let body = serde_json::json!({ "id": id });
//!             ctx.json(StatusCode::OK, &body)
//!         }
//!         None => unreachable!(),
//!     }
//! }))
//! .unwrap();
//!
//! let service = d.build();
//! let get = |path: &str| http::Request::get(path).body(Vec::new()).unwrap();
//!
//! assert_eq!(service.serve(get("/pets/7/")).body(), br#"{"id":"7"}"#);
//! assert_eq!(service.serve(get("/pets/0")).status(), StatusCode::NOT_FOUND);
//! assert_eq!(service.serve(get("/cats")).status(), StatusCode::NOT_FOUND);
//! ```
//!
//! ## Setup and serve phases
//!
//! Routes are registered on a [`Dispatcher`], which is then built into a
//! [`DispatchService`]. The service is `Send + Sync` and never mutated, so any
//! number of threads or coroutines may call
//! [`serve`](DispatchService::serve) concurrently. The only shared mutable
//! state on the request path is the context pool.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod live;
pub mod logging;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod table;

pub use config::{DispatchConfig, PoolConfig};
pub use context::{Context, ContextPool, PoolStats, Request, Response};
pub use dispatcher::{DispatchService, Dispatcher, Group, RouteRegistrar};
pub use error::{HttpError, ResponseError, RouteError};
pub use handler::{Handler, HandlerFunc, HandlerResult};
pub use live::LiveService;
pub use middleware::Middleware;
pub use registry::HandlerRegistry;
pub use router::{Route, RouteInfo, Router};
pub use table::RouteTable;
