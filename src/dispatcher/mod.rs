//! # Dispatcher Module
//!
//! The per-request entry point and the setup-phase builder that produces it.
//!
//! ## Overview
//!
//! - [`Dispatcher`] collects routes, groups, middleware and fallback handlers.
//!   It is plain mutable data: setup code owns it exclusively.
//! - [`Dispatcher::build`] composes the middleware into every route and
//!   returns a [`DispatchService`], which is immutable and `Send + Sync`.
//! - [`DispatchService::serve`] is the pipeline:
//!
//! 1. run the request hook
//! 2. lease a context from the pool and reset it (path normalized)
//! 3. resolve the handler (route, 404 or 405 fallback) and bind parameters
//! 4. run the composed middleware chain and handler
//! 5. hand any error to the error handler, which never rewrites a committed
//!    response
//! 6. release the context (when the lease drops) and return the response
//!
//! Routes cannot be added to a built service. To change routes while serving,
//! use [`LiveService`](crate::LiveService), which rebuilds and swaps whole
//! services.

mod core;
mod group;
mod service;

pub use self::core::{
    default_error_handler, Dispatcher, ErrorHandler, HookFunc, RouteRegistrar, ANY_METHODS,
};
pub use group::Group;
pub use service::DispatchService;
