//! # Middleware Module
//!
//! Middleware wraps a handler in another handler. A chain is composed once,
//! when the dispatcher is built; the first registered middleware is the
//! outermost layer, so it sees the request first and the result last.
//!
//! ```text
//! request ─▶ global[0] ─▶ global[1] ─▶ group[0] ─▶ handler
//! result  ◀─ global[0] ◀─ global[1] ◀─ group[0] ◀─┘
//! ```
//!
//! Built-in middleware: [`request_logger`], [`recover`], [`request_id`] and
//! [`MetricsMiddleware`].

mod core;
mod metrics;
mod recover;
mod request_id;
mod tracing;

pub use self::core::{compose, Middleware, MiddlewareFunc};
pub(crate) use self::core::response_status;
pub use metrics::{MetricsMiddleware, MetricsSnapshot};
pub use recover::recover;
pub use request_id::{request_id, REQUEST_ID_HEADER};
pub use self::tracing::request_logger;
