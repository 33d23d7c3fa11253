//! # Context Module
//!
//! The mutable per-request state and the pool it is recycled through.
//!
//! A context moves through these states on every request:
//!
//! ```text
//! Free ──acquire──▶ Acquired ──reset──▶ Populated (after find) ──▶ Executing
//!   ▲                                                                  │
//!   └─────────────────────────── release ◀── Committed? ◀──────────────┘
//! ```
//!
//! The dispatcher holds the context through a [`Lease`], so the release step
//! runs even when a handler returns an error or panics.

mod core;
mod pool;
mod response;

pub use self::core::{Context, Request};
pub use pool::{ContextPool, Lease, PoolStats};
pub use response::Response;
