//! # Router Module
//!
//! Path matching and route resolution. Routes are registered as templates and
//! stored in a single radix tree shared by every HTTP method.
//!
//! ## Templates
//!
//! - `/users/list` is matched literally
//! - `/users/:id` binds one non-empty path segment to `id`
//! - `/files/*path` binds the rest of the path, slashes included, to `path`
//!
//! ## Example
//!
//! ```rust
//! use radix_dispatch::router::{Captures, Lookup, Router};
//! use radix_dispatch::Handler;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router
//!     .add(Method::GET, "/users/:id", Handler::func(|_ctx| Ok(())))
//!     .unwrap();
//!
//! let mut captures = Captures::new();
//! let path = "/users/42";
//! match router.lookup(&Method::GET, path, &mut captures) {
//!     Lookup::Found(endpoint) => {
//!         let (start, end) = captures[0];
//!         assert_eq!(&*endpoint.route.param_names[0], "id");
//!         assert_eq!(&path[start..end], "42");
//!     }
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Performance
//!
//! Lookup walks the tree once per path byte, with backtracking only at nodes
//! that carry both a static and a param or catch-all alternative. Captures are
//! byte ranges into the request path, so a match performs no allocation.

mod core;
mod radix;
mod template;
#[cfg(test)]
mod tests;

pub use self::core::{Lookup, Route, RouteInfo, Router};
pub use radix::{AllowedMethods, Captures, Endpoint, MAX_INLINE_PARAMS};
pub use template::{join_paths, normalize_path};
