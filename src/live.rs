//! # Live Service
//!
//! Route changes while serving, without locking the request path.
//!
//! A built [`DispatchService`] is immutable. [`LiveService`] keeps the current
//! one behind an [`ArcSwap`] and the setup-phase [`Dispatcher`] behind a mutex.
//! An update clones the dispatcher, applies the change to the clone, builds a
//! new service and swaps it in atomically:
//!
//! - requests already running finish on the snapshot they started with
//! - a failing update changes nothing
//! - updates are serialized by the mutex; readers never take it
//!
//! All generations share one context pool. If an update adds a route with more
//! parameters than any before it, pooled contexts are invalidated and
//! reallocated at the new size.
//!
//! ```
//! use radix_dispatch::{Dispatcher, Handler, LiveService, RouteRegistrar};
//! use http::StatusCode;
//!
//! let live = LiveService::new(Dispatcher::new());
//! let get = |path: &str| http::Request::get(path).body(Vec::new()).unwrap();
//! assert_eq!(live.serve(get("/ping")).status(), StatusCode::NOT_FOUND);
//!
//! live.update(|d| d.get("/ping", Handler::func(|ctx| ctx.string(StatusCode::OK, "pong"))))
//!     .unwrap();
//! assert_eq!(live.serve(get("/ping")).status(), StatusCode::OK);
//! ```

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use crate::context::Request;
use crate::dispatcher::{DispatchService, Dispatcher};
use crate::error::RouteError;

/// Copy-on-write wrapper around a [`DispatchService`]
pub struct LiveService {
    current: ArcSwap<DispatchService>,
    setup: Mutex<Dispatcher>,
    version: AtomicU64,
}

impl LiveService {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        let service = dispatcher.build();
        Self {
            current: ArcSwap::from_pointee(service),
            setup: Mutex::new(dispatcher),
            version: AtomicU64::new(0),
        }
    }

    /// Serve one request on the current snapshot
    pub fn serve(&self, request: Request) -> http::Response<Vec<u8>> {
        self.current.load().serve(request)
    }

    /// The current service; stays valid after later updates
    #[must_use]
    pub fn snapshot(&self) -> Arc<DispatchService> {
        self.current.load_full()
    }

    /// Number of successful updates so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Apply `change` to a copy of the setup state and publish the result.
    ///
    /// If `change` fails, the error is returned and neither the setup state
    /// nor the served routes change.
    pub fn update<T, F>(&self, change: F) -> Result<T, RouteError>
    where
        F: FnOnce(&mut Dispatcher) -> Result<T, RouteError>,
    {
        let mut setup = self.setup.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = setup.clone();
        let out = match change(&mut next) {
            Ok(out) => out,
            Err(err) => {
                warn!(error = %err, "Live update rejected, keeping current routes");
                return Err(err);
            }
        };

        let service = next.build();
        let routes = service.routes().len();
        self.current.store(Arc::new(service));
        *setup = next;
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        info!(version, routes, "Live routes updated");
        Ok(out)
    }
}
