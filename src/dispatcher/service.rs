use std::sync::Arc;
use tracing::debug;

use super::core::{ErrorHandler, HookFunc};
use crate::context::{ContextPool, PoolStats, Request};
use crate::router::{Route, Router};

/// Immutable, shareable request pipeline produced by
/// [`Dispatcher::build`](super::Dispatcher::build).
///
/// `serve` may be called from any number of threads or coroutines at once:
/// the router is read-only and each request gets its own pooled context.
pub struct DispatchService {
    router: Router,
    error_handler: ErrorHandler,
    hook: Option<HookFunc>,
    pool: Arc<ContextPool>,
    debug: bool,
}

impl DispatchService {
    pub(crate) fn new(
        router: Router,
        error_handler: ErrorHandler,
        hook: Option<HookFunc>,
        pool: Arc<ContextPool>,
        debug: bool,
    ) -> Self {
        Self {
            router,
            error_handler,
            hook,
            pool,
            debug,
        }
    }

    /// Run one request through hook, routing, middleware, handler and error
    /// handler.
    ///
    /// The context goes back to the pool on every exit path. A panic that no
    /// `recover` middleware catches still releases the context, then
    /// propagates to the caller.
    pub fn serve(&self, mut request: Request) -> http::Response<Vec<u8>> {
        if let Some(hook) = &self.hook {
            hook(&mut request);
        }

        let mut lease = self.pool.lease();
        let ctx = &mut *lease;
        ctx.reset(request, self.debug);

        let handler = self.router.find(ctx);
        debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            route = ctx.route().map_or("-", |r| &*r.template),
            params = ctx.param_count(),
            "Dispatching request"
        );

        if let Err(err) = handler(ctx) {
            (self.error_handler)(&err, ctx);
        }
        ctx.response_mut().take_http()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        self.router.routes()
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
