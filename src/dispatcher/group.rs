use http::Method;
use tracing::debug;

use super::core::{Dispatcher, RouteRegistrar};
use crate::error::RouteError;
use crate::handler::Handler;
use crate::middleware::Middleware;
use crate::router::join_paths;

/// Routes sharing a path prefix and a middleware stack.
///
/// Group middleware runs inside the global middleware and wraps every route
/// registered through the group, including routes added before the
/// middleware: the stack is resolved when the dispatcher is built. A nested
/// group starts from a copy of its parent's prefix and middleware at the time
/// it is created.
///
/// ```
/// use radix_dispatch::{Dispatcher, Handler, Middleware, RouteRegistrar};
///
/// let mut d = Dispatcher::new();
/// let mut admin = d.group("/admin");
/// admin.add_middleware(Middleware::before(|_ctx| Ok(())).named("auth"));
/// admin.get("/users", Handler::func(|_ctx| Ok(()))).unwrap();
///
/// let mut reports = admin.group("reports");
/// reports.get("/:year", Handler::func(|_ctx| Ok(()))).unwrap();
///
/// let paths: Vec<&str> = d.routes().iter().map(|r| r.path.as_str()).collect();
/// assert_eq!(paths, ["/admin/users", "/admin/reports/:year"]);
/// ```
pub struct Group<'d> {
    dispatcher: &'d mut Dispatcher,
    prefix: String,
    scope: usize,
}

impl<'d> Group<'d> {
    pub(crate) fn new(dispatcher: &'d mut Dispatcher, prefix: String, parent: Option<usize>) -> Self {
        let scope = dispatcher.open_scope(parent);
        debug!(
            prefix = %prefix,
            inherited = dispatcher.scope(scope).len(),
            "Route group created"
        );
        Self {
            dispatcher,
            prefix,
            scope,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Append middleware for every route of this group
    pub fn add_middleware(&mut self, middleware: Middleware) -> &mut Self {
        debug!(prefix = %self.prefix, middleware = %middleware.name(), "Group middleware added");
        self.dispatcher
            .push_scope_middleware(self.scope, middleware.into_func());
        self
    }

    /// Nested group under this group's prefix
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let prefix = join_paths(&self.prefix, prefix);
        Group::new(&mut *self.dispatcher, prefix, Some(self.scope))
    }
}

impl RouteRegistrar for Group<'_> {
    fn add(&mut self, method: Method, path: &str, handler: Handler) -> Result<(), RouteError> {
        let path = join_paths(&self.prefix, path);
        self.dispatcher
            .add_scoped(method, &path, handler, Some(self.scope))
    }
}
