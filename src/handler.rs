//! Handler shapes accepted at registration time.
//!
//! Every route ends up as a [`HandlerFunc`]: a shared closure that receives the
//! pooled [`Context`] and returns a [`HandlerResult`]. The [`Handler`] enum is the
//! closed set of shapes a caller may register; each variant is converted into the
//! canonical signature once, when the route is added.

use std::fmt;
use std::sync::Arc;

use crate::context::{Context, Request, Response};

/// Result returned by handlers and middleware.
///
/// Errors are routed to the dispatcher's central error handler. Return an
/// [`HttpError`](crate::HttpError) to choose the status code.
pub type HandlerResult = anyhow::Result<()>;

/// Canonical handler signature used by the router and the middleware chain
pub type HandlerFunc = Arc<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>;

/// Plain request/response handler that cannot fail
pub type HttpHandlerFn = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

/// A handler in one of the supported shapes.
///
/// ```
/// use radix_dispatch::Handler;
///
/// let h = Handler::func(|ctx| ctx.string(http::StatusCode::OK, "hello"));
/// let plain = Handler::http(|_req, res| res.write(b"pong"));
/// let named = Handler::func(|_ctx| Ok(())).named("noop");
/// assert_eq!(named.name(), "noop");
/// # let _ = (h, plain);
/// ```
#[derive(Clone)]
pub enum Handler {
    /// Receives the full context and may return an error
    Context {
        /// Diagnostic name shown in route listings
        name: Arc<str>,
        /// The handler itself
        func: HandlerFunc,
    },
    /// Receives only the request and the response writer
    Http {
        /// Diagnostic name shown in route listings
        name: Arc<str>,
        /// The handler itself
        func: HttpHandlerFn,
    },
}

impl Handler {
    /// Wrap a context handler. The diagnostic name is the closure's type name.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Context {
            name: Arc::from(std::any::type_name::<F>()),
            func: Arc::new(f),
        }
    }

    /// Wrap a plain request/response handler
    pub fn http<F>(f: F) -> Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        Handler::Http {
            name: Arc::from(std::any::type_name::<F>()),
            func: Arc::new(f),
        }
    }

    /// Wrap an already shared [`HandlerFunc`]
    #[must_use]
    pub fn from_func(name: &str, func: HandlerFunc) -> Self {
        Handler::Context {
            name: Arc::from(name),
            func,
        }
    }

    /// Replace the diagnostic name
    #[must_use]
    pub fn named(self, name: &str) -> Self {
        match self {
            Handler::Context { func, .. } => Handler::Context {
                name: Arc::from(name),
                func,
            },
            Handler::Http { func, .. } => Handler::Http {
                name: Arc::from(name),
                func,
            },
        }
    }

    /// Diagnostic name of the handler
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Handler::Context { name, .. } | Handler::Http { name, .. } => name,
        }
    }

    /// Convert into the canonical signature
    #[must_use]
    pub fn into_func(self) -> HandlerFunc {
        match self {
            Handler::Context { func, .. } => func,
            Handler::Http { func, .. } => Arc::new(move |ctx: &mut Context| {
                let (req, res) = ctx.request_and_response_mut();
                func(req, res);
                Ok(())
            }),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Handler::Context { .. } => "Context",
            Handler::Http { .. } => "Http",
        };
        f.debug_struct("Handler")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish()
    }
}
