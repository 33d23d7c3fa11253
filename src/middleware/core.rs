use http::StatusCode;
use std::fmt;
use std::sync::Arc;

use crate::context::{Context, Request, Response};
use crate::error::HttpError;
use crate::handler::{HandlerFunc, HandlerResult, HttpHandlerFn};

/// Canonical middleware: takes the next handler and returns a wrapped one
pub type MiddlewareFunc = Arc<dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync>;

/// Middleware in one of the supported shapes.
///
/// Each variant is converted once, when registered, into a [`MiddlewareFunc`].
#[derive(Clone)]
pub enum Middleware {
    /// Full control: decides whether and when to call `next`
    Wrap {
        name: Arc<str>,
        func: MiddlewareFunc,
    },
    /// Runs before `next`; an error short-circuits the chain
    Before {
        name: Arc<str>,
        func: HandlerFunc,
    },
    /// Plain request/response function. Skipped once the response is
    /// committed; `next` always runs.
    Http {
        name: Arc<str>,
        func: HttpHandlerFn,
    },
}

impl Middleware {
    pub fn wrap<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
    {
        Middleware::Wrap {
            name: Arc::from(std::any::type_name::<F>()),
            func: Arc::new(f),
        }
    }

    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Middleware::Before {
            name: Arc::from(std::any::type_name::<F>()),
            func: Arc::new(f),
        }
    }

    pub fn http<F>(f: F) -> Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        Middleware::Http {
            name: Arc::from(std::any::type_name::<F>()),
            func: Arc::new(f),
        }
    }

    #[must_use]
    pub fn named(self, name: &str) -> Self {
        let name = Arc::from(name);
        match self {
            Middleware::Wrap { func, .. } => Middleware::Wrap { name, func },
            Middleware::Before { func, .. } => Middleware::Before { name, func },
            Middleware::Http { func, .. } => Middleware::Http { name, func },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Middleware::Wrap { name, .. }
            | Middleware::Before { name, .. }
            | Middleware::Http { name, .. } => name,
        }
    }

    /// Convert into the canonical signature
    #[must_use]
    pub fn into_func(self) -> MiddlewareFunc {
        match self {
            Middleware::Wrap { func, .. } => func,
            Middleware::Before { func, .. } => Arc::new(move |next: HandlerFunc| {
                let before = Arc::clone(&func);
                let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
                    before(ctx)?;
                    next(ctx)
                });
                wrapped
            }),
            Middleware::Http { func, .. } => Arc::new(move |next: HandlerFunc| {
                let http = Arc::clone(&func);
                let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
                    if !ctx.response().is_committed() {
                        let (req, res) = ctx.request_and_response_mut();
                        http(req, res);
                    }
                    next(ctx)
                });
                wrapped
            }),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Middleware::Wrap { .. } => "Wrap",
            Middleware::Before { .. } => "Before",
            Middleware::Http { .. } => "Http",
        };
        f.debug_struct("Middleware")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish()
    }
}

/// Wrap `handler` in `chain` so that `chain[0]` is the outermost layer: it sees
/// the request first and the result last.
#[must_use]
pub fn compose(chain: &[MiddlewareFunc], handler: HandlerFunc) -> HandlerFunc {
    chain.iter().rev().fold(handler, |next, m| m(next))
}

/// Status the client will see once the error handler has run.
///
/// A committed response keeps its status; otherwise an error maps to its
/// `HttpError` code or `500`.
pub(crate) fn response_status(ctx: &Context, result: &HandlerResult) -> StatusCode {
    match result {
        Err(err) if !ctx.response().is_committed() => err
            .downcast_ref::<HttpError>()
            .map_or(StatusCode::INTERNAL_SERVER_ERROR, HttpError::code),
        _ => ctx.response().status(),
    }
}
