use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use super::core::Middleware;
use crate::context::Context;
use crate::error::HttpError;
use crate::handler::HandlerFunc;

/// Turn a panic anywhere below this middleware into a `500` error.
///
/// The panic message is logged, never sent to the client. Requires the
/// `unwind` panic strategy.
#[must_use]
pub fn recover() -> Middleware {
    Middleware::wrap(|next: HandlerFunc| {
        let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
            match catch_unwind(AssertUnwindSafe(|| next(ctx))) {
                Ok(result) => result,
                Err(payload) => {
                    error!(
                        method = %ctx.method(),
                        path = %ctx.path(),
                        panic = panic_message(payload.as_ref()),
                        "Handler panicked"
                    );
                    Err(HttpError::new(StatusCode::INTERNAL_SERVER_ERROR).into())
                }
            }
        });
        wrapped
    })
    .named("recover")
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
