use std::sync::Arc;
use std::time::Instant;

use tracing::field::Empty;
use tracing::{info, info_span};

use super::core::{response_status, Middleware};
use crate::context::Context;
use crate::handler::HandlerFunc;

/// Per-request `tracing` span with method, path, matched route, final status
/// and latency.
///
/// Register it first so the span covers every other middleware.
#[must_use]
pub fn request_logger() -> Middleware {
    Middleware::wrap(|next: HandlerFunc| {
        let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
            let start = Instant::now();
            let span = info_span!(
                "request",
                method = %ctx.method(),
                path = %ctx.path(),
                request_id = %ctx.request_id(),
                route = Empty,
                status = Empty,
                latency_us = Empty,
            );
            let _guard = span.enter();
            if let Some(route) = ctx.route() {
                span.record("route", &*route.template);
            }

            let result = next(ctx);

            let status = response_status(ctx, &result);
            let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
            span.record("status", status.as_u16());
            span.record("latency_us", latency_us);
            info!(
                status = status.as_u16(),
                latency_us,
                params = ctx.param_count(),
                "Request completed"
            );
            result
        });
        wrapped
    })
    .named("request_logger")
}
