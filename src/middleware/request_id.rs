use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use ulid::Ulid;

use super::core::Middleware;
use crate::context::Context;
use crate::handler::HandlerFunc;

/// Header carrying the request id in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adopt a valid ULID from an incoming `x-request-id` header (otherwise keep
/// the id generated at reset) and echo the id in the response.
#[must_use]
pub fn request_id() -> Middleware {
    Middleware::wrap(|next: HandlerFunc| {
        let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
            let incoming = ctx
                .request()
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Ulid::from_string(s.trim()).ok());
            if let Some(id) = incoming {
                ctx.set_request_id(id);
            }
            let value = HeaderValue::from_str(&ctx.request_id().to_string())?;
            ctx.response_mut()
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            next(ctx)
        });
        wrapped
    })
    .named("request_id")
}
