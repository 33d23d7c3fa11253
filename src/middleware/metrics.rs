use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::core::{response_status, Middleware};
use crate::context::Context;
use crate::handler::HandlerFunc;

/// Request counters updated by the middleware returned from
/// [`MetricsMiddleware::middleware`].
///
/// All counters are atomics updated with relaxed ordering; reads are a
/// consistent-enough snapshot for reporting, not a transaction.
///
/// ```
/// use radix_dispatch::middleware::MetricsMiddleware;
/// use std::sync::Arc;
///
/// let metrics = Arc::new(MetricsMiddleware::new());
/// let mw = metrics.middleware();
/// assert_eq!(mw.name(), "metrics");
/// assert_eq!(metrics.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    handler_errors: AtomicU64,
    total_latency_ns: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub handler_errors: u64,
    pub average_latency: Duration,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Middleware that records into these counters
    #[must_use]
    pub fn middleware(self: &Arc<Self>) -> Middleware {
        let metrics = Arc::clone(self);
        Middleware::wrap(move |next: HandlerFunc| {
            let metrics = Arc::clone(&metrics);
            let wrapped: HandlerFunc = Arc::new(move |ctx: &mut Context| {
                let start = Instant::now();
                let result = next(ctx);
                let status = response_status(ctx, &result);
                metrics.record(status.as_u16(), result.is_err(), start.elapsed());
                result
            });
            wrapped
        })
        .named("metrics")
    }

    fn record(&self, status: u16, failed: bool, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        if failed {
            self.handler_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean latency through the middleware, zero before the first request
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.request_count(),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            average_latency: self.average_latency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_classifies_status() {
        let metrics = MetricsMiddleware::new();
        metrics.record(200, false, Duration::from_micros(10));
        metrics.record(404, true, Duration::from_micros(20));
        metrics.record(503, true, Duration::from_micros(30));
        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.client_errors, 1);
        assert_eq!(snap.server_errors, 1);
        assert_eq!(snap.handler_errors, 2);
        assert_eq!(snap.average_latency, Duration::from_micros(20));
    }

    #[test]
    fn test_average_latency_without_requests() {
        assert_eq!(MetricsMiddleware::new().average_latency(), Duration::ZERO);
    }
}
