use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::core::Context;
use crate::config::PoolConfig;

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts created because no idle one was available
    pub allocated: u64,
    /// Acquisitions served from the idle list
    pub reused: u64,
    /// Contexts dropped: stale generation or idle list full
    pub discarded: u64,
    /// Contexts currently idle
    pub idle: usize,
    /// Current generation; bumped whenever parameter capacity grows
    pub generation: u64,
    /// Capture slots every context of the current generation reserves
    pub param_capacity: usize,
}

/// Pool of reusable [`Context`]s.
///
/// `acquire` never blocks on availability: an empty pool allocates. Each
/// context is handed to exactly one caller until it is released.
///
/// Contexts carry the generation they were created in. Growing the parameter
/// capacity bumps the generation, so contexts sized for fewer parameters are
/// dropped instead of being reused.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    max_idle: usize,
    param_capacity: AtomicUsize,
    generation: AtomicU64,
    allocated: AtomicU64,
    reused: AtomicU64,
    discarded: AtomicU64,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl ContextPool {
    #[must_use]
    pub fn new(config: &PoolConfig) -> Self {
        let pool = Self {
            idle: Mutex::new(Vec::with_capacity(config.prewarm.min(config.max_idle))),
            max_idle: config.max_idle,
            param_capacity: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        };
        pool.prewarm(config.prewarm);
        pool
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<Box<Context>>> {
        // A panic while holding the lock leaves only a Vec of reset contexts
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate up to `count` idle contexts ahead of traffic
    pub fn prewarm(&self, count: usize) {
        let generation = self.generation.load(Ordering::Acquire);
        let capacity = self.param_capacity.load(Ordering::Acquire);
        let mut idle = self.lock_idle();
        let target = count.min(self.max_idle);
        while idle.len() < target {
            idle.push(Box::new(Context::new(generation, capacity)));
            self.allocated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a context for exclusive use. It must be [`reset`](Context::reset)
    /// before use.
    pub fn acquire(&self) -> Box<Context> {
        // Generation first: capacity is raised before the generation is bumped
        let generation = self.generation.load(Ordering::Acquire);
        {
            let mut idle = self.lock_idle();
            while let Some(ctx) = idle.pop() {
                if ctx.generation == generation {
                    self.reused.fetch_add(1, Ordering::Relaxed);
                    return ctx;
                }
                self.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);
        let capacity = self.param_capacity.load(Ordering::Acquire);
        Box::new(Context::new(generation, capacity))
    }

    /// Return a context. The caller must not use it afterwards.
    pub fn release(&self, mut ctx: Box<Context>) {
        ctx.clear();
        if ctx.generation != self.generation.load(Ordering::Acquire) {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let mut idle = self.lock_idle();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        } else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Acquire a context that is released when the guard drops
    pub fn lease(&self) -> Lease<'_> {
        Lease {
            pool: self,
            ctx: Some(self.acquire()),
        }
    }

    /// Make sure every context handed out from now on can hold `params`
    /// captures without growing. Invalidates pooled contexts when the
    /// capacity increases.
    pub fn ensure_param_capacity(&self, params: usize) {
        let previous = self.param_capacity.fetch_max(params, Ordering::AcqRel);
        if params <= previous {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let dropped = {
            let mut idle = self.lock_idle();
            let n = idle.len();
            idle.clear();
            n
        };
        self.discarded.fetch_add(dropped as u64, Ordering::Relaxed);
        info!(
            previous,
            capacity = params,
            generation,
            dropped,
            "Context pool parameter capacity increased"
        );
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let idle = self.lock_idle().len();
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle,
            generation: self.generation.load(Ordering::Acquire),
            param_capacity: self.param_capacity.load(Ordering::Acquire),
        }
    }
}

/// Exclusive handle on a pooled [`Context`].
///
/// Dropping the lease releases the context, on every exit path including
/// unwinding out of a handler.
pub struct Lease<'p> {
    pool: &'p ContextPool,
    ctx: Option<Box<Context>>,
}

impl Deref for Lease<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        // Only `drop` takes the context out
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("lease used after release"),
        }
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        match &mut self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("lease used after release"),
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            if std::thread::panicking() {
                debug!("Releasing context while unwinding");
            }
            self.pool.release(ctx);
        }
    }
}
