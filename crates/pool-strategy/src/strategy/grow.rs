//! Pool growth on acquire timeout.
//!
//! Many threads can time out at once and race to grow the pool. Each one
//! snapshots the capacity before calling its inner strategy; under the resize
//! lock only a thread whose snapshot still matches the live capacity may
//! increment it. Everyone else sees `current > expected`, treats the other
//! thread's increment as progress and retries without touching the pool, so
//! a burst of timeouts costs one increment per generation.

use std::sync::Arc;
use std::time::Duration;

use nebula_telemetry::Recorder;
use parking_lot::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::{AcquisitionStrategy, PoolStrategy};
use crate::adapter::PoolAdapter;
use crate::context::{RequestContext, StrategyContext};
use crate::error::{Error, Result};

/// Histogram receiving every capacity this strategy grows the pool to.
pub const MAX_POOL_SIZE_HISTOGRAM: &str = "maxPoolSizeHistogram";

/// How long a single wait on the resize lock lasts before the request's
/// interruption flag is checked again.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Grows the pool by one slot when the inner strategy times out, up to
/// `max_overflow_pool_size`, then tries the inner strategy again.
///
/// Capacity only ever goes up through this strategy. Once the ceiling is
/// reached the inner timeout is returned unchanged.
pub struct GrowOnTimeoutStrategy<S, P> {
    inner: S,
    pool: Arc<P>,
    max_overflow_pool_size: usize,
    histogram: Arc<dyn Recorder>,
    resize_lock: Mutex<()>,
}

impl<P: PoolAdapter> GrowOnTimeoutStrategy<PoolStrategy<P>, P> {
    /// Grow directly in front of the context's pool adapter.
    pub fn new(context: &StrategyContext<P>, max_overflow_pool_size: usize) -> Result<Self> {
        Self::with_inner(context, PoolStrategy::new(context), max_overflow_pool_size)
    }
}

impl<S, P: PoolAdapter> GrowOnTimeoutStrategy<S, P> {
    /// Grow in front of an already built strategy.
    ///
    /// The ceiling must be positive and not below the pool's current
    /// capacity.
    pub fn with_inner(
        context: &StrategyContext<P>,
        inner: S,
        max_overflow_pool_size: usize,
    ) -> Result<Self> {
        if max_overflow_pool_size == 0 {
            return Err(Error::invalid_configuration(
                "max_overflow_pool_size must be greater than 0",
            ));
        }
        let current = context.pool().max_pool_size();
        if max_overflow_pool_size < current {
            return Err(Error::invalid_configuration(format!(
                "max_overflow_pool_size ({max_overflow_pool_size}) must not be below \
                 the current max pool size ({current})"
            )));
        }
        Ok(Self {
            inner,
            pool: Arc::clone(context.pool()),
            max_overflow_pool_size,
            histogram: context.metrics().histogram(MAX_POOL_SIZE_HISTOGRAM),
            resize_lock: Mutex::new(()),
        })
    }

    /// Capacity ceiling this strategy never grows past.
    pub fn max_overflow_pool_size(&self) -> usize {
        self.max_overflow_pool_size
    }

    /// Try to raise the pool capacity above `expected_max`.
    ///
    /// Returns `true` when the capacity is now above `expected_max` and below
    /// the ceiling, whether this call incremented it or another thread already
    /// had. Returns `false` once the live capacity has reached the ceiling, or
    /// when `ctx` is interrupted while waiting for the resize lock; the
    /// interruption stays set for the caller to see.
    pub fn grow_pool(&self, ctx: &RequestContext, expected_max: usize) -> bool {
        let grown = {
            let _guard = match self.lock_interruptibly(ctx) {
                Ok(guard) => guard,
                Err(err) => {
                    warn!(error = %err, "pool growth abandoned");
                    return false;
                }
            };

            let current = self.pool.max_pool_size();
            if current >= self.max_overflow_pool_size {
                return false;
            }
            if current > expected_max {
                info!(
                    expected = expected_max,
                    current, "pool size already changed by another thread"
                );
                return true;
            }

            let grown = current + 1;
            self.pool.set_max_pool_size(grown);
            grown
        };

        info!(from = expected_max, to = grown, "pool size increased");
        self.histogram
            .update(i64::try_from(grown).unwrap_or(i64::MAX));
        true
    }

    /// Acquire the resize lock, giving up once `ctx` is interrupted.
    fn lock_interruptibly(&self, ctx: &RequestContext) -> Result<MutexGuard<'_, ()>> {
        loop {
            if ctx.is_interrupted() {
                return Err(Error::Interrupted);
            }
            if let Some(guard) = self.resize_lock.try_lock_for(LOCK_POLL_INTERVAL) {
                return Ok(guard);
            }
        }
    }
}

impl<S, P> AcquisitionStrategy for GrowOnTimeoutStrategy<S, P>
where
    S: AcquisitionStrategy,
    P: PoolAdapter,
{
    type Connection = S::Connection;

    fn acquire(&self, ctx: &mut RequestContext) -> Result<S::Connection> {
        loop {
            let expected_max = self.pool.max_pool_size();
            match self.inner.acquire(ctx) {
                Err(err) if err.is_retryable() => {
                    if !self.grow_pool(ctx, expected_max) {
                        info!(
                            ceiling = self.max_overflow_pool_size,
                            "can't acquire connection, pool size has already overflown to its max size"
                        );
                        return Err(err);
                    }
                }
                other => return other,
            }
        }
    }
}

impl<S: std::fmt::Debug, P> std::fmt::Debug for GrowOnTimeoutStrategy<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowOnTimeoutStrategy")
            .field("inner", &self.inner)
            .field("max_overflow_pool_size", &self.max_overflow_pool_size)
            .finish_non_exhaustive()
    }
}
