//! Acquisition strategies and their composition.
//!
//! Every strategy owns exactly one inner strategy (its connection factory)
//! and decides what to do when that inner strategy times out. The chain ends
//! in [`PoolStrategy`], which asks the [`PoolAdapter`] directly:
//!
//! ```text
//! caller -> GrowOnTimeoutStrategy -> RetryStrategy -> PoolStrategy -> PoolAdapter
//! ```
//!
//! Strategies are agnostic to what their inner layer is, so either order
//! works: growth outside retry grows only once retries are exhausted, retry
//! outside growth retries only once the pool has hit its ceiling.

mod grow;
mod retry;

use std::sync::Arc;

pub use grow::{GrowOnTimeoutStrategy, MAX_POOL_SIZE_HISTOGRAM};
pub use retry::{RETRY_ATTEMPTS_HISTOGRAM, RetryStrategy};

use crate::adapter::PoolAdapter;
use crate::context::{RequestContext, StrategyContext};
use crate::error::Result;

/// One layer of the acquisition chain.
pub trait AcquisitionStrategy: Send + Sync {
    /// Connection handle produced by the chain.
    type Connection;

    /// Obtain a connection for `ctx`, or surface the terminal error.
    fn acquire(&self, ctx: &mut RequestContext) -> Result<Self::Connection>;
}

/// Type-erased strategy chain.
pub type BoxedStrategy<C> = Box<dyn AcquisitionStrategy<Connection = C>>;

impl<S: AcquisitionStrategy + ?Sized> AcquisitionStrategy for Box<S> {
    type Connection = S::Connection;

    fn acquire(&self, ctx: &mut RequestContext) -> Result<Self::Connection> {
        (**self).acquire(ctx)
    }
}

impl<S: AcquisitionStrategy + ?Sized> AcquisitionStrategy for Arc<S> {
    type Connection = S::Connection;

    fn acquire(&self, ctx: &mut RequestContext) -> Result<Self::Connection> {
        (**self).acquire(ctx)
    }
}

/// Base of every chain: forwards straight to the pool adapter.
pub struct PoolStrategy<P> {
    pool: Arc<P>,
}

impl<P> PoolStrategy<P> {
    /// Build the base strategy over the context's adapter.
    pub fn new(context: &StrategyContext<P>) -> Self {
        Self {
            pool: Arc::clone(context.pool()),
        }
    }
}

impl<P: PoolAdapter> AcquisitionStrategy for PoolStrategy<P> {
    type Connection = P::Connection;

    fn acquire(&self, ctx: &mut RequestContext) -> Result<P::Connection> {
        self.pool.get_connection(ctx)
    }
}

impl<P> std::fmt::Debug for PoolStrategy<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolStrategy").finish_non_exhaustive()
    }
}
