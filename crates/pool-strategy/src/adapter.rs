//! Pool adapter contract and an in-memory bounded pool.
//!
//! Strategies never open or close connections themselves. They go through
//! [`PoolAdapter`], which also exposes the pool capacity that
//! [`GrowOnTimeoutStrategy`](crate::GrowOnTimeoutStrategy) raises.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::context::RequestContext;
use crate::error::{Error, Result};

/// Narrow view of the underlying connection pool.
pub trait PoolAdapter: Send + Sync {
    /// Connection handle handed out by the pool.
    type Connection;

    /// Take a connection, waiting at most the pool's own wait time.
    ///
    /// Fails with [`Error::AcquireTimeout`] when nothing became available.
    fn get_connection(&self, ctx: &mut RequestContext) -> Result<Self::Connection>;

    /// Current capacity of the pool.
    fn max_pool_size(&self) -> usize;

    /// Change the capacity of the pool.
    ///
    /// Reads are safe from any thread; read-modify-write sequences need
    /// external synchronization.
    fn set_max_pool_size(&self, max_pool_size: usize);
}

/// Cause attached to timeouts raised by [`BoundedPool`].
#[derive(Debug, Clone, Error)]
#[error("no connection available after {waited:?} (capacity {max_pool_size})")]
pub struct WaitTimedOut {
    /// How long the caller waited
    pub waited: Duration,
    /// Capacity at the moment the wait expired
    pub max_pool_size: usize,
}

#[derive(Debug)]
struct State {
    max_pool_size: usize,
    in_use: usize,
    next_id: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    released: Condvar,
}

/// In-memory pool that leases up to `max_pool_size` slots at once.
///
/// Callers block for at most `acquire_timeout` when every slot is leased.
/// Raising the capacity wakes the waiters.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    shared: Arc<Shared>,
    acquire_timeout: Duration,
}

impl BoundedPool {
    /// Create a pool with the given capacity and wait time.
    #[must_use]
    pub fn new(max_pool_size: usize, acquire_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    max_pool_size,
                    in_use: 0,
                    next_id: 0,
                }),
                released: Condvar::new(),
            }),
            acquire_timeout,
        }
    }

    /// Slots currently leased.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.shared.state.lock().in_use
    }

    /// Slots that could be leased right now without waiting.
    #[must_use]
    pub fn idle_capacity(&self) -> usize {
        let state = self.shared.state.lock();
        state.max_pool_size.saturating_sub(state.in_use)
    }

    /// The configured wait time.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}

impl PoolAdapter for BoundedPool {
    type Connection = Lease;

    fn get_connection(&self, _ctx: &mut RequestContext) -> Result<Lease> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut state = self.shared.state.lock();
        while state.in_use >= state.max_pool_size {
            if self
                .shared
                .released
                .wait_until(&mut state, deadline)
                .timed_out()
                && state.in_use >= state.max_pool_size
            {
                return Err(Error::acquire_timeout(WaitTimedOut {
                    waited: self.acquire_timeout,
                    max_pool_size: state.max_pool_size,
                }));
            }
        }
        state.in_use += 1;
        state.next_id += 1;
        Ok(Lease {
            id: state.next_id,
            shared: Arc::clone(&self.shared),
        })
    }

    fn max_pool_size(&self) -> usize {
        self.shared.state.lock().max_pool_size
    }

    fn set_max_pool_size(&self, max_pool_size: usize) {
        let mut state = self.shared.state.lock();
        state.max_pool_size = max_pool_size;
        drop(state);
        self.shared.released.notify_all();
    }
}

/// A leased slot of a [`BoundedPool`]. Returned to the pool on drop.
#[derive(Debug)]
pub struct Lease {
    id: u64,
    shared: Arc<Shared>,
}

impl Lease {
    /// Sequence number of this lease, unique per pool.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);
        self.shared.released.notify_one();
    }
}
