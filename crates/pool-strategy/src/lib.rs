#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Nebula Pool Strategy
//!
//! Adaptive acquisition policy in front of a fixed-capacity connection pool.
//! When the pool cannot hand out a connection in time, pluggable strategies
//! decide whether to retry, grow the pool, or give up.
//!
//! - [`RetryStrategy`] -- re-attempts the inner strategy on timeout
//! - [`GrowOnTimeoutStrategy`] -- raises the pool capacity, up to a ceiling
//! - [`PoolStrategy`] -- the chain's base, calls the [`PoolAdapter`]
//! - [`ChainConfig`] -- builds a chain from configuration
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use nebula_pool_strategy::{
//!     AcquisitionStrategy, BoundedPool, GrowOnTimeoutStrategy, PoolAdapter, RequestContext,
//!     RetryStrategy, StrategyContext,
//! };
//! use nebula_telemetry::MetricsRegistry;
//!
//! let pool = Arc::new(BoundedPool::new(1, Duration::from_millis(10)));
//! let context = StrategyContext::new(pool.clone(), Arc::new(MetricsRegistry::new()));
//!
//! let retry = RetryStrategy::new(&context, 2).unwrap();
//! let chain = GrowOnTimeoutStrategy::with_inner(&context, retry, 2).unwrap();
//!
//! let _first = chain.acquire(&mut RequestContext::new()).unwrap();
//! let _second = chain.acquire(&mut RequestContext::new()).unwrap();
//! assert_eq!(pool.max_pool_size(), 2);
//! ```
//!
//! Connection lifecycle stays with the adapter; metrics storage stays with
//! the [`MetricsSink`](nebula_telemetry::MetricsSink).

pub mod adapter;
pub mod config;
pub mod context;
pub mod error;
pub mod strategy;

pub use adapter::{BoundedPool, Lease, PoolAdapter, WaitTimedOut};
pub use config::{ChainConfig, StrategyConfig};
pub use context::{RequestContext, StrategyContext};
pub use error::{BoxError, Error, Result};
pub use strategy::{
    AcquisitionStrategy, BoxedStrategy, GrowOnTimeoutStrategy, MAX_POOL_SIZE_HISTOGRAM,
    PoolStrategy, RETRY_ATTEMPTS_HISTOGRAM, RetryStrategy,
};
