//! Property tests for retry counting.
//!
//! For any attempt budget `n`, an inner factory succeeding on attempt `k <= n`
//! yields `k - 1` recorded retries, and a factory that never succeeds yields
//! exactly `n` attempts and the original timeout.

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use nebula_pool_strategy::{
    AcquisitionStrategy, BoundedPool, Error, RETRY_ATTEMPTS_HISTOGRAM, RequestContext, Result,
    RetryStrategy, StrategyContext,
};
use nebula_telemetry::MetricsRegistry;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test factory
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("pool wait expired (attempt {0})")]
struct PoolWaitExpired(u32);

/// Times out until call number `succeed_on`, then hands out that number.
struct FlakyFactory {
    succeed_on: Option<u32>,
    calls: AtomicU32,
}

impl FlakyFactory {
    fn succeeding_on(attempt: u32) -> Self {
        Self {
            succeed_on: Some(attempt),
            calls: AtomicU32::new(0),
        }
    }

    fn never() -> Self {
        Self {
            succeed_on: None,
            calls: AtomicU32::new(0),
        }
    }
}

impl AcquisitionStrategy for FlakyFactory {
    type Connection = u32;

    fn acquire(&self, _ctx: &mut RequestContext) -> Result<u32> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.succeed_on {
            Some(attempt) if call >= attempt => Ok(call),
            _ => Err(Error::acquire_timeout(PoolWaitExpired(call))),
        }
    }
}

fn context() -> (StrategyContext<BoundedPool>, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new());
    let pool = Arc::new(BoundedPool::new(1, Duration::from_millis(10)));
    (StrategyContext::new(pool, metrics.clone()), metrics)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn success_on_attempt_k_records_k_minus_one(
        (budget, k) in (1u32..16).prop_flat_map(|n| (Just(n), 1..=n)),
    ) {
        let (context, metrics) = context();
        let retry = RetryStrategy::with_inner(&context, FlakyFactory::succeeding_on(k), budget).unwrap();
        let mut request = RequestContext::new();

        let connection = retry.acquire(&mut request).unwrap();

        prop_assert_eq!(connection, k);
        prop_assert_eq!(request.retry_attempts(), k - 1);
        let expected: Vec<i64> = if k > 1 { vec![i64::from(k - 1)] } else { Vec::new() };
        prop_assert_eq!(metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).values(), expected);
    }

    #[test]
    fn never_succeeding_factory_exhausts_budget(budget in 1u32..16) {
        let (context, metrics) = context();
        let retry = RetryStrategy::with_inner(&context, FlakyFactory::never(), budget).unwrap();
        let mut request = RequestContext::new();

        let err = retry.acquire(&mut request).unwrap_err();

        prop_assert!(err.is_timeout());
        let cause = err.source().and_then(|s| s.downcast_ref::<PoolWaitExpired>());
        prop_assert_eq!(cause.map(|c| c.0), Some(budget));
        prop_assert_eq!(request.retry_attempts(), budget);
        prop_assert_eq!(
            metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).values(),
            vec![i64::from(budget)]
        );
    }
}

#[test]
fn zero_attempts_fail_construction() {
    let (context, _) = context();
    let err = RetryStrategy::new(&context, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration { .. }));
}

#[test]
fn retry_directly_over_pool_times_out_with_pool_cause() {
    let (context, metrics) = context();
    let retry = RetryStrategy::new(&context, 3).unwrap();
    let _held = retry.acquire(&mut RequestContext::new()).unwrap();

    let mut request = RequestContext::new();
    let err = retry.acquire(&mut request).unwrap_err();

    assert!(
        err.source()
            .is_some_and(|s| s.is::<nebula_pool_strategy::WaitTimedOut>())
    );
    assert_eq!(request.retry_attempts(), 3);
    assert_eq!(
        metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).values(),
        vec![3]
    );
}
