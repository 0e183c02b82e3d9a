//! Immediate re-attempts on acquire timeout.

use std::sync::Arc;

use nebula_telemetry::Recorder;
use tracing::info;

use super::{AcquisitionStrategy, PoolStrategy};
use crate::adapter::PoolAdapter;
use crate::context::{RequestContext, StrategyContext};
use crate::error::{Error, Result};

/// Histogram receiving the request's retry count whenever it is non-zero.
pub const RETRY_ATTEMPTS_HISTOGRAM: &str = "retryAttemptsHistogram";

/// Calls the inner strategy up to `retry_attempts` times.
///
/// Only [`Error::AcquireTimeout`] triggers another attempt; any other error
/// is returned as-is. No delay is inserted between attempts, pacing is left
/// to the pool's own wait time. When attempts run out the last timeout is
/// returned unchanged.
///
/// Every exit with a non-zero [`RequestContext::retry_attempts`] records that
/// count into [`RETRY_ATTEMPTS_HISTOGRAM`].
pub struct RetryStrategy<S> {
    inner: S,
    retry_attempts: u32,
    histogram: Arc<dyn Recorder>,
}

impl<P: PoolAdapter> RetryStrategy<PoolStrategy<P>> {
    /// Retry directly against the context's pool adapter.
    pub fn new(context: &StrategyContext<P>, retry_attempts: u32) -> Result<Self> {
        Self::with_inner(context, PoolStrategy::new(context), retry_attempts)
    }
}

impl<S> RetryStrategy<S> {
    /// Retry in front of an already built strategy.
    pub fn with_inner<P>(
        context: &StrategyContext<P>,
        inner: S,
        retry_attempts: u32,
    ) -> Result<Self> {
        if retry_attempts == 0 {
            return Err(Error::invalid_configuration(
                "retry_attempts must be greater than 0",
            ));
        }
        Ok(Self {
            inner,
            retry_attempts,
            histogram: context.metrics().histogram(RETRY_ATTEMPTS_HISTOGRAM),
        })
    }

    /// Maximum number of inner attempts per `acquire` call.
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }
}

impl<S: AcquisitionStrategy> RetryStrategy<S> {
    fn acquire_with_retries(&self, ctx: &mut RequestContext) -> Result<S::Connection> {
        let mut remaining = self.retry_attempts;
        loop {
            match self.inner.acquire(ctx) {
                Err(err) if err.is_retryable() => {
                    ctx.increment_attempts();
                    remaining -= 1;
                    if remaining == 0 {
                        info!(
                            retry_attempts = self.retry_attempts,
                            "can't acquire connection, retry attempts exhausted"
                        );
                        return Err(err);
                    }
                    info!(remaining, "can't acquire connection, retrying");
                }
                other => return other,
            }
        }
    }
}

impl<S: AcquisitionStrategy> AcquisitionStrategy for RetryStrategy<S> {
    type Connection = S::Connection;

    fn acquire(&self, ctx: &mut RequestContext) -> Result<S::Connection> {
        let result = self.acquire_with_retries(ctx);
        let attempted = ctx.retry_attempts();
        if attempted > 0 {
            self.histogram.update(i64::from(attempted));
        }
        result
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for RetryStrategy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("inner", &self.inner)
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::scripted::{Outcome, RootCause, Scripted, context};
    use pretty_assertions::assert_eq;
    use std::error::Error as _;

    #[test]
    fn zero_attempts_is_rejected() {
        let (ctx, _) = context();
        let err = RetryStrategy::with_inner(&ctx, Scripted::always(Outcome::Connect), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: retry_attempts must be greater than 0"
        );
    }

    #[test]
    fn first_attempt_success_records_nothing() {
        let (ctx, metrics) = context();
        let retry = RetryStrategy::with_inner(&ctx, Scripted::always(Outcome::Connect), 5).unwrap();
        let mut request = RequestContext::new();

        assert_eq!(retry.acquire(&mut request).unwrap(), 1);
        assert_eq!(request.retry_attempts(), 0);
        assert_eq!(metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).count(), 0);
    }

    #[test]
    fn second_attempt_success_records_one() {
        let (ctx, metrics) = context();
        let inner = Scripted::new([Outcome::Timeout], Outcome::Connect);
        let retry = RetryStrategy::with_inner(&ctx, inner, 5).unwrap();
        let mut request = RequestContext::new();

        assert_eq!(retry.acquire(&mut request).unwrap(), 2);
        assert_eq!(request.retry_attempts(), 1);
        assert_eq!(metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).values(), vec![1]);
    }

    #[test]
    fn exhaustion_returns_last_timeout() {
        let (ctx, metrics) = context();
        let retry = RetryStrategy::with_inner(&ctx, Scripted::always(Outcome::Timeout), 2).unwrap();
        let mut request = RequestContext::new();

        let err = retry.acquire(&mut request).unwrap_err();
        let cause = err
            .source()
            .and_then(|s| s.downcast_ref::<RootCause>())
            .expect("root cause preserved");
        assert_eq!(cause.0, 2, "the last attempt's timeout is surfaced");
        assert_eq!(request.retry_attempts(), 2);
        assert_eq!(retry.inner.calls(), 2);
        assert_eq!(metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).values(), vec![2]);
    }

    #[test]
    fn non_timeout_error_is_not_retried() {
        let (ctx, metrics) = context();
        let retry = RetryStrategy::with_inner(&ctx, Scripted::always(Outcome::Fail), 3).unwrap();
        let mut request = RequestContext::new();

        let err = retry.acquire(&mut request).unwrap_err();
        assert!(matches!(err, Error::Pool { .. }));
        assert_eq!(retry.inner.calls(), 1);
        assert_eq!(request.retry_attempts(), 0);
        assert_eq!(metrics.histogram_handle(RETRY_ATTEMPTS_HISTOGRAM).count(), 0);
    }

    #[test]
    fn remaining_attempts_reset_between_calls() {
        let (ctx, _) = context();
        let inner = Scripted::new(
            [Outcome::Timeout, Outcome::Connect, Outcome::Timeout],
            Outcome::Connect,
        );
        let retry = RetryStrategy::with_inner(&ctx, inner, 2).unwrap();

        assert!(retry.acquire(&mut RequestContext::new()).is_ok());
        assert!(retry.acquire(&mut RequestContext::new()).is_ok());
        assert_eq!(retry.inner.calls(), 4);
    }
}
