//! Per-request and per-chain contexts

use std::sync::Arc;

use nebula_telemetry::MetricsSink;
use tokio_util::sync::CancellationToken;

/// State of one logical "get a connection" call.
///
/// Created by the caller before the first `acquire`, owned by that call path
/// alone and dropped afterwards. The retry counter only feeds metrics;
/// strategies keep their own local counters for control decisions.
#[derive(Debug)]
pub struct RequestContext {
    retry_attempts: u32,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context with no recorded retries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retry_attempts: 0,
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the default cancellation token with the caller's one.
    ///
    /// Cancelling the token interrupts the request while it waits for the
    /// pool resize lock.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Count one observed timeout.
    pub fn increment_attempts(&mut self) {
        self.retry_attempts = self.retry_attempts.saturating_add(1);
    }

    /// Timeouts observed so far, across every layer of the chain.
    #[must_use]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Interrupt this request.
    pub fn interrupt(&self) {
        self.cancellation.cancel();
    }

    /// Whether the request has been interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Collaborators shared by every strategy of a chain: the pool adapter and
/// the metrics sink.
pub struct StrategyContext<P> {
    pool: Arc<P>,
    metrics: Arc<dyn MetricsSink>,
}

impl<P> StrategyContext<P> {
    /// Bundle a pool adapter with a metrics sink.
    pub fn new(pool: Arc<P>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { pool, metrics }
    }

    /// The pool adapter.
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// The metrics sink.
    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }
}

impl<P> Clone for StrategyContext<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<P> std::fmt::Debug for StrategyContext<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyContext").finish_non_exhaustive()
    }
}
