//! Metrics capability and in-memory histograms.
//!
//! Strategies depend on [`MetricsSink`] only. The registry here keeps every
//! sample in memory, which is what tests and demos need; production sinks
//! forward to an exporter instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// A point-sample sink for one named series.
///
/// `update` must not block the caller for any meaningful time and cannot
/// fail.
pub trait Recorder: Send + Sync {
    /// Record one sample.
    fn update(&self, value: i64);
}

/// Hands out recorders by name.
///
/// Asking twice for the same name yields recorders feeding the same series.
pub trait MetricsSink: Send + Sync {
    /// Get or create the histogram recorder called `name`.
    fn histogram(&self, name: &str) -> Arc<dyn Recorder>;
}

impl<T: MetricsSink + ?Sized> MetricsSink for Arc<T> {
    fn histogram(&self, name: &str) -> Arc<dyn Recorder> {
        (**self).histogram(name)
    }
}

/// A histogram that keeps every sample.
///
/// Not meant for millions of data points.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    samples: Arc<Mutex<Vec<i64>>>,
}

impl Histogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples recorded.
    #[must_use]
    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    /// Sum of all samples.
    #[must_use]
    pub fn sum(&self) -> i64 {
        self.samples.lock().iter().sum()
    }

    /// Largest sample, if any.
    #[must_use]
    pub fn max(&self) -> Option<i64> {
        self.samples.lock().iter().copied().max()
    }

    /// Most recent sample, if any.
    #[must_use]
    pub fn last(&self) -> Option<i64> {
        self.samples.lock().last().copied()
    }

    /// Copy of all samples in recording order.
    #[must_use]
    pub fn values(&self) -> Vec<i64> {
        self.samples.lock().clone()
    }
}

impl Recorder for Histogram {
    fn update(&self, value: i64) {
        self.samples.lock().push(value);
    }
}

/// Registry of named in-memory histograms.
///
/// # Examples
///
/// ```
/// use nebula_telemetry::metrics::{MetricsRegistry, MetricsSink};
///
/// let registry = MetricsRegistry::new();
/// registry.histogram("retryAttemptsHistogram").update(2);
///
/// // Same name, same series.
/// let same = registry.get("retryAttemptsHistogram").unwrap();
/// assert_eq!(same.values(), vec![2]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    histograms: Arc<RwLock<BTreeMap<String, Histogram>>>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the histogram called `name`, typed.
    pub fn histogram_handle(&self, name: &str) -> Histogram {
        if let Some(existing) = self.histograms.read().get(name) {
            return existing.clone();
        }
        self.histograms
            .write()
            .entry(name.to_owned())
            .or_default()
            .clone()
    }

    /// Look up an existing histogram without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Histogram> {
        self.histograms.read().get(name).cloned()
    }

    /// Samples of every histogram, keyed by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<i64>> {
        self.histograms
            .read()
            .iter()
            .map(|(name, h)| (name.clone(), h.values()))
            .collect()
    }
}

impl MetricsSink for MetricsRegistry {
    fn histogram(&self, name: &str) -> Arc<dyn Recorder> {
        Arc::new(self.histogram_handle(name))
    }
}

/// A sink that discards all samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsRegistry;

impl NoopMetricsRegistry {
    /// Create a noop registry.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn update(&self, _value: i64) {}
}

impl MetricsSink for NoopMetricsRegistry {
    fn histogram(&self, _name: &str) -> Arc<dyn Recorder> {
        Arc::new(NoopRecorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn histogram_starts_empty() {
        let h = Histogram::new();
        assert_eq!(h.count(), 0);
        assert_eq!(h.max(), None);
        assert_eq!(h.last(), None);
    }

    #[test]
    fn histogram_records_samples_in_order() {
        let h = Histogram::new();
        h.update(4);
        h.update(1);
        h.update(3);
        assert_eq!(h.values(), vec![4, 1, 3]);
        assert_eq!(h.count(), 3);
        assert_eq!(h.sum(), 8);
        assert_eq!(h.max(), Some(4));
        assert_eq!(h.last(), Some(3));
    }

    #[test]
    fn registry_returns_same_series_for_same_name() {
        let reg = MetricsRegistry::new();
        reg.histogram("maxPoolSizeHistogram").update(4);
        reg.histogram("maxPoolSizeHistogram").update(5);
        assert_eq!(reg.histogram_handle("maxPoolSizeHistogram").values(), vec![4, 5]);
    }

    #[test]
    fn registry_different_names_are_independent() {
        let reg = MetricsRegistry::new();
        reg.histogram("a").update(1);
        let b = reg.histogram_handle("b");
        assert_eq!(b.count(), 0);
        assert_eq!(reg.get("a").map(|h| h.count()), Some(1));
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn snapshot_lists_every_series() {
        let reg = MetricsRegistry::new();
        reg.histogram("x").update(7);
        reg.histogram("y");
        let snap = reg.snapshot();
        assert_eq!(snap.get("x"), Some(&vec![7]));
        assert_eq!(snap.get("y"), Some(&Vec::new()));
    }

    #[test]
    fn noop_sink_accepts_samples() {
        let sink = NoopMetricsRegistry::new();
        let recorder = sink.histogram("anything");
        recorder.update(42);
    }

    #[test]
    fn arc_sink_forwards_to_inner() {
        let reg = Arc::new(MetricsRegistry::new());
        let sink: Arc<dyn MetricsSink> = reg.clone();
        sink.histogram("z").update(9);
        assert_eq!(reg.histogram_handle("z").values(), vec![9]);
    }
}
