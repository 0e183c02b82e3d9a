#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Nebula Telemetry
//!
//! Metrics reporting points for Nebula pool strategies.
//!
//! This crate provides:
//! - [`MetricsSink`] / [`Recorder`] -- the capability strategies record through
//! - [`MetricsRegistry`] -- in-memory named histograms
//! - [`NoopMetricsRegistry`] -- discards every sample
//!
//! Storage and export of samples is the sink's business; strategies only
//! push point samples and never read them back.

pub mod metrics;

pub use metrics::{Histogram, MetricsRegistry, MetricsSink, NoopMetricsRegistry, Recorder};
