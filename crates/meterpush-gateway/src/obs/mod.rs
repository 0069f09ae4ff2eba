//! Metrics pipeline for the gateway.
//!
//! Instruments live in `meterpush-core`; this module adds the export cadence,
//! the exporter boundary, and HTTP request instrumentation.

pub mod exporter;
pub mod http;
pub mod provider;

pub use exporter::{Exporter, HttpPushExporter};
pub use http::{instrument, track_requests, HttpMetrics, InFlight};
pub use provider::{ExportStats, MeterProvider, MeterProviderBuilder};
