//! meterpush core: instrument primitives, snapshots, and the shared error type.
//!
//! This crate carries no transport or runtime dependencies. The gateway
//! drives export cadence and HTTP instrumentation on top of it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Bad instrument input surfaces as `MeterError::InvalidArgument` so a single
//! bad call never takes down request handling.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod attributes;
pub mod error;
pub mod instrument;
pub mod registry;
pub mod snapshot;

pub use attributes::AttributeSet;
pub use error::{ErrorKind, MeterError, Result};
pub use instrument::{Counter, Histogram, Instrument, InstrumentKind, UpDownCounter};
pub use registry::Registry;
pub use snapshot::{DataPoint, HistogramPoint, MetricData, PointValue, Resource, Snapshot};
