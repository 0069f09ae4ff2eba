//! Instrument Set: counter, up/down counter and histogram.
//!
//! Every instrument keeps one sub-series per [`AttributeSet`] in a `DashMap`.
//! Counters accumulate into atomics; histogram sub-series mutate under the
//! owning shard's write lock. Reads copy current values out and never hold a
//! lock beyond that copy.
//!
//! Handles are cheap to clone and share one underlying series map, so the
//! middleware and the registry observe the same values.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::attributes::AttributeSet;
use crate::error::{MeterError, Result};
use crate::snapshot::{DataPoint, HistogramPoint, MetricData, PointValue};

/// Default latency buckets, in seconds.
pub const DEFAULT_BOUNDARIES: [f64; 11] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Counter,
    UpDownCounter,
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub description: Option<String>,
    pub kind: InstrumentKind,
}

/// Shared open/closed state for every instrument of one registry.
#[derive(Clone, Default)]
pub(crate) struct Gate(Arc<GateInner>);

#[derive(Default)]
struct GateInner {
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl Gate {
    /// Returns false (and counts the write as dropped) once closed.
    fn admit(&self, instrument: &str) -> bool {
        if !self.0.closed.load(Ordering::Acquire) {
            return true;
        }
        self.0.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(instrument, "write after teardown dropped");
        false
    }

    pub(crate) fn close(&self) {
        self.0.closed.store(true, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::Acquire)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.0.dropped.load(Ordering::Relaxed)
    }
}

// --------------------
// Counter
// --------------------

/// Monotonic counter.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    descriptor: Descriptor,
    series: DashMap<AttributeSet, AtomicU64>,
    gate: Gate,
}

impl Counter {
    pub(crate) fn new(descriptor: Descriptor, gate: Gate) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                descriptor,
                series: DashMap::new(),
                gate,
            }),
        }
    }

    /// Add a non-negative delta to the sub-series selected by `attrs`.
    pub fn add(&self, delta: i64, attrs: &AttributeSet) -> Result<()> {
        if delta < 0 {
            return Err(MeterError::InvalidArgument(format!(
                "counter {} got negative delta {delta}",
                self.inner.descriptor.name
            )));
        }
        if !self.inner.gate.admit(&self.inner.descriptor.name) {
            return Ok(());
        }
        let delta = delta as u64;
        if let Some(v) = self.inner.series.get(attrs) {
            v.fetch_add(delta, Ordering::Relaxed);
            return Ok(());
        }
        self.inner
            .series
            .entry(attrs.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
        Ok(())
    }

    /// Current value of one sub-series, `None` if it was never written.
    pub fn value(&self, attrs: &AttributeSet) -> Option<u64> {
        self.inner
            .series
            .get(attrs)
            .map(|v| v.load(Ordering::Relaxed))
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.inner.descriptor
    }

    fn points(&self) -> Vec<DataPoint> {
        self.inner
            .series
            .iter()
            .map(|r| DataPoint {
                attributes: r.key().clone(),
                value: PointValue::Counter(r.value().load(Ordering::Relaxed)),
            })
            .collect()
    }
}

// --------------------
// UpDownCounter
// --------------------

/// Counter that also accepts negative deltas (e.g. in-flight requests).
#[derive(Clone)]
pub struct UpDownCounter {
    inner: Arc<UpDownInner>,
}

struct UpDownInner {
    descriptor: Descriptor,
    series: DashMap<AttributeSet, AtomicI64>,
    gate: Gate,
}

impl UpDownCounter {
    pub(crate) fn new(descriptor: Descriptor, gate: Gate) -> Self {
        Self {
            inner: Arc::new(UpDownInner {
                descriptor,
                series: DashMap::new(),
                gate,
            }),
        }
    }

    /// Add a signed delta. A sub-series that goes below zero indicates an
    /// unbalanced caller; it is logged, not rejected.
    pub fn add(&self, delta: i64, attrs: &AttributeSet) -> Result<()> {
        if !self.inner.gate.admit(&self.inner.descriptor.name) {
            return Ok(());
        }
        // The read guard must be released before `entry` takes the shard write lock.
        let existing = self
            .inner
            .series
            .get(attrs)
            .map(|v| v.fetch_add(delta, Ordering::Relaxed));
        let prev = match existing {
            Some(prev) => prev,
            None => self
                .inner
                .series
                .entry(attrs.clone())
                .or_insert_with(|| AtomicI64::new(0))
                .fetch_add(delta, Ordering::Relaxed),
        };
        if prev.saturating_add(delta) < 0 {
            tracing::debug!(
                instrument = %self.inner.descriptor.name,
                attributes = %attrs,
                value = prev.saturating_add(delta),
                "up/down counter went negative"
            );
        }
        Ok(())
    }

    pub fn value(&self, attrs: &AttributeSet) -> Option<i64> {
        self.inner
            .series
            .get(attrs)
            .map(|v| v.load(Ordering::Relaxed))
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.inner.descriptor
    }

    fn points(&self) -> Vec<DataPoint> {
        self.inner
            .series
            .iter()
            .map(|r| DataPoint {
                attributes: r.key().clone(),
                value: PointValue::UpDownCounter(r.value().load(Ordering::Relaxed)),
            })
            .collect()
    }
}

// --------------------
// Histogram
// --------------------

#[derive(Debug, Clone)]
struct HistogramState {
    bucket_counts: Vec<u64>,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl HistogramState {
    fn new(buckets: usize) -> Self {
        Self {
            bucket_counts: vec![0; buckets],
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn observe(&mut self, bucket: usize, value: f64) {
        self.bucket_counts[bucket] += 1;
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn to_point(&self, boundaries: &[f64]) -> HistogramPoint {
        let seen = self.count > 0;
        HistogramPoint {
            boundaries: boundaries.to_vec(),
            bucket_counts: self.bucket_counts.clone(),
            count: self.count,
            sum: self.sum,
            min: seen.then_some(self.min),
            max: seen.then_some(self.max),
        }
    }
}

/// Explicit-bucket histogram. Bucket `i` counts values in
/// `(boundaries[i-1], boundaries[i]]`; the last bucket is unbounded above.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

struct HistogramInner {
    descriptor: Descriptor,
    boundaries: Arc<[f64]>,
    series: DashMap<AttributeSet, HistogramState>,
    gate: Gate,
}

impl Histogram {
    pub(crate) fn new(descriptor: Descriptor, boundaries: Vec<f64>, gate: Gate) -> Result<Self> {
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(MeterError::Configuration(format!(
                "histogram {} boundaries must be finite",
                descriptor.name
            )));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MeterError::Configuration(format!(
                "histogram {} boundaries must be strictly increasing",
                descriptor.name
            )));
        }
        Ok(Self {
            inner: Arc::new(HistogramInner {
                descriptor,
                boundaries: boundaries.into(),
                series: DashMap::new(),
                gate,
            }),
        })
    }

    /// Record one observation. NaN is rejected.
    pub fn record(&self, value: f64, attrs: &AttributeSet) -> Result<()> {
        if value.is_nan() {
            return Err(MeterError::InvalidArgument(format!(
                "histogram {} got NaN",
                self.inner.descriptor.name
            )));
        }
        if !self.inner.gate.admit(&self.inner.descriptor.name) {
            return Ok(());
        }
        let bucket = self.inner.boundaries.partition_point(|b| *b < value);
        if let Some(mut state) = self.inner.series.get_mut(attrs) {
            state.observe(bucket, value);
            return Ok(());
        }
        let buckets = self.inner.boundaries.len() + 1;
        self.inner
            .series
            .entry(attrs.clone())
            .or_insert_with(|| HistogramState::new(buckets))
            .observe(bucket, value);
        Ok(())
    }

    /// Copy of one sub-series' distribution.
    pub fn snapshot(&self, attrs: &AttributeSet) -> Option<HistogramPoint> {
        self.inner
            .series
            .get(attrs)
            .map(|s| s.to_point(&self.inner.boundaries))
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.inner.boundaries
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.inner.descriptor
    }

    fn points(&self) -> Vec<DataPoint> {
        self.inner
            .series
            .iter()
            .map(|r| DataPoint {
                attributes: r.key().clone(),
                value: PointValue::Histogram(r.value().to_point(&self.inner.boundaries)),
            })
            .collect()
    }
}

// --------------------
// Polymorphic handle
// --------------------

/// Any registered instrument.
#[derive(Clone)]
pub enum Instrument {
    Counter(Counter),
    UpDownCounter(UpDownCounter),
    Histogram(Histogram),
}

impl Instrument {
    pub fn descriptor(&self) -> &Descriptor {
        match self {
            Instrument::Counter(c) => c.descriptor(),
            Instrument::UpDownCounter(u) => u.descriptor(),
            Instrument::Histogram(h) => h.descriptor(),
        }
    }

    /// Copy every sub-series into an immutable [`MetricData`].
    pub fn collect(&self) -> MetricData {
        let mut points = match self {
            Instrument::Counter(c) => c.points(),
            Instrument::UpDownCounter(u) => u.points(),
            Instrument::Histogram(h) => h.points(),
        };
        points.sort_by(|a, b| a.attributes.cmp(&b.attributes));

        let d = self.descriptor();
        MetricData {
            name: d.name.clone(),
            description: d.description.clone(),
            kind: d.kind,
            points,
        }
    }
}
