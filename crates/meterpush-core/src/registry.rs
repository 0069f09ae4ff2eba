//! Instrument registration and collection.
//!
//! Names are unique per registry. `collect` walks every instrument and copies
//! its sub-series; writers only contend with it for the duration of that copy.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{MeterError, Result};
use crate::instrument::{
    Counter, Descriptor, Gate, Histogram, Instrument, InstrumentKind, UpDownCounter,
    DEFAULT_BOUNDARIES,
};
use crate::snapshot::Snapshot;

pub struct Registry {
    scope: String,
    instruments: DashMap<String, Instrument>,
    gate: Gate,
}

impl Registry {
    /// `scope` names the instrumentation library (e.g. `"http"`).
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            instruments: DashMap::new(),
            gate: Gate::default(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// An empty `description` registers the instrument without one.
    pub fn register_counter(&self, name: &str, description: &str) -> Result<Counter> {
        let gate = self.gate.clone();
        let inst = self.register(name, description, InstrumentKind::Counter, |d| {
            Ok(Instrument::Counter(Counter::new(d, gate)))
        })?;
        match inst {
            Instrument::Counter(c) => Ok(c),
            _ => Err(MeterError::DuplicateName(name.to_string())),
        }
    }

    pub fn register_up_down_counter(&self, name: &str, description: &str) -> Result<UpDownCounter> {
        let gate = self.gate.clone();
        let inst = self.register(name, description, InstrumentKind::UpDownCounter, |d| {
            Ok(Instrument::UpDownCounter(UpDownCounter::new(d, gate)))
        })?;
        match inst {
            Instrument::UpDownCounter(u) => Ok(u),
            _ => Err(MeterError::DuplicateName(name.to_string())),
        }
    }

    /// Histogram with [`DEFAULT_BOUNDARIES`] (seconds).
    pub fn register_histogram(&self, name: &str, description: &str) -> Result<Histogram> {
        self.register_histogram_with_boundaries(name, description, DEFAULT_BOUNDARIES.to_vec())
    }

    pub fn register_histogram_with_boundaries(
        &self,
        name: &str,
        description: &str,
        boundaries: Vec<f64>,
    ) -> Result<Histogram> {
        let gate = self.gate.clone();
        let inst = self.register(name, description, InstrumentKind::Histogram, |d| {
            Ok(Instrument::Histogram(Histogram::new(d, boundaries, gate)?))
        })?;
        match inst {
            Instrument::Histogram(h) => Ok(h),
            _ => Err(MeterError::DuplicateName(name.to_string())),
        }
    }

    fn register(
        &self,
        name: &str,
        description: &str,
        kind: InstrumentKind,
        build: impl FnOnce(Descriptor) -> Result<Instrument>,
    ) -> Result<Instrument> {
        if name.is_empty() {
            return Err(MeterError::InvalidArgument("instrument name must not be empty".into()));
        }
        match self.instruments.entry(name.to_string()) {
            Entry::Occupied(_) => Err(MeterError::DuplicateName(name.to_string())),
            Entry::Vacant(slot) => {
                let descriptor = Descriptor {
                    name: name.to_string(),
                    description: (!description.is_empty()).then(|| description.to_string()),
                    kind,
                };
                let inst = build(descriptor)?;
                slot.insert(inst.clone());
                tracing::debug!(scope = %self.scope, instrument = name, ?kind, "instrument registered");
                Ok(inst)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Copy every instrument into an immutable [`Snapshot`], sorted by name.
    pub fn collect(&self) -> Snapshot {
        // Clone the handles first so no registry shard lock is held while
        // the per-instrument series maps are walked.
        let instruments: Vec<Instrument> =
            self.instruments.iter().map(|r| r.value().clone()).collect();
        let metrics = instruments.iter().map(Instrument::collect).collect();
        Snapshot::new(self.scope.clone(), metrics)
    }

    /// Stop accepting writes. Later writes are dropped and counted.
    pub fn close(&self) {
        self.gate.close();
    }

    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Writes dropped because they arrived after [`Registry::close`].
    pub fn dropped_writes(&self) -> u64 {
        self.gate.dropped()
    }
}
