//! Immutable point-in-time copies of instrument state.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::attributes::AttributeSet;
use crate::instrument::InstrumentKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPoint {
    pub boundaries: Vec<f64>,
    pub bucket_counts: Vec<u64>,
    pub count: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointValue {
    Counter(u64),
    UpDownCounter(i64),
    Histogram(HistogramPoint),
}

impl PointValue {
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            PointValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_up_down(&self) -> Option<i64> {
        match self {
            PointValue::UpDownCounter(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramPoint> {
        match self {
            PointValue::Histogram(h) => Some(h),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub attributes: AttributeSet,
    pub value: PointValue,
}

/// One instrument's sub-series, sorted by attribute set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: InstrumentKind,
    pub points: Vec<DataPoint>,
}

impl MetricData {
    pub fn point(&self, attrs: &AttributeSet) -> Option<&PointValue> {
        self.points
            .iter()
            .find(|p| &p.attributes == attrs)
            .map(|p| &p.value)
    }
}

/// Every instrument of one registry at one instant. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub scope: String,
    pub time_unix_nanos: u64,
    pub metrics: Vec<MetricData>,
}

impl Snapshot {
    pub(crate) fn new(scope: String, mut metrics: Vec<MetricData>) -> Self {
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        let time_unix_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            scope,
            time_unix_nanos,
            metrics,
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricData> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Shortcut for `metric(name)?.point(attrs)`.
    pub fn point(&self, name: &str, attrs: &AttributeSet) -> Option<&PointValue> {
        self.metric(name)?.point(attrs)
    }

    /// Total number of sub-series across all instruments.
    pub fn data_point_count(&self) -> usize {
        self.metrics.iter().map(|m| m.points.len()).sum()
    }
}

/// Fixed identity metadata attached once per export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resource {
    pub attributes: AttributeSet,
}

impl Resource {
    pub fn new(service_name: &str, job: &str, instance: &str) -> Self {
        Self {
            attributes: AttributeSet::from_pairs(&[
                ("service.name", service_name),
                ("job", job),
                ("instance", instance),
            ]),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }
}
