#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use meterpush_core::error::{MeterError, Result};
use meterpush_core::{Resource, Snapshot};
use meterpush_gateway::config::{self, GatewayConfig};
use meterpush_gateway::obs::Exporter;

/// Keeps every exported batch.
#[derive(Default)]
pub struct RecordingExporter {
    batches: Mutex<Vec<(Snapshot, Resource)>>,
}

impl RecordingExporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(Snapshot, Resource)> {
        self.batches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Exporter for RecordingExporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn export(&self, snapshot: &Snapshot, resource: &Resource) -> Result<()> {
        self.batches
            .lock()
            .unwrap()
            .push((snapshot.clone(), resource.clone()));
        Ok(())
    }
}

/// Fails every call.
#[derive(Default)]
pub struct FailingExporter {
    calls: AtomicUsize,
}

impl FailingExporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exporter for FailingExporter {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn export(&self, _snapshot: &Snapshot, _resource: &Resource) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MeterError::TransientExport("collector unreachable".into()))
    }
}

/// Succeeds after sleeping `delay`.
pub struct SlowExporter {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowExporter {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Exporter for SlowExporter {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn export(&self, _snapshot: &Snapshot, _resource: &Resource) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Minimal valid config with a custom export interval.
pub fn config_with_interval(interval_ms: u64) -> GatewayConfig {
    let mut cfg = config::load_from_str("version: 1\nserver:\n  listen: \"127.0.0.1:0\"\n").unwrap();
    cfg.export.interval_ms = interval_ms;
    cfg
}
