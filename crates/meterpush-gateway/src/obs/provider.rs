//! Metrics provider: instrument registration plus the periodic export loop.
//!
//! Lifecycle:
//! - `MeterProvider::builder()...build()` validates cadence and exporter.
//! - `start()` spawns the export loop on the current tokio runtime.
//! - Each tick copies the registry into a `Snapshot` and hands it to the
//!   exporter; a failed tick is logged and dropped, never retried.
//! - `shutdown(deadline)` stops the loop, attempts one final flush, then
//!   closes the registry. It consumes the provider, so it runs at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use meterpush_core::error::{MeterError, Result};
use meterpush_core::{Counter, Histogram, Registry, Resource, Snapshot, UpDownCounter};

use super::exporter::Exporter;

pub const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCOPE: &str = "http";

/// Export loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub attempts: u64,
    pub failures: u64,
}

pub struct MeterProviderBuilder {
    interval: Duration,
    export_timeout: Duration,
    exporter: Option<Arc<dyn Exporter>>,
    resource: Resource,
    scope: String,
}

impl MeterProviderBuilder {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound for a single exporter call inside the loop.
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn build(self) -> Result<MeterProvider> {
        if self.interval.is_zero() {
            return Err(MeterError::Configuration("export interval must be positive".into()));
        }
        if self.export_timeout.is_zero() {
            return Err(MeterError::Configuration("export timeout must be positive".into()));
        }
        let exporter = self
            .exporter
            .ok_or_else(|| MeterError::Configuration("exporter is not set".into()))?;

        let registry = Arc::new(Registry::new(self.scope));
        Ok(MeterProvider {
            shared: Arc::new(ExportPipeline {
                registry: Arc::clone(&registry),
                exporter,
                resource: self.resource,
                export_timeout: self.export_timeout,
                attempts: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
            registry,
            interval: self.interval,
            reader: None,
        })
    }
}

/// State shared between the provider and its export loop.
struct ExportPipeline {
    registry: Arc<Registry>,
    exporter: Arc<dyn Exporter>,
    resource: Resource,
    export_timeout: Duration,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl ExportPipeline {
    /// Collect and export once, bounded by `timeout`. Returns the number of
    /// data points shipped.
    async fn export_once(&self, timeout: Duration) -> Result<usize> {
        let snapshot = self.registry.collect();
        self.export_snapshot(&snapshot, timeout).await
    }

    async fn export_snapshot(&self, snapshot: &Snapshot, timeout: Duration) -> Result<usize> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let res = tokio::time::timeout(timeout, self.exporter.export(snapshot, &self.resource)).await;
        match res {
            Ok(Ok(())) => Ok(snapshot.data_point_count()),
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(MeterError::ExportTimeout(timeout))
            }
        }
    }
}

struct ReaderHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct MeterProvider {
    registry: Arc<Registry>,
    shared: Arc<ExportPipeline>,
    interval: Duration,
    reader: Option<ReaderHandle>,
}

impl MeterProvider {
    pub fn builder() -> MeterProviderBuilder {
        MeterProviderBuilder {
            interval: DEFAULT_EXPORT_INTERVAL,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            exporter: None,
            resource: Resource::default(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn register_counter(&self, name: &str, description: &str) -> Result<Counter> {
        self.registry.register_counter(name, description)
    }

    pub fn register_up_down_counter(&self, name: &str, description: &str) -> Result<UpDownCounter> {
        self.registry.register_up_down_counter(name, description)
    }

    pub fn register_histogram(&self, name: &str, description: &str) -> Result<Histogram> {
        self.registry.register_histogram(name, description)
    }

    pub fn register_histogram_with_boundaries(
        &self,
        name: &str,
        description: &str,
        boundaries: Vec<f64>,
    ) -> Result<Histogram> {
        self.registry
            .register_histogram_with_boundaries(name, description, boundaries)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn resource(&self) -> &Resource {
        &self.shared.resource
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.reader.is_some()
    }

    pub fn stats(&self) -> ExportStats {
        ExportStats {
            attempts: self.shared.attempts.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }

    /// Spawn the periodic export loop. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.reader.is_some() {
            warn!("export loop already running");
            return;
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_export_loop(
            Arc::clone(&self.shared),
            self.interval,
            stop_rx,
        ));
        info!(
            interval = ?self.interval,
            exporter = self.shared.exporter.name(),
            "export loop started"
        );
        self.reader = Some(ReaderHandle { stop_tx, task });
    }

    /// Export once outside the cadence.
    pub async fn force_flush(&self) -> Result<()> {
        self.shared
            .export_once(self.shared.export_timeout)
            .await
            .map(|_| ())
    }

    /// Stop the loop, flush once within `deadline`, close the registry.
    ///
    /// An export already in flight when this is called is allowed to finish
    /// inside the deadline. The registry is closed even when the flush fails,
    /// and writes arriving afterwards are dropped.
    pub async fn shutdown(mut self, deadline: Duration) -> Result<()> {
        let started = Instant::now();
        info!(?deadline, "metrics provider shutting down");

        if let Some(reader) = self.reader.take() {
            // The loop may already be gone if it panicked.
            let _ = reader.stop_tx.send(());
            let mut task = reader.task;
            match tokio::time::timeout(deadline, &mut task).await {
                Ok(Ok(())) => debug!("export loop stopped"),
                Ok(Err(e)) => warn!(error = %e, "export loop ended abnormally"),
                Err(_) => {
                    task.abort();
                    self.registry.close();
                    return Err(MeterError::shutdown(MeterError::ExportTimeout(deadline)));
                }
            }
        }

        let snapshot = self.registry.collect();
        self.registry.close();

        let remaining = deadline.saturating_sub(started.elapsed());
        match self.shared.export_snapshot(&snapshot, remaining).await {
            Ok(points) => {
                info!(points, "final flush complete");
                Ok(())
            }
            Err(e) => Err(MeterError::shutdown(e)),
        }
    }
}

impl Drop for MeterProvider {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.task.abort();
        }
    }
}

async fn run_export_loop(
    shared: Arc<ExportPipeline>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // First export happens one full interval after start.
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let exporter = shared.exporter.name();
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            // Stop wins over a tick that became ready during a long export.
            biased;

            // A dropped sender also ends the loop.
            _ = &mut stop_rx => break,

            _ = ticker.tick() => {
                tick += 1;
                match shared.export_once(shared.export_timeout).await {
                    Ok(points) => debug!(tick, points, exporter, "export ok"),
                    Err(e) => warn!(
                        tick,
                        exporter,
                        kind = e.kind().as_str(),
                        error = %e,
                        "export failed, dropping tick"
                    ),
                }
            }
        }
    }
    debug!(ticks = tick, "export loop exiting");
}
