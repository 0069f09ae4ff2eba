//! Exporter boundary and the HTTP push exporter.
//!
//! The provider hands every snapshot to an [`Exporter`]; failures are
//! reported back as `MeterError::TransientExport` and never retried.

use async_trait::async_trait;
use serde::Serialize;

use meterpush_core::error::{MeterError, Result};
use meterpush_core::{Resource, Snapshot};

use crate::config::ExportSection;

/// Transmits a snapshot to a remote collector.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn export(&self, snapshot: &Snapshot, resource: &Resource) -> Result<()>;
}

/// Request body pushed to the collector.
#[derive(Serialize)]
struct PushBody<'a> {
    resource: &'a Resource,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

/// POSTs JSON batches to `{http|https}://{endpoint}{path}`.
pub struct HttpPushExporter {
    client: reqwest::Client,
    url: String,
}

impl HttpPushExporter {
    pub fn new(cfg: &ExportSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| MeterError::Configuration(format!("build http client failed: {e}")))?;
        Ok(Self {
            client,
            url: cfg.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Exporter for HttpPushExporter {
    fn name(&self) -> &'static str {
        "http-push"
    }

    async fn export(&self, snapshot: &Snapshot, resource: &Resource) -> Result<()> {
        let body = PushBody { resource, snapshot };
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MeterError::TransientExport(format!("push to {} failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MeterError::TransientExport(format!(
                "collector {} answered {status}",
                self.url
            )));
        }
        Ok(())
    }
}
