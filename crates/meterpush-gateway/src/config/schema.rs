use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use meterpush_core::error::{MeterError, Result};
use meterpush_core::Resource;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub export: ExportSection,

    #[serde(default)]
    pub resource: ResourceSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterError::Configuration(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.export.validate()?;
        self.resource.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MeterError::Configuration(format!("server.listen {:?} is not a socket address: {e}", self.listen))
        })
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    /// Collector `host:port`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Ingestion path on the collector.
    #[serde(default = "default_path")]
    pub path: String,

    /// `false` pushes over plaintext http.
    #[serde(default)]
    pub secure: bool,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_shutdown_deadline_ms")]
    pub shutdown_deadline_ms: u64,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            path: default_path(),
            secure: false,
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            shutdown_deadline_ms: default_shutdown_deadline_ms(),
        }
    }
}

impl ExportSection {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(MeterError::Configuration("export.endpoint must not be empty".into()));
        }
        if self.endpoint.contains("://") || self.endpoint.contains('/') {
            return Err(MeterError::Configuration(
                "export.endpoint must be host:port without scheme or path".into(),
            ));
        }
        if !self.path.starts_with('/') {
            return Err(MeterError::Configuration("export.path must start with '/'".into()));
        }
        if self.interval_ms == 0 {
            return Err(MeterError::Configuration("export.interval_ms must be positive".into()));
        }
        if self.timeout_ms == 0 {
            return Err(MeterError::Configuration("export.timeout_ms must be positive".into()));
        }
        if self.shutdown_deadline_ms == 0 {
            return Err(MeterError::Configuration(
                "export.shutdown_deadline_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Full push URL, e.g. `http://localhost:8429/opentelemetry/api/v1/push`.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}{}", self.endpoint, self.path)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_millis(self.shutdown_deadline_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSection {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_job")]
    pub job: String,

    #[serde(default = "default_instance")]
    pub instance: String,
}

impl Default for ResourceSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            job: default_job(),
            instance: default_instance(),
        }
    }
}

impl ResourceSection {
    pub fn validate(&self) -> Result<()> {
        if self.job.is_empty() || self.instance.is_empty() {
            return Err(MeterError::Configuration(
                "resource.job and resource.instance must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn to_resource(&self) -> Resource {
        Resource::new(&self.service_name, &self.job, &self.instance)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8081".into()
}
fn default_drain_timeout_ms() -> u64 {
    5000
}
fn default_endpoint() -> String {
    "localhost:8429".into()
}
fn default_path() -> String {
    "/opentelemetry/api/v1/push".into()
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_timeout_ms() -> u64 {
    10000
}
fn default_shutdown_deadline_ms() -> u64 {
    5000
}
fn default_service_name() -> String {
    "myapp".into()
}
fn default_job() -> String {
    "otlp".into()
}
fn default_instance() -> String {
    "localhost".into()
}
