//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use meterpush_core::error::{MeterError, Result};

pub use schema::{ExportSection, GatewayConfig, ResourceSection, ServerSection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "METERPUSH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "meterpush.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MeterError::Configuration(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| MeterError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `METERPUSH_CONFIG`, falling back to `meterpush.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
