//! Run configuration.
//!
//! The whole run is driven by one immutable [`RunConfig`] built before the
//! orchestrator starts: device address, timing, the band catalog, and the
//! ordered list of bands to exercise. Values can come from a TOML file; the
//! defaults are the known-good constants for Huawei portable routers.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{self, BandCatalog, CatalogError};
use crate::models::BandDefinition;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("no bands selected for testing")]
    EmptyTestOrder,
}

/// Raw TOML-facing input; missing fields fall back to the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfigInput {
    pub device_url: String,
    pub session_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub settle_secs: u64,
    pub buffer_secs: u64,
    pub bands: Vec<BandDefinition>,
    pub test_order: Vec<String>,
    pub measurement: MeasurementConfig,
}

impl Default for RunConfigInput {
    fn default() -> Self {
        Self {
            device_url: "http://192.168.8.1".to_string(),
            session_timeout_secs: 5,
            command_timeout_secs: 10,
            settle_secs: 20,
            buffer_secs: 5,
            bands: catalog::default_bands(),
            test_order: ["B1", "B3", "B5", "B8", "B39", "B40", "B41", "Auto"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            measurement: MeasurementConfig::default(),
        }
    }
}

impl RunConfigInput {
    /// Validate and freeze into the immutable run configuration.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        if self.test_order.is_empty() {
            return Err(ConfigError::EmptyTestOrder);
        }
        let catalog = BandCatalog::new(self.bands)?;
        Ok(RunConfig {
            device_url: self.device_url.trim_end_matches('/').to_string(),
            session_timeout: Duration::from_secs(self.session_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            settle_wait: Duration::from_secs(self.settle_secs),
            buffer_wait: Duration::from_secs(self.buffer_secs),
            catalog,
            test_order: self.test_order,
            measurement: self.measurement,
        })
    }
}

/// Immutable configuration for one run. Built once, never mutated while the
/// orchestrator holds it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub device_url: String,
    /// Bound on the session-info request.
    pub session_timeout: Duration,
    /// Bound on the net-mode command request.
    pub command_timeout: Duration,
    /// Post-switch wait for the radio to reassociate.
    pub settle_wait: Duration,
    /// Extra margin before the next band's switch, applied only after a
    /// successful switch.
    pub buffer_wait: Duration,
    pub catalog: BandCatalog,
    pub test_order: Vec<String>,
    pub measurement: MeasurementConfig,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let input: RunConfigInput = toml::from_str(&raw)?;
        input.resolve()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfigInput::default()
            .resolve()
            .expect("default config is valid")
    }
}

/// Settings for the throughput/latency engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Candidate measurement servers, probed in order; the first one that
    /// answers is used.
    pub endpoints: Vec<String>,
    /// Download payload size per test.
    pub download_bytes: u64,
    /// Upload payload size per test.
    pub upload_bytes: u64,
    /// Number of round-trip probes; the best one is reported.
    pub latency_probes: u32,
    pub probe_timeout_secs: u64,
    /// The engine's own bound on a single transfer.
    pub transfer_timeout_secs: u64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["https://speed.cloudflare.com".to_string()],
            download_bytes: 25_000_000,
            upload_bytes: 8_000_000,
            latency_probes: 4,
            probe_timeout_secs: 10,
            transfer_timeout_secs: 120,
        }
    }
}

impl MeasurementConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}
