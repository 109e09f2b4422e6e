//! Throughput and latency measurement.
//!
//! The engine is an opaque capability: locate a usable endpoint, then move
//! bytes and time it. [`SpeedMeasurer`] wraps an engine and guarantees the
//! orchestrator always gets a [`MeasurementSample`] back — a band with no
//! usable network path yields a `NoSignal` sample, anything else unexpected
//! yields `Error`, and neither stalls the run.

use std::time::{Duration, Instant};

use thiserror::Error;

use bandbench_common::config::MeasurementConfig;
use bandbench_common::models::MeasurementSample;

use crate::orchestrate::Measurer;

const MBIT: f64 = 1_000_000.0;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No measurement endpoint reachable — on a freshly switched band this
    /// means no usable network path.
    #[error("no measurement endpoint reachable: {0}")]
    Discovery(String),
    /// A transfer started but did not complete.
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// A reachable measurement server.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
}

/// The external measurement capability. Transfer results are raw bytes per
/// second; latency is milliseconds.
pub trait MeasurementEngine {
    fn locate(&self) -> Result<Endpoint, EngineError>;
    fn download(&self, endpoint: &Endpoint) -> Result<f64, EngineError>;
    fn upload(&self, endpoint: &Endpoint) -> Result<f64, EngineError>;
    fn latency(&self, endpoint: &Endpoint) -> Result<f64, EngineError>;
}

// ── Measurer ────────────────────────────────────────────────────────

/// Runs the download/upload/latency sequence for one band and converts the
/// engine's failure modes into sample statuses.
pub struct SpeedMeasurer<E> {
    engine: E,
}

impl<E> SpeedMeasurer<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: MeasurementEngine> Measurer for SpeedMeasurer<E> {
    fn measure(&self, band: &str) -> MeasurementSample {
        let endpoint = match self.engine.locate() {
            Ok(endpoint) => endpoint,
            Err(EngineError::Discovery(reason)) => {
                tracing::warn!(band = %band, reason = %reason, "no measurement endpoint, treating as no signal");
                return MeasurementSample::no_signal(band);
            }
            Err(e) => {
                tracing::warn!(band = %band, error = %e, "endpoint discovery failed unexpectedly");
                return MeasurementSample::errored(band);
            }
        };
        tracing::info!(band = %band, endpoint = %endpoint.base_url, "measurement endpoint selected");

        tracing::info!(band = %band, "download test running");
        let download_mbps = match self.engine.download(&endpoint) {
            Ok(bytes_per_sec) => bytes_per_sec * 8.0 / MBIT,
            Err(e) => {
                tracing::warn!(band = %band, error = %e, "download test failed");
                return MeasurementSample::errored(band);
            }
        };

        tracing::info!(band = %band, "upload test running");
        let upload_mbps = match self.engine.upload(&endpoint) {
            Ok(bytes_per_sec) => bytes_per_sec * 8.0 / MBIT,
            Err(e) => {
                tracing::warn!(band = %band, error = %e, "upload test failed");
                return MeasurementSample::errored(band);
            }
        };

        let latency_ms = match self.engine.latency(&endpoint) {
            Ok(ms) => ms,
            Err(e) => {
                tracing::warn!(band = %band, error = %e, "latency test failed");
                return MeasurementSample::errored(band);
            }
        };

        tracing::info!(
            band = %band,
            download_mbps,
            upload_mbps,
            latency_ms,
            "measurement complete"
        );
        MeasurementSample::success(band, download_mbps, upload_mbps, latency_ms)
    }
}

// ── HTTP engine ─────────────────────────────────────────────────────

/// HTTP prober speaking the Cloudflare-style speed endpoints:
/// `GET {base}/__down?bytes=N` serves a payload of that size and
/// `POST {base}/__up` sinks whatever it receives. Any server exposing
/// those two routes works.
pub struct HttpMeasurementEngine {
    config: MeasurementConfig,
    transfer_agent: ureq::Agent,
    probe_agent: ureq::Agent,
}

impl HttpMeasurementEngine {
    pub fn new(config: &MeasurementConfig) -> Self {
        Self {
            transfer_agent: agent_with_timeout(config.transfer_timeout()),
            probe_agent: agent_with_timeout(config.probe_timeout()),
            config: config.clone(),
        }
    }
}

impl MeasurementEngine for HttpMeasurementEngine {
    fn locate(&self) -> Result<Endpoint, EngineError> {
        let mut last_error = "no endpoints configured".to_string();
        for base in &self.config.endpoints {
            let base = base.trim_end_matches('/');
            let url = format!("{base}/__down?bytes=0");
            match self.probe_agent.get(&url).call() {
                Ok(_) => {
                    return Ok(Endpoint {
                        base_url: base.to_string(),
                    });
                }
                Err(e) => {
                    tracing::debug!(endpoint = %base, error = %e, "endpoint probe failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(EngineError::Discovery(last_error))
    }

    fn download(&self, endpoint: &Endpoint) -> Result<f64, EngineError> {
        let url = format!(
            "{}/__down?bytes={}",
            endpoint.base_url, self.config.download_bytes
        );
        let start = Instant::now();
        let mut response = self
            .transfer_agent
            .get(&url)
            .call()
            .map_err(|e| EngineError::Transfer(e.to_string()))?;
        let mut reader = response.body_mut().as_reader();
        let bytes = std::io::copy(&mut reader, &mut std::io::sink())
            .map_err(|e| EngineError::Transfer(e.to_string()))?;
        Ok(byte_rate(bytes, start.elapsed()))
    }

    fn upload(&self, endpoint: &Endpoint) -> Result<f64, EngineError> {
        let url = format!("{}/__up", endpoint.base_url);
        let payload = vec![0u8; self.config.upload_bytes as usize];
        let start = Instant::now();
        self.transfer_agent
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .send(&payload[..])
            .map_err(|e| EngineError::Transfer(e.to_string()))?;
        Ok(byte_rate(payload.len() as u64, start.elapsed()))
    }

    fn latency(&self, endpoint: &Endpoint) -> Result<f64, EngineError> {
        let url = format!("{}/__down?bytes=0", endpoint.base_url);
        let mut best = f64::MAX;
        for _ in 0..self.config.latency_probes.max(1) {
            let start = Instant::now();
            self.probe_agent
                .get(&url)
                .call()
                .map_err(|e| EngineError::Transfer(e.to_string()))?;
            best = best.min(start.elapsed().as_secs_f64() * 1000.0);
        }
        Ok(best)
    }
}

/// Raw byte rate over a wall-clock window.
fn byte_rate(bytes: u64, elapsed: Duration) -> f64 {
    bytes as f64 / elapsed.as_secs_f64().max(1e-6)
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

#[cfg(test)]
mod tests {
    use bandbench_common::models::{SampleStatus, SENTINEL_LATENCY_MS};

    use super::*;

    struct FakeEngine {
        discovery_fails: bool,
        download_fails: bool,
        download_bps: f64,
        upload_bps: f64,
        latency_ms: f64,
    }

    impl FakeEngine {
        fn healthy() -> Self {
            Self {
                discovery_fails: false,
                download_fails: false,
                download_bps: 1_250_000.0,
                upload_bps: 625_000.0,
                latency_ms: 31.0,
            }
        }
    }

    impl MeasurementEngine for FakeEngine {
        fn locate(&self) -> Result<Endpoint, EngineError> {
            if self.discovery_fails {
                Err(EngineError::Discovery("unreachable".to_string()))
            } else {
                Ok(Endpoint {
                    base_url: "http://test".to_string(),
                })
            }
        }

        fn download(&self, _endpoint: &Endpoint) -> Result<f64, EngineError> {
            if self.download_fails {
                Err(EngineError::Transfer("reset".to_string()))
            } else {
                Ok(self.download_bps)
            }
        }

        fn upload(&self, _endpoint: &Endpoint) -> Result<f64, EngineError> {
            Ok(self.upload_bps)
        }

        fn latency(&self, _endpoint: &Endpoint) -> Result<f64, EngineError> {
            Ok(self.latency_ms)
        }
    }

    #[test]
    fn discovery_failure_reads_as_no_signal() {
        let measurer = SpeedMeasurer::new(FakeEngine {
            discovery_fails: true,
            ..FakeEngine::healthy()
        });
        let sample = measurer.measure("B8");
        assert_eq!(sample.status, SampleStatus::NoSignal);
        assert_eq!(sample.download_mbps, 0.0);
        assert_eq!(sample.upload_mbps, 0.0);
        assert_eq!(sample.latency_ms, SENTINEL_LATENCY_MS);
    }

    #[test]
    fn transfer_failure_reads_as_error() {
        let measurer = SpeedMeasurer::new(FakeEngine {
            download_fails: true,
            ..FakeEngine::healthy()
        });
        let sample = measurer.measure("B1");
        assert_eq!(sample.status, SampleStatus::Error);
        assert_eq!(sample.download_mbps, 0.0);
        assert_eq!(sample.latency_ms, SENTINEL_LATENCY_MS);
    }

    #[test]
    fn byte_rates_convert_to_mbps() {
        let measurer = SpeedMeasurer::new(FakeEngine::healthy());
        let sample = measurer.measure("B3");
        assert_eq!(sample.status, SampleStatus::Success);
        // 1,250,000 bytes/s == 10 Mbit/s
        assert!((sample.download_mbps - 10.0).abs() < 1e-9);
        assert!((sample.upload_mbps - 5.0).abs() < 1e-9);
        assert_eq!(sample.latency_ms, 31.0);
    }

    #[test]
    fn byte_rate_window_never_divides_by_zero() {
        let rate = byte_rate(1_000, Duration::ZERO);
        assert!(rate.is_finite());
    }
}
