//! Data models for a band benchmark run.
//!
//! These types cross the component boundaries: the switcher produces
//! `SwitchOutcome`s, the measurer produces `MeasurementSample`s, and the
//! orchestrator accumulates them into the `RunReport` the reporter consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Bands ───────────────────────────────────────────────────────────

/// A selectable radio band: a human-readable label plus the device's
/// native hex band-mask encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub label: String,
    pub mask: String,
}

// ── Credentials ─────────────────────────────────────────────────────

/// Short-lived credential pair from the device's session-info endpoint.
///
/// Valid for a single command exchange. The device invalidates tokens
/// quickly, so every switch attempt acquires a fresh pair and discards it
/// afterwards — never cache one.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Session cookie value (`SesInfo`).
    pub session_id: String,
    /// Anti-forgery token (`TokInfo`).
    pub token: String,
}

// ── Switch outcome ──────────────────────────────────────────────────

/// Result of one band-restriction command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The device acknowledged the mode change.
    Switched,
    /// The session handshake failed; no command was sent.
    AuthFailed(String),
    /// The device was reachable but declined the mode change.
    CommandRejected(String),
    /// Network failure during the command exchange.
    TransportError(String),
}

// ── Samples ─────────────────────────────────────────────────────────

/// Latency reported for bands where no measurement could run.
pub const SENTINEL_LATENCY_MS: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Success,
    NoSignal,
    Error,
    SwitchFailed,
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleStatus::Success => write!(f, "success"),
            SampleStatus::NoSignal => write!(f, "no signal"),
            SampleStatus::Error => write!(f, "error"),
            SampleStatus::SwitchFailed => write!(f, "switch failed"),
        }
    }
}

/// One measurement record per band attempted, regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub band: String,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: f64,
    pub status: SampleStatus,
}

impl MeasurementSample {
    pub fn success(band: &str, download_mbps: f64, upload_mbps: f64, latency_ms: f64) -> Self {
        Self {
            band: band.to_string(),
            download_mbps,
            upload_mbps,
            latency_ms,
            status: SampleStatus::Success,
        }
    }

    /// No usable network path on this band: zero throughput, sentinel latency.
    pub fn no_signal(band: &str) -> Self {
        Self {
            band: band.to_string(),
            download_mbps: 0.0,
            upload_mbps: 0.0,
            latency_ms: SENTINEL_LATENCY_MS,
            status: SampleStatus::NoSignal,
        }
    }

    /// Unexpected measurement failure: same fill as [`Self::no_signal`].
    pub fn errored(band: &str) -> Self {
        Self {
            band: band.to_string(),
            download_mbps: 0.0,
            upload_mbps: 0.0,
            latency_ms: SENTINEL_LATENCY_MS,
            status: SampleStatus::Error,
        }
    }

    /// The band switch itself failed; measurement was never attempted.
    pub fn switch_failed(band: &str) -> Self {
        Self {
            band: band.to_string(),
            download_mbps: 0.0,
            upload_mbps: 0.0,
            latency_ms: 0.0,
            status: SampleStatus::SwitchFailed,
        }
    }
}

// ── Run report ──────────────────────────────────────────────────────

/// Ordered results of one full run. Insertion order equals the configured
/// test order and is the display order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    samples: Vec<MeasurementSample>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: MeasurementSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[MeasurementSample] {
        &self.samples
    }

    pub fn successes(&self) -> impl Iterator<Item = &MeasurementSample> {
        self.samples
            .iter()
            .filter(|s| s.status == SampleStatus::Success)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_failed_sample_is_all_zero() {
        let sample = MeasurementSample::switch_failed("B3");
        assert_eq!(sample.status, SampleStatus::SwitchFailed);
        assert_eq!(sample.download_mbps, 0.0);
        assert_eq!(sample.upload_mbps, 0.0);
        assert_eq!(sample.latency_ms, 0.0);
    }

    #[test]
    fn no_signal_sample_carries_sentinel_latency() {
        let sample = MeasurementSample::no_signal("B8");
        assert_eq!(sample.status, SampleStatus::NoSignal);
        assert_eq!(sample.download_mbps, 0.0);
        assert_eq!(sample.latency_ms, SENTINEL_LATENCY_MS);
    }

    #[test]
    fn report_successes_filters_by_status() {
        let mut report = RunReport::new();
        report.push(MeasurementSample::success("B1", 40.0, 12.0, 35.0));
        report.push(MeasurementSample::errored("B3"));
        report.push(MeasurementSample::success("B7", 80.0, 20.0, 28.0));

        let bands: Vec<&str> = report.successes().map(|s| s.band.as_str()).collect();
        assert_eq!(bands, vec!["B1", "B7"]);
        assert_eq!(report.len(), 3);
    }
}
