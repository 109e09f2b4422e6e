//! The experiment loop — one switch/settle/measure cycle per catalog entry.
//!
//! Strictly sequential: the device holds exactly one radio configuration at
//! a time, so correctness rests on the temporal ordering enforced here
//! rather than on any locking. Each band walks the explicit phase sequence
//! `Switching → Settling → Measuring → Recorded`; failures become samples
//! and the loop moves on to the next band.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bandbench_common::config::RunConfig;
use bandbench_common::models::{BandDefinition, MeasurementSample, RunReport, SwitchOutcome};

/// Issues the band-restriction command. Every failure mode is a
/// [`SwitchOutcome`] variant — implementations never raise past this
/// boundary.
pub trait BandSwitcher {
    fn switch(&self, band: &BandDefinition) -> SwitchOutcome;
}

/// Produces exactly one sample per measured band, never failing outward.
pub trait Measurer {
    fn measure(&self, band: &str) -> MeasurementSample;
}

/// Per-band phase, reported to the progress hook on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Switching,
    Settling,
    Measuring,
    Recorded,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Switching => write!(f, "switching"),
            Phase::Settling => write!(f, "settling"),
            Phase::Measuring => write!(f, "measuring"),
            Phase::Recorded => write!(f, "recorded"),
        }
    }
}

/// Called with the band label and the phase just entered.
pub type ProgressHook = Box<dyn Fn(&str, Phase)>;

/// Drives the full run: for each configured band, switch, settle, measure,
/// record — in order, one band at a time.
pub struct Orchestrator<S, M> {
    config: RunConfig,
    switcher: S,
    measurer: M,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressHook>,
}

impl<S: BandSwitcher, M: Measurer> Orchestrator<S, M> {
    pub fn new(config: RunConfig, switcher: S, measurer: M, cancel: Arc<AtomicBool>) -> Self {
        Self {
            config,
            switcher,
            measurer,
            cancel,
            progress: None,
        }
    }

    /// Install a hook observing every phase transition.
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Run the full experiment in configured order.
    ///
    /// Always returns a report: per-band failures become samples, unknown
    /// labels are skipped without a report entry, and a cancellation between
    /// bands returns what was recorded so far.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::new();
        // Whether the previous band's switch succeeded — gates the extra
        // inter-band buffer before the next switch.
        let mut prior_switched = false;

        for label in &self.config.test_order {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::warn!(recorded = report.len(), "run cancelled, stopping before next band");
                break;
            }

            let Some(band) = self.config.catalog.get(label) else {
                tracing::warn!(band = %label, "band not in catalog, skipping");
                continue;
            };

            if prior_switched && !self.config.buffer_wait.is_zero() {
                tracing::debug!(
                    wait_s = self.config.buffer_wait.as_secs(),
                    "inter-band buffer"
                );
                std::thread::sleep(self.config.buffer_wait);
            }

            prior_switched = self.run_band(band, &mut report);
        }

        tracing::info!(bands = report.len(), "run complete");
        report
    }

    /// Drive one band through the phase sequence. Returns whether the
    /// switch was acknowledged.
    fn run_band(&self, band: &BandDefinition, report: &mut RunReport) -> bool {
        let label = band.label.as_str();
        let mut switched = false;
        let mut phase = Phase::Switching;
        loop {
            self.enter(label, phase);
            phase = match phase {
                Phase::Switching => {
                    tracing::info!(band = %label, mask = %band.mask, "switching band");
                    match self.switcher.switch(band) {
                        SwitchOutcome::Switched => {
                            switched = true;
                            Phase::Settling
                        }
                        outcome => {
                            tracing::warn!(
                                band = %label,
                                outcome = ?outcome,
                                "switch failed, measurement skipped"
                            );
                            report.push(MeasurementSample::switch_failed(label));
                            Phase::Recorded
                        }
                    }
                }
                Phase::Settling => {
                    // The radio needs real time to reassociate after a mode
                    // change; measuring immediately reads as no-signal.
                    tracing::info!(
                        band = %label,
                        wait_s = self.config.settle_wait.as_secs(),
                        "settling"
                    );
                    std::thread::sleep(self.config.settle_wait);
                    Phase::Measuring
                }
                Phase::Measuring => {
                    report.push(self.measurer.measure(label));
                    Phase::Recorded
                }
                Phase::Recorded => break,
            };
        }
        switched
    }

    fn enter(&self, band: &str, phase: Phase) {
        if let Some(hook) = &self.progress {
            hook(band, phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use bandbench_common::config::{RunConfig, RunConfigInput};
    use bandbench_common::models::SampleStatus;

    use super::*;

    struct ScriptedSwitcher {
        outcomes: HashMap<String, SwitchOutcome>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedSwitcher {
        fn new(outcomes: &[(&str, SwitchOutcome)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|(label, outcome)| (label.to_string(), outcome.clone()))
                    .collect(),
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl BandSwitcher for ScriptedSwitcher {
        fn switch(&self, band: &BandDefinition) -> SwitchOutcome {
            self.calls.borrow_mut().push(band.label.clone());
            self.outcomes
                .get(&band.label)
                .cloned()
                .unwrap_or(SwitchOutcome::Switched)
        }
    }

    struct RecordingMeasurer {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl RecordingMeasurer {
        fn new() -> Self {
            Self {
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl Measurer for RecordingMeasurer {
        fn measure(&self, band: &str) -> MeasurementSample {
            self.calls.borrow_mut().push(band.to_string());
            MeasurementSample::success(band, 42.0, 10.0, 30.0)
        }
    }

    fn test_config(order: &[&str]) -> RunConfig {
        let mut input = RunConfigInput::default();
        input.settle_secs = 0;
        input.buffer_secs = 0;
        input.test_order = order.iter().map(|s| s.to_string()).collect();
        input.resolve().unwrap()
    }

    fn idle_cancel() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn report_preserves_configured_order() {
        let switcher = ScriptedSwitcher::new(&[]);
        let orchestrator = Orchestrator::new(
            test_config(&["B3", "B1", "B5"]),
            switcher,
            RecordingMeasurer::new(),
            idle_cancel(),
        );
        let report = orchestrator.run();
        let bands: Vec<&str> = report.samples().iter().map(|s| s.band.as_str()).collect();
        assert_eq!(bands, vec!["B3", "B1", "B5"]);
    }

    #[test]
    fn unknown_labels_are_skipped_not_zero_filled() {
        let switcher = ScriptedSwitcher::new(&[]);
        let orchestrator = Orchestrator::new(
            test_config(&["B1", "Ghost"]),
            switcher,
            RecordingMeasurer::new(),
            idle_cancel(),
        );
        let report = orchestrator.run();
        assert_eq!(report.len(), 1);
        assert_eq!(report.samples()[0].band, "B1");
    }

    #[test]
    fn switch_failure_records_sample_and_skips_measurement() {
        let switcher = ScriptedSwitcher::new(&[(
            "B1",
            SwitchOutcome::CommandRejected("device error code 100003".to_string()),
        )]);
        let measurer = RecordingMeasurer::new();
        let measured = measurer.calls.clone();
        let orchestrator = Orchestrator::new(
            test_config(&["B1", "B3"]),
            switcher,
            measurer,
            idle_cancel(),
        );
        let report = orchestrator.run();

        assert_eq!(report.len(), 2);
        let failed = &report.samples()[0];
        assert_eq!(failed.status, SampleStatus::SwitchFailed);
        assert_eq!(failed.download_mbps, 0.0);
        assert_eq!(failed.upload_mbps, 0.0);
        assert_eq!(failed.latency_ms, 0.0);
        // Only the band whose switch was acknowledged got measured.
        assert_eq!(*measured.borrow(), vec!["B3".to_string()]);
    }

    #[test]
    fn auth_failure_is_recorded_like_any_other_switch_failure() {
        let switcher = ScriptedSwitcher::new(&[(
            "B5",
            SwitchOutcome::AuthFailed("session request failed: timeout".to_string()),
        )]);
        let orchestrator = Orchestrator::new(
            test_config(&["B5"]),
            switcher,
            RecordingMeasurer::new(),
            idle_cancel(),
        );
        let report = orchestrator.run();
        assert_eq!(report.samples()[0].status, SampleStatus::SwitchFailed);
    }

    #[test]
    fn cancellation_stops_between_bands() {
        let cancel = idle_cancel();
        let cancel_in_hook = cancel.clone();
        let switcher = ScriptedSwitcher::new(&[]);
        let orchestrator = Orchestrator::new(
            test_config(&["B1", "B3", "B5"]),
            switcher,
            RecordingMeasurer::new(),
            cancel,
        )
        .with_progress(Box::new(move |_, phase| {
            if phase == Phase::Recorded {
                cancel_in_hook.store(true, Ordering::Relaxed);
            }
        }));
        let report = orchestrator.run();
        // The first band completes; the flag stops the loop before the next.
        assert_eq!(report.len(), 1);
        assert_eq!(report.samples()[0].band, "B1");
    }

    #[test]
    fn phases_run_in_order() {
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let seen = transitions.clone();
        let switcher = ScriptedSwitcher::new(&[(
            "B3",
            SwitchOutcome::TransportError("connection reset".to_string()),
        )]);
        let orchestrator = Orchestrator::new(
            test_config(&["B1", "B3"]),
            switcher,
            RecordingMeasurer::new(),
            idle_cancel(),
        )
        .with_progress(Box::new(move |band, phase| {
            seen.borrow_mut().push((band.to_string(), phase));
        }));
        orchestrator.run();

        let transitions = transitions.borrow();
        let b1: Vec<Phase> = transitions
            .iter()
            .filter(|(band, _)| band == "B1")
            .map(|(_, phase)| *phase)
            .collect();
        let b3: Vec<Phase> = transitions
            .iter()
            .filter(|(band, _)| band == "B3")
            .map(|(_, phase)| *phase)
            .collect();
        assert_eq!(
            b1,
            vec![Phase::Switching, Phase::Settling, Phase::Measuring, Phase::Recorded]
        );
        // A failed switch goes straight to recorded.
        assert_eq!(b3, vec![Phase::Switching, Phase::Recorded]);
    }
}
