//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use protlab_calc::{
    classify_differential, restraint_threshold, DifferentialInputs, DifferentialOutcome,
    DifferentialSettings, DifferentialVerdict,
};
use protlab_common::LabConfig;
use protlab_logging::{lab_debug, lab_info, lab_warn, LogContext};
use serde::{Deserialize, Serialize};

use crate::event_log::{EventLog, Severity, DEFAULT_EVENT_LOG_CAPACITY};
use crate::frame_loop::Simulator;
use crate::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::settings::differential_settings;

const MODULE: &str = "differential";

/// Canned current conditions for the transformer differential bench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifferentialScenario {
    Normal,
    ExternalFault,
    InternalFault,
    TransformerInrush,
}

impl DifferentialScenario {
    pub const ALL: [DifferentialScenario; 4] = [
        DifferentialScenario::Normal,
        DifferentialScenario::ExternalFault,
        DifferentialScenario::InternalFault,
        DifferentialScenario::TransformerInrush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifferentialScenario::Normal => "normal",
            DifferentialScenario::ExternalFault => "external-fault",
            DifferentialScenario::InternalFault => "internal-fault",
            DifferentialScenario::TransformerInrush => "transformer-inrush",
        }
    }

    pub fn inputs(&self) -> DifferentialInputs {
        match self {
            DifferentialScenario::Normal => DifferentialInputs {
                i1_pu: 1.0,
                i2_pu: 1.0,
                angle_deg: 180.0,
                harmonic_ratio: 0.02,
            },
            // Heavy through-fault with a little CT mismatch.
            DifferentialScenario::ExternalFault => DifferentialInputs {
                i1_pu: 8.0,
                i2_pu: 7.4,
                angle_deg: 180.0,
                harmonic_ratio: 0.03,
            },
            DifferentialScenario::InternalFault => DifferentialInputs {
                i1_pu: 4.0,
                i2_pu: 2.0,
                angle_deg: 20.0,
                harmonic_ratio: 0.04,
            },
            // Energising from one side only; rich in second harmonic.
            DifferentialScenario::TransformerInrush => DifferentialInputs {
                i1_pu: 5.0,
                i2_pu: 0.0,
                angle_deg: 0.0,
                harmonic_ratio: 0.35,
            },
        }
    }
}

impl fmt::Display for DifferentialScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialSnapshot {
    pub tick: u64,
    pub sim_time_secs: f64,
    pub settings: DifferentialSettings,
    pub inputs: DifferentialInputs,
    pub verdict: DifferentialVerdict,
}

/// Percentage-restraint differential relay bench. Every frame re-grades the
/// current inputs; only changes of outcome reach the event log.
#[derive(Debug)]
pub struct DifferentialSimulator {
    settings: DifferentialSettings,
    inputs: DifferentialInputs,
    verdict: DifferentialVerdict,
    last_logged: Option<DifferentialOutcome>,
    tick: u64,
    sim_time_secs: f64,
    bias_history: HistoryBuffer,
    differential_history: HistoryBuffer,
    events: EventLog,
}

impl Default for DifferentialSimulator {
    fn default() -> Self {
        Self::new(
            DifferentialSettings::default(),
            DEFAULT_HISTORY_CAPACITY,
            DEFAULT_EVENT_LOG_CAPACITY,
        )
    }
}

impl DifferentialSimulator {
    pub fn new(
        settings: DifferentialSettings,
        history_capacity: usize,
        event_log_capacity: usize,
    ) -> Self {
        let inputs = DifferentialScenario::Normal.inputs();
        let verdict = classify_differential(&settings, &inputs);
        Self {
            settings,
            inputs,
            verdict,
            last_logged: None,
            tick: 0,
            sim_time_secs: 0.0,
            bias_history: HistoryBuffer::filled(history_capacity, verdict.point.bias),
            differential_history: HistoryBuffer::filled(
                history_capacity,
                verdict.point.differential,
            ),
            events: EventLog::new(event_log_capacity),
        }
    }

    pub fn from_config(config: &LabConfig) -> Self {
        Self::new(
            differential_settings(&config.differential),
            config.simulation.history_capacity,
            config.simulation.event_log_capacity,
        )
    }

    pub fn set_settings(&mut self, settings: DifferentialSettings) {
        if let Err(err) = settings.validate() {
            lab_warn!(context = self.log_context(), "suspicious differential settings: {}", err);
        }
        self.settings = settings;
        self.verdict = classify_differential(&self.settings, &self.inputs);
    }

    pub fn set_inputs(&mut self, inputs: DifferentialInputs) {
        self.inputs = inputs;
        self.verdict = classify_differential(&self.settings, &self.inputs);
    }

    pub fn apply_scenario(&mut self, scenario: DifferentialScenario) {
        self.set_inputs(scenario.inputs());
        self.events.append(
            self.sim_time_secs,
            Severity::Info,
            format!("Scenario '{}' applied", scenario),
        );
        lab_debug!(context = self.log_context(), "scenario {} applied", scenario);
    }

    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.sim_time_secs += dt;
        self.verdict = classify_differential(&self.settings, &self.inputs);
        self.bias_history.push(self.verdict.point.bias);
        self.differential_history
            .push(self.verdict.point.differential);

        if self.last_logged != Some(self.verdict.outcome) {
            self.record_transition();
        }
    }

    fn record_transition(&mut self) {
        let verdict = self.verdict;
        let severity = match verdict.outcome {
            DifferentialOutcome::Stable => Severity::Success,
            DifferentialOutcome::Trip => Severity::Failure,
            DifferentialOutcome::Blocked => Severity::Warning,
        };
        let message = format!(
            "{}: Idiff {:.2} pu vs threshold {:.2} pu at Ibias {:.2} pu",
            verdict.outcome, verdict.point.differential, verdict.threshold, verdict.point.bias
        );
        self.events.append(self.sim_time_secs, severity, message);
        self.last_logged = Some(verdict.outcome);
        match verdict.outcome {
            DifferentialOutcome::Trip => {
                lab_warn!(context = self.log_context(), "differential trip")
            }
            _ => lab_info!(context = self.log_context(), "differential {}", verdict.outcome),
        }
    }

    /// Clear histories and the log; inputs return to normal load flow.
    pub fn reset(&mut self) {
        self.inputs = DifferentialScenario::Normal.inputs();
        self.verdict = classify_differential(&self.settings, &self.inputs);
        self.last_logged = None;
        self.tick = 0;
        self.sim_time_secs = 0.0;
        self.bias_history.fill(self.verdict.point.bias);
        self.differential_history
            .fill(self.verdict.point.differential);
        self.events.reset();
        self.events.append(0.0, Severity::Info, "System Reset");
    }

    /// Sample the restraint curve from zero bias to `max_bias`.
    pub fn characteristic_curve(&self, max_bias: f64, samples: usize) -> Vec<(f64, f64)> {
        characteristic_curve(&self.settings, max_bias, samples)
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_module(MODULE)
            .with_phase(self.verdict.outcome.as_str())
            .with_tick(self.tick)
    }

    pub fn settings(&self) -> &DifferentialSettings {
        &self.settings
    }

    pub fn inputs(&self) -> &DifferentialInputs {
        &self.inputs
    }

    pub fn verdict(&self) -> &DifferentialVerdict {
        &self.verdict
    }

    pub fn bias_history(&self) -> &HistoryBuffer {
        &self.bias_history
    }

    pub fn differential_history(&self) -> &HistoryBuffer {
        &self.differential_history
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn snapshot(&self) -> DifferentialSnapshot {
        DifferentialSnapshot {
            tick: self.tick,
            sim_time_secs: self.sim_time_secs,
            settings: self.settings,
            inputs: self.inputs,
            verdict: self.verdict,
        }
    }
}

impl Simulator for DifferentialSimulator {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn tick(&mut self, dt: f64) {
        DifferentialSimulator::tick(self, dt);
    }
}

/// `(bias, threshold)` pairs evenly spaced over `[0, max_bias]`.
pub fn characteristic_curve(
    settings: &DifferentialSettings,
    max_bias: f64,
    samples: usize,
) -> Vec<(f64, f64)> {
    if samples < 2 || !(max_bias > 0.0) {
        return Vec::new();
    }
    let step = max_bias / (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let bias = step * i as f64;
            (bias, restraint_threshold(settings, bias))
        })
        .collect()
}
