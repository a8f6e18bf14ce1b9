//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Fast bus transfer controller.
//!
//! The controller walks `Connected → Coasting → TransferInitiated →
//! Completed`. Tripping the main breaker starts the coast-down integrator,
//! initiating a transfer arms a one-shot closing timer for the standby
//! breaker, and the closure is graded against the bus state at the instant
//! the timer fires. [`BusTransferSimulator::reset`] returns to `Connected`
//! from any phase and disarms the closing timer.

use std::fmt;
use std::time::Duration;

use protlab_calc::{
    evaluate_transfer, predict, CoastDownIntegrator, ElectricalState, Prediction,
    ScenarioParameters, SyncCheckLimits, TransferOutcome, TransferVerdict,
};
use protlab_common::LabConfig;
use protlab_logging::{lab_debug, lab_info, log_system_event, LogContext, SystemEventOutcome};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::event_log::{EventLog, Severity, DEFAULT_EVENT_LOG_CAPACITY};
use crate::frame_loop::Simulator;
use crate::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::presets::{PresetCatalog, ScenarioPreset};
use crate::settings::sync_check_limits;
use crate::timer::{TimerHandle, TimerQueue};

const MODULE: &str = "bus-transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalPhase {
    Connected,
    Coasting,
    TransferInitiated,
    Completed,
}

impl OperationalPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalPhase::Connected => "connected",
            OperationalPhase::Coasting => "coasting",
            OperationalPhase::TransferInitiated => "transfer_initiated",
            OperationalPhase::Completed => "completed",
        }
    }

    /// Phases in which the bus is disconnected and the integrator runs.
    pub fn is_coasting(&self) -> bool {
        matches!(
            self,
            OperationalPhase::Coasting | OperationalPhase::TransferInitiated
        )
    }
}

impl fmt::Display for OperationalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerStatus {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferAction {
    CloseStandby,
}

/// Construction-time settings of a [`BusTransferSimulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct BusTransferOptions {
    pub nominal_frequency_hz: f64,
    pub frequency_scaling: f64,
    pub history_capacity: usize,
    pub event_log_capacity: usize,
    /// Closing time of the standby breaker.
    pub breaker_delay: Duration,
    pub limits: SyncCheckLimits,
    /// Initiate the transfer automatically once the prediction is safe.
    pub auto_transfer: bool,
    pub preset: ScenarioPreset,
}

impl Default for BusTransferOptions {
    fn default() -> Self {
        Self {
            nominal_frequency_hz: 60.0,
            frequency_scaling: protlab_calc::integrator::DEFAULT_FREQUENCY_SCALING,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            breaker_delay: Duration::from_millis(100),
            limits: SyncCheckLimits::default(),
            auto_transfer: false,
            preset: ScenarioPreset::new(
                "high-inertia",
                "Large machines: slow decay, wide fast-transfer window",
                ScenarioParameters::default(),
            ),
        }
    }
}

impl BusTransferOptions {
    /// Options from a loaded configuration, starting on the configured
    /// default preset.
    pub fn from_config(config: &LabConfig, catalog: &PresetCatalog) -> Result<Self> {
        let preset = catalog.get(&config.simulation.default_preset)?.clone();
        Ok(Self {
            nominal_frequency_hz: config.simulation.nominal_frequency_hz,
            frequency_scaling: config.simulation.frequency_scaling,
            history_capacity: config.simulation.history_capacity,
            event_log_capacity: config.simulation.event_log_capacity,
            breaker_delay: config.bus_transfer.breaker_delay,
            limits: sync_check_limits(&config.bus_transfer),
            auto_transfer: config.bus_transfer.auto_transfer,
            preset,
        })
    }
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusTransferSnapshot {
    pub tick: u64,
    pub sim_time_secs: f64,
    pub phase: OperationalPhase,
    /// Seconds since the main breaker opened.
    pub clock_secs: f64,
    pub scenario: String,
    pub state: ElectricalState,
    pub slip_hz: f64,
    pub source1: BreakerStatus,
    pub source2: BreakerStatus,
    /// Grade of a closure made right now.
    pub live: TransferVerdict,
    /// Grade of a closure issued now, once the breaker has finished closing.
    pub prediction: Prediction,
    pub sync_ready: bool,
    pub last_outcome: Option<TransferVerdict>,
}

#[derive(Debug)]
pub struct BusTransferSimulator {
    integrator: CoastDownIntegrator,
    options: BusTransferOptions,
    phase: OperationalPhase,
    tick: u64,
    sim_time_secs: f64,
    clock_secs: f64,
    state: ElectricalState,
    source1: BreakerStatus,
    source2: BreakerStatus,
    live: TransferVerdict,
    prediction: Prediction,
    last_outcome: Option<TransferVerdict>,
    voltage_history: HistoryBuffer,
    angle_history: HistoryBuffer,
    frequency_history: HistoryBuffer,
    events: EventLog,
    timers: TimerQueue<TransferAction>,
    pending_close: Option<TimerHandle>,
}

impl Default for BusTransferSimulator {
    fn default() -> Self {
        Self::new(BusTransferOptions::default())
    }
}

impl BusTransferSimulator {
    pub fn new(options: BusTransferOptions) -> Self {
        let integrator = CoastDownIntegrator::new(options.nominal_frequency_hz)
            .with_frequency_scaling(options.frequency_scaling);
        let state = ElectricalState::nominal(options.nominal_frequency_hz);
        let live = evaluate_transfer(&state, &options.limits);
        let prediction = predict(
            &state,
            options.nominal_frequency_hz,
            options.breaker_delay.as_secs_f64(),
            &options.limits,
        );
        let mut simulator = Self {
            integrator,
            phase: OperationalPhase::Connected,
            tick: 0,
            sim_time_secs: 0.0,
            clock_secs: 0.0,
            state,
            source1: BreakerStatus::Closed,
            source2: BreakerStatus::Open,
            live,
            prediction,
            last_outcome: None,
            voltage_history: HistoryBuffer::new(options.history_capacity),
            angle_history: HistoryBuffer::new(options.history_capacity),
            frequency_history: HistoryBuffer::new(options.history_capacity),
            events: EventLog::new(options.event_log_capacity),
            timers: TimerQueue::new(),
            pending_close: None,
            options,
        };
        simulator.restore_initial_state();
        simulator
    }

    pub fn from_config(config: &LabConfig, catalog: &PresetCatalog) -> Result<Self> {
        Ok(Self::new(BusTransferOptions::from_config(config, catalog)?))
    }

    /// Open the main breaker. Only valid while `Connected`.
    pub fn trip_main(&mut self) -> bool {
        if self.phase != OperationalPhase::Connected {
            lab_debug!(context = self.log_context(), "trip ignored");
            return false;
        }
        self.source1 = BreakerStatus::Open;
        self.phase = OperationalPhase::Coasting;
        self.clock_secs = 0.0;
        self.events.append(
            self.sim_time_secs,
            Severity::Warning,
            "Main breaker tripped, bus coasting",
        );
        lab_info!(context = self.log_context(), "main breaker tripped");
        true
    }

    /// Issue the close command to the standby breaker. Only valid while
    /// `Coasting`; the closure lands after the configured breaker delay.
    pub fn initiate_transfer(&mut self) -> bool {
        if self.phase != OperationalPhase::Coasting {
            lab_debug!(context = self.log_context(), "transfer request ignored");
            return false;
        }
        let delay = self.options.breaker_delay;
        let handle = self
            .timers
            .schedule(delay.as_secs_f64(), TransferAction::CloseStandby);
        self.pending_close = Some(handle);
        self.phase = OperationalPhase::TransferInitiated;
        self.events.append(
            self.sim_time_secs,
            Severity::Info,
            format!(
                "Transfer initiated at {:.1}°, source 2 closing in {} ms",
                self.state.phase_angle_deg,
                delay.as_millis()
            ),
        );
        lab_info!(
            context = self.log_context(),
            "transfer initiated, predicted {}",
            self.prediction.verdict.outcome
        );
        true
    }

    /// Return to the grid-locked initial state from any phase.
    pub fn reset(&mut self) {
        self.restore_initial_state();
        self.events.append(0.0, Severity::Info, "System Reset");
        lab_info!(context = self.log_context(), "system reset");
    }

    /// Switch scenario and reset.
    pub fn apply_preset(&mut self, preset: &ScenarioPreset) {
        self.options.preset = preset.clone();
        self.reset();
        self.events.append(
            0.0,
            Severity::Info,
            format!("Scenario '{}' selected", preset.name),
        );
    }

    pub fn select_preset(&mut self, catalog: &PresetCatalog, name: &str) -> Result<()> {
        let preset = catalog.get(name)?.clone();
        self.apply_preset(&preset);
        Ok(())
    }

    /// Edit the bus constants directly. Refused mid coast-down so one run
    /// always uses one set of constants.
    pub fn set_parameters(&mut self, parameters: ScenarioParameters) -> bool {
        if self.phase.is_coasting() {
            lab_debug!(context = self.log_context(), "parameter edit ignored");
            return false;
        }
        self.options.preset = ScenarioPreset::new("custom", "Operator-defined constants", parameters);
        true
    }

    /// Applies to transfers initiated after the call.
    pub fn set_breaker_delay(&mut self, delay: Duration) {
        self.options.breaker_delay = delay;
        self.refresh_classification();
    }

    pub fn arm_auto_transfer(&mut self, armed: bool) {
        self.options.auto_transfer = armed;
    }

    /// Advance simulated time by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.sim_time_secs += dt;

        if self.phase.is_coasting() {
            self.clock_secs += dt;
            self.state = self.integrator.step(
                &self.state,
                dt,
                self.clock_secs,
                &self.options.preset.parameters,
            );
        }

        for (handle, action) in self.timers.advance(dt) {
            match action {
                TransferAction::CloseStandby => self.close_standby(handle),
            }
        }

        self.refresh_classification();
        self.voltage_history.push(self.state.voltage_pu);
        self.angle_history.push(self.state.phase_angle_deg);
        self.frequency_history.push(self.state.frequency_hz);

        if self.options.auto_transfer && self.is_sync_ready() {
            self.initiate_transfer();
        }
    }

    fn close_standby(&mut self, handle: TimerHandle) {
        if self.phase != OperationalPhase::TransferInitiated || self.pending_close != Some(handle) {
            lab_debug!(context = self.log_context(), "stale closing timer ignored");
            return;
        }
        self.pending_close = None;

        let verdict = evaluate_transfer(&self.state, &self.options.limits);
        let (severity, outcome) = match verdict.outcome {
            TransferOutcome::Success => (Severity::Success, SystemEventOutcome::Success),
            TransferOutcome::Warning => (Severity::Warning, SystemEventOutcome::Degraded),
            TransferOutcome::Failure => (Severity::Failure, SystemEventOutcome::Fault),
        };
        let detail = verdict.detail();
        self.events.append(
            self.sim_time_secs,
            severity,
            format!("Source 2 closed: {}, {}", verdict.outcome, detail),
        );

        self.last_outcome = Some(verdict);
        self.state = ElectricalState::nominal(self.options.nominal_frequency_hz);
        self.source2 = BreakerStatus::Closed;
        self.phase = OperationalPhase::Completed;

        log_system_event(
            Some(&self.log_context()),
            "transfer.completed",
            &detail,
            outcome,
        );
    }

    fn restore_initial_state(&mut self) {
        self.timers.cancel_all();
        self.pending_close = None;
        self.phase = OperationalPhase::Connected;
        self.tick = 0;
        self.sim_time_secs = 0.0;
        self.clock_secs = 0.0;
        self.state = ElectricalState::nominal(self.options.nominal_frequency_hz);
        self.source1 = BreakerStatus::Closed;
        self.source2 = BreakerStatus::Open;
        self.last_outcome = None;
        self.voltage_history.fill(self.state.voltage_pu);
        self.angle_history.fill(self.state.phase_angle_deg);
        self.frequency_history.fill(self.state.frequency_hz);
        self.events.reset();
        self.refresh_classification();
    }

    fn refresh_classification(&mut self) {
        self.live = evaluate_transfer(&self.state, &self.options.limits);
        self.prediction = predict(
            &self.state,
            self.options.nominal_frequency_hz,
            self.options.breaker_delay.as_secs_f64(),
            &self.options.limits,
        );
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_module(MODULE)
            .with_phase(self.phase.as_str())
            .with_tick(self.tick)
            .with_scenario(&self.options.preset.name)
    }

    /// A transfer issued now would land inside a safe window.
    pub fn is_sync_ready(&self) -> bool {
        self.phase == OperationalPhase::Coasting && self.prediction.is_sync_ready()
    }

    pub fn phase(&self) -> OperationalPhase {
        self.phase
    }

    pub fn state(&self) -> &ElectricalState {
        &self.state
    }

    pub fn clock_secs(&self) -> f64 {
        self.clock_secs
    }

    pub fn sim_time_secs(&self) -> f64 {
        self.sim_time_secs
    }

    pub fn source1(&self) -> BreakerStatus {
        self.source1
    }

    pub fn source2(&self) -> BreakerStatus {
        self.source2
    }

    pub fn live_verdict(&self) -> &TransferVerdict {
        &self.live
    }

    pub fn prediction(&self) -> &Prediction {
        &self.prediction
    }

    pub fn last_outcome(&self) -> Option<&TransferVerdict> {
        self.last_outcome.as_ref()
    }

    pub fn options(&self) -> &BusTransferOptions {
        &self.options
    }

    pub fn preset(&self) -> &ScenarioPreset {
        &self.options.preset
    }

    pub fn voltage_history(&self) -> &HistoryBuffer {
        &self.voltage_history
    }

    pub fn angle_history(&self) -> &HistoryBuffer {
        &self.angle_history
    }

    pub fn frequency_history(&self) -> &HistoryBuffer {
        &self.frequency_history
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn snapshot(&self) -> BusTransferSnapshot {
        BusTransferSnapshot {
            tick: self.tick,
            sim_time_secs: self.sim_time_secs,
            phase: self.phase,
            clock_secs: self.clock_secs,
            scenario: self.options.preset.name.clone(),
            state: self.state,
            slip_hz: self.state.slip_hz(self.options.nominal_frequency_hz),
            source1: self.source1,
            source2: self.source2,
            live: self.live,
            prediction: self.prediction,
            sync_ready: self.is_sync_ready(),
            last_outcome: self.last_outcome,
        }
    }
}

impl Simulator for BusTransferSimulator {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn tick(&mut self, dt: f64) {
        BusTransferSimulator::tick(self, dt);
    }
}
