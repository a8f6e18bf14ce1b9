//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Three-zone Mho distance relay bench.
//!
//! The verdict is recomputed every frame from the apparent impedance, the
//! zone settings and the loss-of-potential flag alone. Relay operation is
//! tracked beside it: each zone keeps an operate timer which runs while the
//! point sits inside that zone's circle, and the first zone whose timer
//! reaches its time step operates the relay. The operation stays latched
//! until the fault is cleared, the settings change or the bench is reset.

use std::fmt;

use nalgebra::Complex;
use protlab_calc::{
    classify_zone, mho_contains, phasor, DistanceSettings, ImpedancePoint, Zone,
};
use protlab_common::LabConfig;
use protlab_logging::{lab_debug, lab_info, lab_warn, LogContext};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::event_log::{EventLog, Severity, DEFAULT_EVENT_LOG_CAPACITY};
use crate::frame_loop::Simulator;
use crate::settings::{distance_settings, zone_delays_secs};

const MODULE: &str = "distance";
const TIMER_EPSILON: f64 = 1e-9;

/// Apparent impedance of healthy load flow, well outside every zone.
pub const LOAD_POINT: ImpedancePoint = ImpedancePoint {
    r_ohm: 40.0,
    x_ohm: 10.0,
};

pub const DEFAULT_ZONE_DELAYS_SECS: [f64; 3] = [0.0, 0.3, 1.0];

/// Positive-sequence impedance of the protected line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineModel {
    pub impedance_ohm: f64,
    pub angle_deg: f64,
}

impl Default for LineModel {
    fn default() -> Self {
        Self {
            impedance_ohm: 10.0,
            angle_deg: 75.0,
        }
    }
}

impl LineModel {
    /// Impedance seen for a fault `location_percent` along the line through
    /// `fault_resistance_ohm` of arc or tower-footing resistance.
    pub fn fault_point(&self, location_percent: f64, fault_resistance_ohm: f64) -> ImpedancePoint {
        let fraction = if location_percent.is_finite() {
            location_percent.clamp(0.0, 100.0) / 100.0
        } else {
            0.0
        };
        let line = phasor(self.impedance_ohm * fraction, self.angle_deg);
        ImpedancePoint::from_complex(line + Complex::new(fault_resistance_ohm.max(0.0), 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultInput {
    Impedance {
        point: ImpedancePoint,
    },
    LineFault {
        location_percent: f64,
        fault_resistance_ohm: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DistanceOutcome {
    Trip,
    Monitor,
    Blocked,
}

impl DistanceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceOutcome::Trip => "TRIP",
            DistanceOutcome::Monitor => "MONITOR",
            DistanceOutcome::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for DistanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceVerdict {
    /// `Trip` whenever the point lies in a zone, `Blocked` under loss of
    /// potential, otherwise `Monitor`.
    pub outcome: DistanceOutcome,
    /// Innermost zone containing the point.
    pub zone: Option<Zone>,
    pub point: ImpedancePoint,
    /// Zone whose time step has elapsed, latched.
    pub relay_operated: Option<Zone>,
    /// Time the point has spent inside `zone`.
    pub operate_timer_secs: f64,
}

/// Classify `point` against the zone settings for this frame.
pub fn classify_distance(
    settings: &DistanceSettings,
    point: ImpedancePoint,
    loss_of_potential: bool,
) -> (DistanceOutcome, Option<Zone>) {
    let zone = classify_zone(settings, point);
    let outcome = match (loss_of_potential, zone) {
        (true, _) => DistanceOutcome::Blocked,
        (false, Some(_)) => DistanceOutcome::Trip,
        (false, None) => DistanceOutcome::Monitor,
    };
    (outcome, zone)
}

#[derive(Debug)]
pub struct DistanceSimulator {
    settings: DistanceSettings,
    zone_delays_secs: [f64; 3],
    line: LineModel,
    point: ImpedancePoint,
    fault_active: bool,
    loss_of_potential: bool,
    zone_timers_secs: [f64; 3],
    operated: Option<Zone>,
    verdict: DistanceVerdict,
    tick: u64,
    sim_time_secs: f64,
    events: EventLog,
}

impl Default for DistanceSimulator {
    fn default() -> Self {
        Self::new(
            DistanceSettings::default(),
            DEFAULT_ZONE_DELAYS_SECS,
            DEFAULT_EVENT_LOG_CAPACITY,
        )
    }
}

impl DistanceSimulator {
    pub fn new(
        settings: DistanceSettings,
        zone_delays_secs: [f64; 3],
        event_log_capacity: usize,
    ) -> Self {
        let mut simulator = Self {
            settings,
            zone_delays_secs,
            line: LineModel::default(),
            point: LOAD_POINT,
            fault_active: false,
            loss_of_potential: false,
            zone_timers_secs: [0.0; 3],
            operated: None,
            verdict: DistanceVerdict {
                outcome: DistanceOutcome::Monitor,
                zone: None,
                point: LOAD_POINT,
                relay_operated: None,
                operate_timer_secs: 0.0,
            },
            tick: 0,
            sim_time_secs: 0.0,
            events: EventLog::new(event_log_capacity),
        };
        simulator.refresh_verdict();
        simulator
    }

    pub fn from_config(config: &LabConfig) -> Result<Self> {
        let settings = distance_settings(&config.distance);
        settings.validate()?;
        Ok(Self::new(
            settings,
            zone_delays_secs(&config.distance),
            config.simulation.event_log_capacity,
        ))
    }

    /// Replace the zone reaches. Zones that are not nested are rejected and
    /// the previous settings stay in force. Accepted settings restart relay
    /// operation.
    pub fn set_settings(&mut self, settings: DistanceSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.zone_timers_secs = [0.0; 3];
        self.operated = None;
        self.refresh_verdict();
        Ok(())
    }

    pub fn set_zone_delays(&mut self, delays_secs: [f64; 3]) {
        self.zone_delays_secs = delays_secs.map(|delay| {
            if delay.is_finite() {
                delay.max(0.0)
            } else {
                0.0
            }
        });
    }

    pub fn set_line(&mut self, line: LineModel) {
        self.line = line;
    }

    /// Apply a fault. Any latched operation and running timers start over.
    pub fn inject_fault(&mut self, fault: FaultInput) {
        self.point = match fault {
            FaultInput::Impedance { point } => point,
            FaultInput::LineFault {
                location_percent,
                fault_resistance_ohm,
            } => self.line.fault_point(location_percent, fault_resistance_ohm),
        };
        self.fault_active = true;
        self.zone_timers_secs = [0.0; 3];
        self.operated = None;
        self.events.append(
            self.sim_time_secs,
            Severity::Info,
            format!(
                "Fault applied, Z = {:.2} + j{:.2} Ω",
                self.point.r_ohm, self.point.x_ohm
            ),
        );
        lab_info!(context = self.log_context(), "fault applied");
        self.refresh_verdict();
    }

    /// Return to load flow and release a latched operation.
    pub fn clear_fault(&mut self) {
        if !self.fault_active {
            lab_debug!(context = self.log_context(), "no fault to clear");
            return;
        }
        self.point = LOAD_POINT;
        self.fault_active = false;
        self.zone_timers_secs = [0.0; 3];
        self.operated = None;
        self.events
            .append(self.sim_time_secs, Severity::Info, "Fault cleared");
        lab_info!(context = self.log_context(), "fault cleared");
        self.refresh_verdict();
    }

    /// Engage or release the loss-of-potential block.
    pub fn set_loss_of_potential(&mut self, engaged: bool) {
        if self.loss_of_potential == engaged {
            return;
        }
        self.loss_of_potential = engaged;
        self.zone_timers_secs = [0.0; 3];
        let message = if engaged {
            "Loss of potential, distance elements blocked"
        } else {
            "Potential restored, distance elements released"
        };
        self.events
            .append(self.sim_time_secs, Severity::Warning, message);
        lab_warn!(context = self.log_context(), "{}", message);
        self.refresh_verdict();
    }

    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.sim_time_secs += dt;

        if self.loss_of_potential {
            self.refresh_verdict();
            return;
        }

        for zone in Zone::ALL {
            let index = zone.index();
            if mho_contains(self.settings.reach(zone), self.settings.mta_deg, self.point) {
                self.zone_timers_secs[index] += dt;
            } else {
                self.zone_timers_secs[index] = 0.0;
            }
        }

        if self.operated.is_none() {
            if let Some(zone) = self.operated_zone() {
                self.operated = Some(zone);
                self.events.append(
                    self.sim_time_secs,
                    Severity::Failure,
                    format!(
                        "{} trip, |Z| = {:.2} Ω at {:.1}°",
                        zone,
                        self.point.magnitude(),
                        self.point.angle_deg()
                    ),
                );
                lab_warn!(context = self.log_context(), "relay operated in {}", zone);
            }
        }
        self.refresh_verdict();
    }

    fn operated_zone(&self) -> Option<Zone> {
        Zone::ALL.into_iter().find(|zone| {
            let index = zone.index();
            mho_contains(self.settings.reach(*zone), self.settings.mta_deg, self.point)
                && self.zone_timers_secs[index] + TIMER_EPSILON >= self.zone_delays_secs[index]
        })
    }

    fn refresh_verdict(&mut self) {
        let (outcome, zone) =
            classify_distance(&self.settings, self.point, self.loss_of_potential);
        self.verdict = DistanceVerdict {
            outcome,
            zone,
            point: self.point,
            relay_operated: self.operated,
            operate_timer_secs: zone
                .map(|zone| self.zone_timers_secs[zone.index()])
                .unwrap_or(0.0),
        };
    }

    pub fn reset(&mut self) {
        self.point = LOAD_POINT;
        self.fault_active = false;
        self.loss_of_potential = false;
        self.zone_timers_secs = [0.0; 3];
        self.operated = None;
        self.tick = 0;
        self.sim_time_secs = 0.0;
        self.events.reset();
        self.events.append(0.0, Severity::Info, "System Reset");
        self.refresh_verdict();
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_module(MODULE)
            .with_phase(self.verdict.outcome.as_str())
            .with_tick(self.tick)
    }

    pub fn settings(&self) -> &DistanceSettings {
        &self.settings
    }

    pub fn zone_delays_secs(&self) -> [f64; 3] {
        self.zone_delays_secs
    }

    pub fn line(&self) -> &LineModel {
        &self.line
    }

    pub fn point(&self) -> ImpedancePoint {
        self.point
    }

    pub fn verdict(&self) -> &DistanceVerdict {
        &self.verdict
    }

    pub fn is_fault_active(&self) -> bool {
        self.fault_active
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

impl Simulator for DistanceSimulator {
    fn name(&self) -> &'static str {
        MODULE
    }

    fn tick(&mut self, dt: f64) {
        DistanceSimulator::tick(self, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SimError;

    fn along_mta(magnitude: f64) -> ImpedancePoint {
        let mta = 75f64.to_radians();
        ImpedancePoint::new(magnitude * mta.cos(), magnitude * mta.sin())
    }

    fn run(simulator: &mut DistanceSimulator, frames: usize, dt: f64) {
        for _ in 0..frames {
            simulator.tick(dt);
        }
    }

    #[test]
    fn load_flow_is_monitored() {
        let mut simulator = DistanceSimulator::default();
        run(&mut simulator, 10, 0.05);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Monitor);
        assert_eq!(simulator.verdict().zone, None);
        assert!(simulator.events().is_empty());
    }

    #[test]
    fn zone_one_trips_instantly_and_logs_once() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: ImpedancePoint::new(2.0, 3.0),
        });
        simulator.tick(1.0 / 60.0);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Trip);
        assert_eq!(simulator.verdict().zone, Some(Zone::Zone1));
        assert_eq!(simulator.verdict().relay_operated, Some(Zone::Zone1));

        run(&mut simulator, 30, 1.0 / 60.0);
        let trips = simulator
            .events()
            .entries()
            .filter(|entry| entry.severity == Severity::Failure)
            .count();
        assert_eq!(trips, 1);
    }

    #[test]
    fn zone_two_point_classifies_as_trip_on_the_first_frame() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: along_mta(10.0),
        });
        simulator.tick(1.0 / 60.0);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Trip);
        assert_eq!(simulator.verdict().zone, Some(Zone::Zone2));
        assert_eq!(simulator.verdict().relay_operated, None);
    }

    #[test]
    fn zone_two_operates_after_its_time_step() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: along_mta(10.0),
        });
        run(&mut simulator, 5, 0.05);
        assert_eq!(simulator.verdict().relay_operated, None);
        assert!(simulator.verdict().operate_timer_secs > 0.2);

        run(&mut simulator, 1, 0.05);
        assert_eq!(simulator.verdict().relay_operated, Some(Zone::Zone2));
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Trip);
    }

    #[test]
    fn zone_three_needs_a_full_second() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: along_mta(15.0),
        });
        run(&mut simulator, 9, 0.1);
        assert_eq!(simulator.verdict().zone, Some(Zone::Zone3));
        assert_eq!(simulator.verdict().relay_operated, None);
        run(&mut simulator, 2, 0.1);
        assert_eq!(simulator.verdict().relay_operated, Some(Zone::Zone3));
    }

    #[test]
    fn shrinking_the_reaches_reclassifies_immediately() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: ImpedancePoint::new(2.0, 3.0),
        });
        simulator.tick(1.0 / 60.0);
        assert_eq!(simulator.verdict().relay_operated, Some(Zone::Zone1));

        simulator
            .set_settings(DistanceSettings {
                reaches_ohm: [0.5, 1.0, 1.5],
                mta_deg: 75.0,
            })
            .unwrap();
        simulator.tick(1.0 / 60.0);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Monitor);
        assert_eq!(simulator.verdict().zone, None);
        assert_eq!(simulator.verdict().relay_operated, None);
    }

    #[test]
    fn loss_of_potential_blocks_until_released() {
        let mut simulator = DistanceSimulator::default();
        simulator.set_loss_of_potential(true);
        simulator.inject_fault(FaultInput::Impedance {
            point: ImpedancePoint::new(2.0, 3.0),
        });
        run(&mut simulator, 60, 0.05);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Blocked);
        assert_eq!(simulator.verdict().zone, Some(Zone::Zone1));
        assert_eq!(simulator.verdict().relay_operated, None);

        simulator.set_loss_of_potential(false);
        simulator.tick(0.05);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Trip);
    }

    #[test]
    fn line_faults_map_onto_the_impedance_plane() {
        let line = LineModel::default();
        let midpoint = line.fault_point(50.0, 0.0);
        assert!((midpoint.magnitude() - 5.0).abs() < 1e-9);
        assert!((midpoint.angle_deg() - 75.0).abs() < 1e-9);

        let resistive = line.fault_point(50.0, 2.0);
        assert!((resistive.r_ohm - midpoint.r_ohm - 2.0).abs() < 1e-12);

        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::LineFault {
            location_percent: 100.0,
            fault_resistance_ohm: 0.0,
        });
        simulator.tick(0.01);
        assert_eq!(simulator.verdict().zone, Some(Zone::Zone2));
    }

    #[test]
    fn clearing_releases_the_trip() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: ImpedancePoint::new(2.0, 3.0),
        });
        simulator.tick(0.01);
        simulator.clear_fault();
        simulator.tick(0.01);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Monitor);
        assert!(!simulator.is_fault_active());
    }

    #[test]
    fn non_nested_zones_are_rejected() {
        let mut simulator = DistanceSimulator::default();
        let bad = DistanceSettings {
            reaches_ohm: [12.0, 8.0, 20.0],
            mta_deg: 75.0,
        };
        assert!(matches!(
            simulator.set_settings(bad),
            Err(SimError::InvalidSettings(_))
        ));
        assert_eq!(*simulator.settings(), DistanceSettings::default());
    }

    #[test]
    fn reset_leaves_a_single_entry() {
        let mut simulator = DistanceSimulator::default();
        simulator.inject_fault(FaultInput::Impedance {
            point: ImpedancePoint::new(2.0, 3.0),
        });
        run(&mut simulator, 3, 0.1);
        simulator.reset();
        assert_eq!(simulator.events().len(), 1);
        assert_eq!(simulator.point(), LOAD_POINT);
        assert_eq!(simulator.verdict().outcome, DistanceOutcome::Monitor);
    }
}
