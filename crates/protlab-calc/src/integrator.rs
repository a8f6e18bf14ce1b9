//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Coast-down model of a motor bus after its source breaker opens.
//!
//! Residual voltage decays as `V(t) = exp(-t / (τ / load))` and frequency as
//! `f(t) = f0 · exp(-t · load · k / (2H))`. The bus angle is integrated from
//! the slip `f0 − f(t)` with whatever `dt` the frame clock delivered, so frame
//! rate changes do not alter the physics.

use serde::{Deserialize, Serialize};

use crate::model::{ElectricalState, ScenarioParameters};
use crate::MIN_TIME_CONSTANT;

/// Default scaling applied to the frequency decay exponent.
pub const DEFAULT_FREQUENCY_SCALING: f64 = 0.2;

/// Wrap an angle into `(-180, 180]`. Non-finite input maps to `0`.
pub fn wrap_angle_deg(angle_deg: f64) -> f64 {
    if !angle_deg.is_finite() {
        return 0.0;
    }
    let wrapped = angle_deg % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Stateless stepper holding the constants shared by every step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoastDownIntegrator {
    pub nominal_frequency_hz: f64,
    /// Empirical `k` in the frequency decay law.
    pub frequency_scaling: f64,
}

impl Default for CoastDownIntegrator {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl CoastDownIntegrator {
    pub fn new(nominal_frequency_hz: f64) -> Self {
        Self {
            nominal_frequency_hz,
            frequency_scaling: DEFAULT_FREQUENCY_SCALING,
        }
    }

    pub fn with_frequency_scaling(mut self, frequency_scaling: f64) -> Self {
        self.frequency_scaling = frequency_scaling;
        self
    }

    /// Residual bus voltage `t` seconds after the source opened.
    pub fn voltage_at(&self, t: f64, params: &ScenarioParameters) -> f64 {
        let tau = clamp_constant(params.decay_constant);
        let load = clamp_constant(params.load_factor);
        (-sanitize_time(t) / (tau / load)).exp()
    }

    /// Bus frequency `t` seconds after the source opened.
    pub fn frequency_at(&self, t: f64, params: &ScenarioParameters) -> f64 {
        let inertia = clamp_constant(params.inertia_constant);
        let load = clamp_constant(params.load_factor);
        let rate = (1.0 / (2.0 * inertia)) * load * self.frequency_scaling;
        self.nominal_frequency_hz * (-sanitize_time(t) * rate).exp()
    }

    /// Advance `previous` by one frame.
    ///
    /// `t` is the elapsed time since the coast-down began, measured at the
    /// end of this frame, and `dt` is the frame length. The angle rotates
    /// clockwise (negative) while the bus runs slower than the source and is
    /// wrapped after every increment.
    pub fn step(
        &self,
        previous: &ElectricalState,
        dt: f64,
        t: f64,
        params: &ScenarioParameters,
    ) -> ElectricalState {
        let dt = sanitize_time(dt);
        let frequency_hz = self.frequency_at(t, params);
        let slip_hz = self.nominal_frequency_hz - frequency_hz;
        let phase_angle_deg = wrap_angle_deg(previous.phase_angle_deg - slip_hz * 360.0 * dt);
        ElectricalState {
            voltage_pu: self.voltage_at(t, params),
            frequency_hz,
            phase_angle_deg,
        }
    }
}

fn clamp_constant(value: f64) -> f64 {
    if value.is_finite() && value > MIN_TIME_CONSTANT {
        value
    } else {
        MIN_TIME_CONSTANT
    }
}

fn sanitize_time(t: f64) -> f64 {
    if t.is_finite() && t > 0.0 {
        t
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn high_inertia() -> ScenarioParameters {
        ScenarioParameters {
            inertia_constant: 3.5,
            decay_constant: 2.5,
            load_factor: 1.0,
        }
    }

    #[test]
    fn wrap_keeps_half_open_interval() {
        assert_eq!(wrap_angle_deg(180.0), 180.0);
        assert_eq!(wrap_angle_deg(-180.0), 180.0);
        assert_eq!(wrap_angle_deg(181.0), -179.0);
        assert_eq!(wrap_angle_deg(-181.0), 179.0);
        assert_eq!(wrap_angle_deg(720.0), 0.0);
        assert_eq!(wrap_angle_deg(-540.0), 180.0);
        assert_eq!(wrap_angle_deg(f64::NAN), 0.0);
    }

    #[test]
    fn starts_from_nominal() {
        let integrator = CoastDownIntegrator::new(60.0);
        let params = high_inertia();
        assert_eq!(integrator.voltage_at(0.0, &params), 1.0);
        assert_eq!(integrator.frequency_at(0.0, &params), 60.0);
    }

    #[test]
    fn voltage_decays_strictly() {
        let integrator = CoastDownIntegrator::new(60.0);
        let params = high_inertia();
        let mut previous = integrator.voltage_at(0.0, &params);
        for step in 1..200 {
            let v = integrator.voltage_at(step as f64 * 0.01, &params);
            assert!(v < previous, "voltage must fall at t={}", step as f64 * 0.01);
            previous = v;
        }
    }

    #[test]
    fn heavier_load_decays_faster() {
        let integrator = CoastDownIntegrator::new(60.0);
        let light = ScenarioParameters {
            load_factor: 0.6,
            ..high_inertia()
        };
        let heavy = ScenarioParameters {
            load_factor: 1.4,
            ..high_inertia()
        };
        assert!(integrator.voltage_at(0.5, &heavy) < integrator.voltage_at(0.5, &light));
        assert!(integrator.frequency_at(0.5, &heavy) < integrator.frequency_at(0.5, &light));
    }

    #[test]
    fn frequency_scaling_sets_the_decay_rate() {
        let params = high_inertia();
        let integrator = CoastDownIntegrator::new(60.0).with_frequency_scaling(0.4);
        assert_eq!(integrator.frequency_scaling, 0.4);
        let rate = 0.4 * params.load_factor / (2.0 * params.inertia_constant);
        let expected = 60.0 * (-rate).exp();
        assert!((integrator.frequency_at(1.0, &params) - expected).abs() < 1e-9);
        let default = CoastDownIntegrator::new(60.0);
        assert!(default.frequency_at(1.0, &params) > integrator.frequency_at(1.0, &params));
    }

    #[test]
    fn angle_moves_clockwise_while_slowing() {
        let integrator = CoastDownIntegrator::new(60.0);
        let params = high_inertia();
        let mut state = ElectricalState::nominal(60.0);
        let mut t = 0.0;
        for _ in 0..12 {
            t += 1.0 / 60.0;
            state = integrator.step(&state, 1.0 / 60.0, t, &params);
        }
        assert!(state.phase_angle_deg < 0.0);
        assert!(state.frequency_hz < 60.0);
    }

    #[test]
    fn degenerate_constants_collapse_without_nan() {
        let integrator = CoastDownIntegrator::new(50.0);
        let params = ScenarioParameters {
            inertia_constant: 0.0,
            decay_constant: 0.0,
            load_factor: 1.0,
        };
        let state = integrator.step(&ElectricalState::nominal(50.0), 0.02, 0.02, &params);
        assert_eq!(state.voltage_pu, 0.0);
        assert_eq!(state.frequency_hz, 0.0);
        assert!(state.phase_angle_deg.is_finite());
        assert!(state.phase_angle_deg > -180.0 && state.phase_angle_deg <= 180.0);
    }

    #[test]
    fn angle_stays_wrapped_under_random_frames() {
        let integrator = CoastDownIntegrator::new(60.0);
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..50 {
            let params = ScenarioParameters {
                inertia_constant: rng.gen_range(0.5..4.0),
                decay_constant: rng.gen_range(0.2..3.0),
                load_factor: rng.gen_range(0.3..2.0),
            };
            let mut state = ElectricalState::nominal(60.0);
            let mut t = 0.0;
            for _ in 0..400 {
                let dt = rng.gen_range(0.0..0.1);
                t += dt;
                state = integrator.step(&state, dt, t, &params);
                assert!(
                    state.phase_angle_deg > -180.0 && state.phase_angle_deg <= 180.0,
                    "angle {} escaped the interval",
                    state.phase_angle_deg
                );
            }
        }
    }
}
