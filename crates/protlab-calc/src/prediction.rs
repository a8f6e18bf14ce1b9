//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::classify::sync_check::{evaluate_transfer, TransferVerdict};
use crate::integrator::wrap_angle_deg;
use crate::model::{ElectricalState, SyncCheckLimits};

/// Where the bus will be once a breaker issued now has finished closing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub delay_secs: f64,
    pub state: ElectricalState,
    pub verdict: TransferVerdict,
}

impl Prediction {
    pub fn is_sync_ready(&self) -> bool {
        self.verdict.is_safe()
    }
}

/// Rotate `angle_deg` by a constant slip over `delay_secs`.
pub fn project_angle(angle_deg: f64, slip_hz: f64, delay_secs: f64) -> f64 {
    wrap_angle_deg(angle_deg - slip_hz * 360.0 * delay_secs)
}

/// Project `current` over the closing delay, assuming constant slip and
/// voltage across the window, then grade the projected closure.
pub fn predict(
    current: &ElectricalState,
    nominal_frequency_hz: f64,
    delay_secs: f64,
    limits: &SyncCheckLimits,
) -> Prediction {
    let delay_secs = if delay_secs.is_finite() {
        delay_secs.max(0.0)
    } else {
        0.0
    };
    let slip_hz = current.slip_hz(nominal_frequency_hz);
    let state = ElectricalState {
        phase_angle_deg: project_angle(current.phase_angle_deg, slip_hz, delay_secs),
        ..*current
    };
    Prediction {
        delay_secs,
        state,
        verdict: evaluate_transfer(&state, limits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::sync_check::TransferOutcome;

    #[test]
    fn zero_slip_keeps_angle() {
        let state = ElectricalState {
            voltage_pu: 0.9,
            frequency_hz: 60.0,
            phase_angle_deg: -10.0,
        };
        let prediction = predict(&state, 60.0, 0.1, &SyncCheckLimits::default());
        assert_eq!(prediction.state.phase_angle_deg, -10.0);
        assert!(prediction.is_sync_ready());
    }

    #[test]
    fn slip_rotates_angle_over_delay() {
        // 1 Hz slip for 100 ms is 36 degrees clockwise.
        assert!((project_angle(-10.0, 1.0, 0.1) - (-46.0)).abs() < 1e-9);
        assert!((project_angle(-170.0, 1.0, 0.1) - 154.0).abs() < 1e-9);
    }

    #[test]
    fn prediction_can_veto_a_currently_safe_closure() {
        let state = ElectricalState {
            voltage_pu: 0.85,
            frequency_hz: 59.0,
            phase_angle_deg: -20.0,
        };
        let limits = SyncCheckLimits::default();
        assert!(evaluate_transfer(&state, &limits).is_safe());
        let prediction = predict(&state, 60.0, 0.1, &limits);
        assert_eq!(prediction.state.voltage_pu, 0.85);
        assert_ne!(prediction.verdict.outcome, TransferOutcome::Success);
        assert!(!prediction.is_sync_ready());
    }

    #[test]
    fn negative_delay_is_treated_as_immediate() {
        let state = ElectricalState {
            voltage_pu: 0.9,
            frequency_hz: 58.0,
            phase_angle_deg: -5.0,
        };
        let prediction = predict(&state, 60.0, -1.0, &SyncCheckLimits::default());
        assert_eq!(prediction.delay_secs, 0.0);
        assert_eq!(prediction.state.phase_angle_deg, -5.0);
    }
}
