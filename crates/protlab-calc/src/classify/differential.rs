//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{modulus, DifferentialInputs, DifferentialSettings};

/// Bias (restraint) and differential (operate) currents, pu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub bias: f64,
    pub differential: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DifferentialOutcome {
    Stable,
    Trip,
    Blocked,
}

impl DifferentialOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferentialOutcome::Stable => "STABLE",
            DifferentialOutcome::Trip => "TRIP",
            DifferentialOutcome::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for DifferentialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialVerdict {
    pub outcome: DifferentialOutcome,
    pub point: OperatingPoint,
    pub threshold: f64,
    /// `true` when the operating point sits above the restraint curve, even if
    /// the harmonic block prevented the trip.
    pub above_threshold: bool,
}

/// `Ibias = (|I1| + |I2|) / 2`, `Idiff = |I1 + I2∠θ|`.
pub fn operating_point(inputs: &DifferentialInputs) -> OperatingPoint {
    OperatingPoint {
        bias: (inputs.i1_pu.abs() + inputs.i2_pu.abs()) / 2.0,
        differential: modulus(inputs.i1_phasor() + inputs.i2_phasor()),
    }
}

/// Dual-slope restraint curve evaluated at `bias`.
pub fn restraint_threshold(settings: &DifferentialSettings, bias: f64) -> f64 {
    if bias < settings.breakpoint {
        settings.pickup.max(settings.slope1 * bias)
    } else {
        settings.pickup.max(settings.slope1 * settings.breakpoint)
            + settings.slope2 * (bias - settings.breakpoint)
    }
}

/// Classify one frame. Harmonic restraint wins over the trip decision.
pub fn classify_differential(
    settings: &DifferentialSettings,
    inputs: &DifferentialInputs,
) -> DifferentialVerdict {
    let point = operating_point(inputs);
    let threshold = restraint_threshold(settings, point.bias);
    let above_threshold = point.differential > threshold;
    let outcome = if inputs.harmonic_ratio > settings.harmonic_block_threshold {
        DifferentialOutcome::Blocked
    } else if above_threshold {
        DifferentialOutcome::Trip
    } else {
        DifferentialOutcome::Stable
    };
    DifferentialVerdict {
        outcome,
        point,
        threshold,
        above_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_settings() -> DifferentialSettings {
        DifferentialSettings {
            pickup: 0.3,
            slope1: 0.3,
            slope2: 0.7,
            breakpoint: 2.0,
            harmonic_block_threshold: 0.15,
        }
    }

    #[test]
    fn threshold_below_breakpoint() {
        let threshold = restraint_threshold(&reference_settings(), 1.0);
        assert!((threshold - 0.3).abs() < 1e-12);
    }

    #[test]
    fn threshold_above_breakpoint() {
        let threshold = restraint_threshold(&reference_settings(), 3.0);
        assert!((threshold - 1.3).abs() < 1e-12);
    }

    #[test]
    fn pickup_dominates_at_low_bias() {
        let threshold = restraint_threshold(&reference_settings(), 0.2);
        assert!((threshold - 0.3).abs() < 1e-12);
    }

    #[test]
    fn zero_breakpoint_uses_second_slope_only() {
        let settings = DifferentialSettings {
            breakpoint: 0.0,
            ..reference_settings()
        };
        let threshold = restraint_threshold(&settings, 1.0);
        assert!((threshold - 1.0).abs() < 1e-12);
        assert!(threshold.is_finite());
    }

    #[test]
    fn trips_above_curve_and_holds_below() {
        let settings = reference_settings();
        // I1 = 1.25 and I2 = 0.75 in phase: bias 1.0, diff 2.0.
        let internal = DifferentialInputs {
            i1_pu: 1.25,
            i2_pu: 0.75,
            angle_deg: 0.0,
            harmonic_ratio: 0.0,
        };
        assert_eq!(
            classify_differential(&settings, &internal).outcome,
            DifferentialOutcome::Trip
        );

        // Through current: I2 opposes I1, diff 0.2 at bias 1.0.
        let through = DifferentialInputs {
            i1_pu: 1.1,
            i2_pu: 0.9,
            angle_deg: 180.0,
            harmonic_ratio: 0.0,
        };
        let verdict = classify_differential(&settings, &through);
        assert!((verdict.point.bias - 1.0).abs() < 1e-12);
        assert!((verdict.point.differential - 0.2).abs() < 1e-9);
        assert_eq!(verdict.outcome, DifferentialOutcome::Stable);
    }

    #[test]
    fn boundary_values_from_reference_settings() {
        let settings = reference_settings();
        // bias 1.0 with diff 0.5 trips, diff 0.2 does not.
        let trip = DifferentialInputs {
            i1_pu: 1.25,
            i2_pu: 0.75,
            angle_deg: 180.0,
            harmonic_ratio: 0.0,
        };
        let verdict = classify_differential(&settings, &trip);
        assert!((verdict.point.differential - 0.5).abs() < 1e-9);
        assert_eq!(verdict.outcome, DifferentialOutcome::Trip);

        let hold = DifferentialInputs {
            i1_pu: 1.1,
            i2_pu: 0.9,
            angle_deg: 180.0,
            harmonic_ratio: 0.0,
        };
        assert_eq!(
            classify_differential(&settings, &hold).outcome,
            DifferentialOutcome::Stable
        );
    }

    #[test]
    fn harmonic_block_overrides_trip() {
        let settings = reference_settings();
        let inrush = DifferentialInputs {
            i1_pu: 3.0,
            i2_pu: 0.0,
            angle_deg: 0.0,
            harmonic_ratio: 0.25,
        };
        let verdict = classify_differential(&settings, &inrush);
        assert!(verdict.above_threshold);
        assert_eq!(verdict.outcome, DifferentialOutcome::Blocked);

        let quiet = DifferentialInputs {
            harmonic_ratio: 0.3,
            ..DifferentialInputs::default()
        };
        assert_eq!(
            classify_differential(&settings, &quiet).outcome,
            DifferentialOutcome::Blocked
        );
    }

    #[test]
    fn garbage_inputs_do_not_panic() {
        let settings = reference_settings();
        let inputs = DifferentialInputs {
            i1_pu: f64::NAN,
            i2_pu: -4.0,
            angle_deg: f64::INFINITY,
            harmonic_ratio: -1.0,
        };
        let verdict = classify_differential(&settings, &inputs);
        assert_ne!(verdict.outcome, DifferentialOutcome::Blocked);
    }
}
