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

use crate::model::{ElectricalState, SyncCheckLimits};

/// Graded result of closing the standby source onto the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferOutcome {
    Success,
    Warning,
    Failure,
}

impl TransferOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferOutcome::Success => "SUCCESS",
            TransferOutcome::Warning => "WARNING",
            TransferOutcome::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which permissive made a closure safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferWindow {
    /// Small angle and acceptable vector difference.
    Fast,
    /// Bus voltage has collapsed far enough that angle no longer matters.
    Residual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferVerdict {
    pub outcome: TransferOutcome,
    pub window: Option<TransferWindow>,
    pub angle_deg: f64,
    pub residual_voltage_pu: f64,
    pub delta_v_pu: f64,
    /// Vector difference as a fraction of the permissible limit. Values above
    /// 1.0 mean the motors see more than the allowed transient torque.
    pub torque_shock: f64,
}

impl TransferVerdict {
    pub fn is_safe(&self) -> bool {
        self.outcome == TransferOutcome::Success
    }

    /// Operator-facing description used in event logs.
    pub fn detail(&self) -> String {
        match (self.outcome, self.window) {
            (TransferOutcome::Success, Some(TransferWindow::Fast)) => format!(
                "fast transfer at {:.1}°, ΔV {:.2} pu (torque shock {:.0}% of limit)",
                self.angle_deg,
                self.delta_v_pu,
                self.torque_shock * 100.0
            ),
            (TransferOutcome::Success, _) => format!(
                "residual transfer at {:.2} pu bus voltage, ΔV {:.2} pu",
                self.residual_voltage_pu, self.delta_v_pu
            ),
            (TransferOutcome::Warning, _) => format!(
                "closure outside window at {:.1}°, ΔV {:.2} pu: motor shaft stressed ({:.0}% of limit)",
                self.angle_deg,
                self.delta_v_pu,
                self.torque_shock * 100.0
            ),
            (TransferOutcome::Failure, _) => format!(
                "out-of-phase closure at {:.1}°, ΔV {:.2} pu: severe torque shock ({:.0}% of limit)",
                self.angle_deg,
                self.delta_v_pu,
                self.torque_shock * 100.0
            ),
        }
    }
}

/// `ΔV = √(Es² + Er² − 2·Es·Er·cos θ)`.
pub fn vector_difference(source_pu: f64, residual_pu: f64, angle_deg: f64) -> f64 {
    let cos = angle_deg.to_radians().cos();
    let squared = source_pu * source_pu + residual_pu * residual_pu
        - 2.0 * source_pu * residual_pu * cos;
    // Rounding can push the in-phase case a hair below zero.
    squared.max(0.0).sqrt()
}

/// Grade a closure of the source onto a bus in `state`.
pub fn evaluate_transfer(state: &ElectricalState, limits: &SyncCheckLimits) -> TransferVerdict {
    let angle = state.phase_angle_deg;
    let residual = state.voltage_pu;
    let delta_v = vector_difference(limits.source_voltage_pu, residual, angle);
    let torque_shock = if limits.delta_v_limit_pu > 0.0 {
        delta_v / limits.delta_v_limit_pu
    } else {
        f64::INFINITY
    };

    let fast_ok = angle.abs() <= limits.fast_angle_limit_deg && delta_v < limits.delta_v_limit_pu;
    let residual_ok = residual < limits.residual_voltage_limit_pu;

    let (outcome, window) = if fast_ok {
        (TransferOutcome::Success, Some(TransferWindow::Fast))
    } else if residual_ok {
        (TransferOutcome::Success, Some(TransferWindow::Residual))
    } else if delta_v <= limits.delta_v_limit_pu + limits.warning_margin_pu {
        (TransferOutcome::Warning, None)
    } else {
        (TransferOutcome::Failure, None)
    };

    TransferVerdict {
        outcome,
        window,
        angle_deg: angle,
        residual_voltage_pu: residual,
        delta_v_pu: delta_v,
        torque_shock,
    }
}
