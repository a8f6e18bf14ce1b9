//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Stateless numerics behind the protection simulators.
//!
//! Everything here is a pure function of its inputs: the classification
//! primitives decide trip/stable/blocked or transfer safety, the integrator
//! advances a coasting bus by one frame and the predictor projects the bus
//! angle over a breaker's closing time.

pub mod classify;
pub mod errors;
pub mod integrator;
pub mod model;
pub mod prediction;

pub use classify::differential::{
    classify_differential, operating_point, restraint_threshold, DifferentialOutcome,
    DifferentialVerdict, OperatingPoint,
};
pub use classify::mho::{classify_zone, mho_center, mho_contains};
pub use classify::sync_check::{
    evaluate_transfer, vector_difference, TransferOutcome, TransferVerdict, TransferWindow,
};
pub use errors::{CalcError, Result};
pub use integrator::{wrap_angle_deg, CoastDownIntegrator};
pub use model::{
    modulus, phasor, DifferentialInputs, DifferentialSettings, DistanceSettings, ElectricalState,
    ImpedancePoint, ScenarioParameters, SyncCheckLimits, Zone,
};
pub use prediction::{predict, project_angle, Prediction};

/// Lower bound substituted for time constants, inertia and load factors so the
/// decay laws never divide by zero.
pub const MIN_TIME_CONSTANT: f64 = 1e-6;
