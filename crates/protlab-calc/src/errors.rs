//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcError>;

/// Rejections raised when validating settings bundles.
///
/// The classification functions themselves never fail; validation exists so
/// presets and configuration files can be checked before they reach a
/// simulator.
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    NegativeSetting { field: &'static str, value: f64 },
    #[error("{field} must be strictly positive (got {value})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("zone reaches must increase: zone 1 {zone1} ohm, zone 2 {zone2} ohm, zone 3 {zone3} ohm")]
    NonNestedZones { zone1: f64, zone2: f64, zone3: f64 },
}
