//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Protection decision rules. Each is total: out-of-range input yields a
//! classification, never a panic.

pub mod differential;
pub mod mho;
pub mod sync_check;
