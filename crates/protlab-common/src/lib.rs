//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Core shared primitives for the Protection Lab workspace.
//! This crate exposes configuration loading, tracing setup, frame timing
//! and version metadata utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod time;
pub mod version;

pub use config::{
    BusTransferConfig, DifferentialConfig, DistanceConfig, LabConfig, LoadedLabConfig,
    LoggingConfig, PresetConfig, SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use metrics::{FrameTimingReporter, JitterHistogram, JitterSummary, DEFAULT_JITTER_WINDOW};
