//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime module exports and shared types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Frame-driven protection simulators for the Protection Lab project.
//!
//! Each simulator owns its state outright and advances only through
//! `tick(dt)`, so it can be driven by [`frame_loop::FrameLoop`] in real time
//! or stepped deterministically from tests and the trace generator.

pub mod bus_transfer;
pub mod differential;
pub mod distance;
pub mod errors;
pub mod event_log;
pub mod frame_loop;
pub mod history;
pub mod presets;
pub mod render;
pub mod settings;
pub mod timer;

pub use bus_transfer::{
    BreakerStatus, BusTransferOptions, BusTransferSimulator, BusTransferSnapshot,
    OperationalPhase,
};
pub use differential::{
    characteristic_curve, DifferentialScenario, DifferentialSimulator, DifferentialSnapshot,
};
pub use distance::{
    classify_distance, DistanceOutcome, DistanceSimulator, DistanceVerdict, FaultInput, LineModel,
    LOAD_POINT,
};
pub use errors::{Result, SimError};
pub use event_log::{EventLog, EventLogEntry, Severity};
pub use frame_loop::{FrameLoop, FrameLoopHandle, FrameLoopOptions, SharedSimulator, Simulator};
pub use history::HistoryBuffer;
pub use presets::{PresetCatalog, ScenarioPreset};
pub use render::{
    trend_points, trend_polyline, CharacteristicPlot, DrawCommand, ImpedancePlane, Layer,
    PhasorDiagram, Pixel, Viewport,
};
pub use timer::{TimerHandle, TimerQueue};
