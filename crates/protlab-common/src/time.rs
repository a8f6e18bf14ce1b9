//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

/// Convert a measured frame interval into an integration step in seconds,
/// capped at `max_step_secs`. Non-finite or non-positive caps disable the cap.
pub fn frame_step_secs(elapsed: Duration, max_step_secs: f64) -> f64 {
    let dt = elapsed.as_secs_f64();
    if max_step_secs.is_finite() && max_step_secs > 0.0 {
        dt.min(max_step_secs)
    } else {
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_step_is_capped() {
        assert_eq!(frame_step_secs(Duration::from_millis(500), 0.1), 0.1);
        assert!((frame_step_secs(Duration::from_millis(16), 0.1) - 0.016).abs() < 1e-12);
        assert_eq!(frame_step_secs(Duration::from_secs(2), 0.0), 2.0);
    }
}
