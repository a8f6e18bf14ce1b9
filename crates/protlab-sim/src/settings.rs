//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Translation from the file-level configuration into calculation settings.

use protlab_calc::{DifferentialSettings, DistanceSettings, SyncCheckLimits};
use protlab_common::{BusTransferConfig, DifferentialConfig, DistanceConfig};

pub fn sync_check_limits(config: &BusTransferConfig) -> SyncCheckLimits {
    SyncCheckLimits {
        fast_angle_limit_deg: config.fast_angle_limit_deg,
        delta_v_limit_pu: config.delta_v_limit_pu,
        residual_voltage_limit_pu: config.residual_voltage_limit_pu,
        warning_margin_pu: config.warning_margin_pu,
        ..SyncCheckLimits::default()
    }
}

pub fn differential_settings(config: &DifferentialConfig) -> DifferentialSettings {
    DifferentialSettings {
        pickup: config.pickup,
        slope1: config.slope1,
        slope2: config.slope2,
        breakpoint: config.breakpoint,
        harmonic_block_threshold: config.harmonic_block_threshold,
    }
}

pub fn distance_settings(config: &DistanceConfig) -> DistanceSettings {
    DistanceSettings {
        reaches_ohm: [
            config.zone1_reach_ohm,
            config.zone2_reach_ohm,
            config.zone3_reach_ohm,
        ],
        mta_deg: config.mta_deg,
    }
}

/// Zone time steps in seconds, zone 1 always instantaneous.
pub fn zone_delays_secs(config: &DistanceConfig) -> [f64; 3] {
    [
        0.0,
        config.zone2_delay.as_secs_f64(),
        config.zone3_delay.as_secs_f64(),
    ]
}
