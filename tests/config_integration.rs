//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration and validation tests for the Protection Lab simulators."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use protlab_calc::ElectricalState;
use protlab_common::config::LabConfig;
use protlab_sim::{
    BusTransferSimulator, DifferentialSimulator, DistanceSimulator, PresetCatalog,
};
use tempfile::tempdir;

#[test]
fn simulators_follow_a_config_file() -> Result<()> {
    let dir = tempdir()?;
    let catalog_path = dir.path().join("presets.yaml");
    fs::write(
        &catalog_path,
        "- name: boiler-feed\n  inertia_constant: 2.0\n  decay_constant: 1.5\n  load_factor: 1.0\n",
    )?;
    let config_path = dir.path().join("protlab.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[simulation]
nominal_frequency_hz = 50.0
default_preset = "pump-house"
history_capacity = 120

[bus_transfer]
breaker_delay_ms = 80

[differential]
pickup = 0.25

[distance]
zone1_reach_ohm = 6.0
zone2_delay_ms = 250

[presets]
catalog = "{}"

[presets.custom.pump-house]
description = "Station service pumps"
inertia_constant = 0.8
decay_constant = 0.9
load_factor = 1.2
"#,
            catalog_path.display()
        ),
    )?;

    let loaded = LabConfig::load_with_source(&[config_path.clone()])?;
    assert_eq!(loaded.source.as_deref(), Some(config_path.as_path()));
    let config = loaded.config;

    let catalog = PresetCatalog::from_config(&config.presets)?;
    assert!(catalog.contains("high-inertia"));
    assert!(catalog.contains("boiler-feed"));
    assert_eq!(catalog.get("pump-house")?.parameters.inertia_constant, 0.8);

    let transfer = BusTransferSimulator::from_config(&config, &catalog)?;
    assert_eq!(*transfer.state(), ElectricalState::nominal(50.0));
    assert_eq!(transfer.preset().name, "pump-house");
    assert_eq!(transfer.options().breaker_delay, Duration::from_millis(80));
    assert_eq!(transfer.voltage_history().capacity(), 120);

    let differential = DifferentialSimulator::from_config(&config);
    assert_eq!(differential.settings().pickup, 0.25);
    assert_eq!(differential.settings().slope2, 0.7);

    let distance = DistanceSimulator::from_config(&config)?;
    assert_eq!(distance.settings().reaches_ohm, [6.0, 12.0, 20.0]);
    assert_eq!(distance.zone_delays_secs(), [0.0, 0.25, 1.0]);
    Ok(())
}

#[test]
fn unknown_default_preset_is_rejected() -> Result<()> {
    let config: LabConfig = "[simulation]\ndefault_preset = \"missing\"\n".parse()?;
    let catalog = PresetCatalog::from_config(&config.presets)?;
    let err = BusTransferSimulator::from_config(&config, &catalog).unwrap_err();
    assert!(err.to_string().contains("missing"));
    Ok(())
}

#[test]
fn shipped_reference_config_is_valid() -> Result<()> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    let contents = fs::read_to_string(root.join("config/protlab.toml"))?;
    let mut config: LabConfig = contents.parse()?;
    config.presets.catalog = config.presets.catalog.map(|path| root.join(path));

    let catalog = PresetCatalog::from_config(&config.presets)?;
    assert!(catalog.contains("pump-station"));
    assert!(catalog.contains("induced-draft-fans"));

    let transfer = BusTransferSimulator::from_config(&config, &catalog)?;
    assert_eq!(transfer.preset().name, "high-inertia");
    assert_eq!(transfer.options().breaker_delay, Duration::from_millis(100));
    DistanceSimulator::from_config(&config)?;
    Ok(())
}
