//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the simulation runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_file_logging() -> bool {
    true
}

fn default_nominal_frequency() -> f64 {
    60.0
}

fn default_history_capacity() -> usize {
    300
}

fn default_event_log_capacity() -> usize {
    50
}

fn default_frame_period() -> Duration {
    Duration::from_millis(16)
}

fn default_max_step() -> f64 {
    0.1
}

fn default_frequency_scaling() -> f64 {
    0.2
}

fn default_preset() -> String {
    "high-inertia".to_owned()
}

fn default_breaker_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_fast_angle_limit() -> f64 {
    25.0
}

fn default_delta_v_limit() -> f64 {
    1.33
}

fn default_residual_voltage_limit() -> f64 {
    0.25
}

fn default_warning_margin() -> f64 {
    0.20
}

fn default_zone2_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_zone3_delay() -> Duration {
    Duration::from_millis(1000)
}

/// Primary configuration object for the simulators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub bus_transfer: BusTransferConfig,
    #[serde(default)]
    pub differential: DifferentialConfig,
    #[serde(default)]
    pub distance: DistanceConfig,
    #[serde(default)]
    pub presets: PresetConfig,
}

/// Metadata describing where a [`LabConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedLabConfig {
    pub config: LabConfig,
    /// `None` when no file was found and in-memory defaults are in use.
    pub source: Option<PathBuf>,
}

impl LabConfig {
    pub const ENV_CONFIG_PATH: &'static str = "PROTLAB_CONFIG";

    /// Load configuration from disk, respecting the `PROTLAB_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = Self::load_with_source(candidates)?;
        Ok(loaded.config)
    }

    /// Load configuration from disk together with the effective source path.
    ///
    /// Fails when neither the environment override nor any candidate exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedLabConfig> {
        match Self::locate(candidates)? {
            Some(loaded) => Ok(loaded),
            None => Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Same as [`LabConfig::load_with_source`] but falls back to defaults
    /// when nothing is found. A file that exists but fails to parse is still
    /// an error.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedLabConfig> {
        Ok(Self::locate(candidates)?.unwrap_or_else(|| {
            debug!("no configuration file found, using built-in defaults");
            LoadedLabConfig {
                config: LabConfig::default(),
                source: None,
            }
        }))
    }

    fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedLabConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedLabConfig {
                    config,
                    source: Some(path),
                }));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedLabConfig {
                    config,
                    source: Some(path),
                }));
            }
        }
        Ok(None)
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<LabConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.bus_transfer.validate()?;
        self.differential.validate()?;
        self.distance.validate()?;
        for (name, preset) in &self.presets.custom {
            preset.validate(name)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for LabConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: LabConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    #[serde(default = "default_file_logging")]
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_enabled: default_file_logging(),
        }
    }
}

/// Shared knobs for every simulator instance.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid frequency the bus locks to when connected (50 or 60 Hz).
    #[serde(default = "default_nominal_frequency")]
    pub nominal_frequency_hz: f64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    #[serde(default = "default_frame_period", rename = "frame_period_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub frame_period: Duration,
    /// Upper bound applied to a single frame's `dt` in seconds.
    #[serde(default = "default_max_step")]
    pub max_step_secs: f64,
    /// Empirical scaling applied to the frequency decay exponent.
    #[serde(default = "default_frequency_scaling")]
    pub frequency_scaling: f64,
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nominal_frequency_hz: default_nominal_frequency(),
            history_capacity: default_history_capacity(),
            event_log_capacity: default_event_log_capacity(),
            frame_period: default_frame_period(),
            max_step_secs: default_max_step(),
            frequency_scaling: default_frequency_scaling(),
            default_preset: default_preset(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nominal_frequency_hz != 50.0 && self.nominal_frequency_hz != 60.0 {
            return Err(anyhow!(
                "simulation.nominal_frequency_hz must be 50 or 60, got {}",
                self.nominal_frequency_hz
            ));
        }
        if self.history_capacity < 2 {
            return Err(anyhow!("simulation.history_capacity must be at least 2"));
        }
        if self.event_log_capacity == 0 {
            return Err(anyhow!("simulation.event_log_capacity must be positive"));
        }
        if self.frame_period.is_zero() {
            return Err(anyhow!("simulation.frame_period_ms must be positive"));
        }
        if !(self.max_step_secs > 0.0) {
            return Err(anyhow!("simulation.max_step_secs must be positive"));
        }
        if !(self.frequency_scaling > 0.0) {
            return Err(anyhow!("simulation.frequency_scaling must be positive"));
        }
        Ok(())
    }
}

/// Breaker timing and synchronising limits for the fast bus transfer.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusTransferConfig {
    #[serde(default = "default_breaker_delay", rename = "breaker_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub breaker_delay: Duration,
    #[serde(default = "default_fast_angle_limit")]
    pub fast_angle_limit_deg: f64,
    #[serde(default = "default_delta_v_limit")]
    pub delta_v_limit_pu: f64,
    #[serde(default = "default_residual_voltage_limit")]
    pub residual_voltage_limit_pu: f64,
    #[serde(default = "default_warning_margin")]
    pub warning_margin_pu: f64,
    #[serde(default)]
    pub auto_transfer: bool,
}

impl Default for BusTransferConfig {
    fn default() -> Self {
        Self {
            breaker_delay: default_breaker_delay(),
            fast_angle_limit_deg: default_fast_angle_limit(),
            delta_v_limit_pu: default_delta_v_limit(),
            residual_voltage_limit_pu: default_residual_voltage_limit(),
            warning_margin_pu: default_warning_margin(),
            auto_transfer: false,
        }
    }
}

impl BusTransferConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.fast_angle_limit_deg > 0.0 && self.fast_angle_limit_deg <= 180.0) {
            return Err(anyhow!(
                "bus_transfer.fast_angle_limit_deg must be within (0, 180]"
            ));
        }
        if !(self.delta_v_limit_pu > 0.0) || !(self.residual_voltage_limit_pu > 0.0) {
            return Err(anyhow!("bus_transfer voltage limits must be positive"));
        }
        if self.warning_margin_pu < 0.0 {
            return Err(anyhow!("bus_transfer.warning_margin_pu must not be negative"));
        }
        Ok(())
    }
}

/// Default percentage-restraint settings; slopes are fractions (0.3 == 30 %).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialConfig {
    pub pickup: f64,
    pub slope1: f64,
    pub slope2: f64,
    pub breakpoint: f64,
    pub harmonic_block_threshold: f64,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        Self {
            pickup: 0.3,
            slope1: 0.3,
            slope2: 0.7,
            breakpoint: 2.0,
            harmonic_block_threshold: 0.15,
        }
    }
}

impl DifferentialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pickup < 0.0 || self.slope1 < 0.0 || self.slope2 < 0.0 || self.breakpoint < 0.0 {
            return Err(anyhow!("differential settings must not be negative"));
        }
        Ok(())
    }
}

/// Default Mho zone reaches (ohms) and time steps.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub zone1_reach_ohm: f64,
    pub zone2_reach_ohm: f64,
    pub zone3_reach_ohm: f64,
    pub mta_deg: f64,
    #[serde(default = "default_zone2_delay", rename = "zone2_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub zone2_delay: Duration,
    #[serde(default = "default_zone3_delay", rename = "zone3_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub zone3_delay: Duration,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            zone1_reach_ohm: 8.0,
            zone2_reach_ohm: 12.0,
            zone3_reach_ohm: 20.0,
            mta_deg: 75.0,
            zone2_delay: default_zone2_delay(),
            zone3_delay: default_zone3_delay(),
        }
    }
}

impl DistanceConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.zone1_reach_ohm < self.zone2_reach_ohm
            && self.zone2_reach_ohm < self.zone3_reach_ohm)
        {
            return Err(anyhow!(
                "distance zone reaches must increase from zone 1 to zone 3"
            ));
        }
        if self.zone1_reach_ohm <= 0.0 {
            return Err(anyhow!("distance.zone1_reach_ohm must be positive"));
        }
        Ok(())
    }
}

/// Scenario preset catalog sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetConfig {
    /// Optional YAML/JSON file with additional scenario presets.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Presets declared inline in the configuration file.
    #[serde(default)]
    pub custom: IndexMap<String, ScenarioPresetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPresetConfig {
    #[serde(default)]
    pub description: Option<String>,
    pub inertia_constant: f64,
    pub decay_constant: f64,
    pub load_factor: f64,
}

impl ScenarioPresetConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        if !(self.inertia_constant > 0.0 && self.decay_constant > 0.0 && self.load_factor > 0.0) {
            return Err(anyhow!(
                "preset '{}' must have positive inertia, decay and load factor",
                name
            ));
        }
        Ok(())
    }
}
