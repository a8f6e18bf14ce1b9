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

use nalgebra::{Complex, Vector2};
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, Result};

/// Bus quantities tracked by the coast-down integrator.
///
/// `phase_angle_deg` is measured against the incoming source and is kept in
/// `(-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricalState {
    pub voltage_pu: f64,
    pub frequency_hz: f64,
    pub phase_angle_deg: f64,
}

impl ElectricalState {
    /// Grid-locked bus: 1.0 pu, nominal frequency, in phase with the source.
    pub fn nominal(nominal_frequency_hz: f64) -> Self {
        Self {
            voltage_pu: 1.0,
            frequency_hz: nominal_frequency_hz,
            phase_angle_deg: 0.0,
        }
    }

    /// Difference between the nominal frequency and the bus frequency.
    pub fn slip_hz(&self, nominal_frequency_hz: f64) -> f64 {
        nominal_frequency_hz - self.frequency_hz
    }
}

/// Motor-bus constants for one coast-down run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Inertia constant `H` in seconds.
    pub inertia_constant: f64,
    /// Residual voltage decay constant `τ` in seconds.
    pub decay_constant: f64,
    /// Connected load relative to rated; scales both decay rates.
    pub load_factor: f64,
}

impl ScenarioParameters {
    pub fn validate(&self) -> Result<()> {
        positive("inertia_constant", self.inertia_constant)?;
        positive("decay_constant", self.decay_constant)?;
        positive("load_factor", self.load_factor)?;
        Ok(())
    }
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            inertia_constant: 3.5,
            decay_constant: 2.5,
            load_factor: 1.0,
        }
    }
}

/// Synchronising limits applied when closing onto a coasting bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncCheckLimits {
    /// Source-side voltage `Es` in pu.
    pub source_voltage_pu: f64,
    pub fast_angle_limit_deg: f64,
    pub delta_v_limit_pu: f64,
    pub residual_voltage_limit_pu: f64,
    /// Band above `delta_v_limit_pu` still graded as a warning.
    pub warning_margin_pu: f64,
}

impl Default for SyncCheckLimits {
    fn default() -> Self {
        Self {
            source_voltage_pu: 1.0,
            fast_angle_limit_deg: 25.0,
            delta_v_limit_pu: 1.33,
            residual_voltage_limit_pu: 0.25,
            warning_margin_pu: 0.20,
        }
    }
}

/// Percentage-restraint settings. Slopes are fractions: `0.3` is 30 %.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialSettings {
    pub pickup: f64,
    pub slope1: f64,
    pub slope2: f64,
    pub breakpoint: f64,
    /// Second-harmonic ratio above which tripping is blocked.
    pub harmonic_block_threshold: f64,
}

impl Default for DifferentialSettings {
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

impl DifferentialSettings {
    pub fn validate(&self) -> Result<()> {
        non_negative("pickup", self.pickup)?;
        non_negative("slope1", self.slope1)?;
        non_negative("slope2", self.slope2)?;
        non_negative("breakpoint", self.breakpoint)?;
        non_negative("harmonic_block_threshold", self.harmonic_block_threshold)?;
        Ok(())
    }
}

/// Measured quantities fed to the differential element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialInputs {
    /// Current magnitude entering the protected zone, pu.
    pub i1_pu: f64,
    /// Current magnitude at the far terminal, pu.
    pub i2_pu: f64,
    /// Angle of `I2` relative to `I1`. 180° is a through current.
    pub angle_deg: f64,
    /// Second-harmonic content relative to fundamental.
    pub harmonic_ratio: f64,
}

impl Default for DifferentialInputs {
    fn default() -> Self {
        Self {
            i1_pu: 1.0,
            i2_pu: 1.0,
            angle_deg: 180.0,
            harmonic_ratio: 0.0,
        }
    }
}

impl DifferentialInputs {
    pub fn i1_phasor(&self) -> Complex<f64> {
        Complex::new(self.i1_pu, 0.0)
    }

    pub fn i2_phasor(&self) -> Complex<f64> {
        phasor(self.i2_pu, self.angle_deg)
    }
}

/// Phasor of `magnitude` at `angle_deg`.
pub fn phasor(magnitude: f64, angle_deg: f64) -> Complex<f64> {
    let angle = angle_deg.to_radians();
    Complex::new(magnitude * angle.cos(), magnitude * angle.sin())
}

/// Magnitude of a phasor.
pub fn modulus(z: Complex<f64>) -> f64 {
    z.re.hypot(z.im)
}

/// Distance element zone tag. Ordered by reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    Zone1,
    Zone2,
    Zone3,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Zone1, Zone::Zone2, Zone::Zone3];

    pub fn index(&self) -> usize {
        match self {
            Zone::Zone1 => 0,
            Zone::Zone2 => 1,
            Zone::Zone3 => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Zone1 => "Z1",
            Zone::Zone2 => "Z2",
            Zone::Zone3 => "Z3",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mho zone reaches (ohms) and the maximum torque angle shared by all zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSettings {
    pub reaches_ohm: [f64; 3],
    pub mta_deg: f64,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            reaches_ohm: [8.0, 12.0, 20.0],
            mta_deg: 75.0,
        }
    }
}

impl DistanceSettings {
    pub fn reach(&self, zone: Zone) -> f64 {
        self.reaches_ohm[zone.index()]
    }

    pub fn validate(&self) -> Result<()> {
        let [zone1, zone2, zone3] = self.reaches_ohm;
        positive("zone1_reach", zone1)?;
        if !(zone1 < zone2 && zone2 < zone3) {
            return Err(CalcError::NonNestedZones {
                zone1,
                zone2,
                zone3,
            });
        }
        Ok(())
    }
}

/// Apparent impedance seen by the relay, in ohms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpedancePoint {
    pub r_ohm: f64,
    pub x_ohm: f64,
}

impl ImpedancePoint {
    pub fn new(r_ohm: f64, x_ohm: f64) -> Self {
        Self { r_ohm, x_ohm }
    }

    pub fn from_complex(z: Complex<f64>) -> Self {
        Self::new(z.re, z.im)
    }

    pub fn as_complex(&self) -> Complex<f64> {
        Complex::new(self.r_ohm, self.x_ohm)
    }

    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.r_ohm, self.x_ohm)
    }

    pub fn magnitude(&self) -> f64 {
        self.as_vector().norm()
    }

    pub fn angle_deg(&self) -> f64 {
        self.x_ohm.atan2(self.r_ohm).to_degrees()
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CalcError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CalcError::NegativeSetting { field, value })
    }
}
