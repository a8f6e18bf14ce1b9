//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Projection of simulator state into screen-space draw commands.
//!
//! Nothing here touches a graphics API. A presentation layer replays the
//! returned [`DrawCommand`]s with whatever canvas it owns. Screen space has
//! its origin at the top-left corner with Y growing downwards.

use nalgebra::{Rotation2, Vector2};
use protlab_calc::{
    mho_center, restraint_threshold, DifferentialSettings, DifferentialVerdict, DistanceSettings,
    ElectricalState, ImpedancePoint, Prediction, Zone,
};
use serde::Serialize;

use crate::history::HistoryBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a command depicts; the presentation layer maps it to colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Axis,
    SourcePhasor,
    BusPhasor,
    GhostPhasor,
    ZoneCircle(Zone),
    FaultPoint,
    Trend,
    RestraintCurve,
    OperatingPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Line {
        from: Pixel,
        to: Pixel,
        layer: Layer,
    },
    Circle {
        center: Pixel,
        radius: f64,
        layer: Layer,
    },
    Polyline {
        points: Vec<Pixel>,
        layer: Layer,
    },
    Marker {
        at: Pixel,
        label: String,
        layer: Layer,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Pixel {
        Pixel::new(self.width / 2.0, self.height / 2.0)
    }
}

/// R-X plane with the origin at `origin` and `pixels_per_ohm` scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedancePlane {
    pub origin: Pixel,
    pub pixels_per_ohm: f64,
}

impl ImpedancePlane {
    /// `screen = (origin.x + r·s, origin.y − x·s)`
    pub fn to_pixel(&self, point: ImpedancePoint) -> Pixel {
        Pixel::new(
            self.origin.x + point.r_ohm * self.pixels_per_ohm,
            self.origin.y - point.x_ohm * self.pixels_per_ohm,
        )
    }

    pub fn axes(&self, viewport: &Viewport) -> Vec<DrawCommand> {
        vec![
            DrawCommand::Line {
                from: Pixel::new(0.0, self.origin.y),
                to: Pixel::new(viewport.width, self.origin.y),
                layer: Layer::Axis,
            },
            DrawCommand::Line {
                from: Pixel::new(self.origin.x, 0.0),
                to: Pixel::new(self.origin.x, viewport.height),
                layer: Layer::Axis,
            },
        ]
    }

    /// One circle per zone, outermost first so inner zones draw on top.
    pub fn zone_circles(&self, settings: &DistanceSettings) -> Vec<DrawCommand> {
        Zone::ALL
            .into_iter()
            .rev()
            .filter(|zone| settings.reach(*zone) > 0.0)
            .map(|zone| {
                let reach = settings.reach(zone);
                let center = mho_center(reach, settings.mta_deg);
                DrawCommand::Circle {
                    center: self.to_pixel(ImpedancePoint::new(center.x, center.y)),
                    radius: reach / 2.0 * self.pixels_per_ohm,
                    layer: Layer::ZoneCircle(zone),
                }
            })
            .collect()
    }

    pub fn fault_marker(&self, point: ImpedancePoint, label: impl Into<String>) -> DrawCommand {
        DrawCommand::Marker {
            at: self.to_pixel(point),
            label: label.into(),
            layer: Layer::FaultPoint,
        }
    }

    pub fn draw(
        &self,
        viewport: &Viewport,
        settings: &DistanceSettings,
        point: ImpedancePoint,
    ) -> Vec<DrawCommand> {
        let mut commands = self.axes(viewport);
        commands.extend(self.zone_circles(settings));
        commands.push(self.fault_marker(point, "Z"));
        commands
    }
}

/// Phasor diagram centred at `center` with vectors `length` pixels long at
/// 1.0 pu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasorDiagram {
    pub center: Pixel,
    pub length: f64,
}

impl PhasorDiagram {
    /// Tip of the reference vector at `angle_deg`: `(cx + L cos θ, cy − L sin θ)`.
    pub fn endpoint(&self, angle_deg: f64) -> Pixel {
        let theta = angle_deg.to_radians();
        Pixel::new(
            self.center.x + self.length * theta.cos(),
            self.center.y - self.length * theta.sin(),
        )
    }

    /// Tip of a vector of `magnitude_pu` rotated by `angle_deg` from the
    /// reference.
    pub fn rotated(&self, magnitude_pu: f64, angle_deg: f64) -> Pixel {
        let reference = Vector2::new(self.length * magnitude_pu, 0.0);
        let tip = Rotation2::new(angle_deg.to_radians()) * reference;
        Pixel::new(self.center.x + tip.x, self.center.y - tip.y)
    }

    /// Source reference, live bus vector and, while coasting, the ghost
    /// vector at the predicted closing angle.
    pub fn draw(&self, state: &ElectricalState, ghost: Option<&Prediction>) -> Vec<DrawCommand> {
        let mut commands = vec![
            DrawCommand::Line {
                from: self.center,
                to: self.endpoint(0.0),
                layer: Layer::SourcePhasor,
            },
            DrawCommand::Line {
                from: self.center,
                to: self.rotated(state.voltage_pu, state.phase_angle_deg),
                layer: Layer::BusPhasor,
            },
        ];
        if let Some(prediction) = ghost {
            commands.push(DrawCommand::Line {
                from: self.center,
                to: self.rotated(
                    prediction.state.voltage_pu,
                    prediction.state.phase_angle_deg,
                ),
                layer: Layer::GhostPhasor,
            });
        }
        commands
    }
}

/// Trend samples mapped across the full viewport.
///
/// Returns nothing for fewer than two samples. A flat series is drawn at
/// mid height.
pub fn trend_points(history: &HistoryBuffer, viewport: &Viewport) -> Vec<Pixel> {
    if history.len() < 2 {
        return Vec::new();
    }
    let Some((min, max)) = history.min_max() else {
        return Vec::new();
    };
    let span = max - min;
    let last = (history.capacity().max(2) - 1) as f64;
    history
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = i as f64 / last * viewport.width;
            let y = if span > 0.0 && value.is_finite() {
                viewport.height - (value - min) / span * viewport.height
            } else {
                viewport.height / 2.0
            };
            Pixel::new(x, y)
        })
        .collect()
}

pub fn trend_polyline(history: &HistoryBuffer, viewport: &Viewport) -> Option<DrawCommand> {
    let points = trend_points(history, viewport);
    if points.len() < 2 {
        return None;
    }
    Some(DrawCommand::Polyline {
        points,
        layer: Layer::Trend,
    })
}

/// Bias/differential plane for the percentage-restraint characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicPlot {
    pub viewport: Viewport,
    pub max_bias: f64,
    pub max_differential: f64,
}

impl CharacteristicPlot {
    pub fn to_pixel(&self, bias: f64, differential: f64) -> Pixel {
        let x = if self.max_bias > 0.0 {
            bias / self.max_bias * self.viewport.width
        } else {
            0.0
        };
        let y = if self.max_differential > 0.0 {
            self.viewport.height - differential / self.max_differential * self.viewport.height
        } else {
            self.viewport.height
        };
        Pixel::new(x, y)
    }

    pub fn draw(
        &self,
        settings: &DifferentialSettings,
        verdict: &DifferentialVerdict,
        samples: usize,
    ) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        if samples >= 2 && self.max_bias > 0.0 {
            let step = self.max_bias / (samples - 1) as f64;
            let points = (0..samples)
                .map(|i| {
                    let bias = step * i as f64;
                    self.to_pixel(bias, restraint_threshold(settings, bias))
                })
                .collect();
            commands.push(DrawCommand::Polyline {
                points,
                layer: Layer::RestraintCurve,
            });
        }
        commands.push(DrawCommand::Marker {
            at: self.to_pixel(verdict.point.bias, verdict.point.differential),
            label: verdict.outcome.to_string(),
            layer: Layer::OperatingPoint,
        });
        commands
    }
}
