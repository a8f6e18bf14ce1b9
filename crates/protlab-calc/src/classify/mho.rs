//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Protection numerics and coast-down physics."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use nalgebra::Vector2;

use crate::model::{DistanceSettings, ImpedancePoint, Zone};

/// Centre of a Mho circle of the given reach. The circle passes through the
/// origin and its diameter lies along the maximum torque angle.
pub fn mho_center(reach_ohm: f64, mta_deg: f64) -> Vector2<f64> {
    let half = reach_ohm / 2.0;
    let mta = mta_deg.to_radians();
    Vector2::new(half * mta.cos(), half * mta.sin())
}

/// `true` when `point` lies on or inside the Mho circle.
///
/// Non-positive or non-finite reaches describe an empty characteristic.
pub fn mho_contains(reach_ohm: f64, mta_deg: f64, point: ImpedancePoint) -> bool {
    if !(reach_ohm.is_finite() && reach_ohm > 0.0) {
        return false;
    }
    let radius = reach_ohm / 2.0;
    let distance = (point.as_vector() - mho_center(reach_ohm, mta_deg)).norm();
    distance <= radius
}

/// Smallest zone whose circle contains `point`. Zone 1 is checked first, so a
/// point inside several nested circles reports the shortest reach.
pub fn classify_zone(settings: &DistanceSettings, point: ImpedancePoint) -> Option<Zone> {
    Zone::ALL
        .into_iter()
        .find(|zone| mho_contains(settings.reach(*zone), settings.mta_deg, point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_point_inside_eight_ohm_reach() {
        assert!(mho_contains(8.0, 75.0, ImpedancePoint::new(2.0, 3.0)));
    }

    #[test]
    fn reference_point_outside_one_ohm_reach() {
        assert!(!mho_contains(1.0, 75.0, ImpedancePoint::new(2.0, 3.0)));
    }

    #[test]
    fn both_ends_of_the_diameter_are_covered() {
        let near_origin = ImpedancePoint::new(
            0.01 * 75f64.to_radians().cos(),
            0.01 * 75f64.to_radians().sin(),
        );
        assert!(mho_contains(10.0, 75.0, near_origin));
        let tip = ImpedancePoint::new(
            10.0 * 75f64.to_radians().cos() * 0.999,
            10.0 * 75f64.to_radians().sin() * 0.999,
        );
        assert!(mho_contains(10.0, 75.0, tip));
    }

    #[test]
    fn reverse_faults_are_outside() {
        assert!(!mho_contains(10.0, 75.0, ImpedancePoint::new(-1.0, -2.0)));
    }

    #[test]
    fn degenerate_reach_contains_nothing() {
        assert!(!mho_contains(0.0, 75.0, ImpedancePoint::new(0.0, 0.0)));
        assert!(!mho_contains(-5.0, 75.0, ImpedancePoint::new(-1.0, -1.0)));
        assert!(!mho_contains(f64::NAN, 75.0, ImpedancePoint::new(1.0, 1.0)));
    }

    #[test]
    fn nested_zones_report_first_match() {
        let settings = DistanceSettings::default();
        assert_eq!(
            classify_zone(&settings, ImpedancePoint::new(2.0, 3.0)),
            Some(Zone::Zone1)
        );
        // 10 ohm along the MTA: outside the 8 ohm zone 1, inside zone 2.
        let along_mta = ImpedancePoint::new(
            10.0 * 75f64.to_radians().cos(),
            10.0 * 75f64.to_radians().sin(),
        );
        assert_eq!(classify_zone(&settings, along_mta), Some(Zone::Zone2));
        let far = ImpedancePoint::new(
            15.0 * 75f64.to_radians().cos(),
            15.0 * 75f64.to_radians().sin(),
        );
        assert_eq!(classify_zone(&settings, far), Some(Zone::Zone3));
        assert_eq!(classify_zone(&settings, ImpedancePoint::new(30.0, 0.0)), None);
    }
}
