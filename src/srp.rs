//! Solar radiation pressure, including eclipse shadowing.
//!
//! `a_SRP = -ecl * p_sun * AU^2 * c / |r_sat - r_sun|^2 * direction`, where
//! `direction` is the unit vector from the Sun toward the satellite and `c`
//! is an effective reflectivity-weighted cross-section divided by mass
//! (units m^2/kg, folded into the caller's state-7 coefficient). `p_sun` is
//! the solar radiation pressure at one AU, W/m^2 converted to the usual
//! force-per-area constant via `/c_light`.

use crate::harmonics::AU;
use nalgebra::Vector3;

/// Solar constant at 1 AU, N/m^2 (solar irradiance 1361 W/m^2 divided by the
/// speed of light).
pub const SOLAR_PRESSURE_AT_1AU: f64 = 4.5605e-6;

/// Sun's apparent angular radius, rad, at one AU (used for the shadow cone).
const SUN_ANGULAR_RADIUS: f64 = 4.6524e-3;

/// Earth's mean radius, m, used for the shadow cone.
const EARTH_RADIUS: f64 = 6_371_000.0;

/// Eclipse coefficient: 0 (umbra), 0.5 (penumbra) or 1 (sunlit).
///
/// Works in a frame whose axes are arbitrary but common to `p_sat` and
/// `p_sun` (GRW Cartesian, as produced by [`crate::thirdbody::sun_position_grw`]).
/// The satellite is shadowed only when it lies on the night side of Earth
/// (`p_sat . p_sun < 0`); the shadow cone half-angle is computed from the
/// Sun's and Earth's angular radii as seen from the satellite.
pub fn eclipse_coefficient(p_sat: &Vector3<f64>, p_sun: &Vector3<f64>) -> f64 {
    let along_sun = p_sat.dot(p_sun) / p_sun.norm();
    if along_sun >= 0.0 {
        return 1.0;
    }
    let perp = (p_sat - along_sun * p_sun / p_sun.norm()).norm();
    let shadow_dist = -along_sun;
    let earth_angular_radius = (EARTH_RADIUS / shadow_dist).asin();
    let sun_angular_radius_here = SUN_ANGULAR_RADIUS;

    if perp >= earth_angular_radius * shadow_dist + sun_angular_radius_here * shadow_dist {
        1.0
    } else if perp <= (earth_angular_radius - sun_angular_radius_here).max(0.0) * shadow_dist {
        0.0
    } else {
        0.5
    }
}

/// Solar radiation pressure acceleration on a satellite at `p_sat`, with the
/// Sun at `p_sun` (same frame, metres), using effective cross-section-over-mass
/// `c` (m^2/kg).
pub fn acceleration(p_sat: &Vector3<f64>, p_sun: &Vector3<f64>, c: f64) -> Vector3<f64> {
    let ecl = eclipse_coefficient(p_sat, p_sun);
    if ecl == 0.0 {
        return Vector3::zeros();
    }
    let rel = p_sat - p_sun;
    let d2 = rel.norm_squared();
    let direction = rel / rel.norm();
    -ecl * SOLAR_PRESSURE_AT_1AU * AU * AU * c / d2 * direction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sunlit_when_along_sun_direction() {
        let p_sun = Vector3::new(AU, 0.0, 0.0);
        let p_sat = Vector3::new(7_000_000.0, 0.0, 0.0);
        assert_eq!(eclipse_coefficient(&p_sat, &p_sun), 1.0);
    }

    #[test]
    fn test_umbra_directly_behind_earth() {
        let p_sun = Vector3::new(AU, 0.0, 0.0);
        let p_sat = Vector3::new(-7_000_000.0, 0.0, 0.0);
        assert_eq!(eclipse_coefficient(&p_sat, &p_sun), 0.0);
    }

    #[test]
    fn test_acceleration_zero_in_umbra() {
        let p_sun = Vector3::new(AU, 0.0, 0.0);
        let p_sat = Vector3::new(-7_000_000.0, 0.0, 0.0);
        let a = acceleration(&p_sat, &p_sun, 0.02);
        assert_eq!(a, Vector3::zeros());
    }

    #[test]
    fn test_acceleration_points_away_from_sun_when_sunlit() {
        let p_sun = Vector3::new(AU, 0.0, 0.0);
        let p_sat = Vector3::new(7_000_000.0, 0.0, 0.0);
        let a = acceleration(&p_sat, &p_sun, 0.02);
        assert!(a.x > 0.0);
    }
}
