//! Sun/Moon analytic ephemerides and third-body point-mass attraction.
//!
//! The Sun and Moon positions are low-precision analytic series in Julian
//! centuries since J2000 (arcsecond polynomials plus a handful of periodic
//! terms), self-contained so the force model never needs an external
//! ephemeris binding. Accuracy is on the order of an arcminute, well inside
//! the noise floor of the angular measurements this crate fits against.

use crate::frames::{abs_sph_to_grw_ort, ecl_to_abs, fit_to_round};
use crate::harmonics::{AU, MOON_MU, SUN_MU};
use crate::sidereal::sidereal_time;
use crate::time::Instant;
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

const SEC_PER_ROUND: f64 = 1_296_000.0;

fn sec_to_rad(s: f64) -> f64 {
    s * (PI / 648_000.0)
}

/// Mean obliquity of the ecliptic at Julian centuries `jc` since J2000, rad.
pub fn mean_obliquity(jc: f64) -> f64 {
    sec_to_rad(84_381.448 - (46.815 + (0.00059 - 0.001813 * jc) * jc) * jc)
}

/// Sun's position in the ABS spherical frame `(r, declination, right ascension)`.
///
/// Port of the solar longitude/distance series: mean longitude, perigee
/// longitude, eccentricity and nutation-in-longitude all evaluated as
/// polynomials in `jc`, then converted to equatorial coordinates via the
/// obliquity and corrected for nutation and aberration.
pub fn sun_position_abs_sph(t: Instant) -> Vector3<f64> {
    let jc = t.jc2000();
    let l = sec_to_rad(1_009_677.85 + (100.0 * SEC_PER_ROUND + 2_771.27 + 1.089 * jc) * jc);
    let lc = sec_to_rad(1_018_578.046 + (6_190.046 + (1.666 + 0.012 * jc) * jc) * jc);
    let e = 0.0167086342 - (0.000004203654 + (0.00000012673 + 0.00000000014 * jc) * jc) * jc;
    let ecl = mean_obliquity(jc);
    let omega = sec_to_rad(450_160.280 - (5.0 * SEC_PER_ROUND + 482_890.539 - (7.455 + 0.008 * jc) * jc) * jc);
    let psi = sec_to_rad(-17.1996 * omega.sin());

    let longitude = l + 2.0 * e * (l - lc).sin() + 1.25 * e * e * (2.0 * (l - lc)).sin();
    let (sinl, cosl) = longitude.sin_cos();
    let (sine, cose) = ecl.sin_cos();

    let mut dec = (sinl * sine / (cosl * cosl + sinl * sinl * cose * cose).sqrt()).atan();
    let mut ra = (sinl / cosl * cose).atan();
    if dec * ra < 0.0 {
        ra += PI;
    }

    const AC: f64 = 1.4959787e11;
    let cosllc = (l - lc).cos();
    let r = AC * (1.0 - e * (cosllc - e * 0.25 * (1.0 - cosllc)));

    let hi = sec_to_rad(20.49552);
    ra += 0.061165 * psi - hi;
    dec += hi * sine * cosl;

    Vector3::new(r, dec, ra)
}

/// Sun's position in GRW Cartesian metres.
pub fn sun_position_grw(t: Instant) -> Vector3<f64> {
    abs_sph_to_grw_ort(&sun_position_abs_sph(t), sidereal_time(t))
}

/// Moon's position in ABS spherical `(r, declination, right ascension)`.
///
/// Port of the lunar ecliptic latitude/longitude/parallax series, followed
/// by the ecliptic-to-equatorial rotation the original left unfinished.
pub fn moon_position_abs_sph(t: Instant) -> Vector3<f64> {
    let jc = t.jc2000();
    let r_eq = 6_378_136.0_f64;
    let la = sec_to_rad(485_866.733 + (1_325.0 * SEC_PER_ROUND + 715_922.633 + (31.31 + 0.064 * jc) * jc) * jc);
    let sa = sec_to_rad(1_287_099.804 + (99.0 * SEC_PER_ROUND + 1_292_581.224 - (0.577 + 0.012 * jc) * jc) * jc);
    let f = sec_to_rad(335_778.877 + (1_342.0 * SEC_PER_ROUND + 295_263.137 - (13.257 - 0.011 * jc) * jc) * jc);
    let d = sec_to_rad(1_072_261.307 + (1_236.0 * SEC_PER_ROUND + 1_105_601.328 - (6.891 - 0.019 * jc) * jc) * jc);

    let lat = sec_to_rad(
        18_461.48 * f.sin() + 1_010.18 * (la + f).sin() - 999.69 * (f - la).sin()
            - 623.65 * (f - 2.0 * d).sin()
            + 199.48 * (f + 2.0 * d - la).sin()
            - 166.57 * (la + f - 2.0 * d).sin()
            + 117.26 * (f + 2.0 * d).sin()
            + 61.91 * (2.0 * la + f).sin()
            - 33.35 * (f - 2.0 * d - la).sin()
            - 31.76 * (f - 2.0 * la).sin()
            - 29.68 * (sa + f - 2.0 * d).sin()
            + 15.125 * (la + f + 2.0 * d).sin()
            - 15.56 * (2.0 * (la - d) + f).sin(),
    );

    let mut lon = sec_to_rad(
        785_939.157 + (1_336.0 * SEC_PER_ROUND + 1_108_372.598 + (5.802 + 0.019 * jc) * jc) * jc
            + 22_639.5 * la.sin()
            - 4_586.42 * (la - 2.0 * d).sin()
            + 2_369.9 * (2.0 * d).sin()
            + 769.01 * (2.0 * la).sin()
            - 668.11 * sa.sin()
            - 411.6 * (2.0 * f).sin()
            - 211.65 * (2.0 * (la - d)).sin()
            - 205.96 * (la + sa - 2.0 * d).sin()
            + 191.95 * (la + 2.0 * d).sin()
            - 165.14 * (sa - 2.0 * d).sin()
            + 147.69 * (la - sa).sin()
            - 125.15 * d.sin()
            - 109.66 * (la + sa).sin()
            - 55.17 * (2.0 * (f - d)).sin()
            - 45.1 * (sa + 2.0 * f).sin()
            + 39.53 * (la - 2.0 * f).sin()
            - 38.42 * (la - 4.0 * d).sin()
            + 36.12 * (3.0 * la).sin()
            - 30.77 * (2.0 * la - 4.0 * d).sin()
            + 28.47 * (la - sa - 2.0 * d).sin()
            - 24.42 * (sa + 2.0 * d).sin()
            + 18.6 * (la - d).sin()
            + 18.02 * (sa - d).sin(),
    );
    lon = fit_to_round(lon);

    let parallax = sec_to_rad(
        3_422.7
            + 186.539 * la.cos()
            + 34.311 * (la - 2.0 * d).cos()
            + 28.233 * (2.0 * d).cos()
            + 10.165 * (2.0 * la).cos()
            + 3.086 * (la + 2.0 * d).cos()
            + 1.92 * (sa - 2.0 * d).cos()
            + 1.445 * (la + sa - 2.0 * d).cos()
            + 1.154 * (la - sa).cos()
            - 0.975 * d.cos()
            - 0.95 * (la + sa).cos()
            - 0.713 * (la - 2.0 * f).cos()
            + 0.6215 * (3.0 * la).cos()
            + 0.601 * (la - 4.0 * d).cos(),
    );
    let r = r_eq / parallax;
    let ecl = mean_obliquity(jc);

    let ecl_ort = Vector3::new(r * lon.cos() * lat.cos(), r * lon.sin() * lat.cos(), r * lat.sin());
    let abs_ort = ecl_to_abs(&ecl_ort, ecl);
    crate::frames::ort_to_sph(&abs_ort)
}

/// Moon's position in GRW Cartesian metres.
pub fn moon_position_grw(t: Instant) -> Vector3<f64> {
    abs_sph_to_grw_ort(&moon_position_abs_sph(t), sidereal_time(t))
}

/// Third-body point-mass attraction: `a = mu * ((m - p) / |m - p|^3 - m / |m|^3)`.
pub fn third_body_acceleration(p: &Vector3<f64>, body: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let rel = body - p;
    let d3 = rel.norm().powi(3);
    let b3 = body.norm().powi(3);
    mu * (rel / d3 - body / b3)
}

/// `d(a)/d(p)` of [`third_body_acceleration`], the 3x3 sensitivity used by the
/// variational propagator.
pub fn third_body_jacobian(p: &Vector3<f64>, body: &Vector3<f64>, mu: f64) -> Matrix3<f64> {
    let rel = body - p;
    let d = rel.norm();
    let d3 = d.powi(3);
    let d5 = d.powi(5);
    let identity = Matrix3::identity();
    mu * (3.0 * (rel * rel.transpose()) / d5 - identity / d3)
}

/// Sun gravitational acceleration at `p` (GRW Cartesian), at instant `t`.
pub fn sun_acceleration(p: &Vector3<f64>, t: Instant) -> Vector3<f64> {
    third_body_acceleration(p, &sun_position_grw(t), SUN_MU)
}

/// Moon gravitational acceleration at `p` (GRW Cartesian), at instant `t`.
pub fn moon_acceleration(p: &Vector3<f64>, t: Instant) -> Vector3<f64> {
    third_body_acceleration(p, &moon_position_grw(t), MOON_MU)
}

/// Astronomical unit, m; re-exported here since Sun-distance checks (eclipse,
/// SRP) are most naturally expressed alongside the ephemerides that consume it.
pub const ASTRONOMICAL_UNIT: f64 = AU;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sun_distance_near_one_au() {
        let t = Instant::from_datetime(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap());
        let sph = sun_position_abs_sph(t);
        assert_relative_eq!(sph.x, AU, max_relative = 0.02);
    }

    #[test]
    fn test_third_body_jacobian_symmetric() {
        let p = Vector3::new(7_000_000.0, 0.0, 0.0);
        let body = Vector3::new(1.5e11, 0.0, 0.0);
        let j = third_body_jacobian(&p, &body, SUN_MU);
        assert_relative_eq!(j, j.transpose(), epsilon = 1e-6);
    }

    #[test]
    fn test_moon_position_reasonable_distance() {
        let t = Instant::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let sph = moon_position_abs_sph(t);
        assert!(sph.x > 3.5e8 && sph.x < 4.1e8);
    }
}
