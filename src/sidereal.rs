//! Earth rotation angle between the inertial and Earth-fixed frames.
//!
//! The force model and the `ABS <-> GRW` frame transform both need a single
//! number: the angle Earth has rotated since the vernal equinox crossed the
//! Greenwich meridian. This module computes that angle (mean sidereal time,
//! in radians) directly from an [`Instant`](crate::time::Instant), with no
//! external ephemeris dependency — the IAU 1982 GMST polynomial plus Earth's
//! mean angular velocity is accurate to well under a second of time over the
//! lifetime of any tracked object, which is what the force model needs.
//!
//! Nutation (the "true" vs. "mean" sidereal time distinction) is not modelled;
//! the few milliarcseconds it contributes are far below the noise floor of the
//! angular measurements this crate fits against.

use crate::time::Instant;
use std::f64::consts::TAU;

/// Earth's mean angular velocity, rad/s (JGM3/EGM96 value).
pub const EARTH_ANGULAR_VELOCITY: f64 = 72.92115e-6;

/// Mean sidereal time at `t`, in radians, wrapped to `[0, 2*pi)`.
///
/// This is the rotation angle used by [`crate::frames`] to carry a state
/// vector between the absolute (quasi-inertial) and Greenwich-rotating frames.
pub fn sidereal_time(t: Instant) -> f64 {
    // IAU 1982 GMST polynomial, evaluated at 0h UT1 plus the same-day rotation term.
    let days = t.seconds_since_j2000() / 86_400.0;
    let d0 = days.floor();
    let frac_day_s = (days - d0) * 86_400.0;

    let t0 = d0 / 36_525.0;
    let gmst_s = 24_110.54841
        + 8_640_184.812_866 * t0
        + 0.093_104 * t0 * t0
        - 6.2e-6 * t0 * t0 * t0
        + frac_day_s * 1.002_737_909_350_795;

    let angle = gmst_s / 86_400.0 * TAU;
    angle.rem_euclid(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sidereal_time_in_range() {
        let t = Instant::from_datetime(Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap());
        let st = sidereal_time(t);
        assert!(st >= 0.0 && st < TAU);
    }

    #[test]
    fn test_sidereal_time_advances_with_angular_velocity() {
        let t0 = Instant::from_datetime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let t1 = t0 + crate::time::Duration::from_seconds(3600.0);
        let st0 = sidereal_time(t0);
        let st1 = sidereal_time(t1);
        let advanced = (st1 - st0).rem_euclid(TAU);
        let expected = EARTH_ANGULAR_VELOCITY * 3600.0;
        assert!((advanced - expected).abs() < 1e-3, "advanced={advanced} expected={expected}");
    }

    #[test]
    fn test_sidereal_time_wraps() {
        let t0 = Instant::from_datetime(Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap());
        let one_day = crate::time::Duration::from_seconds(86_400.0);
        let st0 = sidereal_time(t0);
        let st1 = sidereal_time(t0 + one_day);
        // one solar day is slightly more than one sidereal day, so the angle
        // should have advanced by roughly angv * 86400 rad, wrapped.
        let diff = (st1 - st0).rem_euclid(TAU);
        assert!(diff > 0.0 && diff < 0.1);
    }
}
