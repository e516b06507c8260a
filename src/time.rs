//! Time representation for the propagator and solver.
//!
//! Every component in this crate that needs "when" uses [`Instant`] rather than
//! `chrono::DateTime<Utc>` directly: it is a plain millisecond count since the
//! J2000.0 epoch, `Copy`, orderable, and cheap to pass by value through the
//! integrator's inner loop. Conversions to and from `chrono` sit at the edges
//! (measurement ingestion, reporting) where wall-clock dates are needed.
//!
//! # Julian Dates
//!
//! Internally, epochs are still counted from the Julian Date system used by every
//! ephemeris this crate ports formulas from: a continuous day count with no leap
//! seconds, leap years, or calendar reforms to account for.
//!
//! - **JD 2451545.0**: J2000.0 epoch (January 1, 2000 at noon TT)
//! - Julian centuries since J2000.0 (`jc2000`) is the independent variable of the
//!   Sun/Moon series and the sidereal angle used here.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use std::ops::{Add, Sub};

/// Julian Date (JD) of the J2000.0 epoch: 2000 January 1.5 TT.
pub const JD2000: f64 = 2451545.0;

const MS_PER_DAY: i64 = 86_400_000;

/// A moment in time, stored as whole milliseconds since the J2000.0 epoch.
///
/// `Instant` is intentionally coarser than `chrono`'s nanosecond resolution:
/// millisecond precision is more than sufficient for optical/radar observation
/// timestamps and keeps the type `Copy` and trivially hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    ms: i64,
}

/// An elapsed span of time, stored as whole milliseconds.
///
/// Signed: `t1 - t0` may be negative when `t0` is later than `t1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    ms: i64,
}

impl Instant {
    /// Constructs an `Instant` directly from a millisecond offset from J2000.0.
    pub fn from_ms_since_j2000(ms: i64) -> Self {
        Instant { ms }
    }

    /// Milliseconds since J2000.0.
    pub fn ms_since_j2000(self) -> i64 {
        self.ms
    }

    /// Seconds since J2000.0, as a floating point value.
    pub fn seconds_since_j2000(self) -> f64 {
        self.ms as f64 / 1000.0
    }

    /// Builds an `Instant` from a UTC calendar date/time.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let days = julian_date(dt) - JD2000;
        Instant {
            ms: (days * MS_PER_DAY as f64).round() as i64,
        }
    }

    /// Converts back to a UTC calendar date/time.
    ///
    /// Round-trips `from_datetime` to millisecond precision.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let jd = JD2000 + self.ms as f64 / MS_PER_DAY as f64;
        julian_date_to_datetime(jd)
    }

    /// Julian centuries elapsed since J2000.0 (the argument used by the Sun/Moon
    /// series and the sidereal angle).
    pub fn jc2000(self) -> f64 {
        self.seconds_since_j2000() / 86_400.0 / 36_525.0
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        Duration { ms: self.ms - rhs.ms }
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant { ms: self.ms + rhs.ms }
    }
}

impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Instant {
        Instant { ms: self.ms - rhs.ms }
    }
}

impl Duration {
    /// Builds a `Duration` from a whole number of seconds.
    pub fn from_seconds(s: f64) -> Self {
        Duration { ms: (s * 1000.0).round() as i64 }
    }

    /// The span in seconds, as used throughout the force models and integrator.
    pub fn as_seconds(self) -> f64 {
        self.ms as f64 / 1000.0
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration { ms: self.ms + rhs.ms }
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration { ms: self.ms - rhs.ms }
    }
}

/// Converts a UTC datetime to a Julian Date (JD).
///
/// Based on the algorithm from Meeus' *Astronomical Algorithms* (2nd ed., ch. 7),
/// valid for the proleptic Gregorian calendar.
pub fn julian_date(datetime: DateTime<Utc>) -> f64 {
    let year = datetime.year();
    let month = datetime.month();
    let day = datetime.day() as f64;

    let mut y = year;
    let mut m = month as i32;

    if m <= 2 {
        y -= 1;
        m += 12;
    }

    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    let hour = datetime.hour() as f64;
    let minute = datetime.minute() as f64;
    let second = datetime.second() as f64;
    let frac_day = (hour + (minute / 60.0) + (second / 3600.0)) / 24.0;

    (365.25 * (y as f64 + 4716.0)).floor()
        + (30.6001 * ((m + 1) as f64)).floor()
        + day
        + frac_day
        + b
        - 1524.5
}

/// Inverse of [`julian_date`]: converts a Julian Date back to a UTC calendar date/time.
fn julian_date_to_datetime(jd: f64) -> DateTime<Utc> {
    let jd = jd + 0.5;
    let z = jd.floor();
    let f = jd - z;

    let a = if z < 2_299_161.0 {
        z
    } else {
        let alpha = ((z - 1_867_216.25) / 36_524.25).floor();
        z + 1.0 + alpha - (alpha / 4.0).floor()
    };
    let b = a + 1524.0;
    let c = ((b - 122.1) / 365.25).floor();
    let d = (365.25 * c).floor();
    let e = ((b - d) / 30.6001).floor();

    let day_frac = b - d - (30.6001 * e).floor() + f;
    let day = day_frac.floor() as u32;
    let month = if e < 14.0 { e - 1.0 } else { e - 13.0 } as u32;
    let year = if month > 2 { c - 4716.0 } else { c - 4715.0 } as i32;

    let secs_frac = (day_frac - day as f64) * 86_400.0;
    let hour = (secs_frac / 3600.0).floor() as u32;
    let minute = ((secs_frac - hour as f64 * 3600.0) / 60.0).floor() as u32;
    let second = (secs_frac - hour as f64 * 3600.0 - minute as f64 * 60.0).round() as u32;

    Utc.with_ymd_and_hms(year, month, day, hour.min(23), minute.min(59), second.min(59))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_j2000_epoch() {
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let jd = julian_date(j2000);
        assert!((jd - JD2000).abs() < 1e-9);
    }

    #[test]
    fn test_calendar_reform_period_1582() {
        let test_cases = [
            (1582, 10, 1, 12, 0, 0, 2299147.0),
            (1582, 10, 4, 12, 0, 0, 2299150.0),
            (1582, 10, 15, 12, 0, 0, 2299161.0),
            (1583, 1, 1, 12, 0, 0, 2299239.0),
        ];
        for (year, month, day, hour, min, sec, expected_jd) in test_cases {
            let dt = Utc.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap();
            let calculated_jd = julian_date(dt);
            let diff_seconds = (calculated_jd - expected_jd).abs() * 86400.0;
            assert!(diff_seconds < 0.001, "expected JD {}, got {}", expected_jd, calculated_jd);
        }
    }

    #[test]
    fn test_instant_from_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 6, 30, 0).unwrap();
        let t = Instant::from_datetime(dt);
        let back = t.to_datetime();
        assert_eq!(dt.year(), back.year());
        assert_eq!(dt.month(), back.month());
        assert_eq!(dt.day(), back.day());
        assert_eq!(dt.hour(), back.hour());
        assert_eq!(dt.minute(), back.minute());
    }

    #[test]
    fn test_instant_arithmetic() {
        let t0 = Instant::from_ms_since_j2000(0);
        let d = Duration::from_seconds(3600.0);
        let t1 = t0 + d;
        assert_eq!((t1 - t0).as_seconds(), 3600.0);
        assert_eq!(t1 - d, t0);
    }

    #[test]
    fn test_jc2000_at_epoch() {
        let t0 = Instant::from_ms_since_j2000(0);
        assert_eq!(t0.jc2000(), 0.0);

        let one_century = Instant::from_ms_since_j2000((36_525.0 * 86_400_000.0) as i64);
        assert!((one_century.jc2000() - 1.0).abs() < 1e-9);
    }
}
