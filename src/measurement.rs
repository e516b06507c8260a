//! Angular measurement data model: one observation, a same-observatory
//! batch of them, and a windowed view over many batches.

use crate::error::{validate_declination, validate_right_ascension, OrbitError, Result};
use crate::time::Instant;
use nalgebra::Vector3;

/// One topocentric angular observation of the satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub t: Instant,
    /// Declination, radians, in `[-pi/2, pi/2]`.
    pub i: f64,
    /// Right ascension, radians, canonicalised to `[0, 2*pi)` at ingest.
    pub a: f64,
    /// Stellar magnitude; informational, not used in angular residuals.
    pub m: f64,
}

impl Measurement {
    /// Builds a measurement, validating and canonicalising `a` into
    /// `[0, 2*pi)` as required by the residual wrap convention.
    pub fn new(t: Instant, i: f64, a: f64, m: f64) -> Result<Self> {
        validate_declination(i)?;
        let a = a.rem_euclid(std::f64::consts::TAU);
        validate_right_ascension(a)?;
        Ok(Measurement { t, i, a, m })
    }
}

/// A contiguous set of measurements from one observatory, ordered by
/// increasing instant.
#[derive(Debug, Clone)]
pub struct Seance {
    pub id: String,
    /// Observatory position in the Earth-fixed (GRW) frame, metres.
    pub o: Vector3<f64>,
    meas: Vec<Measurement>,
}

impl Seance {
    /// Builds a seance from an unordered measurement list, sorting by
    /// instant. Rejects an empty list, which would violate the type's
    /// non-empty invariant, rather than panicking on malformed input.
    pub fn new(id: impl Into<String>, o: Vector3<f64>, mut meas: Vec<Measurement>) -> Result<Self> {
        if meas.is_empty() {
            return Err(OrbitError::InsufficientPoints { required: 1, found: 0 });
        }
        meas.sort_by(|a, b| a.t.cmp(&b.t));
        Ok(Seance { id: id.into(), o, meas })
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.meas
    }

    pub fn first_instant(&self) -> Instant {
        self.meas[0].t
    }

    pub fn last_instant(&self) -> Instant {
        self.meas[self.meas.len() - 1].t
    }
}

/// A view over a sequence of seances whose measurement instants lie within
/// `[tn, tk]`.
pub struct MeasuringInterval<'a> {
    tn: Instant,
    tk: Instant,
    seances: Vec<&'a Seance>,
}

impl<'a> MeasuringInterval<'a> {
    /// Selects every seance from `all` whose entire measurement list falls
    /// within `[tn, tk]`.
    pub fn new(all: &'a [Seance], tn: Instant, tk: Instant) -> Self {
        let seances = all.iter().filter(|s| s.first_instant() >= tn && s.last_instant() <= tk).collect();
        MeasuringInterval { tn, tk, seances }
    }

    pub fn window(&self) -> (Instant, Instant) {
        (self.tn, self.tk)
    }

    pub fn seances(&self) -> &[&'a Seance] {
        &self.seances
    }

    /// Total scalar measurement count across every selected seance. The
    /// residual vector this drives has length `2 * points_count()`.
    pub fn points_count(&self) -> usize {
        self.seances.iter().map(|s| s.measurements().len()).sum()
    }

    /// Forward iteration over every `(seance, measurement)` pair, in
    /// seance order then measurement order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Seance, &'a Measurement)> + '_ {
        self.seances.iter().flat_map(|s| s.measurements().iter().map(move |m| (*s, m)))
    }

    pub fn latest_instant(&self) -> Option<Instant> {
        self.seances.iter().map(|s| s.last_instant()).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(ms: i64, a: f64) -> Measurement {
        Measurement::new(Instant::from_ms_since_j2000(ms), 0.1, a, 12.0).unwrap()
    }

    #[test]
    fn test_measurement_canonicalises_negative_ascension() {
        let meas = Measurement::new(Instant::from_ms_since_j2000(0), 0.0, -0.1, 10.0).unwrap();
        assert!((0.0..std::f64::consts::TAU).contains(&meas.a));
    }

    #[test]
    fn test_measurement_rejects_out_of_range_declination() {
        assert!(Measurement::new(Instant::from_ms_since_j2000(0), 2.0, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_seance_sorts_by_instant() {
        let seance = Seance::new("obs1", Vector3::zeros(), vec![m(2000, 0.1), m(1000, 0.2)]).unwrap();
        assert_eq!(seance.measurements()[0].t, Instant::from_ms_since_j2000(1000));
        assert_eq!(seance.first_instant(), Instant::from_ms_since_j2000(1000));
        assert_eq!(seance.last_instant(), Instant::from_ms_since_j2000(2000));
    }

    #[test]
    fn test_seance_rejects_empty_measurement_list() {
        let result = Seance::new("obs1", Vector3::zeros(), vec![]);
        assert!(matches!(result, Err(OrbitError::InsufficientPoints { required: 1, found: 0 })));
    }

    #[test]
    fn test_measuring_interval_selects_only_fully_contained_seances() {
        let inside = Seance::new("a", Vector3::zeros(), vec![m(100, 0.1), m(200, 0.1)]).unwrap();
        let outside = Seance::new("b", Vector3::zeros(), vec![m(100, 0.1), m(5000, 0.1)]).unwrap();
        let all = vec![inside, outside];
        let interval = MeasuringInterval::new(&all, Instant::from_ms_since_j2000(0), Instant::from_ms_since_j2000(1000));
        assert_eq!(interval.seances().len(), 1);
        assert_eq!(interval.points_count(), 2);
    }
}
