//! Flat-plate spin-axis estimator, fitted from a single-observer photometric
//! time series rather than the angular astrometry the rest of this crate
//! consumes.
//!
//! The satellite is modelled as one reflecting plate of fixed orientation in
//! the body frame, spinning about a fixed inertial axis. Given a sequence of
//! apparent magnitudes and the satellite's already-determined trajectory, the
//! brightness ratio between any two epochs constrains the plate's instantaneous
//! attitude relative to the observer/Sun geometry; fitting that series pins
//! down the five free parameters: the spin axis (inclination, ascension),
//! the angular velocity, and the plate normal's offset from the axis at the
//! reference epoch (inclination, ascension).

use crate::error::{OrbitError, Result};
use crate::forecast::Forecast;
use crate::linalg::{is_equal, State6};
use crate::measurement::MeasuringInterval;
use crate::thirdbody::sun_position_grw;
use crate::time::Instant;
use nalgebra::{UnitQuaternion, UnitVector3, Vector3};
use rayon::prelude::*;
use statrs::statistics::Statistics;
use std::f64::consts::{PI, TAU};

/// Minimum sample variance a normalised ratio series must show before a spin
/// period can be considered constrained at all.
const MIN_RATIO_VARIANCE: f64 = 1e-10;

/// The five free parameters of the flat-plate rotation model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationParams {
    pub axis_inclination: f64,
    pub axis_ascension: f64,
    /// Spin rate, rad/s, about `axis` at `tn`.
    pub angular_velocity: f64,
    pub normal_inclination: f64,
    pub normal_ascension: f64,
}

/// Result of a completed grid search: the best-fit parameters and the
/// sum-of-squares residual they achieved against the observed ratio series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationEstimate {
    pub params: RotationParams,
    pub residual: f64,
    pub tn: Instant,
}

/// A closed interval plus a step count, the unit the grid search refines.
#[derive(Debug, Clone, Copy)]
struct GridAxis {
    lo: f64,
    hi: f64,
    steps: usize,
}

impl GridAxis {
    fn new(lo: f64, hi: f64, steps: usize) -> Self {
        GridAxis { lo, hi, steps: steps.max(1) }
    }

    fn values(&self) -> Vec<f64> {
        if self.steps == 1 {
            return vec![0.5 * (self.lo + self.hi)];
        }
        let n = self.steps;
        (0..n).map(|i| self.lo + (self.hi - self.lo) * (i as f64) / (n as f64 - 1.0)).collect()
    }

    /// Shrinks the interval to a neighbourhood of `center`, half the previous
    /// width, clamped to the original bounds.
    fn refine(&self, center: f64) -> Self {
        let half_width = (self.hi - self.lo) * 0.25;
        GridAxis::new((center - half_width).max(self.lo), (center + half_width).min(self.hi), self.steps)
    }
}

/// Unit vector with the given inclination (from the pole) and ascension
/// (around the pole), in spherical-to-Cartesian convention shared with the
/// rest of this crate's frames.
fn surface_normal(inclination: f64, ascension: f64) -> Vector3<f64> {
    let (si, ci) = inclination.sin_cos();
    let (sa, ca) = ascension.sin_cos();
    Vector3::new(si * ca, si * sa, ci)
}

/// Direction from the satellite to the Sun, unit length, at `t`.
fn solar_unit(p_sat: &Vector3<f64>, t: Instant) -> Vector3<f64> {
    (sun_position_grw(t) - p_sat).normalize()
}

/// `(cos_phase+1) * 0.5/pi`: the phase-angle normalisation in the inverse
/// photometric formula below.
fn phase_function(cos_phase: f64) -> f64 {
    (cos_phase + 1.0) * (0.5 / PI)
}

fn cos_phase_angle(to_observer: &Vector3<f64>, to_sun: &Vector3<f64>) -> f64 {
    to_observer.normalize().dot(&to_sun.normalize())
}

/// Inverts the standard magnitude-distance-phase relation to recover an
/// apparent reflective cross-section: `c = 10^((m+26.58)/-2.5) * r^2 / phase_function(cos_phase)`.
fn square_from_magnitude(magnitude: f64, range: f64, cos_phase: f64) -> f64 {
    10f64.powf((magnitude + 26.58) / -2.5) * range * range / phase_function(cos_phase)
}

/// Observed reflective cross-section at one measurement, from its magnitude
/// and the satellite/observer/Sun geometry at that instant.
fn reflective_square(observer: &Vector3<f64>, p_sat: &Vector3<f64>, magnitude: f64, t: Instant) -> f64 {
    let to_observer = observer - p_sat;
    let to_sun = solar_unit(p_sat, t);
    let range = to_observer.norm();
    let cos_phase = cos_phase_angle(&to_observer, &to_sun);
    square_from_magnitude(magnitude, range, cos_phase)
}

/// Observed ratio series `c_k / c_0` for every measurement but the first
/// (whose ratio to itself is trivially 1 and carries no information), plus
/// the matching elapsed-seconds-since-`tn` timestamps.
fn observed_ratios(observer: &Vector3<f64>, forecast: &Forecast<State6>, interval: &MeasuringInterval, tn: Instant) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut squares = Vec::with_capacity(interval.points_count());
    let mut times = Vec::with_capacity(interval.points_count());
    for (_, m) in interval.iter() {
        let sample = forecast.point(m.t)?;
        let p_sat = Vector3::new(sample[0], sample[1], sample[2]);
        squares.push(reflective_square(observer, &p_sat, m.m, m.t));
        times.push((m.t - tn).as_seconds());
    }
    if squares.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let c0 = squares[0];
    let ratios: Vec<f64> = squares[1..].iter().map(|c| c / c0).collect();
    Ok((ratios, times[1..].to_vec()))
}

/// Applies the rigid-body spin to the plate normal at elapsed time `dt`
/// (seconds since `tn`) about `axis`.
fn rotate_normal(normal0: &Vector3<f64>, axis: &UnitVector3<f64>, angular_velocity: f64, dt: f64) -> Vector3<f64> {
    UnitQuaternion::from_axis_angle(axis, angular_velocity * dt) * normal0
}

/// Modelled double-cosine (diffuse flat-plate) brightness factor: the plate
/// only reflects light it both receives and can redirect toward the
/// observer, so both cosines are clipped at zero.
fn reflectance_factor(normal: &Vector3<f64>, to_observer: &Vector3<f64>, to_sun: &Vector3<f64>) -> f64 {
    normal.dot(to_observer).max(0.0) * normal.dot(to_sun).max(0.0)
}

/// Modelled ratio series matching [`observed_ratios`]'s time grid, for a
/// candidate parameter set.
fn modeled_ratios(params: &RotationParams, observer: &Vector3<f64>, forecast: &Forecast<State6>, interval: &MeasuringInterval, tn: Instant) -> Result<Vec<f64>> {
    let axis = UnitVector3::new_normalize(surface_normal(params.axis_inclination, params.axis_ascension));
    let normal0 = surface_normal(params.normal_inclination, params.normal_ascension);

    let mut factors = Vec::with_capacity(interval.points_count());
    for (_, m) in interval.iter() {
        let sample = forecast.point(m.t)?;
        let p_sat = Vector3::new(sample[0], sample[1], sample[2]);
        let to_observer = (observer - p_sat).normalize();
        let to_sun = solar_unit(&p_sat, m.t);
        let dt = (m.t - tn).as_seconds();
        let normal = rotate_normal(&normal0, &axis, params.angular_velocity, dt);
        factors.push(reflectance_factor(&normal, &to_observer, &to_sun));
    }
    if factors.is_empty() {
        return Ok(Vec::new());
    }
    let f0 = factors[0].max(1e-12);
    Ok(factors[1..].iter().map(|f| f / f0).collect())
}

/// Closed-form least-squares slope of `y` against `x`.
fn linear_fit_slope(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = x.mean();
    let mean_y = y.mean();
    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        cov += (xi - mean_x) * (yi - mean_y);
        var_x += (xi - mean_x) * (xi - mean_x);
    }
    if var_x < 1e-12 {
        0.0
    } else {
        cov / var_x
    }
}

/// Seeds an angular-velocity guess by linearising the ratio series: each
/// ratio is treated as a clipped cosine of an accumulating phase, unwrapped
/// against the previous sample, and the phase-vs-time slope gives the rate.
fn estimate_frequency(times: &[f64], ratios: &[f64]) -> f64 {
    if times.len() < 2 {
        return 0.0;
    }
    let mut phases = Vec::with_capacity(ratios.len());
    let mut unwrapped = Vec::with_capacity(ratios.len());
    for &r in ratios {
        phases.push(r.clamp(-1.0, 1.0).acos());
    }
    unwrapped.push(phases[0]);
    for i in 1..phases.len() {
        let mut p = phases[i];
        while p - unwrapped[i - 1] > PI {
            p -= TAU;
        }
        while p - unwrapped[i - 1] < -PI {
            p += TAU;
        }
        unwrapped.push(p);
    }
    linear_fit_slope(times, &unwrapped)
}

/// Sum-of-squares mismatch between the modelled and observed ratio series.
fn compute_residual(params: &RotationParams, observer: &Vector3<f64>, forecast: &Forecast<State6>, interval: &MeasuringInterval, tn: Instant, observed: &[f64]) -> Result<f64> {
    let modeled = modeled_ratios(params, observer, forecast, interval, tn)?;
    Ok(modeled.iter().zip(observed).map(|(m, o)| (m - o) * (m - o)).sum())
}

/// One round of the nested 5-axis grid search: evaluates every combination
/// of the five axes' sample points in parallel and returns the best.
fn select(
    ranges: &[GridAxis; 5],
    observer: &Vector3<f64>,
    forecast: &Forecast<State6>,
    interval: &MeasuringInterval,
    tn: Instant,
    observed: &[f64],
) -> Result<(RotationParams, f64)> {
    let axis_incl = ranges[0].values();
    let axis_asc = ranges[1].values();
    let ang_vel = ranges[2].values();
    let norm_incl = ranges[3].values();
    let norm_asc = ranges[4].values();

    let mut grid = Vec::with_capacity(axis_incl.len() * axis_asc.len() * ang_vel.len() * norm_incl.len() * norm_asc.len());
    for &ai in &axis_incl {
        for &aa in &axis_asc {
            for &w in &ang_vel {
                for &ni in &norm_incl {
                    for &na in &norm_asc {
                        grid.push(RotationParams { axis_inclination: ai, axis_ascension: aa, angular_velocity: w, normal_inclination: ni, normal_ascension: na });
                    }
                }
            }
        }
    }

    let scored: Vec<(RotationParams, f64)> = grid
        .into_par_iter()
        .map(|p| {
            let r = compute_residual(&p, observer, forecast, interval, tn, observed).unwrap_or(f64::INFINITY);
            (p, r)
        })
        .collect();

    scored
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .ok_or(OrbitError::DegenerateSignal { variance: 0.0 })
}

/// Fits [`RotationParams`] to `interval`'s photometry by iterative
/// grid-shrinking search, seeded by a linearised angular-velocity guess and
/// stopping once the residual stops improving by more than 1%.
pub fn estimate_rotation(observer: Vector3<f64>, forecast: &Forecast<State6>, interval: &MeasuringInterval, tn: Instant) -> Result<RotationEstimate> {
    let (observed, times) = observed_ratios(&observer, forecast, interval, tn)?;
    if observed.len() < 2 {
        return Err(OrbitError::InsufficientPoints { required: 3, found: observed.len() + 1 });
    }

    let variance = observed.as_slice().variance();
    if variance < MIN_RATIO_VARIANCE {
        return Err(OrbitError::DegenerateSignal { variance });
    }

    let seed_w = estimate_frequency(&times, &observed).abs().max(1e-4);

    let mut ranges = [
        GridAxis::new(0.0, PI, 9),
        GridAxis::new(0.0, TAU, 9),
        GridAxis::new(0.2 * seed_w, 2.0 * seed_w, 9),
        GridAxis::new(0.0, PI, 9),
        GridAxis::new(0.0, TAU, 9),
    ];

    let (mut best_params, mut best_residual) = select(&ranges, &observer, forecast, interval, tn, &observed)?;

    for _ in 0..12 {
        ranges = [
            ranges[0].refine(best_params.axis_inclination),
            ranges[1].refine(best_params.axis_ascension),
            ranges[2].refine(best_params.angular_velocity),
            ranges[3].refine(best_params.normal_inclination),
            ranges[4].refine(best_params.normal_ascension),
        ];
        let (params, residual) = select(&ranges, &observer, forecast, interval, tn, &observed)?;
        let converged = is_equal(best_residual, residual, 1e-2);
        best_params = params;
        best_residual = residual;
        if converged {
            break;
        }
    }

    Ok(RotationEstimate { params: best_params, residual: best_residual, tn })
}
