//! Adams-Bashforth-Moulton order-8 predictor-corrector integrator with a
//! Runge-Kutta 4 bootstrap, storing the full trajectory on a uniform time
//! grid and offering Lagrange-polynomial interpolation between samples.

use crate::error::{OrbitError, Result};
use crate::time::{Duration, Instant};
use std::ops::{Add, Mul};

const DEGREE: usize = 8;

/// The trait bound a state vector must satisfy to be integrated: the usual
/// weighted-sum operations a predictor-corrector needs, plus a same-shape
/// zero (fixed-size nalgebra vectors get this for free; `DVector` needs its
/// length to build one).
pub trait State: Clone + Add<Output = Self> + Mul<f64, Output = Self> {
    fn zero_like(&self) -> Self;
}

impl State for crate::linalg::State6 {
    fn zero_like(&self) -> Self {
        Self::zeros()
    }
}

impl State for nalgebra::DVector<f64> {
    fn zero_like(&self) -> Self {
        nalgebra::DVector::zeros(self.len())
    }
}

const ADAMS_PREDICT: [f64; 8] = [
    -0.304_224_537_037_037_06,
    2.445_163_690_476_190_4,
    -8.612_127_976_190_477,
    17.379_654_431_216_935,
    -22.027_752_976_190_477,
    18.054_538_690_476_193,
    -9.525_206_679_894_179,
    3.589_955_357_142_857_3,
];

const ADAMS_CORRECT: [f64; 8] = [
    0.011_367_394_179_894_181,
    -0.093_840_939_153_439_15,
    0.343_080_357_142_857_17,
    -0.732_035_383_597_883_7,
    1.017_964_616_402_116_6,
    -1.006_919_642_857_143,
    1.156_159_060_846_560_8,
    0.304_224_537_037_037,
];

/// One sample of a stored trajectory.
#[derive(Debug, Clone)]
pub struct Sample<V> {
    pub v: V,
    pub t: Instant,
}

/// Eagerly-computed trajectory on a uniform time grid, with Lagrange
/// interpolation to arbitrary instants in `[t0, t_last]`.
pub struct Integrator<V> {
    points: Vec<Sample<V>>,
    step: f64,
}

fn rk4<V, F>(v: &V, t: Instant, step: f64, func: &mut F) -> Result<(V, Instant)>
where
    V: State,
    F: FnMut(&V, Instant) -> Result<V>,
{
    let half = step / 2.0;
    let sixth = step / 6.0;
    let t_mid = t + Duration::from_seconds(half);
    let t_out = t + Duration::from_seconds(step);
    let k1 = func(v, t)?;
    let k2 = func(&(v.clone() + k1.clone() * half), t_mid)?;
    let k3 = func(&(v.clone() + k2.clone() * half), t_mid)?;
    let k4 = func(&(v.clone() + k3.clone() * step), t_out)?;
    let ks = k1 + (k2 + k3) * 2.0 + k4;
    Ok((v.clone() + ks * sixth, t_out))
}

fn adams<V, F>(arr: &mut [V; DEGREE], v: &V, t: Instant, step: f64, func: &mut F) -> Result<(V, Instant)>
where
    V: State,
    F: FnMut(&V, Instant) -> Result<V>,
{
    arr[7] = func(v, t)?;
    let mut x = arr[0].clone() * ADAMS_PREDICT[0];
    let mut out_v = v.zero_like();
    for i in 1..DEGREE {
        x = x + arr[i].clone() * ADAMS_PREDICT[i];
        out_v = out_v + arr[i].clone() * ADAMS_CORRECT[i - 1];
        arr[i - 1] = arr[i].clone();
    }
    let x_pred = x * step + v.clone();
    let t_out = t + Duration::from_seconds(step);
    out_v = out_v + func(&x_pred, t_out)? * ADAMS_CORRECT[7];
    Ok((out_v * step + v.clone(), t_out))
}

impl<V: State> Integrator<V> {
    /// Integrates `v0` from `tn` to `tk` with fixed step `step` (seconds,
    /// sign matching the direction of integration), bootstrapping the first
    /// `degree - 1` samples with RK4 before switching to the ABM8
    /// predictor-corrector.
    ///
    /// `func` is the right-hand side; any error it returns aborts the
    /// integration and is propagated here verbatim.
    pub fn new<F>(v0: V, tn: Instant, tk: Instant, step: f64, mut func: F) -> Result<Self>
    where
        F: FnMut(&V, Instant) -> Result<V>,
    {
        if step == 0.0 {
            return Err(OrbitError::InvalidStep { step });
        }
        let span = (tk - tn).as_seconds();
        if (step > 0.0) != (span >= 0.0) && span != 0.0 {
            return Err(OrbitError::InvalidStep { step });
        }

        let count = (span / step).floor() as usize + 1;
        let mut points = Vec::with_capacity(count);
        points.push(Sample { v: v0.clone(), t: tn });

        let bootstrap_len = count.min(DEGREE);
        let mut arr: [V; DEGREE] = std::array::from_fn(|_| v0.zero_like());

        for i in 1..bootstrap_len {
            let prev = points[i - 1].clone();
            arr[i - 1] = func(&prev.v, prev.t)?;
            let (v, t) = rk4(&prev.v, prev.t, step, &mut func)?;
            points.push(Sample { v, t });
        }

        for _ in bootstrap_len..count {
            let prev = points.last().unwrap().clone();
            let (v, t) = adams(&mut arr, &prev.v, prev.t, step, &mut func)?;
            points.push(Sample { v, t });
        }

        Ok(Integrator { points, step })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn t0(&self) -> Instant {
        self.points.first().unwrap().t
    }

    pub fn t_last(&self) -> Instant {
        self.points.last().unwrap().t
    }

    pub fn sample_count(&self) -> usize {
        self.points.len()
    }

    pub fn samples(&self) -> &[Sample<V>] {
        &self.points
    }

    /// Interpolates the state at `t`, using a Lagrange polynomial over
    /// `degree` samples centred on `t` (clamped at the ends of the stored
    /// trajectory). `degree` is silently reduced to the sample count when
    /// fewer points are available, so a single-sample trajectory (`tk == tn`)
    /// interpolates exactly at its one instant.
    pub fn point(&self, t: Instant, degree: usize) -> V {
        let count = self.points.len();
        let degree = degree.min(count).max(1);
        let t0 = self.points[0].t;

        let raw_index = ((t - t0).as_seconds() / self.step).floor() as i64;
        let half = (degree / 2) as i64;
        let mut index = (raw_index - half).max(0) as usize;
        index = index.min(count - degree);

        let mut result: Option<V> = None;
        for n in 0..degree {
            let mut mult = 1.0;
            let tn = self.points[index + n].t;
            for k in 0..degree {
                if k == n {
                    continue;
                }
                let tk = self.points[index + k].t;
                let up = (t - tk).as_seconds();
                let down = (tn - tk).as_seconds();
                mult *= up / down;
            }
            let term = self.points[index + n].v.clone() * mult;
            result = Some(match result {
                Some(r) => r + term,
                None => term,
            });
        }
        result.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::State6;
    use approx::assert_relative_eq;

    fn two_body_derivative(state: &State6, _t: Instant) -> Result<State6> {
        let p = nalgebra::Vector3::new(state[0], state[1], state[2]);
        let v = nalgebra::Vector3::new(state[3], state[4], state[5]);
        let mu = crate::harmonics::JGM3_MU;
        let a = -mu / p.norm().powi(3) * p;
        Ok(State6::new(v.x, v.y, v.z, a.x, a.y, a.z))
    }

    #[test]
    fn test_single_sample_trajectory_is_exact() {
        let v0 = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t0 = Instant::from_ms_since_j2000(0);
        let integrator = Integrator::new(v0, t0, t0, 10.0, two_body_derivative).unwrap();
        assert_eq!(integrator.sample_count(), 1);
        let state = integrator.point(t0, 4);
        assert_relative_eq!(state, v0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_body_orbit_returns_near_initial_state() {
        let v0 = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t0 = Instant::from_ms_since_j2000(0);
        let period_s = 5828.0;
        let t1 = t0 + Duration::from_seconds(period_s);
        let integrator = Integrator::new(v0, t0, t1, 10.0, two_body_derivative).unwrap();
        let state = integrator.point(t1, 4);
        let dp = (nalgebra::Vector3::new(state[0], state[1], state[2]) - nalgebra::Vector3::new(v0[0], v0[1], v0[2])).norm();
        assert!(dp < 50.0, "drift {dp} m too large after one orbit");
    }

    #[test]
    fn test_zero_step_is_invalid() {
        let v0 = State6::zeros();
        let t0 = Instant::from_ms_since_j2000(0);
        let t1 = Instant::from_ms_since_j2000(1000);
        assert!(matches!(Integrator::new(v0, t0, t1, 0.0, two_body_derivative), Err(OrbitError::InvalidStep { .. })));
    }

    #[test]
    fn test_step_sign_must_match_direction() {
        let v0 = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t0 = Instant::from_ms_since_j2000(0);
        let t1 = Instant::from_ms_since_j2000(10_000);
        assert!(matches!(Integrator::new(v0, t0, t1, -10.0, two_body_derivative), Err(OrbitError::InvalidStep { .. })));
    }
}
