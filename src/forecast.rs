//! Immutable trajectory produced by one completed integration.
//!
//! `Forecast` is a thin wrapper over [`Integrator`]: it owns the sample
//! storage and exposes `point(t)` with explicit window validation, so every
//! caller (residual assembler, solver damping candidates) gets the same
//! `InvalidInput` behaviour at the boundary instead of each reimplementing
//! the range check.

use crate::error::{OrbitError, Result};
use crate::integrator::{Integrator, State};
use crate::time::Instant;

/// Default Lagrange interpolation degree, per the propagator's contract.
pub const DEFAULT_DEGREE: usize = 4;

/// A completed, immutable integration. Cheap to share by reference across
/// threads: nothing about a forecast is mutated after construction.
pub struct Forecast<V> {
    integrator: Integrator<V>,
    degree: usize,
}

impl<V: State> Forecast<V> {
    /// Integrates `v0` from `tn` to `tk` and wraps the result.
    pub fn new<F>(v0: V, tn: Instant, tk: Instant, step: f64, func: F) -> Result<Self>
    where
        F: FnMut(&V, Instant) -> Result<V>,
    {
        let integrator = Integrator::new(v0, tn, tk, step, func)?;
        Ok(Forecast { integrator, degree: DEFAULT_DEGREE })
    }

    /// Overrides the Lagrange interpolation degree (2 or 4; see
    /// [`Integrator::point`]).
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn t0(&self) -> Instant {
        self.integrator.t0()
    }

    pub fn t_last(&self) -> Instant {
        self.integrator.t_last()
    }

    pub fn step(&self) -> f64 {
        self.integrator.step()
    }

    pub fn sample_count(&self) -> usize {
        self.integrator.sample_count()
    }

    /// Interpolated state at `t`. Fails with `InvalidInput` if `t` falls
    /// outside `[t0, t_last]`.
    pub fn point(&self, t: Instant) -> Result<V> {
        let (t0, t1) = (self.integrator.t0(), self.integrator.t_last());
        if t < t0 || t > t1 {
            return Err(OrbitError::InvalidInput { t, t0, t1 });
        }
        Ok(self.integrator.point(t, self.degree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::State6;
    use crate::time::Duration;
    use approx::assert_relative_eq;

    fn two_body_derivative(state: &State6, _t: Instant) -> Result<State6> {
        let p = nalgebra::Vector3::new(state[0], state[1], state[2]);
        let v = nalgebra::Vector3::new(state[3], state[4], state[5]);
        let mu = crate::harmonics::JGM3_MU;
        let a = -mu / p.norm().powi(3) * p;
        Ok(State6::new(v.x, v.y, v.z, a.x, a.y, a.z))
    }

    #[test]
    fn test_point_outside_window_is_invalid_input() {
        let v0 = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t0 = Instant::from_ms_since_j2000(0);
        let t1 = t0 + Duration::from_seconds(1000.0);
        let forecast = Forecast::new(v0, t0, t1, 10.0, two_body_derivative).unwrap();
        let past = t0 - Duration::from_seconds(10.0);
        assert!(matches!(forecast.point(past), Err(OrbitError::InvalidInput { .. })));
    }

    #[test]
    fn test_forecast_point_agrees_regardless_of_horizon() {
        let v0 = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t0 = Instant::from_ms_since_j2000(0);
        let query = t0 + Duration::from_seconds(500.0);
        let short = Forecast::new(v0, t0, query, 10.0, two_body_derivative).unwrap();
        let long = Forecast::new(v0, t0, t0 + Duration::from_seconds(2000.0), 10.0, two_body_derivative).unwrap();
        let a = short.point(query).unwrap();
        let b = long.point(query).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-3);
    }
}
