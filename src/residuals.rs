//! Maps a candidate state onto topocentric angular residuals against a
//! measurement interval, with both an analytic and a parallel
//! finite-difference Jacobian variant.

use crate::error::Result;
use crate::forecast::Forecast;
use crate::frames::grw_to_abs_ort;
use crate::harmonics::HarmonicsTable;
use crate::linalg::{wrap_angle, State6};
use crate::measurement::MeasuringInterval;
use crate::motion::{ForceOptions, Forces};
use crate::sidereal::sidereal_time;
use crate::time::Instant;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rayon::prelude::*;

/// `d(declination)/d(p)`, `d(right_ascension)/d(p)` at Cartesian `p`
/// (any frame; the caller supplies `p` already in the frame it wants the
/// gradient expressed in).
fn spherical_gradients(p: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let len2 = p.x * p.x + p.y * p.y;
    let len = len2.sqrt();
    let r2 = len2 + p.z * p.z;
    let d_dec = Vector3::new(-p.z * p.x / (r2 * len), -p.z * p.y / (r2 * len), len / r2);
    let d_ra = Vector3::new(-p.y / len2, p.x / len2, 0.0);
    (d_dec, d_ra)
}

fn predicted_angles(p_grw: &Vector3<f64>, t: Instant) -> (f64, f64) {
    let sph = crate::frames::grw_ort_to_abs_sph(p_grw, sidereal_time(t));
    (sph.y, sph.z)
}

/// Plain residual vector: `(dec_k - dec_pred_k, wrap(ra_k - ra_pred_k))` for
/// every measurement in `interval`, in seance order.
pub fn residuals(state: &State6, epoch: Instant, interval: &MeasuringInterval, table: &HarmonicsTable, options: ForceOptions) -> Result<DVector<f64>> {
    let latest = interval.latest_instant().unwrap_or(epoch);
    let mut forces = Forces::new(table, options);
    let forecast = Forecast::new(*state, epoch, latest, 30.0, |s, t| forces.derivative6(s, t))?;

    let mut out = Vec::with_capacity(2 * interval.points_count());
    for (_, m) in interval.iter() {
        let predicted = forecast.point(m.t)?;
        let p_grw = Vector3::new(predicted[0], predicted[1], predicted[2]);
        let (dec_pred, ra_pred) = predicted_angles(&p_grw, m.t);
        out.push(m.i - dec_pred);
        out.push(wrap_angle(m.a - ra_pred));
    }
    Ok(DVector::from_vec(out))
}

/// Residual vector plus the analytic Jacobian `d(residual)/d(state0)`,
/// shape `(6, 2 * points_count())`, using the variational propagator's
/// state-transition matrix.
pub fn residuals_with_jacobian(state: &State6, epoch: Instant, interval: &MeasuringInterval, table: &HarmonicsTable, options: ForceOptions) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let latest = interval.latest_instant().unwrap_or(epoch);
    let mut forces = Forces::new(table, options);

    let phi0 = DMatrix::<f64>::identity(6, 6);
    let initial = Augmented { x: *state, phi: phi0 };
    let forecast = Forecast::new(initial, epoch, latest, 30.0, |aug: &Augmented, t| {
        let (dx, a) = forces.derivative_with_sensitivity(&aug.x, t)?;
        let dphi = forces.variational_derivative(&a, &aug.phi);
        Ok(Augmented { x: dx, phi: dphi })
    })?;

    let n = interval.points_count();
    let mut residual_vec = Vec::with_capacity(2 * n);
    let mut jac = DMatrix::<f64>::zeros(6, 2 * n);

    for (col, (_, m)) in interval.iter().enumerate() {
        let sample = forecast.point(m.t)?;
        let p_grw = Vector3::new(sample.x[0], sample.x[1], sample.x[2]);
        let (dec_pred, ra_pred) = predicted_angles(&p_grw, m.t);
        residual_vec.push(m.i - dec_pred);
        residual_vec.push(wrap_angle(m.a - ra_pred));

        let st = sidereal_time(m.t);
        let (s, c) = st.sin_cos();
        let r = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
        let p_abs = grw_to_abs_ort(&p_grw, st);
        let (d_dec_abs, d_ra_abs) = spherical_gradients(&p_abs);
        let d_dec_grw = r.transpose() * d_dec_abs;
        let d_ra_grw = r.transpose() * d_ra_abs;

        let phi_pos = sample.phi.rows(0, 3);
        let dec_row = -(d_dec_grw.transpose() * phi_pos);
        let ra_row = -(d_ra_grw.transpose() * phi_pos);
        for k in 0..6 {
            jac[(k, 2 * col)] = dec_row[(0, k)];
            jac[(k, 2 * col + 1)] = ra_row[(0, k)];
        }
    }

    Ok((DVector::from_vec(residual_vec), jac))
}

/// Parallel finite-difference Jacobian, for use when the variational
/// propagator is disabled. Each column is an independent propagation with
/// its own forecast, perturbing state component `j` by `eps[j]`.
pub fn residuals_with_finite_difference_jacobian(
    state: &State6,
    epoch: Instant,
    interval: &MeasuringInterval,
    table: &HarmonicsTable,
    options: ForceOptions,
    eps: [f64; 6],
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let base = residuals(state, epoch, interval, table, options.clone())?;
    let n = base.len();

    let columns: Vec<Result<DVector<f64>>> = (0..6)
        .into_par_iter()
        .map(|j| {
            let mut perturbed = *state;
            perturbed[j] += eps[j];
            let r = residuals(&perturbed, epoch, interval, table, options.clone())?;
            Ok((r - &base) / eps[j])
        })
        .collect();

    let mut jac = DMatrix::<f64>::zeros(6, n);
    for (j, col) in columns.into_iter().enumerate() {
        let col = col?;
        for i in 0..n {
            jac[(j, i)] = col[i];
        }
    }
    Ok((base, jac))
}

/// State plus a 6x6 variational block, integrated together so the
/// sensitivity matrix advances in lockstep with the state it linearises.
#[derive(Clone)]
struct Augmented {
    x: State6,
    phi: DMatrix<f64>,
}

impl std::ops::Add for Augmented {
    type Output = Augmented;
    fn add(self, rhs: Augmented) -> Augmented {
        Augmented { x: self.x + rhs.x, phi: self.phi + rhs.phi }
    }
}

impl std::ops::Mul<f64> for Augmented {
    type Output = Augmented;
    fn mul(self, rhs: f64) -> Augmented {
        Augmented { x: self.x * rhs, phi: self.phi * rhs }
    }
}

impl crate::integrator::State for Augmented {
    fn zero_like(&self) -> Self {
        Augmented { x: State6::zeros(), phi: DMatrix::zeros(self.phi.nrows(), self.phi.ncols()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::{EARTH_ANGV, JGM3_FLAT, JGM3_MU, JGM3_RAD};
    use crate::measurement::{Measurement, Seance};

    fn kepler_table() -> HarmonicsTable {
        HarmonicsTable::point_mass(JGM3_MU, JGM3_RAD, EARTH_ANGV, JGM3_FLAT)
    }

    fn kepler_options() -> ForceOptions {
        ForceOptions { degree: 0, enable_sun: false, enable_moon: false, enable_drag: false, enable_srp: false, ..Default::default() }
    }

    #[test]
    fn test_residual_wrap_stays_bounded() {
        let table = kepler_table();
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let epoch = Instant::from_ms_since_j2000(0);
        let meas = Measurement::new(Instant::from_ms_since_j2000(5000), 0.2, 0.001, 12.0).unwrap();
        let seance = Seance::new("s1", Vector3::new(6_378_000.0, 0.0, 0.0), vec![meas]).unwrap();
        let all = vec![seance];
        let interval = MeasuringInterval::new(&all, Instant::from_ms_since_j2000(0), Instant::from_ms_since_j2000(10_000));
        let r = residuals(&state, epoch, &interval, &table, kepler_options()).unwrap();
        assert_eq!(r.len(), 2);
        assert!(r[1].abs() <= std::f64::consts::PI);
    }

    #[test]
    fn test_finite_difference_jacobian_shape() {
        let table = kepler_table();
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let epoch = Instant::from_ms_since_j2000(0);
        let meas = vec![
            Measurement::new(Instant::from_ms_since_j2000(1000), 0.2, 0.001, 12.0).unwrap(),
            Measurement::new(Instant::from_ms_since_j2000(2000), 0.21, 0.002, 12.0).unwrap(),
        ];
        let seance = Seance::new("s1", Vector3::new(6_378_000.0, 0.0, 0.0), meas).unwrap();
        let all = vec![seance];
        let interval = MeasuringInterval::new(&all, Instant::from_ms_since_j2000(0), Instant::from_ms_since_j2000(10_000));
        let eps = [1.0, 1.0, 1.0, 0.01, 0.01, 0.01];
        let (r, jac) = residuals_with_finite_difference_jacobian(&state, epoch, &interval, &table, kepler_options(), eps).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(jac.nrows(), 6);
        assert_eq!(jac.ncols(), 4);
    }
}
