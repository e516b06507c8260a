//! Right-hand side of the propagated ODE: composes force components into
//! a derivative function, in two capability tiers that share one harmonics
//! table and one ballistic coefficient.
//!
//! - [`Forces::derivative6`] — plain 6-state derivative.
//! - [`Forces::derivative_with_sensitivity`] — derivative plus the 6x6
//!   Jacobian `d(derivative)/d(state)`, consumed by the variational
//!   propagator to advance a state-transition matrix alongside the state.
//!
//! This is a capability trait rather than an inheritance hierarchy: callers
//! that only need `derivative6` never pay for the Hessian evaluation inside
//! `derivative_with_sensitivity`.

use crate::atmosphere::{self, SpaceWeather};
use crate::drag;
use crate::error::Result;
use crate::frames;
use crate::geopotential::Geopotential;
use crate::harmonics::{HarmonicsTable, MOON_MU, SUN_MU};
use crate::linalg::State6;
use crate::sidereal::{sidereal_time, EARTH_ANGULAR_VELOCITY};
use crate::srp;
use crate::thirdbody;
use crate::time::Instant;
use nalgebra::{Matrix3, Matrix6, Vector3};
use std::sync::Arc;

/// Altitude band and force-component toggles shared by every variant built
/// from the same [`Forces`] instance.
#[derive(Clone)]
pub struct ForceOptions {
    pub degree: usize,
    pub h_min: f64,
    pub h_max: f64,
    pub ballistic_coefficient: f64,
    /// Effective area-times-reflectivity coefficient (m²) consumed by solar
    /// radiation pressure when [`ForceOptions::enable_srp`] is set. Unlike
    /// the ballistic coefficient this has no on-orbit fit path; it is an
    /// externally-supplied constant, the same way the caller pins down a
    /// spacecraft's cross-section from its known geometry.
    pub radiation_coefficient: f64,
    pub enable_sun: bool,
    pub enable_moon: bool,
    pub enable_drag: bool,
    pub enable_srp: bool,
    pub weather: Option<Arc<SpaceWeather>>,
}

impl Default for ForceOptions {
    fn default() -> Self {
        ForceOptions {
            degree: 4,
            h_min: 150_000.0,
            h_max: 2_500_000.0,
            ballistic_coefficient: 0.0,
            radiation_coefficient: 0.0,
            enable_sun: true,
            enable_moon: true,
            enable_drag: true,
            enable_srp: false,
            weather: None,
        }
    }
}

/// WGS-style ellipsoid altitude above the reference ellipsoid, metres, from
/// GRW Cartesian position.
fn altitude(p: &Vector3<f64>, table: &HarmonicsTable) -> f64 {
    let sph = frames::ort_to_sph(p);
    let lat = sph.y;
    let re = table.rad;
    let f = table.flat;
    let local_radius = re * (1.0 - f * lat.sin().powi(2));
    sph.x - local_radius
}

/// Composes geopotential, third-body, drag, SRP and frame-rotation forces
/// against one immutable harmonics table.
pub struct Forces<'a> {
    geopotential: Geopotential<'a>,
    table: &'a HarmonicsTable,
    options: ForceOptions,
}

impl<'a> Forces<'a> {
    pub fn new(table: &'a HarmonicsTable, options: ForceOptions) -> Self {
        let geopotential = Geopotential::new(table, options.degree);
        Forces { geopotential, table, options }
    }

    fn check_altitude(&self, p: &Vector3<f64>, t: Instant) -> Result<()> {
        let h = altitude(p, self.table);
        if h < self.options.h_min || h > self.options.h_max {
            return Err(crate::error::OrbitError::HeightOutOfBounds { h, t, h_min: self.options.h_min, h_max: self.options.h_max });
        }
        Ok(())
    }

    /// Sums the geopotential and frame-rotation contributions at `(p, v)`;
    /// third-body, drag and SRP are added separately by the caller since each
    /// is gated on its own enable flag and coefficient.
    fn base_acceleration(&mut self, p: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        let omega = self.table.angv;
        let mut a = self.geopotential.acceleration(p);
        a.x += omega * omega * p.x + 2.0 * omega * v.y;
        a.y += omega * omega * p.y - 2.0 * omega * v.x;
        a
    }

    fn third_body_acceleration(&self, p: &Vector3<f64>, t: Instant) -> Vector3<f64> {
        let mut a = Vector3::zeros();
        if self.options.enable_sun {
            a += thirdbody::sun_acceleration(p, t);
        }
        if self.options.enable_moon {
            a += thirdbody::moon_acceleration(p, t);
        }
        a
    }

    fn drag_acceleration(&self, p: &Vector3<f64>, v: &Vector3<f64>, t: Instant, s: f64) -> Result<Vector3<f64>> {
        if !self.options.enable_drag || s == 0.0 {
            return Ok(Vector3::zeros());
        }
        let weather = match &self.options.weather {
            Some(w) => w,
            None => return Ok(Vector3::zeros()),
        };
        let (f10_7, f81, kp) = weather(t);
        let h = altitude(p, self.table);
        let sun_grw = thirdbody::sun_position_grw(t);
        let sun_sph = frames::ort_to_sph(&sun_grw);
        let rho = atmosphere::density(p, h, t, sun_sph.z, sun_sph.y, f10_7, f81, kp)?;
        Ok(drag::acceleration(v, rho, s))
    }

    fn srp_acceleration(&self, p: &Vector3<f64>, t: Instant, c: f64) -> Vector3<f64> {
        if !self.options.enable_srp || c == 0.0 {
            return Vector3::zeros();
        }
        let sun = thirdbody::sun_position_grw(t);
        srp::acceleration(p, &sun, c)
    }

    /// `f(state6, t) -> derivative6`: frame rotation + geopotential + Sun +
    /// Moon + drag, scaled by [`ForceOptions::ballistic_coefficient`], plus
    /// optional SRP scaled by [`ForceOptions::radiation_coefficient`].
    pub fn derivative6(&mut self, state: &State6, t: Instant) -> Result<State6> {
        let p = Vector3::new(state[0], state[1], state[2]);
        let v = Vector3::new(state[3], state[4], state[5]);
        self.check_altitude(&p, t)?;

        let mut a = self.base_acceleration(&p, &v);
        a += self.third_body_acceleration(&p, t);
        a += self.drag_acceleration(&p, &v, t, self.options.ballistic_coefficient)?;
        a += self.srp_acceleration(&p, t, self.options.radiation_coefficient);

        Ok(State6::new(v.x, v.y, v.z, a.x, a.y, a.z))
    }

    /// `d(base_acceleration)/d(position)`: geopotential Hessian plus the
    /// third-body and frame-rotation contributions' closed-form 3x3
    /// sensitivities.
    fn acceleration_position_jacobian(&mut self, p: &Vector3<f64>, t: Instant) -> Matrix3<f64> {
        let (_, mut jac) = self.geopotential.acceleration_with_jacobian(p);
        let omega = self.table.angv;
        jac[(0, 0)] += omega * omega;
        jac[(1, 1)] += omega * omega;
        if self.options.enable_sun {
            jac += thirdbody::third_body_jacobian(p, &thirdbody::sun_position_grw(t), SUN_MU);
        }
        if self.options.enable_moon {
            jac += thirdbody::third_body_jacobian(p, &thirdbody::moon_position_grw(t), MOON_MU);
        }
        jac
    }

    fn acceleration_velocity_jacobian(&self, v: &Vector3<f64>, p: &Vector3<f64>, t: Instant) -> Matrix3<f64> {
        let omega = self.table.angv;
        let mut jac = Matrix3::new(0.0, 2.0 * omega, 0.0, -2.0 * omega, 0.0, 0.0, 0.0, 0.0, 0.0);
        if self.options.enable_drag && self.options.ballistic_coefficient != 0.0 {
            if let Some(weather) = &self.options.weather {
                let (f10_7, f81, kp) = weather(t);
                let h = altitude(p, self.table);
                let sun_grw = thirdbody::sun_position_grw(t);
                let sun_sph = frames::ort_to_sph(&sun_grw);
                if let Ok(rho) = atmosphere::density(p, h, t, sun_sph.z, sun_sph.y, f10_7, f81, kp) {
                    jac += drag::jacobian(v, rho, self.options.ballistic_coefficient);
                }
            }
        }
        jac
    }

    /// `f(state6, t) -> (derivative6, A)` where `A = d(derivative6)/d(state6)`
    /// is the 6x6 block used to advance a state-transition matrix:
    /// `Phi' = A * Phi`.
    pub fn derivative_with_sensitivity(&mut self, state: &State6, t: Instant) -> Result<(State6, Matrix6<f64>)> {
        let derivative = self.derivative6(state, t)?;
        let p = Vector3::new(state[0], state[1], state[2]);
        let v = Vector3::new(state[3], state[4], state[5]);

        let dadr = self.acceleration_position_jacobian(&p, t);
        let dadv = self.acceleration_velocity_jacobian(&v, &p, t);

        let mut a = Matrix6::zeros();
        a.fixed_view_mut::<3, 3>(0, 3).copy_from(&Matrix3::identity());
        a.fixed_view_mut::<3, 3>(3, 0).copy_from(&dadr);
        a.fixed_view_mut::<3, 3>(3, 3).copy_from(&dadv);

        Ok((derivative, a))
    }

    /// Advances a 6 x k variational block `Phi` given the state-derivative
    /// Jacobian `A`: `Phi' = A * Phi`.
    pub fn variational_derivative(&self, a: &Matrix6<f64>, phi: &nalgebra::DMatrix<f64>) -> nalgebra::DMatrix<f64> {
        let a_dyn = nalgebra::DMatrix::from_fn(6, 6, |r, c| a[(r, c)]);
        a_dyn * phi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::{EARTH_ANGV, JGM3_FLAT, JGM3_MU, JGM3_RAD};

    fn point_mass_table() -> HarmonicsTable {
        HarmonicsTable::point_mass(JGM3_MU, JGM3_RAD, EARTH_ANGV, JGM3_FLAT)
    }

    fn kepler_options() -> ForceOptions {
        ForceOptions { degree: 0, enable_sun: false, enable_moon: false, enable_drag: false, enable_srp: false, ..Default::default() }
    }

    #[test]
    fn test_derivative6_velocity_components_match_state() {
        let table = point_mass_table();
        let mut forces = Forces::new(&table, kepler_options());
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let d = forces.derivative6(&state, t).unwrap();
        assert_eq!(d[0], state[3]);
        assert_eq!(d[1], state[4]);
        assert_eq!(d[2], state[5]);
    }

    #[test]
    fn test_derivative6_rejects_low_altitude() {
        let table = point_mass_table();
        let mut forces = Forces::new(&table, kepler_options());
        let state = State6::new(6_400_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        assert!(forces.derivative6(&state, t).is_err());
    }

    #[test]
    fn test_srp_disabled_matches_zero_radiation_coefficient() {
        let table = point_mass_table();
        let mut forces_off = Forces::new(&table, kepler_options());
        let mut forces_on = Forces::new(&table, ForceOptions { enable_srp: true, ..kepler_options() });
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let d_off = forces_off.derivative6(&state, t).unwrap();
        let d_on = forces_on.derivative6(&state, t).unwrap();
        assert_eq!(d_off, d_on);
    }

    #[test]
    fn test_srp_enabled_perturbs_acceleration() {
        let table = point_mass_table();
        let mut forces_off = Forces::new(&table, kepler_options());
        let mut forces_on = Forces::new(&table, ForceOptions { enable_srp: true, radiation_coefficient: 20.0, ..kepler_options() });
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let d_off = forces_off.derivative6(&state, t).unwrap();
        let d_on = forces_on.derivative6(&state, t).unwrap();
        assert!((d_off[3] - d_on[3]).abs() > 1e-12 || (d_off[4] - d_on[4]).abs() > 1e-12 || (d_off[5] - d_on[5]).abs() > 1e-12);
    }

    #[test]
    fn test_sensitivity_position_block_is_identity() {
        let table = point_mass_table();
        let mut forces = Forces::new(&table, kepler_options());
        let state = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let (_, a) = forces.derivative_with_sensitivity(&state, t).unwrap();
        assert_eq!(a.fixed_view::<3, 3>(0, 3).into_owned(), Matrix3::identity());
    }
}
