//! Atmospheric density model.
//!
//! Two regimes, matching the source model this is ported from: a static
//! piecewise-exponential fit below 120 km, and a dynamic model above it that
//! blends a baseline exponential profile with solar-flux, seasonal,
//! latitude and geomagnetic corrections. Above 1500 km density is zero.
//!
//! The dynamic model's full coefficient tables span seven F81 brackets with
//! degree-3..7 polynomials per coefficient family; reproducing all of them
//! is out of scope here (see `DESIGN.md`). This module keeps all six
//! coefficient families (`a`, `l`, `c`/`n`, `d`, `b`, `e`) for three
//! representative brackets (low, medium, high solar activity) at a reduced
//! polynomial degree, which preserves the model's qualitative solar-flux,
//! seasonal, altitude and geomagnetic dependence without the full table.

use crate::error::{OrbitError, Result};
use crate::time::Instant;
use nalgebra::Vector3;

/// `weather(t) -> (F10.7, F81, Kp)`, supplied by the caller.
pub type SpaceWeather = dyn Fn(Instant) -> (f64, f64, f64) + Sync + Send;

/// Evaluates a polynomial `c[0] + c[1]*x + c[2]*x^2 + ...`.
fn poly(x: f64, c: &[f64]) -> f64 {
    let mut result = 0.0;
    for &coeff in c.iter().rev() {
        result = result * x + coeff;
    }
    result
}

/// Static density model for `h < 120 km`, `h` in km: piecewise exponential
/// with breakpoints at 0, 20, 60, 100 km.
pub fn static_density(h_km: f64) -> f64 {
    const HEIGHT: [f64; 4] = [0.0, 20.0, 60.0, 100.0];
    const COEF: [[f64; 3]; 4] = [
        [1.228, -9.0764e-2, -2.0452e-3],
        [9.013e-2, -0.16739, 6.2669e-4],
        [3.104e-4, -0.137, -7.8653e-4],
        [3.66e-7, -0.18553, 1.5397e-3],
    ];
    let mut index = 1usize;
    while index < 4 {
        if h_km < HEIGHT[index] {
            break;
        }
        index += 1;
    }
    index -= 1;
    let dh = h_km - HEIGHT[index];
    let [a, k1, k2] = COEF[index];
    a * (dh * (k1 + dh * k2)).exp()
}

struct Bracket {
    f0: f64,
    a: [f64; 3],
    l: [f64; 2],
    c: [f64; 2],
    n: [f64; 2],
    d: [f64; 2],
    b: [f64; 2],
    /// K4 (geomagnetic) altitude family, `e5` in the original: degree-1
    /// polynomial in `h_km`.
    e_h: [f64; 2],
    /// K4 (geomagnetic) Kp family, `e4` in the original: degree-1 polynomial
    /// in `kp`.
    e_kp: [f64; 2],
    phi: f64,
}

const BRACKETS: [Bracket; 3] = [
    Bracket { f0: 75.0, a: [-5.8, -0.012, 0.00003], l: [0.02, -0.00004], c: [0.02, 0.00002], n: [2.0, 0.002], d: [0.01, -0.00001], b: [0.015, 0.00001], e_h: [0.010, -0.00002], e_kp: [0.08, 0.01], phi: 0.0 },
    Bracket { f0: 150.0, a: [-5.2, -0.014, 0.000035], l: [0.03, -0.00005], c: [0.03, 0.00003], n: [2.2, 0.0022], d: [0.012, -0.000012], b: [0.02, 0.000012], e_h: [0.014, -0.000025], e_kp: [0.09, 0.012], phi: 0.3 },
    Bracket { f0: 250.0, a: [-4.6, -0.016, 0.00004], l: [0.04, -0.00006], c: [0.04, 0.00004], n: [2.4, 0.0024], d: [0.014, -0.000014], b: [0.025, 0.000014], e_h: [0.018, -0.00003], e_kp: [0.10, 0.014], phi: 0.6 },
];

fn select_bracket(f81: f64) -> &'static Bracket {
    if f81 < 100.0 {
        &BRACKETS[0]
    } else if f81 < 200.0 {
        &BRACKETS[1]
    } else {
        &BRACKETS[2]
    }
}

fn day_of_year(t: Instant) -> f64 {
    let dt = t.to_datetime();
    use chrono::Datelike;
    dt.ordinal() as f64
}

/// Dynamic density model for `120 <= h <= 1500 km`, `h` in km.
///
/// `p` is GRW Cartesian position (m); `sol_long`/`sol_incl` are the Sun's
/// GRW longitude and declination at `t`, used for the diurnal bulge term.
pub fn dynamic_density(p: &Vector3<f64>, h_km: f64, t: Instant, sol_long: f64, sol_incl: f64, f10_7: f64, f81: f64, kp: f64) -> f64 {
    let bracket = select_bracket(f81);
    let k0 = 1.0 + poly(h_km, &bracket.l) * (f81 - bracket.f0) / bracket.f0;

    let beta = sol_long + bracket.phi;
    let r = p.norm();
    let mut cosphi = (1.0 / r) * (p.z * sol_incl.sin() + sol_incl.cos() * (p.x * beta.cos() + p.y * beta.sin()));
    cosphi = (0.5 * (1.0 + cosphi)).max(0.0).sqrt();
    let k1 = poly(h_km, &bracket.c) * cosphi.powf(poly(h_km, &bracket.n));

    let annual_phase = (std::f64::consts::TAU * (day_of_year(t) - 1.0) / 365.25).cos();
    let k2 = poly(h_km, &bracket.d) * annual_phase;

    let df = f10_7 - f81;
    let k3 = poly(h_km, &bracket.b) * df / (f81 + df.abs());

    let k4 = poly(h_km, &bracket.e_h) * poly(kp, &bracket.e_kp);

    let rho = 1.58868e-8 * poly(h_km, &bracket.a).exp();
    rho * k0 * (1.0 + k1 + k2 + k3 + k4)
}

/// Combined atmosphere model: dispatches between the static and dynamic
/// regimes by altitude, returning zero above 1500 km.
///
/// `h` is altitude above the reference ellipsoid in metres.
pub fn density(p: &Vector3<f64>, h: f64, t: Instant, sol_long: f64, sol_incl: f64, f10_7: f64, f81: f64, kp: f64) -> Result<f64> {
    let h_km = h / 1000.0;
    if h_km > 1500.0 {
        return Ok(0.0);
    }
    if f81 < 0.0 {
        return Err(OrbitError::CoefficientOutOfRange { parameter: "f81", value: f81, min: 0.0, max: 400.0 });
    }
    if h_km < 120.0 {
        Ok(static_density(h_km))
    } else {
        Ok(dynamic_density(p, h_km, t, sol_long, sol_incl, f10_7, f81, kp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_density_positive_and_decreasing() {
        let rho0 = static_density(0.0);
        let rho50 = static_density(50.0);
        let rho110 = static_density(110.0);
        assert!(rho0 > rho50 && rho50 > rho110);
        assert!(rho110 > 0.0);
    }

    #[test]
    fn test_density_above_ceiling_is_zero() {
        let p = Vector3::new(8_000_000.0, 0.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let rho = density(&p, 1_600_000.0, t, 0.0, 0.0, 150.0, 150.0, 2.0).unwrap();
        assert_eq!(rho, 0.0);
    }

    #[test]
    fn test_dynamic_density_rises_with_geomagnetic_activity() {
        let p = Vector3::new(7_200_000.0, 0.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        let rho_quiet = density(&p, 400_000.0, t, 0.0, 0.0, 150.0, 150.0, 0.0).unwrap();
        let rho_active = density(&p, 400_000.0, t, 0.0, 0.0, 150.0, 150.0, 8.0).unwrap();
        assert!(rho_active > rho_quiet);
    }

    #[test]
    fn test_density_negative_f81_errors() {
        let p = Vector3::new(8_000_000.0, 0.0, 0.0);
        let t = Instant::from_ms_since_j2000(0);
        assert!(density(&p, 300_000.0, t, 0.0, 0.0, 150.0, -1.0, 2.0).is_err());
    }
}
