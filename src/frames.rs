//! Coordinate frame transforms.
//!
//! Frames form a small closed set: {ABS, GRW} (Earth-centred inertial /
//! Earth-fixed rotating) crossed with {ORT, SPH} (Cartesian / spherical),
//! plus an ecliptic frame used only by the Sun/Moon series. Every pair that
//! this crate's force models and residual assembler need is exposed as a
//! named `forward`/`backward` function, mirroring the directed-pair
//! convention the propagator is built around: `forward` always moves from
//! the inertial/spherical side toward the rotating/Cartesian side.

use nalgebra::Vector3;

/// Cartesian -> spherical: `(r, latitude/declination, longitude/right ascension)`.
pub fn ort_to_sph(v: &Vector3<f64>) -> Vector3<f64> {
    let len = (v.x * v.x + v.y * v.y).sqrt();
    let r = (len * len + v.z * v.z).sqrt();
    let lat = v.z.atan2(len);
    let lon = v.y.atan2(v.x);
    Vector3::new(r, lat, lon)
}

/// Spherical -> Cartesian, inverse of [`ort_to_sph`].
pub fn sph_to_ort(v: &Vector3<f64>) -> Vector3<f64> {
    let (r, lat, lon) = (v.x, v.y, v.z);
    let cl = lat.cos();
    Vector3::new(r * lon.cos() * cl, r * lon.sin() * cl, r * lat.sin())
}

/// ABS-ORT -> GRW-ORT: rotates by `-sidereal_time` about the z-axis.
pub fn abs_to_grw_ort(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    let (s, c) = sidereal_time.sin_cos();
    Vector3::new(v.x * c + v.y * s, v.y * c - v.x * s, v.z)
}

/// GRW-ORT -> ABS-ORT, inverse of [`abs_to_grw_ort`].
pub fn grw_to_abs_ort(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    let (s, c) = sidereal_time.sin_cos();
    Vector3::new(v.x * c - v.y * s, v.y * c + v.x * s, v.z)
}

/// Velocity-coupled ABS-ORT -> GRW-ORT, accounting for the frame's angular
/// velocity `omega` (rad/s) via the Coriolis-coupled terms.
pub fn abs_to_grw_ort6(r: &Vector3<f64>, v: &Vector3<f64>, sidereal_time: f64, omega: f64) -> (Vector3<f64>, Vector3<f64>) {
    let gr = abs_to_grw_ort(r, sidereal_time);
    let mut gv = abs_to_grw_ort(v, sidereal_time);
    gv.x += omega * gr.y;
    gv.y -= omega * gr.x;
    (gr, gv)
}

/// GRW-ORT -> ABS-ORT, velocity-coupled inverse of [`abs_to_grw_ort6`].
pub fn grw_to_abs_ort6(r: &Vector3<f64>, v: &Vector3<f64>, sidereal_time: f64, omega: f64) -> (Vector3<f64>, Vector3<f64>) {
    let ar = grw_to_abs_ort(r, sidereal_time);
    let mut av = grw_to_abs_ort(v, sidereal_time);
    av.x -= omega * ar.y;
    av.y += omega * ar.x;
    (ar, av)
}

/// Wraps an angle into `[0, 2*pi)`.
pub(crate) fn fit_to_round(a: f64) -> f64 {
    a.rem_euclid(std::f64::consts::TAU)
}

/// ABS-SPH -> GRW-SPH: longitude shifts by `+sidereal_time`.
pub fn abs_to_grw_sph(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    Vector3::new(v.x, v.y, fit_to_round(v.z + sidereal_time))
}

/// GRW-SPH -> ABS-SPH, inverse of [`abs_to_grw_sph`].
pub fn grw_to_abs_sph(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    Vector3::new(v.x, v.y, fit_to_round(v.z - sidereal_time))
}

/// ABS-SPH -> GRW-ORT.
pub fn abs_sph_to_grw_ort(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    sph_to_ort(&abs_to_grw_sph(v, sidereal_time))
}

/// GRW-ORT -> ABS-SPH, inverse of [`abs_sph_to_grw_ort`].
pub fn grw_ort_to_abs_sph(v: &Vector3<f64>, sidereal_time: f64) -> Vector3<f64> {
    grw_to_abs_sph(&ort_to_sph(v), sidereal_time)
}

/// ABS -> ecliptic, rotation by the obliquity `eps` about the x-axis.
pub fn abs_to_ecl(v: &Vector3<f64>, eps: f64) -> Vector3<f64> {
    let (s, c) = eps.sin_cos();
    Vector3::new(v.x, v.y * c + v.z * s, -v.y * s + v.z * c)
}

/// Ecliptic -> ABS, inverse of [`abs_to_ecl`].
pub fn ecl_to_abs(v: &Vector3<f64>, eps: f64) -> Vector3<f64> {
    let (s, c) = eps.sin_cos();
    Vector3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ort_sph_roundtrip() {
        let v = Vector3::new(100.0, -250.0, 900.0);
        let sph = ort_to_sph(&v);
        let back = sph_to_ort(&sph);
        assert_relative_eq!(back, v, epsilon = 1e-9);
    }

    #[test]
    fn test_abs_grw_ort_roundtrip() {
        let v = Vector3::new(7000e3, 1200e3, -300e3);
        let st = 1.234;
        let grw = abs_to_grw_ort(&v, st);
        let back = grw_to_abs_ort(&grw, st);
        assert_relative_eq!(back, v, epsilon = 1e-6);
    }

    #[test]
    fn test_abs_grw_ort6_roundtrip() {
        let r = Vector3::new(7000e3, 0.0, 0.0);
        let v = Vector3::new(0.0, 7546.0, 0.0);
        let st = 0.5;
        let omega = 72.92115e-6;
        let (gr, gv) = abs_to_grw_ort6(&r, &v, st, omega);
        let (ar, av) = grw_to_abs_ort6(&gr, &gv, st, omega);
        assert_relative_eq!(ar, r, epsilon = 1e-6);
        assert_relative_eq!(av, v, epsilon = 1e-6);
    }

    #[test]
    fn test_ecl_abs_roundtrip() {
        let v = Vector3::new(1.0, 0.4, -0.2);
        let eps = 0.409;
        let back = ecl_to_abs(&abs_to_ecl(&v, eps), eps);
        assert_relative_eq!(back, v, epsilon = 1e-12);
    }
}
