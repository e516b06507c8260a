//! Atmospheric drag acceleration.
//!
//! `a_drag = -|v_rel| * rho * s * v_rel`, where `v_rel` is velocity relative
//! to the rotating atmosphere (the state velocity already expressed in the
//! GRW frame) and `s` is a ballistic coefficient lumping cross-section, drag
//! coefficient and mass into one scalar.

use crate::linalg::Rotation;
use nalgebra::Vector3;

/// One flat panel of a surface mesh, in the satellite's body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Outward unit normal, body frame.
    pub normal: Vector3<f64>,
    /// Panel area, m^2.
    pub area: f64,
}

/// Drag acceleration for a single lumped ballistic coefficient `s`.
pub fn acceleration(v_rel: &Vector3<f64>, rho: f64, s: f64) -> Vector3<f64> {
    -v_rel.norm() * rho * s * v_rel
}

/// `d(a_drag)/d(v_rel)` at fixed `rho`, `s`: the 3x3 sensitivity used by the
/// variational propagator.
///
/// `a = -|v| * rho * s * v`, so `da/dv = -rho*s*(|v|*I + v*v^T/|v|)`.
pub fn jacobian(v_rel: &Vector3<f64>, rho: f64, s: f64) -> nalgebra::Matrix3<f64> {
    let speed = v_rel.norm();
    if speed < 1e-12 {
        return nalgebra::Matrix3::zeros();
    }
    let identity = nalgebra::Matrix3::identity();
    -rho * s * (speed * identity + v_rel * v_rel.transpose() / speed)
}

/// Projected effective cross-section of a mesh facing velocity direction
/// `v_hat` (unit), with each face normal rotated into the inertial frame by
/// `attitude` before the dot product.
///
/// `s = sum(face.area * max(0, n_hat . v_hat))` over all faces.
pub fn projected_area(faces: &[Face], v_hat: &Vector3<f64>, attitude: Rotation) -> f64 {
    faces
        .iter()
        .map(|f| {
            let n = attitude * f.normal;
            f.area * n.dot(v_hat).max(0.0)
        })
        .sum()
}

/// Drag acceleration computed from a surface mesh instead of a single lumped
/// ballistic coefficient.
pub fn acceleration_multi_face(v_rel: &Vector3<f64>, rho: f64, faces: &[Face], attitude: Rotation, mass: f64) -> Vector3<f64> {
    let speed = v_rel.norm();
    if speed < 1e-12 {
        return Vector3::zeros();
    }
    let v_hat = v_rel / speed;
    let s = projected_area(faces, &v_hat, attitude) / mass;
    acceleration(v_rel, rho, s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_drag_opposes_velocity() {
        let v = Vector3::new(7500.0, 0.0, 0.0);
        let a = acceleration(&v, 1e-12, 0.01);
        assert!(a.x < 0.0);
        assert_eq!(a.y, 0.0);
        assert_eq!(a.z, 0.0);
    }

    #[test]
    fn test_drag_jacobian_zero_velocity() {
        let v = Vector3::zeros();
        let j = jacobian(&v, 1e-12, 0.01);
        assert_eq!(j, nalgebra::Matrix3::zeros());
    }

    #[test]
    fn test_projected_area_single_face_head_on() {
        let faces = [Face { normal: Vector3::new(1.0, 0.0, 0.0), area: 2.0 }];
        let v_hat = Vector3::new(1.0, 0.0, 0.0);
        let s = projected_area(&faces, &v_hat, Rotation::identity());
        assert_relative_eq!(s, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_projected_area_backface_culled() {
        let faces = [Face { normal: Vector3::new(-1.0, 0.0, 0.0), area: 2.0 }];
        let v_hat = Vector3::new(1.0, 0.0, 0.0);
        let s = projected_area(&faces, &v_hat, Rotation::identity());
        assert_relative_eq!(s, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_multi_face_matches_lumped_for_equivalent_area() {
        let v = Vector3::new(7500.0, 0.0, 0.0);
        let faces = [Face { normal: Vector3::new(1.0, 0.0, 0.0), area: 1.0 }];
        let a = acceleration_multi_face(&v, 1e-12, &faces, Rotation::identity(), 1.0);
        let expected = acceleration(&v, 1e-12, 1.0);
        assert_relative_eq!(a, expected, epsilon = 1e-12);
    }
}
