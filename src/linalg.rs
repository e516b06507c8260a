//! Linear algebra primitives shared by the force model and the solver.
//!
//! State vectors are fixed-size `nalgebra` types; the Jacobians and normal
//! equations built up during a solver iteration are dynamically sized, since
//! their dimension depends on how many parameters are being fit.

use crate::error::{OrbitError, Result};
use nalgebra::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};

/// Six-dimensional position/velocity state in the Earth-fixed (GRW) frame.
pub type State6 = nalgebra::SVector<f64, 6>;

/// A 3x3 Jacobian, used for third-body and drag sensitivity blocks.
pub type Jacobian3 = Matrix3<f64>;

/// A unit quaternion, used by the rotation estimator and multi-face drag model.
pub type Rotation = UnitQuaternion<f64>;

/// Builds the rotation taking `from` to `to`, both unit vectors.
///
/// Degenerate when `from == -to`; callers in this crate only use it on vectors
/// separated by much less than pi so this is not handled specially.
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> Rotation {
    UnitQuaternion::rotation_between(from, to).unwrap_or(UnitQuaternion::identity())
}

/// Solves `min ||A^T x - b||^2` for `x`, optionally with a symmetric prior
/// matrix added to the normal equations, by forming `S = A*A^T (+ prior)`,
/// diagonally pre-conditioning, inverting, and un-preconditioning.
///
/// `a` has shape `(n, m)`: `n` parameters (rows) by `m` residuals (columns).
/// `b` has length `m`. Returns the `n`-vector minimizing the residual.
pub fn lstsq(a: &DMatrix<f64>, b: &DVector<f64>, prior: Option<&DMatrix<f64>>) -> Result<DVector<f64>> {
    let mut s = a * a.transpose();
    if let Some(p) = prior {
        s += p;
    }
    let n = s.nrows();
    let mut diag = DVector::<f64>::zeros(n);
    for i in 0..n {
        let d = s[(i, i)];
        if d <= 0.0 {
            return Err(OrbitError::SingularMatrix);
        }
        diag[i] = 1.0 / d.sqrt();
    }
    // S <- D * S * D (diagonal pre-conditioning on both sides)
    for i in 0..n {
        for j in 0..n {
            s[(i, j)] *= diag[i] * diag[j];
        }
    }
    let s_inv = s.try_inverse().ok_or(OrbitError::SingularMatrix)?;
    let mut s_final = s_inv;
    for i in 0..n {
        for j in 0..n {
            s_final[(i, j)] *= diag[i] * diag[j];
        }
    }
    Ok(s_final * (a * b))
}

/// Diagonal of `A * A^T`, used by the solver to scale the LM damping term.
pub fn normal_diagonal(a: &DMatrix<f64>) -> DVector<f64> {
    let n = a.nrows();
    let mut out = DVector::zeros(n);
    for i in 0..n {
        out[i] = a.row(i).dot(&a.row(i));
    }
    out
}

/// `|oldval - newval| < eps * max(|oldval|, |newval|)`, with an absolute
/// floor of `eps * 1e-12` for near-zero magnitudes. Shared convergence test
/// for the solver's residual norm and the rotation estimator's grid refinement.
pub(crate) fn is_equal(oldval: f64, newval: f64, eps: f64) -> bool {
    let scale = oldval.abs().max(newval.abs()).max(1e-12);
    (oldval - newval).abs() < eps * scale
}

/// Wraps `delta` into the signed-shortest representative of its residue class
/// modulo `2*pi`: the result lies in `(-pi, pi]`.
///
/// Used for right-ascension residuals so a prediction near the 0/2*pi branch
/// cut does not produce a spuriously large error.
pub fn wrap_angle(delta: f64) -> f64 {
    use std::f64::consts::PI;
    let wrapped = delta - (delta / (2.0 * PI)).round() * 2.0 * PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    #[test]
    fn test_lstsq_exact_solution() {
        let a = dmatrix![1.0, 0.0; 0.0, 1.0];
        let b = DVector::from_vec(vec![3.0, 4.0]);
        let x = lstsq(&a, &b, None).unwrap();
        assert_relative_eq!(x[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lstsq_singular_fails() {
        let a = DMatrix::<f64>::zeros(2, 2);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!(matches!(lstsq(&a, &b, None), Err(OrbitError::SingularMatrix)));
    }

    #[test]
    fn test_wrap_angle_branch_cut() {
        use std::f64::consts::TAU;
        // prediction lambda=0.001, measurement a=2*pi-0.001 => delta = a - lambda wraps to -0.002
        let delta = (TAU - 0.001) - 0.001;
        assert_relative_eq!(wrap_angle(delta), -0.002, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_angle_small_value_unchanged() {
        assert_relative_eq!(wrap_angle(0.01), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_between_maps_from_to_to() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 1.0, 0.0);
        let q = rotation_between(&from, &to);
        assert_relative_eq!(q * from, to, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_composition() {
        let axis = Vector3::z_axis();
        let q1 = UnitQuaternion::from_axis_angle(&axis, 0.3);
        let q2 = UnitQuaternion::from_axis_angle(&axis, 0.7);
        let v = Vector3::new(1.0, 0.0, 0.0);
        let lhs = (q1 * q2) * v;
        let rhs = q1 * (q2 * v);
        assert_relative_eq!(lhs, rhs, epsilon = 1e-12);
    }
}
