//! Levenberg-Marquardt non-linear least-squares solver, with parallel
//! exploration of the damping parameter at each iteration.

use crate::error::{OrbitError, Result};
use crate::harmonics::HarmonicsTable;
use crate::linalg::{is_equal, normal_diagonal, State6};
use crate::measurement::MeasuringInterval;
use crate::motion::ForceOptions;
use crate::residuals::{residuals, residuals_with_finite_difference_jacobian, residuals_with_jacobian};
use crate::time::Instant;
use lazy_static::lazy_static;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

const MIN_POINTS: usize = 7;

lazy_static! {
    /// Fixed-size worker pool for the damping-parameter search, sized once at
    /// process start to the detected hardware concurrency. Reused across every
    /// `solve` call rather than rebuilt per iteration.
    static ref DAMPING_POOL: rayon::ThreadPool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .thread_name(|i| format!("ballistic-damping-{i}"))
        .build()
        .expect("failed to build the damping-search worker pool");
}

/// Tunables for one `solve` call.
#[derive(Clone)]
pub struct SolverOptions {
    /// Relative convergence threshold on the residual norm.
    pub eps: f64,
    /// Outer iteration budget.
    pub max_iter: usize,
    /// Whether to use the analytic (variational) Jacobian instead of
    /// parallel finite differences.
    pub analytic_jacobian: bool,
    /// Finite-difference step per state component, used only when
    /// `analytic_jacobian` is false.
    pub finite_difference_eps: [f64; 6],
    /// Optional a-priori correlation prior added to the normal matrix.
    pub prior: Option<DMatrix<f64>>,
    pub force_options: ForceOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            eps: 1e-3,
            max_iter: 20,
            analytic_jacobian: true,
            finite_difference_eps: [1.0, 1.0, 1.0, 0.01, 0.01, 0.01],
            prior: None,
            force_options: ForceOptions::default(),
        }
    }
}

/// One completed iteration, sufficient to reconstruct the full convergence
/// history.
#[derive(Clone)]
pub struct IterationRecord {
    pub n: usize,
    pub r: f64,
    pub v: State6,
    pub dv: DVector<f64>,
    pub rv: DVector<f64>,
    pub dm: DMatrix<f64>,
}

/// Sink for [`IterationRecord`]s. Implementations range from no-op to
/// append-to-vector to stream-to-file; the solver makes no assumptions
/// about what happens after `save` returns.
pub trait IterationsSaver {
    fn save(&mut self, record: IterationRecord);
}

/// An [`IterationsSaver`] that keeps every record in memory, for tests and
/// offline convergence analysis.
#[derive(Default)]
pub struct VecLogger(pub Vec<IterationRecord>);

/// A `solve` call that could not run to completion: the propagation error
/// that aborted it, paired with the best iterate accepted before that point
/// (or the caller's `initial` guess, if no iteration was accepted yet).
#[derive(Debug, Clone)]
pub struct SolveFailure {
    pub error: OrbitError,
    pub best: State6,
}

impl IterationsSaver for VecLogger {
    fn save(&mut self, record: IterationRecord) {
        self.0.push(record);
    }
}

fn residual_norm(r: &DVector<f64>) -> f64 {
    r.dot(r)
}

/// Gauss-Newton correction `dv = -(J*J^T + lambda*diag(J*J^T) + prior)^-1 * J*r`,
/// the scaling-by-diagonal variant of Levenberg-Marquardt.
fn lm_correction(jac: &DMatrix<f64>, r: &DVector<f64>, lambda: f64, prior: Option<&DMatrix<f64>>) -> Result<DVector<f64>> {
    let mut s = jac * jac.transpose();
    let diag = normal_diagonal(jac);
    for i in 0..s.nrows() {
        s[(i, i)] += lambda * diag[i];
    }
    if let Some(p) = prior {
        s += p;
    }
    let s_inv = s.try_inverse().ok_or(OrbitError::SingularMatrix)?;
    Ok(-(s_inv * (jac * r)))
}

struct Candidate {
    lambda: f64,
    dv: Option<DVector<f64>>,
    norm: f64,
}

fn evaluate_candidate(
    lambda: f64,
    v: &State6,
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    epoch: Instant,
    interval: &MeasuringInterval,
    table: &HarmonicsTable,
    options: &SolverOptions,
) -> Candidate {
    match lm_correction(jac, r, lambda, options.prior.as_ref()) {
        Ok(dv) => {
            let trial = v + State6::new(dv[0], dv[1], dv[2], dv[3], dv[4], dv[5]);
            match residuals(&trial, epoch, interval, table, options.force_options.clone()) {
                Ok(trial_r) => Candidate { lambda, norm: residual_norm(&trial_r), dv: Some(dv) },
                Err(_) => Candidate { lambda, norm: f64::INFINITY, dv: None },
            }
        }
        Err(_) => Candidate { lambda, norm: f64::INFINITY, dv: None },
    }
}

/// Levenberg-Marquardt fit of a 6-state against the measurements in
/// `interval`, starting from `initial` at `epoch`.
///
/// Each outer iteration computes the residual vector and Jacobian, then
/// explores damping candidates `{0.5*lambda, lambda, 1.5*lambda}` in
/// parallel, accepting the lowest-residual candidate and retrying with an
/// expanded `lambda` when none improves on the current iterate.
///
/// A propagation failure partway through aborts the fit, but the best
/// iterate accepted up to that point is not discarded: it comes back in
/// [`SolveFailure::best`] alongside the error that ended the fit.
pub fn solve(
    initial: State6,
    epoch: Instant,
    interval: &MeasuringInterval,
    table: &HarmonicsTable,
    options: SolverOptions,
    mut logger: Option<&mut dyn IterationsSaver>,
) -> std::result::Result<State6, SolveFailure> {
    if interval.points_count() < MIN_POINTS {
        return Err(SolveFailure { error: OrbitError::InsufficientPoints { required: MIN_POINTS, found: interval.points_count() }, best: initial });
    }

    let mut v = initial;
    let mut lambda = 0.1;

    for iteration in 1..=options.max_iter {
        let (rv, dm) = if options.analytic_jacobian {
            residuals_with_jacobian(&v, epoch, interval, table, options.force_options.clone())
        } else {
            residuals_with_finite_difference_jacobian(&v, epoch, interval, table, options.force_options.clone(), options.finite_difference_eps)
        }
        .map_err(|error| SolveFailure { error, best: v })?;
        let base_norm = residual_norm(&rv);

        let mut accepted: Option<(f64, DVector<f64>, f64)> = None;
        for _ in 0..options.max_iter {
            let lambdas = [0.5 * lambda, lambda, 1.5 * lambda];
            let candidates: Vec<Candidate> = DAMPING_POOL
                .install(|| lambdas.into_par_iter().map(|l| evaluate_candidate(l, &v, &dm, &rv, epoch, interval, table, &options)).collect());

            let best = candidates.iter().enumerate().min_by(|a, b| a.1.norm.partial_cmp(&b.1.norm).unwrap()).unwrap();

            if best.1.norm < base_norm {
                if let Some(dv) = &candidates[best.0].dv {
                    accepted = Some((candidates[best.0].lambda, dv.clone(), best.1.norm));
                }
                break;
            }

            let cor = (candidates[0].lambda - candidates[2].lambda) / (candidates[0].norm - candidates[2].norm);
            lambda = if cor > 0.0 { lambda * 0.5 } else { lambda * 1.5 };
        }

        let (new_lambda, dv, new_norm) = match accepted {
            Some(triple) => triple,
            None => {
                if let Some(l) = logger.as_deref_mut() {
                    l.save(IterationRecord { n: iteration, r: base_norm, v, dv: DVector::zeros(6), rv: rv.clone(), dm: dm.clone() });
                }
                return Ok(v);
            }
        };
        lambda = new_lambda;

        if let Some(l) = logger.as_deref_mut() {
            l.save(IterationRecord { n: iteration, r: base_norm, v, dv: dv.clone(), rv: rv.clone(), dm: dm.clone() });
        }

        v += State6::new(dv[0], dv[1], dv[2], dv[3], dv[4], dv[5]);

        if is_equal(base_norm, new_norm, options.eps) {
            return Ok(v);
        }
    }

    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_equal_relative_tolerance() {
        assert!(is_equal(100.0, 100.05, 1e-3));
        assert!(!is_equal(100.0, 110.0, 1e-3));
    }

    #[test]
    fn test_is_equal_absolute_floor_for_tiny_residuals() {
        assert!(is_equal(0.0, 1e-15, 1e-3));
    }

    #[test]
    fn test_solve_rejects_too_few_points() {
        use crate::harmonics::{EARTH_ANGV, JGM3_FLAT, JGM3_MU, JGM3_RAD};
        use crate::measurement::{Measurement, Seance};
        use nalgebra::Vector3;

        let table = HarmonicsTable::point_mass(JGM3_MU, JGM3_RAD, EARTH_ANGV, JGM3_FLAT);
        let meas = vec![Measurement::new(Instant::from_ms_since_j2000(1000), 0.2, 0.1, 12.0).unwrap()];
        let seance = Seance::new("s1", Vector3::new(6_378_000.0, 0.0, 0.0), meas).unwrap();
        let all = vec![seance];
        let interval = MeasuringInterval::new(&all, Instant::from_ms_since_j2000(0), Instant::from_ms_since_j2000(10_000));
        let initial = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
        let result = solve(initial, Instant::from_ms_since_j2000(0), &interval, &table, SolverOptions::default(), None);
        match result {
            Err(failure) => {
                assert!(matches!(failure.error, OrbitError::InsufficientPoints { .. }));
                assert_eq!(failure.best, initial);
            }
            Ok(_) => panic!("expected InsufficientPoints failure"),
        }
    }
}
