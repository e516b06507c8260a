//! Error types for the orbit-determination core.
//!
//! Every fallible operation in this crate returns [`OrbitError`]. The variants
//! mirror the failure points of the propagator/solver pipeline: a height
//! violation in the force model, a malformed integration step, a degenerate
//! normal-equations matrix, and so on. Callers matching on a specific variant
//! recover context (the offending altitude, the pivot row) without parsing a
//! message string.

use crate::time::Instant;
use thiserror::Error;

/// Main error type for `ballistic-core` operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrbitError {
    /// The propagated position fell outside the force model's valid altitude band.
    #[error("altitude {h:.1} m at {t:?} is outside the valid band [{h_min:.1}, {h_max:.1}] m")]
    HeightOutOfBounds {
        /// Altitude above the reference ellipsoid, metres.
        h: f64,
        /// Instant at which the violation occurred.
        t: Instant,
        /// Lower altitude bound, metres.
        h_min: f64,
        /// Upper altitude bound, metres.
        h_max: f64,
    },

    /// The integration step sign disagreed with the direction of integration, or was zero.
    #[error("invalid integration step {step}: sign must match (tk - tn)")]
    InvalidStep {
        /// The offending step value, seconds.
        step: f64,
    },

    /// Fewer than seven scalar measurements fell inside the measuring interval.
    #[error("insufficient points for a fit: need at least {required}, found {found}")]
    InsufficientPoints {
        /// Minimum scalar measurement count required by the solver.
        required: usize,
        /// Count actually present in the interval.
        found: usize,
    },

    /// The least-squares normal matrix had a zero pivot after preconditioning.
    #[error("singular matrix: could not invert the normal equations")]
    SingularMatrix,

    /// A measurement instant fell outside the window covered by a forecast.
    #[error("instant {t:?} falls outside the forecast window [{t0:?}, {t1:?}]")]
    InvalidInput {
        /// The offending instant.
        t: Instant,
        /// Forecast window start.
        t0: Instant,
        /// Forecast window end.
        t1: Instant,
    },

    /// An atmosphere model input fell outside its tabulated range.
    #[error("{parameter} = {value} outside tabulated range [{min}, {max}]")]
    CoefficientOutOfRange {
        /// Name of the out-of-range parameter.
        parameter: &'static str,
        /// The offending value.
        value: f64,
        /// Lower bound of the tabulated range.
        min: f64,
        /// Upper bound of the tabulated range.
        max: f64,
    },

    /// A reflectance series showed too little variation to constrain a spin
    /// period: every photometric ratio was within noise of every other.
    #[error("reflectance series has variance {variance:e}, too flat to fit a rotation period")]
    DegenerateSignal {
        /// Sample variance of the normalised ratio series.
        variance: f64,
    },
}

/// Type alias for `Result`s returned by this crate.
pub type Result<T> = std::result::Result<T, OrbitError>;

/// Validate that a declination lies in `[-pi/2, pi/2]`.
#[inline]
pub fn validate_declination(i: f64) -> Result<()> {
    const MAX: f64 = std::f64::consts::FRAC_PI_2;
    if !(-MAX..=MAX).contains(&i) {
        return Err(OrbitError::CoefficientOutOfRange {
            parameter: "declination",
            value: i,
            min: -MAX,
            max: MAX,
        });
    }
    Ok(())
}

/// Validate that a right ascension lies in `[0, 2*pi)`.
#[inline]
pub fn validate_right_ascension(a: f64) -> Result<()> {
    if !(0.0..std::f64::consts::TAU).contains(&a) {
        return Err(OrbitError::CoefficientOutOfRange {
            parameter: "right_ascension",
            value: a,
            min: 0.0,
            max: std::f64::consts::TAU,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_declination() {
        assert!(validate_declination(0.0).is_ok());
        assert!(validate_declination(std::f64::consts::FRAC_PI_2).is_ok());
        assert!(validate_declination(2.0).is_err());
    }

    #[test]
    fn test_validate_right_ascension() {
        assert!(validate_right_ascension(0.0).is_ok());
        assert!(validate_right_ascension(std::f64::consts::TAU).is_err());
        assert!(validate_right_ascension(-0.1).is_err());
    }

    #[test]
    fn test_height_error_display() {
        let err = OrbitError::HeightOutOfBounds {
            h: 100.0,
            t: Instant::from_ms_since_j2000(0),
            h_min: 150_000.0,
            h_max: 2_500_000.0,
        };
        assert!(err.to_string().contains("outside the valid band"));
    }
}
