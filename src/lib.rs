//! # ballistic-core
//!
//! Core orbit-determination engine for a ground-based satellite tracking
//! pipeline: a force-model propagator, a variational (state-transition
//! matrix) propagator, an angular-residual assembler, a Levenberg-Marquardt
//! least-squares solver, and a photometric spin-axis estimator.
//!
//! ## Layers
//!
//! ### Time and frames
//! - [`time`] — millisecond-resolution `Instant`/`Duration`, Julian Date
//!   conversions at the `chrono` boundary
//! - [`sidereal`] — Greenwich apparent sidereal time
//! - [`frames`] — GRW (Earth-fixed) / ABS (inertial) / ecliptic conversions
//! - [`linalg`] — state types, quaternion rotations, shared least-squares and
//!   convergence helpers
//!
//! ### Force model
//! - [`harmonics`] — JGM3 constants and the normalized-coefficient table
//! - [`geopotential`] — associated-Legendre recurrence and its position
//!   Jacobian
//! - [`thirdbody`] — low-precision Sun/Moon ephemerides and point-mass
//!   attraction
//! - [`atmosphere`] — static (below 120 km) and space-weather-driven dynamic
//!   (120-1500 km) density models
//! - [`drag`] — single- and multi-face atmospheric drag
//! - [`srp`] — solar radiation pressure with umbra/penumbra eclipse shadowing
//! - [`motion`] — composes every force component into a `State6` derivative,
//!   plus the 6x6 sensitivity block for the variational propagator
//!
//! ### Propagation and fitting
//! - [`integrator`] — ABM8 predictor-corrector with RK4 bootstrap and
//!   Lagrange interpolation, generic over any [`integrator::State`]
//! - [`forecast`] — an immutable, window-validated trajectory
//! - [`measurement`] — angular observations, observatory batches, and
//!   windowed views over them
//! - [`residuals`] — maps a candidate state onto topocentric angular
//!   residuals, with analytic and finite-difference Jacobian variants
//! - [`solver`] — Levenberg-Marquardt fit with parallel damping-parameter
//!   search
//!
//! ### Rotation state
//! - [`rotation`] — flat-plate spin-axis estimator fitted from a
//!   single-observer photometric series
//!
//! ## Quick example: fit a state from a measuring interval
//!
//! ```no_run
//! use ballistic_core::harmonics::{HarmonicsTable, EARTH_ANGV, JGM3_FLAT, JGM3_MU, JGM3_RAD};
//! use ballistic_core::linalg::State6;
//! use ballistic_core::measurement::{Measurement, MeasuringInterval, Seance};
//! use ballistic_core::solver::{solve, SolverOptions};
//! use ballistic_core::time::Instant;
//! use nalgebra::Vector3;
//!
//! let table = HarmonicsTable::point_mass(JGM3_MU, JGM3_RAD, EARTH_ANGV, JGM3_FLAT);
//! let seances: Vec<Seance> = vec![/* populated from a tracking archive */];
//! let interval = MeasuringInterval::new(&seances, Instant::from_ms_since_j2000(0), Instant::from_ms_since_j2000(3_600_000));
//!
//! let initial = State6::new(7_000_000.0, 0.0, 0.0, 0.0, 7_546.0, 0.0);
//! let epoch = Instant::from_ms_since_j2000(0);
//! let fitted = solve(initial, epoch, &interval, &table, SolverOptions::default(), None).unwrap();
//! println!("fitted position: {:?}", fitted.fixed_rows::<3>(0));
//! ```

pub mod atmosphere;
pub mod drag;
pub mod error;
pub mod forecast;
pub mod frames;
pub mod geopotential;
pub mod harmonics;
pub mod integrator;
pub mod linalg;
pub mod measurement;
pub mod motion;
pub mod residuals;
pub mod rotation;
pub mod sidereal;
pub mod solver;
pub mod srp;
pub mod thirdbody;
pub mod time;

pub use error::{OrbitError, Result};
pub use forecast::Forecast;
pub use linalg::{Jacobian3, Rotation, State6};
pub use measurement::{Measurement, MeasuringInterval, Seance};
pub use motion::{ForceOptions, Forces};
pub use residuals::residuals;
pub use rotation::{estimate_rotation, RotationEstimate, RotationParams};
pub use solver::{solve, IterationRecord, IterationsSaver, SolveFailure, SolverOptions, VecLogger};
pub use time::{Duration, Instant};
