//! Earth gravity model constants and the harmonics table.
//!
//! The core never loads a harmonics file itself (that is an external
//! collaborator's job); it only consumes an already-populated
//! [`HarmonicsTable`] value. The constants here follow the JGM3 model, the
//! same one used throughout the force-model literature this crate's geopotential
//! recurrence is ported from.

/// One `(C_nm, S_nm)` normalized harmonic coefficient pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Harmonic {
    pub cos: f64,
    pub sin: f64,
}

/// Earth physical constants paired with a harmonic coefficient table.
///
/// Immutable once built; shared by reference across every thread the solver
/// spawns for the damping search and finite-difference Jacobian columns.
#[derive(Debug, Clone)]
pub struct HarmonicsTable {
    /// Earth's gravitational parameter, m^3/s^2.
    pub mu: f64,
    /// Equatorial radius, m.
    pub rad: f64,
    /// Mean angular velocity of Earth's rotation, rad/s.
    pub angv: f64,
    /// Flattening of the reference ellipsoid.
    pub flat: f64,
    /// Maximum degree this table supports.
    pub max_degree: usize,
    /// `(C_nm, S_nm)` pairs in the triangular `(n, m)` order used by
    /// [`crate::geopotential`]: `n = 0..=max_degree`, `m = 0..=n`.
    pub harmonics: Vec<Harmonic>,
}

/// JGM3 Earth gravitational parameter, m^3/s^2.
pub const JGM3_MU: f64 = 0.3986004415e15;
/// JGM3 equatorial radius, m.
pub const JGM3_RAD: f64 = 0.6378136300e7;
/// JGM3 flattening, `1/298.257223563`.
pub const JGM3_FLAT: f64 = 1.0 / 298.257223563;
/// Mean angular velocity of Earth's rotation, rad/s (shared by JGM3 and EGM96).
pub const EARTH_ANGV: f64 = 72.92115e-6;

/// Sun's gravitational parameter, m^3/s^2.
pub const SUN_MU: f64 = 1.327124400189e20;
/// Mean Earth-Sun distance (astronomical unit), m.
pub const AU: f64 = 149_597_870_700.0;
/// Moon's gravitational parameter, m^3/s^2.
pub const MOON_MU: f64 = 4.90486959e12;

impl HarmonicsTable {
    /// Builds a table from explicit constants and a flat `(C,S)` coefficient
    /// list ordered `n = 0..=max_degree, m = 0..=n`.
    pub fn new(mu: f64, rad: f64, angv: f64, flat: f64, max_degree: usize, harmonics: Vec<Harmonic>) -> Self {
        HarmonicsTable { mu, rad, angv, flat, max_degree, harmonics }
    }

    /// A degree-0 (point mass) table with JGM3 Earth constants, useful for
    /// pure two-body sanity checks.
    pub fn point_mass(mu: f64, rad: f64, angv: f64, flat: f64) -> Self {
        HarmonicsTable { mu, rad, angv, flat, max_degree: 0, harmonics: vec![Harmonic { cos: 1.0, sin: 0.0 }] }
    }

    /// Index of the `(n, m)` coefficient in the flat triangular table.
    pub fn index(n: usize, m: usize) -> usize {
        n * (n + 1) / 2 + m
    }

    pub fn coefficient(&self, n: usize, m: usize) -> Harmonic {
        self.harmonics[Self::index(n, m)]
    }
}
