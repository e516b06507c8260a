//! Earth gravity potential as a normalized spherical-harmonic series.
//!
//! `Geopotential` evaluates the potential, its gradient (acceleration), or its
//! gradient and Hessian, from Cartesian position in the GRW frame, up to a
//! configured truncation degree bounded by the harmonics table it was built
//! from. The recurrences for the associated Legendre functions and their
//! derivatives are the standard normalized three-term forms.

use crate::harmonics::HarmonicsTable;
use nalgebra::{Matrix3, Vector3};

/// Evaluates Earth's gravity potential and its derivatives from a fixed
/// harmonics table, up to `degree`.
pub struct Geopotential<'a> {
    table: &'a HarmonicsTable,
    degree: usize,
    cs: Vec<(f64, f64)>,
    pnm: Vec<f64>,
}

fn delta(m: usize) -> f64 {
    if m == 0 {
        0.5
    } else {
        1.0
    }
}

/// `d P_nm / d phi`, from the adjacent-order recurrence (Pines-style form).
fn dpnm(pnm: f64, pnm1: f64, n: usize, m: usize, tgphi: f64) -> f64 {
    let next = if m < n {
        pnm1 * ((n - m) as f64 * (n + m + 1) as f64 * delta(m)).sqrt()
    } else {
        0.0
    };
    -pnm * tgphi * m as f64 + next
}

impl<'a> Geopotential<'a> {
    /// Builds an evaluator truncated at `degree`, clamped to the table's
    /// maximum supported degree.
    pub fn new(table: &'a HarmonicsTable, degree: usize) -> Self {
        let degree = degree.min(table.max_degree);
        let count = (degree + 1) * (degree + 2) / 2;
        Geopotential { table, degree, cs: vec![(0.0, 0.0); degree + 1], pnm: vec![0.0; count + degree + 2] }
    }

    fn calc_trigonometric(&mut self, coslambda: f64, sinlambda: f64) {
        self.cs[0] = (1.0, 0.0);
        for i in 1..=self.degree {
            let (pc, ps) = self.cs[i - 1];
            self.cs[i] = (pc * coslambda - ps * sinlambda, ps * coslambda + pc * sinlambda);
        }
    }

    fn calc_polynoms(&mut self, cosphi: f64, sinphi: f64) {
        self.pnm[0] = 1.0;
        if self.pnm.len() > 1 {
            self.pnm[1] = sinphi * 3.0_f64.sqrt();
        }
        if self.pnm.len() > 2 {
            self.pnm[2] = cosphi * 3.0_f64.sqrt();
        }
        let mut k = 3usize;
        for n in 2..=self.degree {
            for m in 0..n {
                let a = ((2 * n - 1) as f64).sqrt() * sinphi * self.pnm[k - n];
                let b = (((n - 1 - m) * (n - 1 + m)) as f64 / (2.0 * n as f64 - 3.0)).sqrt() * self.pnm[(k + 1) - n - n];
                self.pnm[k] = a - b;
                self.pnm[k] *= ((2.0 * n as f64 + 1.0) / ((n - m) * (n + m)) as f64).sqrt();
                k += 1;
            }
            self.pnm[k] = (1.0 + 0.5 / n as f64).sqrt() * cosphi * self.pnm[k - n - 1];
            k += 1;
        }
    }

    /// Potential value `U(x, y, z)`, m^2/s^2.
    pub fn potential(&mut self, p: &Vector3<f64>) -> f64 {
        let (x, y, z) = (p.x, p.y, p.z);
        let r = (x * x + y * y + z * z).sqrt();
        let xy = (x * x + y * y).sqrt();
        let sinphi = z / r;
        let cosphi = xy / r;
        let coslambda = x / xy;
        let sinlambda = y / xy;
        let r_r = self.table.rad / r;
        self.calc_trigonometric(coslambda, sinlambda);
        self.calc_polynoms(cosphi, sinphi);

        let mut result = 0.0;
        let mut mult = 1.0;
        let mut k = 0usize;
        for n in 0..=self.degree {
            for m in 0..=n {
                let h = self.table.coefficient(n, m);
                let (cc, sc) = self.cs[m];
                result += mult * self.pnm[k] * (h.cos * cc + h.sin * sc);
                k += 1;
            }
            mult *= r_r;
        }
        self.table.mu / r * result
    }

    /// Gravitational acceleration `d^2x/dt^2`, m/s^2, in the same GRW frame as `p`.
    pub fn acceleration(&mut self, p: &Vector3<f64>) -> Vector3<f64> {
        let (x, y, z) = (p.x, p.y, p.z);
        let r = (x * x + y * y + z * z).sqrt();
        let xy = (x * x + y * y).sqrt();
        let sinphi = z / r;
        let cosphi = xy / r;
        let tgphi = sinphi / cosphi;
        let coslambda = x / xy;
        let sinlambda = y / xy;
        let mu_r2 = self.table.mu / r / r;
        let r_r = self.table.rad / r;

        let ct = Matrix3::new(
            cosphi * coslambda, -sinphi * coslambda, -sinlambda,
            cosphi * sinlambda, -sinphi * sinlambda, coslambda,
            sinphi, cosphi, 0.0,
        );

        self.calc_trigonometric(coslambda, sinlambda);
        self.calc_polynoms(cosphi, sinphi);

        let mut dusum = Vector3::<f64>::zeros();
        let mut mult = 1.0;
        let mut k = 0usize;
        for n in 0..=self.degree {
            let mut dun = Vector3::<f64>::zeros();
            for m in 0..=n {
                let h = self.table.coefficient(n, m);
                let (cc, sc) = self.cs[m];
                let poly = self.pnm[k];
                let kcs = h.cos * cc + h.sin * sc;
                let ksc = h.sin * cc - h.cos * sc;
                dun[0] -= poly * kcs;
                dun[1] += dpnm(self.pnm[k], self.pnm[k + 1], n, m, tgphi) * kcs;
                dun[2] += poly * ksc * m as f64;
                k += 1;
            }
            dusum[0] += (n as f64 + 1.0) * mult * dun[0];
            dusum[1] += mult * dun[1];
            dusum[2] += mult * dun[2];
            mult *= r_r;
        }
        dusum[2] /= cosphi;
        dusum *= mu_r2;
        ct * dusum
    }

    /// Gravitational acceleration and its Jacobian `d(acceleration)/d(position)`.
    ///
    /// The Hessian path mirrors [`Geopotential::acceleration`] but additionally
    /// accumulates the second partials of the spherical potential, which are
    /// then rotated into Cartesian space the same way the gradient is.
    pub fn acceleration_with_jacobian(&mut self, p: &Vector3<f64>) -> (Vector3<f64>, Matrix3<f64>) {
        let (x, y, z) = (p.x, p.y, p.z);
        let r = (x * x + y * y + z * z).sqrt();
        let xy = (x * x + y * y).sqrt();
        let sinphi = z / r;
        let cosphi = xy / r;
        let cosphi2 = cosphi * cosphi;
        let tgphi = sinphi / cosphi;
        let coslambda = x / xy;
        let sinlambda = y / xy;
        let mu_r2 = self.table.mu / r / r;
        let r_r = self.table.rad / r;

        let ct = Matrix3::new(
            cosphi * coslambda, -sinphi * coslambda, -sinlambda,
            cosphi * sinlambda, -sinphi * sinlambda, coslambda,
            sinphi, cosphi, 0.0,
        );
        let c = Matrix3::new(
            cosphi * coslambda, cosphi * sinlambda, sinphi,
            -sinphi * coslambda, -sinphi * sinlambda, cosphi,
            -sinlambda, coslambda, 0.0,
        );

        self.calc_trigonometric(coslambda, sinlambda);
        self.calc_polynoms(cosphi, sinphi);

        let mut dusum = Vector3::<f64>::zeros();
        // [d2U/dr2, d2U/drdphi, d2U/drdlambda, d2U/dphi2, d2U/dphidlambda, d2U/dlambda2]
        let mut ddusum = [0.0_f64; 6];
        let mut mult = 1.0;
        let mut k = 0usize;
        for n in 0..=self.degree {
            let mut dun = Vector3::<f64>::zeros();
            let mut ddun = Vector3::<f64>::zeros();
            for m in 0..=n {
                let h = self.table.coefficient(n, m);
                let (cc, sc) = self.cs[m];
                let poly = self.pnm[k];
                let dpoly = dpnm(self.pnm[k], self.pnm[k + 1], n, m, tgphi);
                let kcs = h.cos * cc + h.sin * sc;
                let ksc = h.sin * cc - h.cos * sc;
                dun[0] -= poly * kcs;
                dun[1] += dpoly * kcs;
                dun[2] += poly * ksc * m as f64;
                let next_term = dpnm(self.pnm[k + 1], self.pnm[k + 2], n, m + 1, tgphi);
                ddun[0] += (next_term - m as f64 * (poly / cosphi2 + dpoly * tgphi)) * kcs;
                ddun[1] += dpoly * ksc * m as f64;
                ddun[2] = dun[0] * (m * m) as f64;
                k += 1;
            }
            dusum[0] += (n as f64 + 1.0) * mult * dun[0];
            dusum[1] += mult * dun[1];
            dusum[2] += mult * dun[2];
            ddusum[0] -= (n as f64 + 2.0) * (n as f64 + 1.0) * mult * dun[0];
            ddusum[1] -= (n as f64 + 1.0) * mult * dun[1];
            ddusum[2] -= (n as f64 + 1.0) * mult * dun[2];
            ddusum[3] += mult * ddun[0];
            ddusum[4] += mult * ddun[1];
            ddusum[5] += mult * ddun[2];
            mult *= r_r;
        }
        dusum[2] /= cosphi;
        dusum *= mu_r2;
        for v in ddusum.iter_mut() {
            *v *= mu_r2 / r;
        }
        ddusum[2] /= cosphi;
        ddusum[4] /= cosphi;
        ddusum[5] /= cosphi2;

        let mut g = Matrix3::zeros();
        g[(0, 0)] = ddusum[0];
        g[(0, 1)] = ddusum[1] - dusum[1] / r;
        g[(1, 0)] = g[(0, 1)];
        g[(0, 2)] = ddusum[2] - dusum[2] / r;
        g[(2, 0)] = g[(0, 2)];
        g[(1, 1)] = dusum[0] / r + ddusum[3];
        g[(1, 2)] = tgphi * dusum[2] / r + ddusum[4];
        g[(2, 1)] = g[(1, 2)];
        g[(2, 2)] = (dusum[0] - tgphi * dusum[1]) / r + ddusum[5];

        (ct * dusum, ct * g * c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonics::HarmonicsTable;
    use approx::assert_relative_eq;

    fn point_mass_table() -> HarmonicsTable {
        HarmonicsTable::point_mass(crate::harmonics::JGM3_MU, crate::harmonics::JGM3_RAD, crate::harmonics::EARTH_ANGV, crate::harmonics::JGM3_FLAT)
    }

    #[test]
    fn test_point_mass_potential_matches_kepler() {
        let table = point_mass_table();
        let mut g = Geopotential::new(&table, 0);
        let p = Vector3::new(7_000_000.0, 0.0, 0.0);
        let u = g.potential(&p);
        assert_relative_eq!(u, table.mu / 7_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_mass_acceleration_is_central() {
        let table = point_mass_table();
        let mut g = Geopotential::new(&table, 0);
        let p = Vector3::new(7_000_000.0, 1_000_000.0, -500_000.0);
        let a = g.acceleration(&p);
        let r = p.norm();
        let expected = -table.mu / (r * r * r) * p;
        assert_relative_eq!(a, expected, epsilon = 1e-3);
    }
}
