//! Symmetric 3x3 eigendecomposition used by oriented box fitting.

use nalgebra::Matrix3;

use super::{Real, Vector3};
use crate::error::{CullError, Result};

/// Eigenvalues in ascending order and the matching orthonormal eigenvectors.
#[derive(Debug, Clone, Copy)]
pub struct Eigen<R: Real> {
    pub values: [R; 3],
    pub vectors: [R::Vec3; 3],
}

/// Decomposes a symmetric 3x3 matrix.
///
/// Implementations must return eigenvalues sorted ascending and an
/// orthonormal, right-handed set of eigenvectors. Repeated eigenvalues keep
/// the solver's own relative order; the basis spanning them is arbitrary but
/// must be deterministic for identical input.
pub trait EigenSolver<R: Real> {
    fn symmetric_eigen(&self, m: [[R; 3]; 3]) -> Result<Eigen<R>>;
}

/// Default solver backed by `nalgebra::SymmetricEigen`, evaluated in f64.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraEigen;

impl<R: Real> EigenSolver<R> for NalgebraEigen {
    fn symmetric_eigen(&self, m: [[R; 3]; 3]) -> Result<Eigen<R>> {
        let m = m.map(|row| row.map(R::to_f64));
        if m.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CullError::IllConditioned(
                "covariance matrix contains non-finite values".into(),
            ));
        }

        let mat = Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        );
        let eig = mat.try_symmetric_eigen(f64::EPSILON, 0).ok_or_else(|| {
            CullError::IllConditioned("eigendecomposition did not converge".into())
        })?;

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

        let mut columns = order.map(|i| {
            let c = eig.eigenvectors.column(i);
            [c[0], c[1], c[2]]
        });
        if triple_product(&columns) < 0.0 {
            columns[2] = columns[2].map(|v| -v);
        }

        Ok(Eigen {
            values: order.map(|i| R::from_f64(eig.eigenvalues[i])),
            vectors: columns.map(|c| R::Vec3::from_array(c.map(R::from_f64))),
        })
    }
}

fn triple_product(c: &[[f64; 3]; 3]) -> f64 {
    let [a, b, d] = c;
    let cross = [
        b[1] * d[2] - b[2] * d[1],
        b[2] * d[0] - b[0] * d[2],
        b[0] * d[1] - b[1] * d[0],
    ];
    a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn assert_orthonormal(v: &[DVec3; 3]) {
        for (i, a) in v.iter().enumerate() {
            assert!((a.length() - 1.0).abs() < 1e-9, "column {i} not unit");
            for b in v.iter().skip(i + 1) {
                assert!(a.dot(*b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn diagonal_matrix_sorted_ascending() {
        let m = [[9.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 4.0]];
        let eig: Eigen<f64> = NalgebraEigen.symmetric_eigen(m).unwrap();
        for (got, want) in eig.values.iter().zip([1.0, 4.0, 9.0]) {
            approx::assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
        assert!(eig.vectors[0].abs().abs_diff_eq(DVec3::Y, 1e-12));
        assert!(eig.vectors[1].abs().abs_diff_eq(DVec3::Z, 1e-12));
        assert!(eig.vectors[2].abs().abs_diff_eq(DVec3::X, 1e-12));
    }

    #[test]
    fn basis_is_right_handed() {
        let m = [[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 4.0]];
        let eig: Eigen<f64> = NalgebraEigen.symmetric_eigen(m).unwrap();
        assert_orthonormal(&eig.vectors);
        let det = eig.vectors[0].dot(eig.vectors[1].cross(eig.vectors[2]));
        assert!((det - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_eigenvalues_still_orthonormal() {
        let m = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let eig: Eigen<f64> = NalgebraEigen.symmetric_eigen(m).unwrap();
        assert_orthonormal(&eig.vectors);
        for v in eig.values {
            approx::assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_matrix_returns_basis() {
        let eig: Eigen<f32> = NalgebraEigen.symmetric_eigen([[0.0f32; 3]; 3]).unwrap();
        for v in eig.values {
            assert!(v.abs() < 1e-12);
        }
        for v in eig.vectors {
            assert!((v.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let m = [[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let result: Result<Eigen<f64>> = NalgebraEigen.symmetric_eigen(m);
        assert!(matches!(result, Err(CullError::IllConditioned(_))));
    }
}
