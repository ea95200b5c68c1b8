//! Oriented bounding box fitted by principal component analysis.

use tracing::debug;

use crate::error::{CullError, Result};
use crate::math::{EigenSolver, Matrix4, NalgebraEigen, Real, Vector3};

use super::aabb::Aabb;

/// Oriented bounding box.
///
/// Extents are kept in the box frame (`local_min`/`local_max`, measured
/// from `translation` along the columns of `rotation`). World-space values
/// are derived on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb<R: Real> {
    pub local_min: R::Vec3,
    pub local_max: R::Vec3,
    /// Box-to-world rotation; columns are the orthonormal box axes.
    pub rotation: R::Mat4,
    /// Origin of the box frame in world space (the centroid for fitted boxes).
    pub translation: R::Vec3,
    /// Edge lengths along the box axes.
    pub size: R::Vec3,
}

impl<R: Real> Obb<R> {
    pub fn from_parts(
        local_min: R::Vec3,
        local_max: R::Vec3,
        rotation: R::Mat4,
        translation: R::Vec3,
    ) -> Self {
        Self {
            local_min,
            local_max,
            rotation,
            translation,
            size: local_max - local_min,
        }
    }

    /// Fit a box around `points` using the default eigen solver.
    pub fn fit(points: &[R::Vec3]) -> Result<Self> {
        Self::fit_with(points, &NalgebraEigen)
    }

    /// Fit a box around `points`, taking the box axes from the eigenvectors
    /// of the point covariance.
    ///
    /// Needs at least two points. Planar or collinear input does not fail;
    /// the box degenerates to zero thickness along the missing axes.
    pub fn fit_with<S>(points: &[R::Vec3], solver: &S) -> Result<Self>
    where
        S: EigenSolver<R> + ?Sized,
    {
        if points.len() < 2 {
            return Err(CullError::IllConditioned(format!(
                "oriented box fitting needs at least 2 points, got {}",
                points.len()
            )));
        }

        let mean = centroid::<R>(points);
        let covariance = covariance_matrix::<R>(points, mean);
        let eigen = solver.symmetric_eigen(covariance)?;

        let [x, y, z] = eigen.vectors;
        let rotation = R::Mat4::from_basis(x, y, z);
        let change_basis = rotation.inverse();

        let first = change_basis.transform_vector3(points[0] - mean);
        let (local_min, local_max) = points[1..].iter().fold((first, first), |(lo, hi), p| {
            let local = change_basis.transform_vector3(*p - mean);
            (lo.min(local), hi.max(local))
        });

        if !local_min.is_finite() || !local_max.is_finite() {
            return Err(CullError::IllConditioned(
                "oriented box extents are not finite".into(),
            ));
        }

        debug!(
            points = points.len(),
            variances = ?eigen.values,
            "Fitted oriented bounding box"
        );

        Ok(Self::from_parts(local_min, local_max, rotation, mean))
    }

    /// Grow the box to include `point`, keeping rotation and translation.
    pub fn union_point(&self, point: R::Vec3) -> Self {
        let local = self.to_local(point);
        Self::from_parts(
            self.local_min.min(local),
            self.local_max.max(local),
            self.rotation,
            self.translation,
        )
    }

    /// Express a world-space point in the box frame.
    pub fn to_local(&self, point: R::Vec3) -> R::Vec3 {
        self.rotation
            .inverse()
            .transform_vector3(point - self.translation)
    }

    /// Express a box-frame point in world space.
    pub fn to_world(&self, local: R::Vec3) -> R::Vec3 {
        self.rotation.transform_vector3(local) + self.translation
    }

    /// `local_min` carried into world space.
    ///
    /// Together with [`Obb::world_max`] this is one diagonal of the box, not
    /// the corners of a world-aligned box; use [`Obb::corners`] for the full
    /// shape.
    pub fn world_min(&self) -> R::Vec3 {
        self.to_world(self.local_min)
    }

    pub fn world_max(&self) -> R::Vec3 {
        self.to_world(self.local_max)
    }

    pub fn center(&self) -> R::Vec3 {
        (self.world_max() + self.world_min()) * R::HALF
    }

    pub fn half_size(&self) -> R::Vec3 {
        self.size * R::HALF
    }

    /// Box axes in world space (columns of `rotation`).
    pub fn axes(&self) -> [R::Vec3; 3] {
        std::array::from_fn(|i| self.rotation.column3(i))
    }

    /// Euler angles of `rotation` as `(pitch, yaw, roll)`, Y-X-Z order.
    pub fn euler_rotation(&self) -> R::Vec3 {
        self.rotation.to_euler_yxz()
    }

    /// The eight world-space corners, local x varying fastest.
    pub fn corners(&self) -> [R::Vec3; 8] {
        let local = Aabb::<R> {
            min: self.local_min,
            max: self.local_max,
        };
        local.corners().map(|c| self.to_world(c))
    }

    /// Axis-aligned box around the eight world corners.
    pub fn world_aabb(&self) -> Aabb<R> {
        let corners = self.corners();
        let first = Aabb {
            min: corners[0],
            max: corners[0],
        };
        corners[1..]
            .iter()
            .fold(first, |acc, c| acc.union_point(*c))
    }

    pub fn contains_point(&self, point: R::Vec3) -> bool {
        Aabb::<R> {
            min: self.local_min,
            max: self.local_max,
        }
        .contains_point(self.to_local(point))
    }
}

/// Arithmetic mean of a non-empty point set.
pub fn centroid<R: Real>(points: &[R::Vec3]) -> R::Vec3 {
    let n = R::from_f64(points.len() as f64);
    let sum = points
        .iter()
        .fold(R::Vec3::ZERO, |acc, p| acc + *p);
    sum * (R::ONE / n)
}

/// Population covariance `Σ (p - c)(p - c)ᵀ / N` of a point set about `centroid`.
pub fn covariance_matrix<R: Real>(points: &[R::Vec3], centroid: R::Vec3) -> [[R; 3]; 3] {
    let mut m = [[R::ZERO; 3]; 3];
    for p in points {
        let d = (*p - centroid).to_array();
        for (row, di) in m.iter_mut().zip(d) {
            for (cell, dj) in row.iter_mut().zip(d) {
                *cell = *cell + di * dj;
            }
        }
    }
    let inv_n = R::ONE / R::from_f64(points.len() as f64);
    m.map(|row| row.map(|v| v * inv_n))
}
