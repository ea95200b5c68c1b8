//! Axis-aligned bounding box

use crate::error::{CullError, Result};
use crate::math::{Matrix4, Real, Vector3};

use super::frustum::Frustum;
use super::plane::Plane;

/// Axis-aligned bounding box defined by min and max corners.
///
/// `min <= max` holds on every axis for every box built through this API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<R: Real> {
    pub min: R::Vec3,
    pub max: R::Vec3,
}

impl<R: Real> Aabb<R> {
    /// Create an AABB from two opposite corners, given in any order.
    pub fn new(a: R::Vec3, b: R::Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: R::Vec3, half_extent: R::Vec3) -> Self {
        let half_extent = half_extent.abs();
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Smallest box containing every point.
    pub fn from_points(points: &[R::Vec3]) -> Result<Self> {
        let (first, rest) = points
            .split_first()
            .ok_or_else(|| CullError::Input("cannot bound an empty point set".into()))?;

        Ok(rest.iter().fold(
            Self {
                min: *first,
                max: *first,
            },
            |acc, p| acc.union_point(*p),
        ))
    }

    /// Get center point
    pub fn center(&self) -> R::Vec3 {
        (self.min + self.max) * R::HALF
    }

    /// Get size (max - min)
    pub fn size(&self) -> R::Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> R::Vec3 {
        self.size() * R::HALF
    }

    /// Length of the space diagonal.
    pub fn diagonal(&self) -> R {
        self.size().length()
    }

    /// The eight corners, x varying fastest.
    pub fn corners(&self) -> [R::Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        std::array::from_fn(|i| {
            R::Vec3::new(
                if i & 1 != 0 { hi.x() } else { lo.x() },
                if i & 2 != 0 { hi.y() } else { lo.y() },
                if i & 4 != 0 { hi.z() } else { lo.z() },
            )
        })
    }

    /// Bound this box after transforming it by `matrix`.
    ///
    /// All eight corners go through the matrix (with perspective divide) and
    /// the result is re-fitted around them, so it stays axis-aligned in the
    /// target space. Rotations yield a looser box; scale and shear are fine.
    pub fn transform(&self, matrix: &R::Mat4) -> Self {
        let corners = self.corners().map(|c| matrix.project_point3(c));
        let first = Self {
            min: corners[0],
            max: corners[0],
        };
        corners[1..]
            .iter()
            .fold(first, |acc, c| acc.union_point(*c))
    }

    /// Return the smallest box that contains both `self` and `other`.
    pub fn union(&self, other: &Aabb<R>) -> Aabb<R> {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Expand the box to include a point.
    pub fn union_point(&self, point: R::Vec3) -> Aabb<R> {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Check if point is inside AABB (boundary included)
    pub fn contains_point(&self, p: R::Vec3) -> bool {
        p.x() >= self.min.x()
            && p.x() <= self.max.x()
            && p.y() >= self.min.y()
            && p.y() <= self.max.y()
            && p.z() >= self.min.z()
            && p.z() <= self.max.z()
    }

    /// Check if two AABBs intersect
    pub fn intersects(&self, other: &Aabb<R>) -> bool {
        self.min.x() <= other.max.x()
            && self.max.x() >= other.min.x()
            && self.min.y() <= other.max.y()
            && self.max.y() >= other.min.y()
            && self.min.z() <= other.max.z()
            && self.max.z() >= other.min.z()
    }

    /// Point of the box (surface or interior) closest to `point`.
    pub fn closest_point(&self, point: R::Vec3) -> R::Vec3 {
        point.max(self.min).min(self.max)
    }

    pub fn inside_or_intersecting_plane(&self, plane: &Plane<R>) -> bool {
        plane.inside_or_intersecting_aabb(self)
    }

    /// Conservative frustum test; `false` only if some plane excludes the box.
    pub fn inside_or_intersecting_frustum(&self, frustum: &Frustum<R>) -> bool {
        frustum
            .planes()
            .iter()
            .all(|plane| plane.inside_or_intersecting_aabb(self))
    }
}
