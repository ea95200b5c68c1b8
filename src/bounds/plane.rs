//! Half-space in the form `A·x + B·y + C·z = D`.

use std::ops::{Mul, Neg};

use crate::error::{CullError, Result};
use crate::math::{Matrix4, Real, Vector3};

use super::aabb::Aabb;
use super::obb::Obb;

/// A plane `a·x + b·y + c·z = d` whose normal `(a, b, c)` need not be unit length.
///
/// The normal points into the outer (rejected) half-space: points with a
/// negative signed distance are inside, positive ones outside.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane<R: Real> {
    pub a: R,
    pub b: R,
    pub c: R,
    pub d: R,
}

impl<R: Real> Plane<R> {
    pub fn new(a: R, b: R, c: R, d: R) -> Self {
        Self { a, b, c, d }
    }

    /// Plane through `point` with the given (outward) normal.
    pub fn from_normal_and_point(normal: R::Vec3, point: R::Vec3) -> Self {
        Self {
            a: normal.x(),
            b: normal.y(),
            c: normal.z(),
            d: normal.dot(point),
        }
    }

    pub fn normal(&self) -> R::Vec3 {
        R::Vec3::new(self.a, self.b, self.c)
    }

    /// Same plane with a unit-length normal.
    pub fn normalize(&self) -> Result<Self> {
        let mag = self.normal().length();
        if mag == R::ZERO || !mag.is_finite() {
            return Err(CullError::IllConditioned(format!(
                "cannot normalize plane with normal length {mag:?}"
            )));
        }
        Ok(Self {
            a: self.a / mag,
            b: self.b / mag,
            c: self.c / mag,
            d: self.d / mag,
        })
    }

    /// Signed distance of `point`; euclidean only for normalized planes.
    pub fn signed_distance(&self, point: R::Vec3) -> R {
        self.normal().dot(point) - self.d
    }

    /// Angle (radians, `[0, π/2]`) between the two planes.
    pub fn angle_between(&self, other: &Plane<R>) -> R {
        let numerator = self.normal().dot(other.normal()).abs();
        let denominator = self.normal().length() * other.normal().length();
        (numerator / denominator).min(R::ONE).acos()
    }

    pub fn scaled(&self, k: R) -> Self {
        Self {
            a: self.a * k,
            b: self.b * k,
            c: self.c * k,
            d: self.d * k,
        }
    }

    /// Box-vs-plane test after Ericson, *Real-Time Collision Detection*, 5.2.3,
    /// with inside and outside flipped (negative distance is inside).
    ///
    /// Returns `false` only when the cuboid lies completely in the outer
    /// half-space.
    pub fn inside_or_intersecting_cuboid(&self, center: R::Vec3, size: R::Vec3) -> bool {
        let r = self.extent_along_normal(size * R::HALF);
        let s = self.signed_distance(center);
        classify(s, r)
    }

    /// Cube of edge length `size` centered at `center`.
    pub fn inside_or_intersecting_cube(&self, center: R::Vec3, size: R) -> bool {
        self.inside_or_intersecting_cuboid(center, R::Vec3::splat(size))
    }

    pub fn inside_or_intersecting_aabb(&self, aabb: &Aabb<R>) -> bool {
        self.inside_or_intersecting_cuboid(aabb.center(), aabb.size())
    }

    pub fn inside_or_intersecting_obb(&self, obb: &Obb<R>) -> bool {
        let r = self.obb_extent_along_normal(obb);
        let s = self.signed_distance(obb.center());
        classify(s, r)
    }

    /// Whether the plane cuts through the box.
    pub fn intersects_aabb(&self, aabb: &Aabb<R>) -> bool {
        let r = self.extent_along_normal(aabb.half_extent());
        self.signed_distance(aabb.center()).abs() <= r
    }

    pub fn intersects_obb(&self, obb: &Obb<R>) -> bool {
        let r = self.obb_extent_along_normal(obb);
        self.signed_distance(obb.center()).abs() <= r
    }

    /// Projection radius of an axis-aligned box onto the normal line.
    fn extent_along_normal(&self, half: R::Vec3) -> R {
        half.dot(self.normal().abs())
    }

    fn obb_extent_along_normal(&self, obb: &Obb<R>) -> R {
        let n = self.normal();
        let half = obb.size * R::HALF;
        let axis = |i: usize| obb.rotation.column3(i).normalize_or_zero();
        half.x() * n.dot(axis(0)).abs()
            + half.y() * n.dot(axis(1)).abs()
            + half.z() * n.dot(axis(2)).abs()
    }
}

fn classify<R: Real>(s: R, r: R) -> bool {
    if s <= -r {
        // completely inside
        true
    } else {
        // intersecting unless completely outside
        s < r
    }
}

impl<R: Real> Mul<R> for Plane<R> {
    type Output = Plane<R>;

    fn mul(self, k: R) -> Plane<R> {
        self.scaled(k)
    }
}

impl<R: Real> Neg for Plane<R> {
    type Output = Plane<R>;

    fn neg(self) -> Plane<R> {
        self.scaled(-R::ONE)
    }
}
