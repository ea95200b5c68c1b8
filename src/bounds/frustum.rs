//! View frustum for culling

use std::iter::FusedIterator;

use crate::error::{CullError, Result};
use crate::math::{Matrix4, Real, Vector3};

use super::aabb::Aabb;
use super::obb::Obb;
use super::plane::Plane;

/// View frustum with 6 planes whose normals face away from the interior.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frustum<R: Real> {
    pub near: Plane<R>,
    pub far: Plane<R>,
    pub left: Plane<R>,
    pub right: Plane<R>,
    pub top: Plane<R>,
    pub bottom: Plane<R>,
}

impl<R: Real> Frustum<R> {
    /// Frustum of the clip volume of `matrix`.
    ///
    /// The space of the planes follows the input: a projection matrix gives
    /// view-space planes, view-projection gives world space, model-view-
    /// projection gives model space.
    pub fn from_matrix(matrix: &R::Mat4) -> Self {
        let mut frustum = Self::default();
        frustum.calculate_frustum_planes(matrix);
        frustum
    }

    /// Extract the six planes from `matrix` (Gribb & Hartmann, OpenGL clip
    /// space with `z` in `[-1, 1]`).
    pub fn calculate_frustum_planes(&mut self, matrix: &R::Mat4) {
        let row1 = matrix.row(0);
        let row2 = matrix.row(1);
        let row3 = matrix.row(2);
        let row4 = matrix.row(3);

        self.left = clip_plane(row4, row1, R::ONE);
        self.right = clip_plane(row4, row1, -R::ONE);
        self.bottom = clip_plane(row4, row2, R::ONE);
        self.top = clip_plane(row4, row2, -R::ONE);
        self.near = clip_plane(row4, row3, R::ONE);
        self.far = clip_plane(row4, row3, -R::ONE);
    }

    /// Planes in the order near, far, left, right, top, bottom.
    pub fn planes(&self) -> [&Plane<R>; 6] {
        [
            &self.near,
            &self.far,
            &self.left,
            &self.right,
            &self.top,
            &self.bottom,
        ]
    }

    /// Corner points of the clip volume of `matrix`.
    ///
    /// Fails on a singular matrix instead of producing infinities. A matrix
    /// counts as singular when its determinant is negligible next to the
    /// product of its column lengths, so rank-deficient input that rounds to
    /// a tiny non-zero determinant is rejected too.
    pub fn corners(matrix: &R::Mat4) -> Result<FrustumCorners<R>> {
        let det = matrix.determinant();
        if det == R::ZERO || !det.is_finite() {
            return Err(CullError::SingularMatrix(format!(
                "frustum matrix determinant is {det:?}"
            )));
        }
        let relative = det.abs() / column_norm_product::<R>(matrix);
        if !(relative > R::EPSILON * R::from_f64(SINGULAR_TOLERANCE)) {
            return Err(CullError::SingularMatrix(format!(
                "frustum matrix is numerically singular (relative determinant {relative:?})"
            )));
        }
        let inverse = matrix.inverse();
        if !inverse.is_finite() {
            return Err(CullError::SingularMatrix(
                "frustum matrix inverse is not finite".into(),
            ));
        }
        Ok(FrustumCorners { inverse })
    }

    /// Check if point is inside frustum (boundary included)
    pub fn contains_point(&self, point: R::Vec3) -> bool {
        self.planes()
            .iter()
            .all(|plane| plane.signed_distance(point) <= R::ZERO)
    }

    /// Conservative AABB test: `false` only when one plane excludes the box.
    pub fn inside_or_intersecting_aabb(&self, aabb: &Aabb<R>) -> bool {
        aabb.inside_or_intersecting_frustum(self)
    }

    pub fn inside_or_intersecting_obb(&self, obb: &Obb<R>) -> bool {
        self.planes()
            .iter()
            .all(|plane| plane.inside_or_intersecting_obb(obb))
    }
}

/// Multiple of machine epsilon below which `|det| / Π |column|` counts as zero.
const SINGULAR_TOLERANCE: f64 = 64.0;

/// Hadamard bound on `|det|`: the product of the column lengths.
fn column_norm_product<R: Real>(matrix: &R::Mat4) -> R {
    matrix
        .to_cols_array()
        .chunks_exact(4)
        .fold(R::ONE, |acc, c| {
            acc * (c[0] * c[0] + c[1] * c[1] + c[2] * c[2] + c[3] * c[3]).sqrt()
        })
}

/// `row4 + sign * rowk`, converted to `A·x + B·y + C·z = D` with an outward normal.
fn clip_plane<R: Real>(row4: [R; 4], rowk: [R; 4], sign: R) -> Plane<R> {
    let raw = Plane::new(
        row4[0] + sign * rowk[0],
        row4[1] + sign * rowk[1],
        row4[2] + sign * rowk[2],
        row4[3] + sign * rowk[3],
    );
    // D moves to the right-hand side of the plane equation
    let plane = Plane { d: -raw.d, ..raw };
    -plane
}

/// Clip-space cube corners, bit 0 = x, bit 1 = y, bit 2 = z.
const CLIP_CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// The eight frustum corners, produced on demand from the inverted matrix.
///
/// Order: near-bottom-left, near-bottom-right, near-top-left, near-top-right,
/// then the same four on the far plane. Iterate as often as needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumCorners<R: Real> {
    inverse: R::Mat4,
}

impl<R: Real> FrustumCorners<R> {
    pub fn iter(&self) -> CornerIter<R> {
        CornerIter {
            inverse: self.inverse,
            next: 0,
        }
    }

    pub fn to_array(&self) -> [R::Vec3; 8] {
        std::array::from_fn(|i| corner::<R>(&self.inverse, i))
    }

    /// Axis-aligned box around the corners.
    pub fn bounds(&self) -> Aabb<R> {
        let corners = self.to_array();
        let first = Aabb {
            min: corners[0],
            max: corners[0],
        };
        corners[1..]
            .iter()
            .fold(first, |acc, c| acc.union_point(*c))
    }
}

fn corner<R: Real>(inverse: &R::Mat4, i: usize) -> R::Vec3 {
    let c = CLIP_CORNERS[i].map(R::from_f64);
    inverse.project_point3(R::Vec3::from_array(c))
}

#[derive(Debug, Clone)]
pub struct CornerIter<R: Real> {
    inverse: R::Mat4,
    next: usize,
}

impl<R: Real> Iterator for CornerIter<R> {
    type Item = R::Vec3;

    fn next(&mut self) -> Option<R::Vec3> {
        if self.next >= CLIP_CORNERS.len() {
            return None;
        }
        let p = corner::<R>(&self.inverse, self.next);
        self.next += 1;
        Some(p)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = CLIP_CORNERS.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl<R: Real> ExactSizeIterator for CornerIter<R> {}

impl<R: Real> FusedIterator for CornerIter<R> {}

impl<R: Real> IntoIterator for FrustumCorners<R> {
    type Item = R::Vec3;
    type IntoIter = CornerIter<R>;

    fn into_iter(self) -> CornerIter<R> {
        self.iter()
    }
}

impl<R: Real> IntoIterator for &FrustumCorners<R> {
    type Item = R::Vec3;
    type IntoIter = CornerIter<R>;

    fn into_iter(self) -> CornerIter<R> {
        self.iter()
    }
}
