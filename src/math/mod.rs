//! Precision abstraction over glam's single and double precision types.
//!
//! Every bounding volume, plane, frustum and octant is generic over a
//! [`Real`] scalar. `f32` maps to `glam::{Vec3, Mat4}` and `f64` to
//! `glam::{DVec3, DMat4}`; the traits below expose only the narrow set of
//! vector/matrix operations the culling code needs.

pub mod eigen;

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

pub use eigen::{Eigen, EigenSolver, NalgebraEigen};

/// Floating point scalar with associated glam vector and matrix types.
pub trait Real:
    Copy
    + Debug
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    type Vec3: Vector3<Self>;
    type Mat4: Matrix4<Self, Self::Vec3>;

    const ZERO: Self;
    const ONE: Self;
    const HALF: Self;
    const INFINITY: Self;
    const NEG_INFINITY: Self;
    const EPSILON: Self;

    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    fn abs(self) -> Self;
    fn sqrt(self) -> Self;
    fn tan(self) -> Self;
    fn acos(self) -> Self;
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;
    fn is_finite(self) -> bool;
}

/// Three component vector operations.
pub trait Vector3<R>:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<R, Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;

    fn new(x: R, y: R, z: R) -> Self;
    fn splat(v: R) -> Self;
    fn from_array(a: [R; 3]) -> Self;
    fn to_array(self) -> [R; 3];
    fn x(self) -> R;
    fn y(self) -> R;
    fn z(self) -> R;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    fn abs(self) -> Self;
    fn dot(self, rhs: Self) -> R;
    fn length(self) -> R;
    fn max_element(self) -> R;
    fn normalize_or_zero(self) -> Self;
    fn is_finite(self) -> bool;
    fn abs_diff_eq(self, rhs: Self, max_abs_diff: R) -> bool;
}

/// 4x4 matrix operations, column-vector convention (`M * v`).
pub trait Matrix4<R, V>:
    Copy + Debug + PartialEq + Send + Sync + 'static + Mul<Output = Self>
{
    const IDENTITY: Self;

    /// Rotation-only matrix whose first three columns are `x`, `y`, `z`.
    fn from_basis(x: V, y: V, z: V) -> Self;
    fn from_translation(t: V) -> Self;
    /// Column-major element array, as `glam` lays it out.
    fn from_cols_array(a: [R; 16]) -> Self;
    fn to_cols_array(&self) -> [R; 16];
    /// First three components of column `i`.
    fn column3(&self, i: usize) -> V;
    fn row(&self, i: usize) -> [R; 4];
    fn determinant(&self) -> R;
    fn inverse(&self) -> Self;
    fn is_finite(&self) -> bool;
    /// Transform a point with `w = 1` and divide by the resulting `w`.
    fn project_point3(&self, p: V) -> V;
    fn transform_vector3(&self, v: V) -> V;
    /// Euler angles of the rotational part, Y-X-Z order, as `(pitch, yaw, roll)`.
    fn to_euler_yxz(&self) -> V;
}

macro_rules! impl_real {
    ($real:ty, $vec3:ty, $vec4:ty, $mat4:ty, $quat:ty) => {
        impl Real for $real {
            type Vec3 = $vec3;
            type Mat4 = $mat4;

            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const HALF: Self = 0.5;
            const INFINITY: Self = <$real>::INFINITY;
            const NEG_INFINITY: Self = <$real>::NEG_INFINITY;
            const EPSILON: Self = <$real>::EPSILON;

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $real
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn abs(self) -> Self {
                <$real>::abs(self)
            }
            #[inline]
            fn sqrt(self) -> Self {
                <$real>::sqrt(self)
            }
            #[inline]
            fn tan(self) -> Self {
                <$real>::tan(self)
            }
            #[inline]
            fn acos(self) -> Self {
                <$real>::acos(self)
            }
            #[inline]
            fn min(self, other: Self) -> Self {
                <$real>::min(self, other)
            }
            #[inline]
            fn max(self, other: Self) -> Self {
                <$real>::max(self, other)
            }
            #[inline]
            fn is_finite(self) -> bool {
                <$real>::is_finite(self)
            }
        }

        impl Vector3<$real> for $vec3 {
            const ZERO: Self = <$vec3>::ZERO;
            const ONE: Self = <$vec3>::ONE;

            #[inline]
            fn new(x: $real, y: $real, z: $real) -> Self {
                <$vec3>::new(x, y, z)
            }
            #[inline]
            fn splat(v: $real) -> Self {
                <$vec3>::splat(v)
            }
            #[inline]
            fn from_array(a: [$real; 3]) -> Self {
                <$vec3>::from_array(a)
            }
            #[inline]
            fn to_array(self) -> [$real; 3] {
                <$vec3>::to_array(&self)
            }
            #[inline]
            fn x(self) -> $real {
                self.x
            }
            #[inline]
            fn y(self) -> $real {
                self.y
            }
            #[inline]
            fn z(self) -> $real {
                self.z
            }
            #[inline]
            fn min(self, rhs: Self) -> Self {
                <$vec3>::min(self, rhs)
            }
            #[inline]
            fn max(self, rhs: Self) -> Self {
                <$vec3>::max(self, rhs)
            }
            #[inline]
            fn abs(self) -> Self {
                <$vec3>::abs(self)
            }
            #[inline]
            fn dot(self, rhs: Self) -> $real {
                <$vec3>::dot(self, rhs)
            }
            #[inline]
            fn length(self) -> $real {
                <$vec3>::length(self)
            }
            #[inline]
            fn max_element(self) -> $real {
                <$vec3>::max_element(self)
            }
            #[inline]
            fn normalize_or_zero(self) -> Self {
                <$vec3>::normalize_or_zero(self)
            }
            #[inline]
            fn is_finite(self) -> bool {
                <$vec3>::is_finite(self)
            }
            #[inline]
            fn abs_diff_eq(self, rhs: Self, max_abs_diff: $real) -> bool {
                <$vec3>::abs_diff_eq(self, rhs, max_abs_diff)
            }
        }

        impl Matrix4<$real, $vec3> for $mat4 {
            const IDENTITY: Self = <$mat4>::IDENTITY;

            fn from_basis(x: $vec3, y: $vec3, z: $vec3) -> Self {
                <$mat4>::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), <$vec4>::W)
            }

            fn from_translation(t: $vec3) -> Self {
                <$mat4>::from_translation(t)
            }

            fn from_cols_array(a: [$real; 16]) -> Self {
                <$mat4>::from_cols_array(&a)
            }

            fn to_cols_array(&self) -> [$real; 16] {
                <$mat4>::to_cols_array(self)
            }

            fn column3(&self, i: usize) -> $vec3 {
                self.col(i).truncate()
            }

            fn row(&self, i: usize) -> [$real; 4] {
                <$mat4>::row(self, i).to_array()
            }

            fn determinant(&self) -> $real {
                <$mat4>::determinant(self)
            }

            fn inverse(&self) -> Self {
                <$mat4>::inverse(self)
            }

            fn is_finite(&self) -> bool {
                <$mat4>::is_finite(self)
            }

            fn project_point3(&self, p: $vec3) -> $vec3 {
                <$mat4>::project_point3(self, p)
            }

            fn transform_vector3(&self, v: $vec3) -> $vec3 {
                <$mat4>::transform_vector3(self, v)
            }

            fn to_euler_yxz(&self) -> $vec3 {
                let q = <$quat>::from_mat4(self);
                let (yaw, pitch, roll) = q.to_euler(glam::EulerRot::YXZ);
                <$vec3>::new(pitch, yaw, roll)
            }
        }
    };
}

impl_real!(f32, glam::Vec3, glam::Vec4, glam::Mat4, glam::Quat);
impl_real!(f64, glam::DVec3, glam::DVec4, glam::DMat4, glam::DQuat);

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DMat4, DVec3, Mat4, Vec3};

    fn generic_midpoint<R: Real>(a: R::Vec3, b: R::Vec3) -> R::Vec3 {
        (a + b) * R::HALF
    }

    #[test]
    fn generic_code_runs_in_both_precisions() {
        let m = generic_midpoint::<f32>(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(m, Vec3::new(1.0, 2.0, 3.0));

        let m = generic_midpoint::<f64>(DVec3::ZERO, DVec3::new(2.0, 4.0, 6.0));
        assert_eq!(m, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rows_follow_column_vector_convention() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Matrix4::row(&m, 0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(Matrix4::row(&m, 3), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn from_basis_places_columns() {
        let m = <DMat4 as Matrix4<f64, DVec3>>::from_basis(DVec3::Y, DVec3::Z, DVec3::X);
        assert_eq!(m.column3(0), DVec3::Y);
        assert_eq!(m.column3(1), DVec3::Z);
        assert_eq!(m.column3(2), DVec3::X);
        assert_eq!(Matrix4::determinant(&m), 1.0);
    }

    #[test]
    fn project_point_divides_by_w() {
        let proj = DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 1.0, 10.0);
        let p = Matrix4::project_point3(&proj, DVec3::new(0.0, 0.0, -1.0));
        assert!((p.z + 1.0).abs() < 1e-12);
    }

    #[test]
    fn euler_of_identity_is_zero() {
        let e = Matrix4::to_euler_yxz(&Mat4::IDENTITY);
        assert!(Vector3::abs_diff_eq(e, Vec3::ZERO, 1e-6));
    }
}
