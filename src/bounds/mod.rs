//! Bounding volumes and view frustum
//!
//! Every type is generic over [`Real`](crate::math::Real) so the same code
//! serves single and double precision. The `*f` / `*d` aliases pin the
//! precision and are what callers normally name.

pub mod aabb;
pub mod frustum;
pub mod obb;
pub mod plane;

pub use aabb::Aabb;
pub use frustum::{CornerIter, Frustum, FrustumCorners};
pub use obb::{Obb, centroid, covariance_matrix};
pub use plane::Plane;

pub type Aabbf = Aabb<f32>;
pub type Aabbd = Aabb<f64>;
pub type Obbf = Obb<f32>;
pub type Obbd = Obb<f64>;
pub type Planef = Plane<f32>;
pub type Planed = Plane<f64>;
pub type Frustumf = Frustum<f32>;
pub type Frustumd = Frustum<f64>;
