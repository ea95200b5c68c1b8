pub mod bounds;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod math;
pub mod octree;
pub mod pipeline;

pub use bounds::{Aabb, Frustum, Obb, Plane};
pub use config::{CameraConfig, CullConfig, OctreeConfig, Precision};
pub use error::{CullError, Result};
pub use octree::{BoundedNode, Octant, OctantId, Octree};
pub use pipeline::Pipeline;
