pub mod builder;
pub mod cull;
pub mod id;
pub mod octant;

pub use builder::{DEFAULT_GRID_CELLS, HasPosition, Octree, child_position, cube_bounds};
pub use cull::{LodCamera, VisibleOctant, cull};
pub use id::{MAX_LEVEL, OctantId};
pub use octant::{BoundedNode, Octant};
