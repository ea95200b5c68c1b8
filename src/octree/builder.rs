use std::collections::HashSet;

use glam::{DVec3, Vec3};
use rayon::prelude::*;
use tracing::debug;

use crate::bounds::Aabb;
use crate::error::{CullError, Result};
use crate::math::{Real, Vector3};

use super::id::MAX_LEVEL;
use super::octant::{BoundedNode, Octant};

/// Anything with a position that can be sorted into an octree.
pub trait HasPosition<R: Real> {
    fn position(&self) -> R::Vec3;
}

impl HasPosition<f32> for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

impl HasPosition<f64> for DVec3 {
    fn position(&self) -> DVec3 {
        *self
    }
}

/// Default number of spacing-grid cells along each axis of an octant.
pub const DEFAULT_GRID_CELLS: u32 = 128;

/// Point octree with a level-of-detail subsample on every inner node.
///
/// A subdivided octant keeps one point per cell of a `grid_cells`^3 spacing
/// grid laid over its cube and passes the remaining points to its children.
/// The spacing halves with every level, so the points stored from the root
/// down to any level form a progressively denser sample of the cloud. Leaves
/// keep all points that reach them.
#[derive(Debug, Clone, PartialEq)]
pub struct Octree<R: Real, T> {
    root: Octant<R, T>,
    grid_cells: u32,
}

impl<R, T> Octree<R, T>
where
    R: Real,
    T: HasPosition<R> + Send + Sync,
{
    /// Build an octree over `points` with [`DEFAULT_GRID_CELLS`].
    pub fn build(points: Vec<T>, max_points: usize, max_depth: u8) -> Result<Self> {
        Self::build_with_grid(points, max_points, max_depth, DEFAULT_GRID_CELLS)
    }

    /// Build an octree over `points`.
    ///
    /// The root is the bounding cube of the points. A node subdivides while it
    /// holds more than `max_points` points, is shallower than `max_depth`,
    /// and its spacing grid leaves some points over for the children.
    pub fn build_with_grid(
        points: Vec<T>,
        max_points: usize,
        max_depth: u8,
        grid_cells: u32,
    ) -> Result<Self> {
        if max_points == 0 {
            return Err(CullError::Input("max points per octant must be positive".into()));
        }
        if max_depth > MAX_LEVEL {
            return Err(CullError::Input(format!(
                "max depth {max_depth} exceeds the octant id limit {MAX_LEVEL}"
            )));
        }
        if grid_cells == 0 {
            return Err(CullError::Input("grid cells per axis must be positive".into()));
        }

        let positions: Vec<R::Vec3> = points.iter().map(|p| p.position()).collect();
        let aabb = Aabb::from_points(&positions)?;
        let (center, size) = cube_bounds(&aabb);
        debug!(points = points.len(), size = ?size, grid_cells, "building octree");

        let limits = Limits {
            max_points,
            max_depth,
            grid_cells,
        };
        let root = build_node(Octant::new_root(center, size), points, &limits)?;
        Ok(Self { root, grid_cells })
    }
}

impl<R: Real, T> Octree<R, T> {
    pub fn root(&self) -> &Octant<R, T> {
        &self.root
    }

    pub fn grid_cells(&self) -> u32 {
        self.grid_cells
    }

    /// Minimum distance between the points an octant keeps for itself.
    pub fn spacing(&self, node: &Octant<R, T>) -> R {
        node.size() / R::from_f64(f64::from(self.grid_cells))
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.iter().filter(|n| n.is_leaf()).count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn point_count(&self) -> usize {
        self.root.iter().map(|n| n.payload().len()).sum()
    }
}

struct Limits {
    max_points: usize,
    max_depth: u8,
    grid_cells: u32,
}

fn build_node<R, T>(mut node: Octant<R, T>, points: Vec<T>, limits: &Limits) -> Result<Octant<R, T>>
where
    R: Real,
    T: HasPosition<R> + Send + Sync,
{
    // Leaf condition: few enough points or at max depth
    if points.len() <= limits.max_points || node.level() >= limits.max_depth {
        node.set_payload(points);
        return Ok(node);
    }

    let (kept, overflow) = sample_grid(&node, points, limits.grid_cells);
    if overflow.is_empty() {
        node.set_payload(kept);
        return Ok(node);
    }

    let center = node.center();
    let mut buckets: [Vec<T>; 8] = Default::default();
    for p in overflow {
        let pos = child_position::<R>(center, p.position());
        buckets[usize::from(pos)].push(p);
    }

    let node_ref = &node;
    let children = buckets
        .into_iter()
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i, sub)| {
            let child = node_ref.create_child(i as u8)?;
            build_node(child, sub, limits)
        })
        .collect::<Result<Vec<_>>>()?;

    node.set_children_from_vec(children)?;
    node.set_payload(kept);
    Ok(node)
}

/// Split `points` into the first point of every occupied grid cell and the rest.
fn sample_grid<R, T>(node: &Octant<R, T>, points: Vec<T>, grid_cells: u32) -> (Vec<T>, Vec<T>)
where
    R: Real,
    T: HasPosition<R>,
{
    let origin = node.min();
    let cells = R::from_f64(f64::from(grid_cells));
    let scale = cells / node.size();
    let last = grid_cells - 1;
    let cell_of = |v: R| -> u32 {
        let i = ((v * scale).to_f64().floor()).max(0.0) as u32;
        i.min(last)
    };

    let mut occupied = HashSet::with_capacity(points.len().min(1 << 16));
    let mut kept = Vec::new();
    let mut overflow = Vec::new();
    for p in points {
        let local = p.position() - origin;
        let cell = (cell_of(local.x()), cell_of(local.y()), cell_of(local.z()));
        if occupied.insert(cell) {
            kept.push(p);
        } else {
            overflow.push(p);
        }
    }
    (kept, overflow)
}

/// Bounding cube of `aabb`: its center and the longest edge, padded by 1% so
/// no point lies on the border of the cube.
///
/// A box collapsed to a point gets edge length 1 before padding.
pub fn cube_bounds<R: Real>(aabb: &Aabb<R>) -> (R::Vec3, R) {
    let size = aabb.size().max_element();
    let size = if size > R::ZERO { size } else { R::ONE };
    (aabb.center(), size * R::from_f64(CUBE_PADDING))
}

const CUBE_PADDING: f64 = 1.01;

/// Child slot of `point` in a node centered at `center`.
///
/// Bit 0 is set for `x >= center.x`, bit 1 for `z`, bit 2 for `y`.
pub fn child_position<R: Real>(center: R::Vec3, point: R::Vec3) -> u8 {
    let mut pos = 0;
    if point.x() >= center.x() {
        pos |= 1;
    }
    if point.z() >= center.z() {
        pos |= 2;
    }
    if point.y() >= center.y() {
        pos |= 4;
    }
    pos
}
