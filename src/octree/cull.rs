//! Visibility pass over an octree.

use rayon::prelude::*;
use serde::Serialize;

use crate::bounds::Frustum;
use crate::math::{Real, Vector3};

use super::builder::Octree;
use super::id::OctantId;
use super::octant::{BoundedNode, Octant};

/// Camera parameters for level of detail selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodCamera<R: Real> {
    pub position: R::Vec3,
    /// Viewport height in pixels.
    pub screen_height: R,
    /// Vertical field of view in radians.
    pub fov: R,
}

/// One octant that survived culling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleOctant {
    pub id: OctantId,
    pub level: u8,
    pub center: [f64; 3],
    pub size: f64,
    pub projected_size: f64,
    pub point_count: usize,
    pub is_leaf: bool,
}

/// Collect the octants inside `frustum` whose projected size reaches
/// `min_screen_size`, largest on screen first.
///
/// A rejected node prunes its whole subtree. Octants without points are
/// traversed but not reported. Since inner octants carry a spacing-grid
/// subsample, a larger `min_screen_size` coarsens the result rather than
/// dropping regions of the cloud.
pub fn cull<R, T>(
    octree: &Octree<R, T>,
    frustum: &Frustum<R>,
    camera: &LodCamera<R>,
    min_screen_size: R,
) -> Vec<VisibleOctant>
where
    R: Real,
    T: Send + Sync,
{
    let mut visible = visit(octree.root(), frustum, camera, min_screen_size);
    visible.sort_by(|a, b| b.projected_size.total_cmp(&a.projected_size));
    visible
}

fn visit<R, T>(
    node: &Octant<R, T>,
    frustum: &Frustum<R>,
    camera: &LodCamera<R>,
    min_screen_size: R,
) -> Vec<VisibleOctant>
where
    R: Real,
    T: Send + Sync,
{
    if !node.inside_or_intersecting_frustum(frustum) {
        return Vec::new();
    }
    let projected = node.screen_projected_size(camera.position, camera.screen_height, camera.fov);
    if projected < min_screen_size {
        return Vec::new();
    }

    let mut out = Vec::new();
    if !node.payload().is_empty() {
        out.push(VisibleOctant {
            id: node.id(),
            level: node.level(),
            center: node.center().to_array().map(R::to_f64),
            size: node.size().to_f64(),
            projected_size: projected.to_f64(),
            point_count: node.payload().len(),
            is_leaf: node.is_leaf(),
        });
    }

    let below: Vec<VisibleOctant> = node
        .children()
        .par_iter()
        .flat_map_iter(|child| visit(child, frustum, camera, min_screen_size))
        .collect();
    out.extend(below);
    out
}
