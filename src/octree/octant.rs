//! Octree nodes and the culling queries every node supports.

use crate::bounds::{Aabb, Frustum, Plane};
use crate::error::{CullError, Result};
use crate::math::{Real, Vector3};

use super::id::OctantId;

/// A cubic node of an 8-ary spatial tree.
///
/// Implementors supply the cube and the child slots; culling and level of
/// detail queries come for free. `children()` is either empty (leaf) or holds
/// exactly eight nodes.
pub trait BoundedNode<R: Real>: Sized {
    fn center(&self) -> R::Vec3;

    /// Edge length of the cube.
    fn size(&self) -> R;

    fn is_leaf(&self) -> bool;

    fn children(&self) -> &[Self];

    fn min(&self) -> R::Vec3 {
        self.center() - R::Vec3::splat(self.size() * R::HALF)
    }

    fn max(&self) -> R::Vec3 {
        self.center() + R::Vec3::splat(self.size() * R::HALF)
    }

    fn bounds(&self) -> Aabb<R> {
        Aabb {
            min: self.min(),
            max: self.max(),
        }
    }

    fn contains_point(&self, point: R::Vec3) -> bool {
        self.bounds().contains_point(point)
    }

    /// `false` only when the node lies entirely on the outer side of `plane`.
    fn inside_or_intersecting_plane(&self, plane: &Plane<R>) -> bool {
        plane.inside_or_intersecting_cube(self.center(), self.size())
    }

    /// Conservative frustum test, stops at the first plane that excludes the node.
    ///
    /// May report nodes just outside a frustum corner as visible; never
    /// rejects a node that overlaps the frustum.
    fn inside_or_intersecting_frustum(&self, frustum: &Frustum<R>) -> bool {
        frustum
            .planes()
            .iter()
            .all(|plane| self.inside_or_intersecting_plane(plane))
    }

    /// Apparent height in pixels of the node seen from `camera_pos`.
    ///
    /// `fov` is the vertical field of view in radians. A camera placed exactly
    /// at the center divides by zero and yields infinity (NaN for a zero-sized
    /// node).
    fn screen_projected_size(&self, camera_pos: R::Vec3, screen_height: R, fov: R) -> R {
        projected_size(self.center(), self.size(), camera_pos, screen_height, fov)
    }
}

fn projected_size<R: Real>(center: R::Vec3, size: R, camera_pos: R::Vec3, screen_height: R, fov: R) -> R {
    let distance = (center - camera_pos).length();
    let slope = (fov * R::HALF).tan();
    screen_height * R::HALF * size / (slope * distance)
}

/// Octree node with a payload of `T`.
///
/// Level and position in the parent are encoded in the node's [`OctantId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Octant<R: Real, T> {
    id: OctantId,
    center: R::Vec3,
    size: R,
    projected_screen_size: R,
    children: Option<Box<[Octant<R, T>; 8]>>,
    payload: Vec<T>,
}

impl<R: Real, T> Octant<R, T> {
    pub fn new_root(center: R::Vec3, size: R) -> Self {
        Self::with_id(OctantId::root(), center, size)
    }

    fn with_id(id: OctantId, center: R::Vec3, size: R) -> Self {
        Self {
            id,
            center,
            size,
            projected_screen_size: R::ZERO,
            children: None,
            payload: Vec::new(),
        }
    }

    pub fn id(&self) -> OctantId {
        self.id
    }

    pub fn level(&self) -> u8 {
        self.id.level()
    }

    /// Position (0..8) within the parent, `None` for the root.
    pub fn pos_in_parent(&self) -> Option<u8> {
        self.id.last_position()
    }

    /// Value stored by the last `compute_screen_projected_size*` call.
    pub fn projected_screen_size(&self) -> R {
        self.projected_screen_size
    }

    pub fn payload(&self) -> &[T] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Vec<T> {
        &mut self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<T>) {
        self.payload = payload;
    }

    pub fn children_mut(&mut self) -> Option<&mut [Octant<R, T>; 8]> {
        self.children.as_deref_mut()
    }

    /// Center of the child cube at `pos`: bit 0 selects +x, bit 1 +z, bit 2 +y.
    pub fn child_center(&self, pos: u8) -> R::Vec3 {
        let quarter = self.size * R::HALF * R::HALF;
        let offset = |bit: u8| if pos & bit != 0 { quarter } else { -quarter };
        self.center + R::Vec3::new(offset(1), offset(4), offset(2))
    }

    /// New, empty child at `pos` with half the edge length.
    pub fn create_child(&self, pos: u8) -> Result<Self> {
        let id = self.id.child(pos)?;
        Ok(Self::with_id(id, self.child_center(pos), self.size * R::HALF))
    }

    /// Split the node into eight empty children.
    ///
    /// Fails if the node already has children or sits at the deepest level.
    /// The payload stays on this node.
    pub fn subdivide(&mut self) -> Result<()> {
        if self.children.is_some() {
            return Err(CullError::Contract(format!("octant {} is already subdivided", self.id)));
        }
        let children = (0..8u8)
            .map(|pos| self.create_child(pos))
            .collect::<Result<Vec<_>>>()?;
        self.set_children_from_vec(children)
    }

    /// Install eight children, replacing any existing ones.
    ///
    /// Child `i` must be the direct child at position `i` and smaller than this node.
    pub fn set_children(&mut self, children: [Octant<R, T>; 8]) -> Result<()> {
        for (i, child) in children.iter().enumerate() {
            if child.id.parent() != Some(self.id) || child.pos_in_parent() != Some(i as u8) {
                return Err(CullError::Contract(format!(
                    "octant {} cannot be child {i} of {}",
                    child.id, self.id
                )));
            }
            if !(child.size < self.size) {
                return Err(CullError::Contract(format!(
                    "child {} size {:?} is not smaller than parent size {:?}",
                    child.id, child.size, self.size
                )));
            }
        }
        self.children = Some(Box::new(children));
        Ok(())
    }

    /// Same as [`Octant::set_children`], for children collected into a `Vec`.
    pub fn set_children_from_vec(&mut self, children: Vec<Octant<R, T>>) -> Result<()> {
        let children: [Octant<R, T>; 8] = children.try_into().map_err(|v: Vec<_>| {
            CullError::Contract(format!(
                "octant {} needs exactly 8 children, got {}",
                self.id,
                v.len()
            ))
        })?;
        self.set_children(children)
    }

    /// Compute and store the projected screen size.
    pub fn compute_screen_projected_size(&mut self, camera_pos: R::Vec3, screen_height: R, fov: R) -> R {
        self.projected_screen_size = self.screen_projected_size(camera_pos, screen_height, fov);
        self.projected_screen_size
    }

    /// Projected size of an instance of this node moved by `translation` and
    /// scaled per axis by `scale`; the largest scale component sizes the cube.
    pub fn compute_screen_projected_size_transformed(
        &mut self,
        camera_pos: R::Vec3,
        screen_height: R,
        fov: R,
        translation: R::Vec3,
        scale: R::Vec3,
    ) -> R {
        let size = self.size * scale.abs().max_element();
        self.projected_screen_size =
            projected_size(self.center + translation, size, camera_pos, screen_height, fov);
        self.projected_screen_size
    }

    /// Frustum test for an instance of this node moved by `translation` and
    /// scaled per axis by `scale`.
    pub fn inside_or_intersecting_frustum_transformed(
        &self,
        frustum: &Frustum<R>,
        translation: R::Vec3,
        scale: R::Vec3,
    ) -> bool {
        let center = self.center + translation;
        let size = scale.abs() * self.size;
        frustum
            .planes()
            .iter()
            .all(|plane| plane.inside_or_intersecting_cuboid(center, size))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Levels below this node; 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Depth-first, pre-order walk over the subtree, children in position order.
    pub fn iter(&self) -> Iter<'_, R, T> {
        Iter { stack: vec![self] }
    }
}

impl<R: Real, T> BoundedNode<R> for Octant<R, T> {
    fn center(&self) -> R::Vec3 {
        self.center
    }

    fn size(&self) -> R {
        self.size
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn children(&self) -> &[Self] {
        match &self.children {
            Some(children) => &children[..],
            None => &[],
        }
    }
}

pub struct Iter<'a, R: Real, T> {
    stack: Vec<&'a Octant<R, T>>,
}

impl<'a, R: Real, T> Iterator for Iter<'a, R, T> {
    type Item = &'a Octant<R, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

impl<'a, R: Real, T> IntoIterator for &'a Octant<R, T> {
    type Item = &'a Octant<R, T>;
    type IntoIter = Iter<'a, R, T>;

    fn into_iter(self) -> Iter<'a, R, T> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Frustumd, Planed};
    use crate::octree::id::MAX_LEVEL;
    use glam::{DMat4, DVec3, Vec3};

    type Node = Octant<f64, u32>;

    fn root() -> Node {
        Node::new_root(DVec3::ZERO, 4.0)
    }

    #[test]
    fn root_accessors() {
        let r = root();
        assert_eq!(r.level(), 0);
        assert_eq!(r.pos_in_parent(), None);
        assert!(r.is_leaf());
        assert!(r.children().is_empty());
        assert_eq!(r.min(), DVec3::splat(-2.0));
        assert_eq!(r.max(), DVec3::splat(2.0));
        assert!(r.contains_point(DVec3::new(1.0, -2.0, 0.5)));
        assert!(!r.contains_point(DVec3::new(2.5, 0.0, 0.0)));
    }

    #[test]
    fn subdivide_postcondition() {
        let mut r = root();
        r.payload_mut().push(7);
        r.subdivide().unwrap();

        assert!(!r.is_leaf());
        assert_eq!(r.children().len(), 8);
        assert_eq!(r.payload(), &[7]);
        for (i, child) in r.children().iter().enumerate() {
            assert_eq!(child.size(), 2.0);
            assert_eq!(child.level(), 1);
            assert_eq!(child.pos_in_parent(), Some(i as u8));
            assert!(child.is_leaf());
            assert!(r.contains_point(child.min()) && r.contains_point(child.max()));
        }
    }

    #[test]
    fn child_position_bits() {
        let r = root();
        assert_eq!(r.child_center(0), DVec3::new(-1.0, -1.0, -1.0));
        assert_eq!(r.child_center(1), DVec3::new(1.0, -1.0, -1.0));
        assert_eq!(r.child_center(2), DVec3::new(-1.0, -1.0, 1.0));
        assert_eq!(r.child_center(4), DVec3::new(-1.0, 1.0, -1.0));
        assert_eq!(r.child_center(7), DVec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn children_tile_parent() {
        let mut r = root();
        r.subdivide().unwrap();
        let union = r
            .children()
            .iter()
            .map(|c| c.bounds())
            .reduce(|a, b| a.union(&b))
            .unwrap();
        assert_eq!(union, r.bounds());
    }

    #[test]
    fn subdivide_twice_is_contract_error() {
        let mut r = root();
        r.subdivide().unwrap();
        assert!(matches!(r.subdivide(), Err(CullError::Contract(_))));
    }

    #[test]
    fn subdivide_stops_at_max_level() {
        let mut node = &mut root();
        for _ in 0..MAX_LEVEL {
            node.subdivide().unwrap();
            node = &mut node.children_mut().unwrap()[0];
        }
        assert_eq!(node.level(), MAX_LEVEL);
        assert!(matches!(node.subdivide(), Err(CullError::Contract(_))));
        assert!(node.is_leaf());
    }

    #[test]
    fn set_children_validates() {
        let mut r = root();
        let kids: Vec<Node> = (0..7).map(|p| r.create_child(p).unwrap()).collect();
        assert!(matches!(
            r.set_children_from_vec(kids),
            Err(CullError::Contract(_))
        ));
        assert!(r.is_leaf());

        let mut kids: Vec<Node> = (0..8).map(|p| r.create_child(p).unwrap()).collect();
        kids.swap(0, 1);
        assert!(r.set_children_from_vec(kids).is_err());

        let grandchild = r.create_child(0).unwrap().create_child(0).unwrap();
        let mut kids: Vec<Node> = (0..8).map(|p| r.create_child(p).unwrap()).collect();
        kids[0] = grandchild;
        assert!(r.set_children_from_vec(kids).is_err());

        let kids: Vec<Node> = (0..8).map(|p| r.create_child(p).unwrap()).collect();
        r.set_children_from_vec(kids).unwrap();
        assert_eq!(r.node_count(), 9);
    }

    #[test]
    fn set_children_rejects_non_shrinking_child() {
        let mut r = root();
        let mut kids: Vec<Node> = (0..8).map(|p| r.create_child(p).unwrap()).collect();
        kids[3].size = 4.0;
        assert!(matches!(
            r.set_children_from_vec(kids),
            Err(CullError::Contract(_))
        ));
    }

    #[test]
    fn screen_projected_size_formula() {
        let mut node = Node::new_root(DVec3::new(0.0, 0.0, -10.0), 2.0);
        let fov = 90f64.to_radians();
        let size = node.compute_screen_projected_size(DVec3::ZERO, 1080.0, fov);
        approx::assert_relative_eq!(size, 108.0, epsilon = 1e-9);
        assert_eq!(node.projected_screen_size(), size);
    }

    #[test]
    fn screen_projected_size_uses_raw_slope() {
        // tan(135°) = -1: the slope's sign is passed through
        let node = Node::new_root(DVec3::new(0.0, 0.0, -10.0), 2.0);
        let size = node.screen_projected_size(DVec3::ZERO, 1080.0, 270f64.to_radians());
        approx::assert_relative_eq!(size, -108.0, epsilon = 1e-9);
    }

    #[test]
    fn screen_projected_size_at_camera_is_infinite() {
        let node = Node::new_root(DVec3::new(1.0, 2.0, 3.0), 2.0);
        let size = node.screen_projected_size(DVec3::new(1.0, 2.0, 3.0), 1080.0, 1.0);
        assert!(size.is_infinite());
    }

    #[test]
    fn transformed_variants() {
        let mut node = Node::new_root(DVec3::ZERO, 2.0);
        let fov = 90f64.to_radians();
        let translation = DVec3::new(0.0, 0.0, -10.0);
        let scale = DVec3::new(1.0, 2.0, 1.0);
        let size = node.compute_screen_projected_size_transformed(DVec3::ZERO, 1080.0, fov, translation, scale);
        approx::assert_relative_eq!(size, 216.0, epsilon = 1e-9);

        let proj = DMat4::perspective_rh_gl(fov, 1.0, 0.1, 100.0);
        let frustum = Frustumd::from_matrix(&proj);
        assert!(node.inside_or_intersecting_frustum_transformed(&frustum, translation, scale));
        assert!(!node.inside_or_intersecting_frustum_transformed(&frustum, -translation, scale));
    }

    #[test]
    fn plane_query_matches_cube_test() {
        let node = Node::new_root(DVec3::new(3.0, 0.0, 0.0), 2.0);
        for d in [0.0, 1.9, 2.0, 4.5] {
            let plane = Planed::new(-1.0, 0.0, 0.0, -d);
            assert_eq!(
                node.inside_or_intersecting_plane(&plane),
                plane.inside_or_intersecting_cube(DVec3::new(3.0, 0.0, 0.0), 2.0)
            );
        }
        // x >= 4.5 is inside, node spans [2, 4]
        assert!(!node.inside_or_intersecting_plane(&Planed::new(-1.0, 0.0, 0.0, -4.5)));
    }

    #[test]
    fn node_containing_camera_is_never_culled() {
        let eye = DVec3::new(3.0, 1.0, 5.0);
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let proj = DMat4::perspective_rh_gl(45f64.to_radians(), 1.5, 0.1, 50.0);
        let frustum = Frustumd::from_matrix(&(proj * view));

        for size in [0.5, 2.0, 100.0] {
            let node = Node::new_root(eye, size);
            assert!(node.inside_or_intersecting_frustum(&frustum));
        }
        let behind = Node::new_root(eye * 3.0, 1.0);
        assert!(!behind.inside_or_intersecting_frustum(&frustum));
        assert!(Node::new_root(DVec3::ZERO, 1.0).inside_or_intersecting_frustum(&frustum));
    }

    #[test]
    fn iter_is_depth_first() {
        let mut r = root();
        r.subdivide().unwrap();
        r.children_mut().unwrap()[1].subdivide().unwrap();

        let ids: Vec<String> = r.iter().map(|n| n.id().to_string()).collect();
        assert_eq!(ids.len(), r.node_count());
        assert_eq!(r.node_count(), 17);
        assert_eq!(r.depth(), 2);
        assert_eq!(&ids[..4], &["r", "r0", "r1", "r10"]);
        assert_eq!(ids.last().map(String::as_str), Some("r7"));
    }

    #[test]
    fn single_precision_node() {
        let mut node = Octant::<f32, ()>::new_root(Vec3::ZERO, 1.0);
        node.subdivide().unwrap();
        assert_eq!(node.children()[7].center(), Vec3::splat(0.25));
    }
}
