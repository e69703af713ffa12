use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

use crate::ball::Ball;
use crate::bbox::{BoundingBox, IntersectsBox};
use crate::bvh::{Bvh, BvhIntersectIter, KindLine};
use crate::error::Result;
use crate::ray::Line;
use crate::{BoundingVolumeKind, Point3, Primitive};

/// A node of a [`Bvh`], stored in the node arena of the tree.
///
/// Every node owns a contiguous range of the primitives of the tree. Internal nodes own the
/// range of their whole subtree and have exactly two children; the left child is always the
/// next node in the arena, the right child follows the left subtree.
///
/// The bounding box of a node is computed once, on first access. Internal nodes get theirs
/// during the build.
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// The primitives of this node, as a range of [`Bvh::primitives`].
    pub(crate) range: Range<usize>,

    /// The node's parent, `None` for the root.
    pub(crate) parent_index: Option<usize>,

    /// Indices of the left and right child, `None` for leaves.
    pub(crate) children: Option<[usize; 2]>,

    /// Number of edges between this node and the root.
    pub(crate) depth: u32,

    /// The bounding box of the node's primitives.
    pub(crate) bbox: OnceLock<BoundingBox>,
}

impl PartialEq for BvhNode {
    // Structure only. Which leaf boxes are cached depends on the queries run so far.
    fn eq(&self, other: &BvhNode) -> bool {
        self.range == other.range
            && self.parent_index == other.parent_index
            && self.children == other.children
            && self.depth == other.depth
    }
}

impl BvhNode {
    /// Creates a leaf node. Its box is left to be computed on first access.
    pub(crate) fn leaf(range: Range<usize>, parent_index: Option<usize>, depth: u32) -> BvhNode {
        BvhNode {
            range,
            parent_index,
            children: None,
            depth,
            bbox: OnceLock::new(),
        }
    }

    /// Creates an internal node with an already computed box.
    pub(crate) fn internal(
        range: Range<usize>,
        parent_index: Option<usize>,
        depth: u32,
        children: [usize; 2],
        bbox: BoundingBox,
    ) -> BvhNode {
        BvhNode {
            range,
            parent_index,
            children: Some(children),
            depth,
            bbox: OnceLock::from(bbox),
        }
    }

    /// Moves a node of a subtree built on its own into a larger arena. The subtree root takes
    /// `root_parent` as its parent.
    #[cfg(feature = "rayon")]
    pub(crate) fn rebased(
        mut self,
        index_offset: usize,
        range_offset: usize,
        root_parent: usize,
    ) -> BvhNode {
        self.range = self.range.start + range_offset..self.range.end + range_offset;
        self.parent_index = Some(self.parent_index.map_or(root_parent, |p| p + index_offset));
        self.children = self.children.map(|c| c.map(|c| c + index_offset));
        self
    }

    /// The primitives of this node, as a range of [`Bvh::primitives`].
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The index of the parent node, `None` for the root.
    pub fn parent_index(&self) -> Option<usize> {
        self.parent_index
    }

    /// The indices of the left and right child, `None` for leaves.
    pub fn child_indices(&self) -> Option<[usize; 2]> {
        self.children
    }

    /// Number of edges between this node and the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The bounding box, if it has been computed already.
    pub fn cached_bbox(&self) -> Option<&BoundingBox> {
        self.bbox.get()
    }
}

/// A borrowed view of one node of a [`Bvh`], giving access to its box, its primitives and its
/// relatives.
pub struct NodeRef<'bvh, K: BoundingVolumeKind> {
    bvh: &'bvh Bvh<K>,
    index: usize,
}

impl<K: BoundingVolumeKind> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: BoundingVolumeKind> Copy for NodeRef<'_, K> {}

impl<K: BoundingVolumeKind> PartialEq for NodeRef<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.bvh, other.bvh) && self.index == other.index
    }
}

impl<K: BoundingVolumeKind> fmt::Debug for NodeRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node();
        f.debug_struct("NodeRef")
            .field("index", &self.index)
            .field("range", &node.range)
            .field("depth", &node.depth)
            .field("is_leaf", &node.is_leaf())
            .finish()
    }
}

impl<'bvh, K: BoundingVolumeKind> NodeRef<'bvh, K> {
    pub(crate) fn new(bvh: &'bvh Bvh<K>, index: usize) -> Self {
        NodeRef { bvh, index }
    }

    /// The index of this node in the node arena.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The node record.
    pub fn node(&self) -> &'bvh BvhNode {
        &self.bvh.nodes[self.index]
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// The primitives contained in this node and all of its descendants.
    pub fn objects(&self) -> &'bvh [Primitive] {
        &self.bvh.primitives[self.node().range()]
    }

    /// Number of primitives in this node.
    pub fn len(&self) -> usize {
        self.node().range.len()
    }

    /// Returns true if the node has no primitives. Only the root of an empty tree could, and an
    /// empty tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of edges between this node and the root.
    pub fn depth(&self) -> u32 {
        self.node().depth
    }

    /// The parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'bvh, K>> {
        self.node()
            .parent_index
            .map(|index| NodeRef::new(self.bvh, index))
    }

    /// The left and right child, `None` for leaves.
    pub fn children(&self) -> Option<[NodeRef<'bvh, K>; 2]> {
        self.node()
            .children
            .map(|children| children.map(|index| NodeRef::new(self.bvh, index)))
    }

    /// The boundary points of all primitives of this node.
    pub fn points(&self) -> Vec<Point3> {
        self.objects()
            .iter()
            .flat_map(|primitive| primitive.points.iter().copied())
            .collect()
    }

    /// The bounding box of this node, enclosing every boundary point of its primitives.
    ///
    /// The box is computed on first access and memoised; later calls return the same box.
    ///
    /// # Errors
    /// Fails if the kind of box cannot be computed for the node's points, e.g. an oriented box
    /// of a single triangle whose corners are collinear. Failures are not memoised.
    pub fn bbox(&self) -> Result<&'bvh BoundingBox> {
        let node = self.node();
        if let Some(bbox) = node.bbox.get() {
            return Ok(bbox);
        }
        let bbox = K::compute_box(&self.points())?;
        Ok(node.bbox.get_or_init(|| bbox))
    }

    /// Yields this node and all of its descendants whose box is crossed by `line`, skipping the
    /// subtrees of nodes which are missed.
    pub fn intersect_line(&self, line: &Line) -> BvhIntersectIter<'bvh, K, KindLine<K>> {
        BvhIntersectIter::new(self.bvh, Some(self.index), KindLine::new(*line))
    }

    /// Yields this node and all of its descendants whose box intersects `bbox`.
    pub fn intersect_box(&self, bbox: &BoundingBox) -> BvhIntersectIter<'bvh, K, BoundingBox> {
        BvhIntersectIter::new(self.bvh, Some(self.index), *bbox)
    }

    /// Yields this node and all of its descendants whose box intersects `ball`.
    pub fn intersect_sphere(&self, ball: &Ball) -> BvhIntersectIter<'bvh, K, Ball> {
        BvhIntersectIter::new(self.bvh, Some(self.index), *ball)
    }

    /// Yields this node and all of its descendants whose box intersects `query`.
    pub fn intersect<'q, Q: IntersectsBox + ?Sized>(
        &self,
        query: &'q Q,
    ) -> BvhIntersectIter<'bvh, K, &'q Q> {
        BvhIntersectIter::new(self.bvh, Some(self.index), query)
    }
}

#[cfg(test)]
mod tests {
    use crate::bvh::{Bvh, BvhOptions};
    use crate::testbase::{generate_aligned_triangles, uv_sphere_mesh};
    use crate::{Aligned, Oriented};

    #[test]
    /// The box of a node is computed once, later calls return the very same box.
    fn test_bbox_memoised() {
        let bvh = Bvh::<Oriented>::from_mesh(&uv_sphere_mesh(1.0, 8, 8), BvhOptions::default())
            .unwrap();
        let leaf = bvh.leaves().next().unwrap();
        assert!(leaf.node().cached_bbox().is_none());

        let first = leaf.bbox().unwrap();
        let second = leaf.bbox().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(leaf.node().cached_bbox(), Some(first));
    }

    #[test]
    fn test_relatives() {
        let bvh =
            Bvh::<Aligned>::from_triangles(&generate_aligned_triangles(), BvhOptions::default())
                .unwrap();
        let root = bvh.root().unwrap();
        assert_eq!(root.parent(), None);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.len(), 21);

        let [left, right] = root.children().unwrap();
        assert_eq!(left.index(), 1);
        assert_eq!(left.parent(), Some(root));
        assert_eq!(right.parent(), Some(root));
        assert_eq!(left.len() + right.len(), root.len());
        assert_eq!(left.len(), 10);
        assert_eq!(left.depth(), 1);

        // The left half holds the triangles at the lower x coordinates.
        let left_max = left.bbox().unwrap().max().x;
        let right_min = right.bbox().unwrap().min().x;
        assert!(left_max < right_min);
    }

    #[test]
    /// Objects of a node are the objects of its leaves.
    fn test_objects_of_subtree() {
        let bvh =
            Bvh::<Aligned>::from_triangles(&generate_aligned_triangles(), BvhOptions::default())
                .unwrap();
        let root = bvh.root().unwrap();
        let mut from_leaves = root
            .intersect_box(root.bbox().unwrap())
            .filter(|node| node.is_leaf())
            .flat_map(|node| node.objects())
            .map(|primitive| primitive.index)
            .collect::<Vec<_>>();
        from_leaves.sort();
        let mut all = root.objects().iter().map(|p| p.index).collect::<Vec<_>>();
        all.sort();
        assert_eq!(from_leaves, all);
        assert_eq!(all, (0..21).collect::<Vec<_>>());

        let leaf = bvh.leaves().next().unwrap();
        assert_eq!(leaf.points().len(), 3);
        assert!(leaf
            .points()
            .iter()
            .all(|point| leaf.bbox().unwrap().contains_point(point)));
    }
}
