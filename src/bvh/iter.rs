use std::marker::PhantomData;

use log::warn;

use crate::bbox::{BoundingBox, IntersectsBox};
use crate::bvh::{Bvh, NodeRef};
use crate::ray::Line;
use crate::BoundingVolumeKind;

/// A [`Line`] tested against node boxes the way the bounding volume kind `K` prescribes:
/// slab test for axis-aligned boxes, clipping in the box frame for oriented ones.
#[derive(Debug, Clone, Copy)]
pub struct KindLine<K: BoundingVolumeKind> {
    line: Line,
    kind: PhantomData<K>,
}

impl<K: BoundingVolumeKind> KindLine<K> {
    /// Wraps `line`.
    pub fn new(line: Line) -> Self {
        KindLine {
            line,
            kind: PhantomData,
        }
    }

    /// The wrapped line.
    pub fn line(&self) -> &Line {
        &self.line
    }
}

impl<K: BoundingVolumeKind> IntersectsBox for KindLine<K> {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        K::intersects_line(&self.line, bbox)
    }
}

/// Iterator over the nodes of a [`Bvh`] whose boxes intersect a query, in depth-first order.
///
/// The children of a node are only visited if the node itself intersects the query.
#[derive(Clone)]
pub struct BvhIntersectIter<'bvh, K: BoundingVolumeKind, Q: IntersectsBox> {
    /// Reference to the [`Bvh`] to traverse
    bvh: &'bvh Bvh<K>,
    /// The query
    query: Q,
    /// Nodes still to be tested
    stack: Vec<usize>,
}

impl<'bvh, K: BoundingVolumeKind, Q: IntersectsBox> BvhIntersectIter<'bvh, K, Q> {
    /// Creates a new [`BvhIntersectIter`] starting at the node `start`, or an empty one.
    pub fn new(bvh: &'bvh Bvh<K>, start: Option<usize>, query: Q) -> Self {
        BvhIntersectIter {
            bvh,
            query,
            stack: start.into_iter().collect(),
        }
    }

    /// Returns true if the query intersects the box of `node`. A node without a box cannot be
    /// pruned and counts as intersected.
    fn test_node(&self, node: &NodeRef<'bvh, K>) -> bool {
        match node.bbox() {
            Ok(bbox) => self.query.intersects_box(bbox),
            Err(err) => {
                warn!(
                    "no {} box for node {}, keeping it as a candidate: {}",
                    K::NAME,
                    node.index(),
                    err
                );
                true
            }
        }
    }
}

impl<'bvh, K: BoundingVolumeKind, Q: IntersectsBox> Iterator for BvhIntersectIter<'bvh, K, Q> {
    type Item = NodeRef<'bvh, K>;

    fn next(&mut self) -> Option<NodeRef<'bvh, K>> {
        while let Some(index) = self.stack.pop() {
            let node = NodeRef::new(self.bvh, index);
            if !self.test_node(&node) {
                continue;
            }
            if let Some([left, right]) = node.node().child_indices() {
                self.stack.push(right);
                self.stack.push(left);
            }
            return Some(node);
        }
        None
    }
}
