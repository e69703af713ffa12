//! This module defines [`Bvh`] and [`BvhOptions`], and the top-down build of the hierarchy.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use log::{debug, trace};

use crate::ball::Ball;
use crate::bbox::{BoundingBox, IntersectsBox};
use crate::bvh::{BvhIntersectIter, BvhNode, KindLine, NodeRef};
use crate::error::{BvhError, Result};
use crate::mesh::FaceMesh;
use crate::ray::Line;
use crate::{Aligned, BoundingVolumeKind, Point3, Primitive, EPSILON};

/// Subtrees with more primitives than this are built in parallel by [`Bvh::build_par`].
#[cfg(feature = "rayon")]
pub const PARALLEL_THRESHOLD: usize = 64;

/// Options controlling the shape of a [`Bvh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct BvhOptions {
    /// Nodes with at most this many primitives become leaves. Must be at least 1.
    pub leafsize: usize,

    /// Nodes at this depth become leaves, regardless of their size. `None` for no limit.
    pub max_depth: Option<u32>,
}

impl Default for BvhOptions {
    fn default() -> Self {
        BvhOptions {
            leafsize: 1,
            max_depth: None,
        }
    }
}

impl BvhOptions {
    /// Sets the maximum number of primitives per leaf.
    pub fn with_leafsize(mut self, leafsize: usize) -> Self {
        self.leafsize = leafsize;
        self
    }

    /// Sets the depth at which nodes stop being split.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Checks that the options can build a tree.
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if `leafsize` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.leafsize == 0 {
            return Err(BvhError::InvalidInput(
                "leafsize must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if a node with `len` primitives at `depth` is not split any further.
    pub fn is_leaf(&self, len: usize, depth: u32) -> bool {
        len <= self.leafsize || len == 1 || self.max_depth.is_some_and(|max| depth >= max)
    }
}

/// The [`Bvh`] data structure. Contains the primitives, reordered so that every node owns a
/// contiguous range of them, and the list of nodes in depth-first order.
///
/// The type parameter selects the kind of node boxes, [`Aligned`] or
/// [`Oriented`](crate::Oriented).
#[derive(Debug, Clone)]
pub struct Bvh<K: BoundingVolumeKind = Aligned> {
    /// The primitives, in split order.
    pub(crate) primitives: Vec<Primitive>,

    /// The list of nodes of the [`Bvh`]. The root is the first node.
    pub(crate) nodes: Vec<BvhNode>,

    options: BvhOptions,

    kind: PhantomData<K>,
}

/// A range of primitives waiting to become a node of the sequential build.
struct BuildTask {
    range: Range<usize>,
    parent_index: Option<usize>,
    depth: u32,
    is_right: bool,
}

/// Computes the box of `primitives`, sorts them along the split axis of that box and returns
/// the box and the split position.
fn split_primitives<K: BoundingVolumeKind>(
    primitives: &mut [Primitive],
) -> Result<(BoundingBox, usize)> {
    let points = primitives
        .iter()
        .flat_map(|primitive| primitive.points.iter().copied())
        .collect::<Vec<Point3>>();
    let bbox = K::compute_box(&points)?;
    let axis = K::split_axis(&bbox);

    // Stable, so primitives with equal projections keep their input order.
    primitives.sort_by(|a, b| {
        let a = (a.centroid - bbox.center).dot(&axis);
        let b = (b.centroid - bbox.center).dot(&axis);
        a.total_cmp(&b)
    });

    Ok((bbox, primitives.len() / 2))
}

/// Builds the nodes over `primitives` with an explicit work-list. Node ranges are relative to
/// `primitives`, the root is the first node, has no parent and sits at `depth`.
fn build_nodes<K: BoundingVolumeKind>(
    primitives: &mut [Primitive],
    depth: u32,
    options: BvhOptions,
) -> Result<Vec<BvhNode>> {
    let mut nodes = Vec::with_capacity(2 * primitives.len());
    if primitives.is_empty() {
        return Ok(nodes);
    }

    let mut tasks = vec![BuildTask {
        range: 0..primitives.len(),
        parent_index: None,
        depth,
        is_right: false,
    }];
    while let Some(task) = tasks.pop() {
        let node_index = nodes.len();

        // The left child is always `parent + 1`, the right one is only known now.
        if let (true, Some(parent)) = (task.is_right, task.parent_index) {
            if let Some(children) = nodes[parent].children.as_mut() {
                children[1] = node_index;
            }
        }

        if options.is_leaf(task.range.len(), task.depth) {
            nodes.push(BvhNode::leaf(task.range, task.parent_index, task.depth));
            continue;
        }

        let (bbox, split) = split_primitives::<K>(&mut primitives[task.range.clone()])?;
        let mid = task.range.start + split;
        trace!(
            "node {} at depth {}: {} primitives split at {}",
            node_index,
            task.depth,
            task.range.len(),
            split
        );

        // The right child index is patched when its task is popped.
        nodes.push(BvhNode::internal(
            task.range.clone(),
            task.parent_index,
            task.depth,
            [node_index + 1, node_index + 1],
            bbox,
        ));
        tasks.push(BuildTask {
            range: mid..task.range.end,
            parent_index: Some(node_index),
            depth: task.depth + 1,
            is_right: true,
        });
        tasks.push(BuildTask {
            range: task.range.start..mid,
            parent_index: Some(node_index),
            depth: task.depth + 1,
            is_right: false,
        });
    }

    Ok(nodes)
}

/// Like [`build_nodes`], but builds the two halves of large ranges in parallel.
#[cfg(feature = "rayon")]
fn build_nodes_par<K: BoundingVolumeKind>(
    primitives: &mut [Primitive],
    depth: u32,
    options: BvhOptions,
) -> Result<Vec<BvhNode>> {
    let len = primitives.len();
    if len <= PARALLEL_THRESHOLD || options.is_leaf(len, depth) {
        return build_nodes::<K>(primitives, depth, options);
    }

    let (bbox, split) = split_primitives::<K>(primitives)?;
    let (left_primitives, right_primitives) = primitives.split_at_mut(split);
    let (left, right) = rayon::join(
        || build_nodes_par::<K>(left_primitives, depth + 1, options),
        || build_nodes_par::<K>(right_primitives, depth + 1, options),
    );
    let (left, right) = (left?, right?);

    let right_index = 1 + left.len();
    let mut nodes = Vec::with_capacity(right_index + right.len());
    nodes.push(BvhNode::internal(0..len, None, depth, [1, right_index], bbox));
    nodes.extend(left.into_iter().map(|node| node.rebased(1, 0, 0)));
    nodes.extend(
        right
            .into_iter()
            .map(|node| node.rebased(right_index, split, 0)),
    );
    Ok(nodes)
}

impl<K: BoundingVolumeKind> Bvh<K> {
    fn from_parts(primitives: Vec<Primitive>, nodes: Vec<BvhNode>, options: BvhOptions) -> Self {
        let bvh = Bvh {
            primitives,
            nodes,
            options,
            kind: PhantomData,
        };
        debug!(
            "built {} bvh over {} primitives: {} nodes, {} leaves, depth {}",
            K::NAME,
            bvh.len(),
            bvh.node_count(),
            bvh.leaves().count(),
            bvh.depth()
        );
        bvh
    }

    /// Creates a new [`Bvh`] from the `primitives`, splitting nodes at the median of the
    /// primitive centroids along the split axis of the node box.
    ///
    /// An empty list of primitives gives an empty tree.
    ///
    /// # Errors
    /// Fails if the options are invalid, or if the box of an internal node cannot be computed.
    pub fn build(mut primitives: Vec<Primitive>, options: BvhOptions) -> Result<Bvh<K>> {
        options.validate()?;
        let nodes = build_nodes::<K>(&mut primitives, 0, options)?;
        Ok(Bvh::from_parts(primitives, nodes, options))
    }

    /// Like [`Bvh::build`], but builds large subtrees in parallel. The resulting tree is
    /// identical to the one of [`Bvh::build`].
    #[cfg(feature = "rayon")]
    pub fn build_par(mut primitives: Vec<Primitive>, options: BvhOptions) -> Result<Bvh<K>> {
        options.validate()?;
        let nodes = build_nodes_par::<K>(&mut primitives, 0, options)?;
        Ok(Bvh::from_parts(primitives, nodes, options))
    }

    /// Creates a new [`Bvh`] over triangles, each indexed by its position in `triangles`.
    pub fn from_triangles(triangles: &[[Point3; 3]], options: BvhOptions) -> Result<Bvh<K>> {
        Bvh::build(Primitive::from_triangles(triangles), options)
    }

    /// Creates a new [`Bvh`] over the faces of `mesh`, each indexed by its face identifier.
    pub fn from_mesh(mesh: &impl FaceMesh, options: BvhOptions) -> Result<Bvh<K>> {
        Bvh::build(mesh.to_primitives(), options)
    }

    /// The root node, `None` for an empty tree.
    pub fn root(&self) -> Option<NodeRef<'_, K>> {
        self.node(0)
    }

    /// The node at `index` in the node arena.
    pub fn node(&self, index: usize) -> Option<NodeRef<'_, K>> {
        (index < self.nodes.len()).then(|| NodeRef::new(self, index))
    }

    /// All nodes, in depth-first order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_, K>> + '_ {
        (0..self.nodes.len()).map(move |index| NodeRef::new(self, index))
    }

    /// All leaves, from left to right.
    pub fn leaves(&self) -> impl Iterator<Item = NodeRef<'_, K>> + '_ {
        self.nodes().filter(|node| node.is_leaf())
    }

    /// Yields the nodes whose box is crossed by `line`, skipping the subtrees of nodes which are
    /// missed. The primitives of the yielded leaves are the candidates for exact tests.
    pub fn intersect_line(&self, line: &Line) -> BvhIntersectIter<'_, K, KindLine<K>> {
        BvhIntersectIter::new(self, self.root_index(), KindLine::new(*line))
    }

    /// Yields the nodes whose box intersects `bbox`.
    pub fn intersect_box(&self, bbox: &BoundingBox) -> BvhIntersectIter<'_, K, BoundingBox> {
        BvhIntersectIter::new(self, self.root_index(), *bbox)
    }

    /// Yields the nodes whose box intersects `ball`.
    pub fn intersect_sphere(&self, ball: &Ball) -> BvhIntersectIter<'_, K, Ball> {
        BvhIntersectIter::new(self, self.root_index(), *ball)
    }

    /// Yields the nodes whose box intersects `query`.
    pub fn intersect<'q, Q: IntersectsBox + ?Sized>(
        &self,
        query: &'q Q,
    ) -> BvhIntersectIter<'_, K, &'q Q> {
        BvhIntersectIter::new(self, self.root_index(), query)
    }

    fn root_index(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Returns true if the tree has no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf, 0 for a tree of a single leaf or an empty tree.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// The options the tree was built with.
    pub fn options(&self) -> &BvhOptions {
        &self.options
    }

    /// The primitives, in split order.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Prints the [`Bvh`] in a tree-like visualization.
    pub fn pretty_print(&self) {
        println!("{self}");
    }

    /// Checks that the node at `index` has the expected parent, depth and range, that its box
    /// contains all of its points, and that its children split its range. Returns the number of
    /// nodes in the subtree, or `None` if something is off.
    fn is_consistent_subtree(
        &self,
        index: usize,
        expected_parent: Option<usize>,
        expected_depth: u32,
        expected_range: Range<usize>,
    ) -> Option<usize> {
        let node = self.nodes.get(index)?;
        let correct_parent = node.parent_index == expected_parent;
        let correct_depth = node.depth == expected_depth;
        let correct_range = node.range == expected_range && !node.range.is_empty();
        let correct_split = node.is_leaf() == self.options.is_leaf(node.range.len(), node.depth);
        if !(correct_parent && correct_depth && correct_range && correct_split) {
            return None;
        }

        let node_ref = NodeRef::new(self, index);
        if let Ok(bbox) = node_ref.bbox() {
            let tolerance =
                EPSILON * (1.0 + bbox.center.coords.amax() + bbox.half_extents.amax());
            if !node_ref
                .points()
                .iter()
                .all(|point| bbox.approx_contains_eps(point, tolerance))
            {
                return None;
            }
        } else if !node.is_leaf() {
            return None;
        }

        match node.children {
            None => Some(1),
            Some([left, right]) => {
                // Depth-first layout: the left subtree directly follows its parent.
                if left != index + 1 {
                    return None;
                }
                let left_range = self.nodes.get(left)?.range.clone();
                let right_range = left_range.end..expected_range.end;
                if left_range.start != expected_range.start {
                    return None;
                }
                let left_count =
                    self.is_consistent_subtree(left, Some(index), expected_depth + 1, left_range)?;
                if right != left + left_count {
                    return None;
                }
                let right_count = self.is_consistent_subtree(
                    right,
                    Some(index),
                    expected_depth + 1,
                    right_range,
                )?;
                Some(1 + left_count + right_count)
            }
        }
    }

    /// Checks if all children of a node have the correct parent index, depth and primitive
    /// range, that there is no detached subtree, that every primitive belongs to exactly one
    /// leaf and that every computable node box contains the points of its primitives.
    pub fn is_consistent(&self) -> bool {
        if self.nodes.is_empty() {
            return self.primitives.is_empty();
        }
        let count = self.is_consistent_subtree(0, None, 0, 0..self.primitives.len());
        count == Some(self.nodes.len())
    }
}

impl<K: BoundingVolumeKind> fmt::Display for Bvh<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            let padding = " ".repeat(node.depth as usize);
            writeln!(
                f,
                "{}node={} parent={:?} primitives={:?}",
                padding, index, node.parent_index, node.range
            )?;
            match node.cached_bbox() {
                Some(bbox) => writeln!(f, "{} bbox {}", padding, bbox)?,
                None => writeln!(f, "{} bbox not computed", padding)?,
            }
            if node.is_leaf() {
                let indices = self.primitives[node.range()]
                    .iter()
                    .map(|primitive| primitive.index)
                    .collect::<Vec<_>>();
                writeln!(f, "{} objects\t{:?}", padding, indices)?;
            }
        }
        Ok(())
    }
}
