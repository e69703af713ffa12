//! This module defines the [`Primitive`] stored in a hierarchy, and the [`BoundingVolumeKind`]
//! trait which selects between axis-aligned and oriented node boxes.

use std::fmt::Debug;

use crate::bbox::{BoundingBox, IntersectsBox};
use crate::error::{BvhError, Result};
use crate::ray::{Intersection, Line, Parametric};
use crate::utils::centroid_of_points;
use crate::{Point3, Vector3};

/// A flat piece of geometry, usually one face of a mesh, as stored in a [`Bvh`].
///
/// [`Bvh`]: crate::bvh::Bvh
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Primitive {
    /// Identifier of the primitive, e.g. the face index in its mesh.
    pub index: usize,

    /// Reference point used to sort the primitive during the build.
    pub centroid: Point3,

    /// The boundary points of the primitive, in order.
    pub points: Vec<Point3>,
}

impl Primitive {
    /// Creates a new [`Primitive`] from its parts.
    pub fn new(index: usize, centroid: Point3, points: Vec<Point3>) -> Primitive {
        Primitive {
            index,
            centroid,
            points,
        }
    }

    /// Creates a triangle, with the mean of its corners as centroid.
    pub fn triangle(index: usize, corners: [Point3; 3]) -> Primitive {
        let [a, b, c] = corners;
        let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        Primitive::new(index, centroid, corners.to_vec())
    }

    /// Creates a polygon, with the mean of its points as centroid.
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if `points` is empty.
    pub fn from_points(index: usize, points: Vec<Point3>) -> Result<Primitive> {
        let centroid = centroid_of_points(&points).ok_or_else(|| {
            BvhError::InvalidInput(format!("primitive {index} has no points"))
        })?;
        Ok(Primitive::new(index, centroid, points))
    }

    /// Creates one triangle per entry of `triangles`, indexed by position.
    pub fn from_triangles(triangles: &[[Point3; 3]]) -> Vec<Primitive> {
        triangles
            .iter()
            .enumerate()
            .map(|(index, corners)| Primitive::triangle(index, *corners))
            .collect()
    }

    /// Intersects a line, ray or segment with the polygon spanned by the points of this
    /// primitive. Polygons with more than three points are fanned into triangles around the first
    /// point, so they are expected to be planar and convex.
    ///
    /// Returns the hit with the smallest parameter.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ray::Ray;
    /// use facet_bvh::{Point3, Primitive, Vector3};
    ///
    /// let square = Primitive::from_points(0, vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ]).unwrap();
    /// let ray = Ray::new(Point3::new(0.9, 0.9, 2.0), Vector3::new(0.0, 0.0, -1.0));
    ///
    /// let hit = square.intersect_ray(&ray).unwrap();
    /// assert_eq!(hit.distance, 2.0);
    /// ```
    pub fn intersect_ray(&self, ray: &impl Parametric) -> Option<Intersection> {
        let (first, rest) = self.points.split_first()?;
        rest.windows(2)
            .filter_map(|pair| ray.intersects_triangle(first, &pair[0], &pair[1]))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// The kind of bounding volume of the nodes of a [`Bvh`]. Decides how node boxes are computed,
/// along which axis a node is split, and how lines are tested against node boxes.
///
/// [`Bvh`]: crate::bvh::Bvh
pub trait BoundingVolumeKind: Copy + Default + Debug + Send + Sync + 'static {
    /// Human readable name, used in log messages.
    const NAME: &'static str;

    /// Computes the box enclosing `points`.
    fn compute_box(points: &[Point3]) -> Result<BoundingBox>;

    /// The direction along which the primitives of a node with box `bbox` are sorted.
    fn split_axis(bbox: &BoundingBox) -> Vector3;

    /// Tests a line against a node box of this kind.
    fn intersects_line(line: &Line, bbox: &BoundingBox) -> bool;
}

/// Axis-aligned node boxes. Cheap to compute, loose around slanted geometry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Aligned;

/// Oriented node boxes fitted to the principal components of the node's points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Oriented;

impl BoundingVolumeKind for Aligned {
    const NAME: &'static str = "aligned";

    fn compute_box(points: &[Point3]) -> Result<BoundingBox> {
        BoundingBox::aligned(points)
    }

    fn split_axis(bbox: &BoundingBox) -> Vector3 {
        let mut axis = Vector3::zeros();
        axis[bbox.largest_axis()] = 1.0;
        axis
    }

    fn intersects_line(line: &Line, bbox: &BoundingBox) -> bool {
        line.intersects_aabb(bbox)
    }
}

impl BoundingVolumeKind for Oriented {
    const NAME: &'static str = "oriented";

    fn compute_box(points: &[Point3]) -> Result<BoundingBox> {
        BoundingBox::oriented(points)
    }

    fn split_axis(bbox: &BoundingBox) -> Vector3 {
        bbox.axis(0)
    }

    fn intersects_line(line: &Line, bbox: &BoundingBox) -> bool {
        IntersectsBox::intersects_box(line, bbox)
    }
}

#[cfg(test)]
mod tests {
    use crate::bbox::BoundingBox;
    use crate::ray::{Line, Segment};
    use crate::{Aligned, BoundingVolumeKind, Oriented, Point3, Primitive, Vector3};

    #[test]
    fn test_triangle_centroid() {
        let triangle = Primitive::triangle(
            4,
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 3.0),
            ],
        );
        assert_eq!(triangle.index, 4);
        assert_eq!(triangle.centroid, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(triangle.points.len(), 3);
    }

    #[test]
    fn test_from_points_needs_points() {
        assert!(Primitive::from_points(0, Vec::new()).is_err());
        let single = Primitive::from_points(1, vec![Point3::new(1.0, 2.0, 3.0)]).unwrap();
        assert_eq!(single.centroid, Point3::new(1.0, 2.0, 3.0));
        // A single point has no area and is never hit.
        let line = Line::new(Point3::new(1.0, 2.0, 0.0), Vector3::z());
        assert!(single.intersect_ray(&line).is_none());
    }

    #[test]
    /// Every triangle of a fan is tried, and the nearest hit is returned.
    fn test_polygon_fan() {
        let polygon = Primitive::from_points(
            0,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
        )
        .unwrap();
        let segment = Segment::new(Point3::new(0.5, 1.5, 1.0), Point3::new(0.5, 1.5, -1.0));
        let hit = polygon.intersect_ray(&segment).unwrap();
        assert_eq!(hit.point, Point3::new(0.5, 1.5, 0.0));

        let outside = Segment::new(Point3::new(2.5, 1.5, 1.0), Point3::new(2.5, 1.5, -1.0));
        assert!(polygon.intersect_ray(&outside).is_none());
    }

    #[test]
    fn test_split_axes() {
        let bbox = BoundingBox::from_bounds(Point3::origin(), Point3::new(1.0, 5.0, 2.0));
        assert_eq!(Aligned::split_axis(&bbox), Vector3::y());

        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(9.0, 10.0, 0.0),
        ];
        let oriented = Oriented::compute_box(&points).unwrap();
        let axis = Oriented::split_axis(&oriented);
        let diagonal = Vector3::new(1.0, 1.0, 0.0).normalize();
        assert!(axis.dot(&diagonal).abs() > 0.99);
    }

    #[test]
    fn test_kinds_on_rotated_box() {
        let bbox = BoundingBox::from_frame(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(-1.0, 1.0, 0.0),
            Vector3::new(4.0, 0.2, 0.2),
        )
        .unwrap();
        // Crosses the world-aligned reading of the box, but passes beside the rotated bar.
        let line = Line::new(Point3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(Aligned::intersects_line(&line, &bbox));
        assert!(!Oriented::intersects_line(&line, &bbox));
    }
}
