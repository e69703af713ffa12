//! This module defines lines, rays and segments, and their intersection algorithm for triangles.

use crate::bbox::BoundingBox;
use crate::ray::intersect_box::{clip_locally, BoxHits};
use crate::{Point3, Real, Vector3, EPSILON};

/// A struct which is returned by the [`Parametric::intersects_triangle()`] method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Line parameter of the intersection. For a [`Ray`] this is the distance from its origin.
    pub distance: Real,

    /// U coordinate of the intersection.
    pub u: Real,

    /// V coordinate of the intersection.
    pub v: Real,

    /// The intersection point.
    pub point: Point3,
}

impl Intersection {
    /// Constructs an [`Intersection`].
    pub fn new(distance: Real, u: Real, v: Real, point: Point3) -> Intersection {
        Intersection {
            distance,
            u,
            v,
            point,
        }
    }
}

/// Shared behaviour of [`Line`], [`Ray`] and [`Segment`]: the points `origin + t * direction`
/// for the parameters `t` accepted by [`Parametric::contains_parameter`].
pub trait Parametric {
    /// The point at parameter zero.
    fn origin(&self) -> Point3;

    /// The direction vector. Its length is the scale of the parameter.
    fn direction(&self) -> Vector3;

    /// The parameter interval covered by this shape. Bounds may be infinite.
    fn parameter_range(&self) -> (Real, Real);

    /// Returns true if the parameter `t` belongs to this shape, with respect to [`EPSILON`].
    fn contains_parameter(&self, t: Real) -> bool {
        let (lo, hi) = self.parameter_range();
        t >= lo - EPSILON && t <= hi + EPSILON
    }

    /// Returns the point at parameter `t`.
    fn point_at(&self, t: Real) -> Point3 {
        self.origin() + self.direction() * t
    }

    /// Implementation of the
    /// [Möller-Trumbore triangle/ray intersection algorithm](https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm).
    /// Returns the parameter of the intersection, the u and v coordinates of the intersection and
    /// the intersection point, or `None` if the triangle is missed.
    ///
    /// Both faces of the triangle are hit. A direction parallel to the triangle plane never hits.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ray::{Parametric, Segment};
    /// use facet_bvh::Point3;
    ///
    /// let a = Point3::new(0.0, 0.0, 0.0);
    /// let b = Point3::new(1.0, 0.0, 0.0);
    /// let c = Point3::new(0.0, 1.0, 0.0);
    ///
    /// let crossing = Segment::new(Point3::new(0.25, 0.25, -1.0), Point3::new(0.25, 0.25, 1.0));
    /// let short = Segment::new(Point3::new(0.25, 0.25, -1.0), Point3::new(0.25, 0.25, -0.5));
    ///
    /// let hit = crossing.intersects_triangle(&a, &b, &c).unwrap();
    /// assert_eq!(hit.point, Point3::new(0.25, 0.25, 0.0));
    /// assert!(short.intersects_triangle(&a, &b, &c).is_none());
    /// ```
    #[allow(clippy::many_single_char_names)]
    fn intersects_triangle(&self, a: &Point3, b: &Point3, c: &Point3) -> Option<Intersection> {
        let origin = self.origin();
        let direction = self.direction();
        let a_to_b = b - a;
        let a_to_c = c - a;

        // u_vec lies in view plane
        let u_vec = direction.cross(&a_to_c);

        // If determinant is near zero, the direction lies in the plane of the triangle.
        // Compared to the lengths it is made of, so the test does not depend on the scale.
        let det = a_to_b.dot(&u_vec);
        if det.abs() <= EPSILON * a_to_b.norm() * u_vec.norm() {
            return None;
        }

        let inv_det = 1.0 / det;
        let a_to_origin = origin - a;

        // Test bounds: u < 0 || u > 1 => outside of triangle
        let u = a_to_origin.dot(&u_vec) * inv_det;
        if u < -EPSILON || u > 1.0 + EPSILON {
            return None;
        }

        let v_vec = a_to_origin.cross(&a_to_b);
        let v = direction.dot(&v_vec) * inv_det;
        if v < -EPSILON || u + v > 1.0 + EPSILON {
            return None;
        }

        let distance = a_to_c.dot(&v_vec) * inv_det;
        if !self.contains_parameter(distance) {
            return None;
        }

        Some(Intersection::new(distance, u, v, self.point_at(distance)))
    }

    /// Finds where this shape enters and leaves a [`BoundingBox`], clipping in the frame of the
    /// box.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::bbox::BoundingBox;
    /// use facet_bvh::ray::{BoxHits, Line, Parametric};
    /// use facet_bvh::Point3;
    ///
    /// let bbox = BoundingBox::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
    /// let line = Line::from_points(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
    ///
    /// assert_eq!(
    ///     line.box_intersections(&bbox),
    ///     BoxHits::Through(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0))
    /// );
    /// ```
    fn box_intersections(&self, bbox: &BoundingBox) -> BoxHits {
        let local_origin = bbox.to_local_point(&self.origin());
        let local_direction = bbox.to_local_vector(&self.direction());
        let range = clip_locally(
            &local_origin,
            &local_direction,
            &bbox.half_extents,
            self.parameter_range(),
        );
        BoxHits::from_range(range, |t| self.point_at(t))
    }

    /// Like [`Parametric::box_intersections`], but treats `bbox` as axis-aligned and skips the
    /// change of frame.
    fn aabb_intersections(&self, bbox: &BoundingBox) -> BoxHits {
        let local_origin = self.origin() - bbox.center;
        let range = clip_locally(
            &local_origin,
            &self.direction(),
            &bbox.half_extents,
            self.parameter_range(),
        );
        BoxHits::from_range(range, |t| self.point_at(t))
    }

    /// Returns true if this shape touches or crosses the (oriented) [`BoundingBox`].
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        let local_origin = bbox.to_local_point(&self.origin());
        let local_direction = bbox.to_local_vector(&self.direction());
        clip_locally(
            &local_origin,
            &local_direction,
            &bbox.half_extents.add_scalar(EPSILON),
            self.parameter_range(),
        )
        .is_some()
    }

    /// Returns true if this shape touches or crosses the [`BoundingBox`], treating it as
    /// axis-aligned.
    fn intersects_aabb(&self, bbox: &BoundingBox) -> bool {
        clip_locally(
            &(self.origin() - bbox.center),
            &self.direction(),
            &bbox.half_extents.add_scalar(EPSILON),
            self.parameter_range(),
        )
        .is_some()
    }
}

/// An infinite line through `origin` along `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    /// A point on the line.
    pub origin: Point3,

    /// The line direction. Not normalized.
    pub direction: Vector3,
}

impl Line {
    /// Creates a new [`Line`] from an `origin` and a `direction`.
    /// `direction` is kept as it is.
    pub fn new(origin: Point3, direction: Vector3) -> Line {
        Line { origin, direction }
    }

    /// Creates the [`Line`] through `start` and `end`, with direction `end - start`.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ray::{Line, Parametric};
    /// use facet_bvh::{Point3, Vector3};
    ///
    /// let line = Line::from_points(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 2.0));
    ///
    /// assert_eq!(line.direction, Vector3::new(0.0, 0.0, 2.0));
    /// assert_eq!(line.point_at(-1.0), Point3::new(1.0, 0.0, -2.0));
    /// ```
    pub fn from_points(start: Point3, end: Point3) -> Line {
        Line {
            origin: start,
            direction: end - start,
        }
    }
}

impl Parametric for Line {
    fn origin(&self) -> Point3 {
        self.origin
    }

    fn direction(&self) -> Vector3 {
        self.direction
    }

    fn parameter_range(&self) -> (Real, Real) {
        (Real::NEG_INFINITY, Real::INFINITY)
    }
}

/// A half-line starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    /// The ray origin.
    pub origin: Point3,

    /// The ray direction, of unit length.
    pub direction: Vector3,
}

impl Ray {
    /// Creates a new [`Ray`] from an `origin` and a `direction`.
    /// `direction` will be normalized.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ray::Ray;
    /// use facet_bvh::{Point3, Vector3};
    ///
    /// let origin = Point3::new(0.0,0.0,0.0);
    /// let direction = Vector3::new(2.0,0.0,0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, Vector3::new(1.0,0.0,0.0));
    /// ```
    pub fn new(origin: Point3, direction: Vector3) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Returns the infinite [`Line`] carrying this ray.
    pub fn as_line(&self) -> Line {
        Line::new(self.origin, self.direction)
    }
}

impl Parametric for Ray {
    fn origin(&self) -> Point3 {
        self.origin
    }

    fn direction(&self) -> Vector3 {
        self.direction
    }

    fn parameter_range(&self) -> (Real, Real) {
        (0.0, Real::INFINITY)
    }

    /// Hits at the origin itself are not counted.
    fn contains_parameter(&self, t: Real) -> bool {
        t > EPSILON
    }
}

/// The bounded piece of a line between `start` (parameter 0) and `end` (parameter 1).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// The start point of the segment.
    pub start: Point3,

    /// The end point of the segment.
    pub end: Point3,
}

impl Segment {
    /// Creates a new [`Segment`] from `start` to `end`.
    pub fn new(start: Point3, end: Point3) -> Segment {
        Segment { start, end }
    }

    /// Returns the length of the segment.
    pub fn length(&self) -> Real {
        (self.end - self.start).norm()
    }

    /// Returns the middle of the segment.
    pub fn midpoint(&self) -> Point3 {
        nalgebra::center(&self.start, &self.end)
    }
}

impl Parametric for Segment {
    fn origin(&self) -> Point3 {
        self.start
    }

    fn direction(&self) -> Vector3 {
        self.end - self.start
    }

    fn parameter_range(&self) -> (Real, Real) {
        (0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::ray::{Line, Parametric, Ray, Segment};
    use crate::testbase::{tuple_to_point, tuplevec_small_strategy};
    use crate::{Point3, Vector3};

    use float_eq::assert_float_eq;
    use proptest::prelude::*;

    fn triangle() -> [Point3; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    /// Rays hit both faces of a triangle.
    fn test_ray_hits_front_and_back() {
        let [a, b, c] = triangle();
        let from_above = Ray::new(Point3::new(0.2, 0.2, 3.0), -Vector3::z());
        let from_below = Ray::new(Point3::new(0.2, 0.2, -3.0), Vector3::z());

        let hit = from_above.intersects_triangle(&a, &b, &c).unwrap();
        assert_float_eq!(hit.distance, 3.0, abs <= 1e-12);
        assert_float_eq!(hit.u, 0.2, abs <= 1e-12);
        assert_float_eq!(hit.v, 0.2, abs <= 1e-12);
        assert!(from_below.intersects_triangle(&a, &b, &c).is_some());
    }

    #[test]
    fn test_ray_behind_origin_misses() {
        let [a, b, c] = triangle();
        let away = Ray::new(Point3::new(0.2, 0.2, 3.0), Vector3::z());
        assert!(away.intersects_triangle(&a, &b, &c).is_none());

        // The carrying line of the same ray still hits, at a negative parameter.
        let hit = away.as_line().intersects_triangle(&a, &b, &c).unwrap();
        assert_float_eq!(hit.distance, -3.0, abs <= 1e-12);
    }

    #[test]
    /// A ray starting on the triangle does not hit it.
    fn test_ray_starting_on_triangle() {
        let [a, b, c] = triangle();
        let ray = Ray::new(Point3::new(0.2, 0.2, 0.0), Vector3::z());
        assert!(ray.intersects_triangle(&a, &b, &c).is_none());
    }

    #[test]
    fn test_parallel_line_misses() {
        let [a, b, c] = triangle();
        let line = Line::new(Point3::new(0.2, 0.2, 0.0), Vector3::x());
        assert!(line.intersects_triangle(&a, &b, &c).is_none());
    }

    #[test]
    fn test_outside_triangle_misses() {
        let [a, b, c] = triangle();
        let line = Line::new(Point3::new(0.6, 0.6, 1.0), Vector3::z());
        assert!(line.intersects_triangle(&a, &b, &c).is_none());
    }

    #[test]
    /// Segments only hit within their end points, end points included.
    fn test_segment_bounds() {
        let [a, b, c] = triangle();
        let touching = Segment::new(Point3::new(0.1, 0.1, 1.0), Point3::new(0.1, 0.1, 0.0));
        let hit = touching.intersects_triangle(&a, &b, &c).unwrap();
        assert_float_eq!(hit.distance, 1.0, abs <= 1e-12);

        let short = Segment::new(Point3::new(0.1, 0.1, 1.0), Point3::new(0.1, 0.1, 0.5));
        assert!(short.intersects_triangle(&a, &b, &c).is_none());

        assert_float_eq!(touching.length(), 1.0, abs <= 1e-12);
        assert_eq!(touching.midpoint(), Point3::new(0.1, 0.1, 0.5));
    }

    #[test]
    /// Small triangles are hit like large ones.
    fn test_small_triangle_hit() {
        for scale in [1e-4, 1e-6, 1e-8] {
            let [a, b, c] = triangle().map(|p| Point3::from(p.coords * scale));
            let ray = Ray::new(Point3::new(0.2 * scale, 0.2 * scale, 3.0 * scale), -Vector3::z());
            let hit = ray.intersects_triangle(&a, &b, &c).unwrap();
            assert_float_eq!(hit.distance, 3.0 * scale, abs <= 1e-12 * scale);
            assert_float_eq!(hit.u, 0.2, abs <= 1e-9);

            let parallel = Line::new(Point3::new(0.2 * scale, 0.2 * scale, 0.0), Vector3::x());
            assert!(parallel.intersects_triangle(&a, &b, &c).is_none());
        }
        // A degenerate triangle is never hit.
        let ray = Ray::new(Point3::new(0.5, 0.0, 1.0), -Vector3::z());
        let (a, b) = (Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        assert!(ray.intersects_triangle(&a, &b, &b).is_none());
    }

    #[test]
    fn test_hit_on_edge() {
        let [a, b, c] = triangle();
        let line = Line::new(Point3::new(0.5, 0.5, 1.0), -Vector3::z());
        assert!(line.intersects_triangle(&a, &b, &c).is_some());
    }

    proptest! {
        // Test whether a `Ray` which points at a point inside a triangle hits it there.
        #[test]
        fn test_ray_hits_triangle(a in tuplevec_small_strategy(),
                                  b in tuplevec_small_strategy(),
                                  c in tuplevec_small_strategy(),
                                  origin in tuplevec_small_strategy(),
                                  u in 0.05..0.9_f64,
                                  v in 0.05..0.9_f64) {
            // Keep u + v below one.
            let v = v * (1.0 - u);
            let (a, b, c) = (tuple_to_point(&a), tuple_to_point(&b), tuple_to_point(&c));
            let u_vec = b - a;
            let v_vec = c - a;
            let normal = u_vec.cross(&v_vec);

            // Skip tiny and sliver triangles.
            prop_assume!(u_vec.norm() > 1.0 && v_vec.norm() > 1.0);
            prop_assume!(normal.norm() > 1e-2 * u_vec.norm() * v_vec.norm());

            let target = a + u * u_vec + v * v_vec;
            let origin = tuple_to_point(&origin);
            let to_target = target - origin;
            prop_assume!(to_target.norm() > 1e-3);
            // Skip grazing rays.
            prop_assume!(normal.normalize().dot(&to_target.normalize()).abs() > 1e-2);

            let ray = Ray::new(origin, to_target);
            let hit = ray.intersects_triangle(&a, &b, &c);
            prop_assert!(hit.is_some());
            let hit = hit.unwrap();
            let scale = 1.0 + to_target.norm();
            prop_assert!((hit.point - target).norm() <= 1e-6 * scale);
            prop_assert!((hit.distance - to_target.norm()).abs() <= 1e-6 * scale);
        }
    }
}
