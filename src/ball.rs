//! Balls, used as spherical queries of a BVH.

use crate::bbox::{BoundingBox, IntersectsBox};
use crate::{Point3, Real};

/// A sphere, including its interior. This can be used for traversing BVH's.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ball {
    /// The center of the ball.
    pub center: Point3,
    /// The radius of the ball.
    pub radius: Real,
}

impl Ball {
    /// Creates a [`Ball`] with the given `center` and `radius`.
    ///
    /// # Panics
    /// Panics, in debug mode, if the radius is negative.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ball::Ball;
    /// use facet_bvh::Point3;
    ///
    /// let ball = Ball::new(Point3::new(1.0, 1.0, 1.0), 1.0);
    /// assert_eq!(ball.center, Point3::new(1.0, 1.0, 1.0));
    /// assert_eq!(ball.radius, 1.0)
    /// ```
    pub fn new(center: Point3, radius: Real) -> Self {
        debug_assert!(radius >= 0.0);
        Self { center, radius }
    }

    /// Returns true if this [`Ball`] contains the [`Point3`].
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::ball::Ball;
    /// use facet_bvh::Point3;
    ///
    /// let ball = Ball::new(Point3::new(1.0, 1.0, 1.0), 1.0);
    /// let point = Point3::new(1.25, 1.25, 1.25);
    ///
    /// assert!(ball.contains(&point));
    /// ```
    pub fn contains(&self, point: &Point3) -> bool {
        // Squaring the RHS is faster than computing the square root of the LHS.
        (point - self.center).norm_squared() <= self.radius.powi(2)
    }

    /// Returns true if this [`Ball`] intersects the (oriented) [`BoundingBox`].
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::{bbox::BoundingBox, ball::Ball};
    /// use facet_bvh::Point3;
    ///
    /// let ball = Ball::new(Point3::new(1.0, 1.0, 1.0), 1.0);
    /// let bbox = BoundingBox::from_bounds(Point3::new(1.25, 1.25, 1.25), Point3::new(3.0, 3.0, 3.0));
    ///
    /// assert!(ball.intersects_box(&bbox));
    /// ```
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        // https://gamemath.com/book/geomtests.html#intersection_sphere_aabb
        // The point in/on the box closest to the center is found in the frame of the box.
        bbox.distance_squared(&self.center) <= self.radius.powi(2)
    }
}

impl IntersectsBox for Ball {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.intersects_box(bbox)
    }
}
