use crate::bbox::BoundingBox;
use crate::{Point3, Real, EPSILON};

/// A trait implemented by things that may or may not intersect a [`BoundingBox`] and, by
/// extension, things that can be used to traverse a [`Bvh`].
///
/// [`Bvh`]: crate::bvh::Bvh
pub trait IntersectsBox {
    /// Returns whether this object intersects a [`BoundingBox`].
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::bbox::{BoundingBox, IntersectsBox};
    /// use facet_bvh::Point3;
    ///
    /// struct XyPlane;
    ///
    /// impl IntersectsBox for XyPlane {
    ///     fn intersects_box(&self, bbox: &BoundingBox) -> bool {
    ///         bbox.min().z <= 0.0 && bbox.max().z >= 0.0
    ///     }
    /// }
    ///
    /// let xy_plane = XyPlane;
    /// let bbox = BoundingBox::from_bounds(Point3::new(-1.0,-1.0,-1.0), Point3::new(1.0,1.0,1.0));
    /// assert!(xy_plane.intersects_box(&bbox));
    /// ```
    fn intersects_box(&self, bbox: &BoundingBox) -> bool;
}

impl BoundingBox {
    /// Returns true if the two boxes overlap or touch, using the separating axis theorem.
    ///
    /// The candidate axes are the three axes of each box and the nine cross products between
    /// them. The test stops at the first axis that separates the boxes.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::bbox::BoundingBox;
    /// use facet_bvh::Point3;
    ///
    /// let a = BoundingBox::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
    /// let b = BoundingBox::from_bounds(Point3::new(1.0, 1.0, 1.0), Point3::new(2.0, 2.0, 2.0));
    /// let c = BoundingBox::from_bounds(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
    ///
    /// assert!(a.intersects_bbox(&b));
    /// assert!(!a.intersects_bbox(&c));
    /// ```
    pub fn intersects_bbox(&self, other: &BoundingBox) -> bool {
        let (a, b) = (self, other);
        let ea = a.half_extents;
        let eb = b.half_extents;

        // Rotation expressing `b` in the frame of `a`, and the translation in that frame.
        let r = a.axes.tr_mul(&b.axes);
        let t = a.axes.tr_mul(&(b.center - a.center));

        // Padding keeps near-parallel edges from producing a bogus cross product axis.
        let abs_r = r.abs().add_scalar(EPSILON);

        for i in 0..3 {
            let rb = eb[0] * abs_r[(i, 0)] + eb[1] * abs_r[(i, 1)] + eb[2] * abs_r[(i, 2)];
            if t[i].abs() > ea[i] + rb {
                return false;
            }
        }

        for j in 0..3 {
            let ra = ea[0] * abs_r[(0, j)] + ea[1] * abs_r[(1, j)] + ea[2] * abs_r[(2, j)];
            let distance = (t[0] * r[(0, j)] + t[1] * r[(1, j)] + t[2] * r[(2, j)]).abs();
            if distance > ra + eb[j] {
                return false;
            }
        }

        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = ea[i1] * abs_r[(i2, j)] + ea[i2] * abs_r[(i1, j)];
                let rb = eb[j1] * abs_r[(i, j2)] + eb[j2] * abs_r[(i, j1)];
                let distance = (t[i2] * r[(i1, j)] - t[i1] * r[(i2, j)]).abs();
                if distance > ra + rb {
                    return false;
                }
            }
        }

        true
    }

    /// Returns the point of the box (surface or interior) that is closest to `point`.
    pub fn closest_point(&self, point: &Point3) -> Point3 {
        let local = self.to_local_point(point);
        let clamped = local.zip_map(&self.half_extents, |l, e| l.clamp(-e, e));
        self.center + self.axes * clamped
    }

    /// Returns the squared distance from `point` to the box, zero if it is inside.
    pub fn distance_squared(&self, point: &Point3) -> Real {
        (self.closest_point(point) - point).norm_squared()
    }
}

impl<T: IntersectsBox + ?Sized> IntersectsBox for &T {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        (**self).intersects_box(bbox)
    }
}

impl IntersectsBox for BoundingBox {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.intersects_bbox(bbox)
    }
}

impl IntersectsBox for Point3 {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        bbox.contains_point(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::bbox::{BoundingBox, IntersectsBox};
    use crate::{Point3, Vector3};

    fn unit_box(center: Point3) -> BoundingBox {
        BoundingBox::from_frame(center, Vector3::x(), Vector3::y(), Vector3::repeat(1.0)).unwrap()
    }

    #[test]
    fn test_boxes_sharing_a_face() {
        let a = unit_box(Point3::origin());
        let b = unit_box(Point3::new(1.0, 0.0, 0.0));
        assert!(a.intersects_bbox(&b));
        assert!(b.intersects_bbox(&a));
    }

    #[test]
    fn test_boxes_sharing_an_edge() {
        let a = unit_box(Point3::origin());
        let b = unit_box(Point3::new(1.0, 1.0, 0.0));
        assert!(a.intersects_bbox(&b));
    }

    #[test]
    fn test_boxes_sharing_a_vertex() {
        let a = unit_box(Point3::origin());
        let b = unit_box(Point3::new(1.0, 1.0, 1.0));
        assert!(a.intersects_bbox(&b));
    }

    #[test]
    fn test_box_inside_box() {
        let a = unit_box(Point3::origin());
        let b = BoundingBox::from_frame(
            Point3::origin(),
            Vector3::x(),
            Vector3::y(),
            Vector3::repeat(0.5),
        )
        .unwrap();
        assert!(a.intersects_bbox(&b));
        assert!(b.intersects_bbox(&a));
    }

    #[test]
    /// The tilted box only clears the unit box along its own Y axis.
    fn test_rotated_box_separated() {
        let a = unit_box(Point3::origin());
        let b = BoundingBox::from_frame(
            Point3::new(0.0, 0.85, 0.92),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.87, 0.48),
            Vector3::repeat(1.0),
        )
        .unwrap();
        assert!(!a.intersects_bbox(&b));
        assert!(!b.intersects_bbox(&a));
        // The world-aligned hulls of the two boxes do overlap.
        let hull = BoundingBox::from_bounds(b.min(), b.max());
        assert!(a.intersects_bbox(&hull));
    }

    #[test]
    /// Two thin bars crossing like an X, stacked apart or overlapping in height.
    fn test_crossed_bars() {
        let a = BoundingBox::from_frame(
            Point3::origin(),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(-1.0, 1.0, 0.0),
            Vector3::new(10.0, 0.2, 0.2),
        )
        .unwrap();
        let b = BoundingBox::from_frame(
            Point3::new(0.0, 0.0, 0.5),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(10.0, 0.2, 0.2),
        )
        .unwrap();
        assert!(!a.intersects_bbox(&b));

        let c = BoundingBox::from_frame(
            Point3::new(0.0, 0.0, 0.1),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(10.0, 0.2, 0.2),
        )
        .unwrap();
        assert!(a.intersects_bbox(&c));
    }

    #[test]
    fn test_point_intersects_box() {
        let bbox = unit_box(Point3::origin());
        assert!(Point3::new(0.5, 0.0, 0.0).intersects_box(&bbox));
        assert!(!Point3::new(0.6, 0.0, 0.0).intersects_box(&bbox));
    }

    #[test]
    fn test_closest_point() {
        let bbox = unit_box(Point3::origin());
        assert_eq!(
            bbox.closest_point(&Point3::new(2.0, 0.1, -3.0)),
            Point3::new(0.5, 0.1, -0.5)
        );
        assert_eq!(bbox.distance_squared(&Point3::new(0.2, 0.2, 0.2)), 0.0);
        assert_eq!(bbox.distance_squared(&Point3::new(1.5, 0.0, 0.0)), 1.0);
    }
}
