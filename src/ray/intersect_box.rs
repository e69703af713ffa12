//! Slab clipping of lines, rays and segments against boxes.

use crate::bbox::{BoundingBox, IntersectsBox};
use crate::ray::{Line, Parametric, Ray, Segment};
use crate::{Point3, Real, Vector3};

/// Where a line, ray or segment meets a [`BoundingBox`], including its interior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxHits {
    /// The box is missed.
    Miss,
    /// The box is touched in a single point, e.g. at an edge or a corner.
    Touch(Point3),
    /// The box is entered at the first point and left at the second.
    Through(Point3, Point3),
}

impl BoxHits {
    pub(crate) fn from_range(
        range: Option<(Real, Real)>,
        point_at: impl Fn(Real) -> Point3,
    ) -> BoxHits {
        match range {
            None => BoxHits::Miss,
            Some((t0, t1)) if t1 > t0 => BoxHits::Through(point_at(t0), point_at(t1)),
            Some((t0, _)) => BoxHits::Touch(point_at(t0)),
        }
    }

    /// Number of distinct points, 0, 1 or 2.
    pub fn count(&self) -> usize {
        match self {
            BoxHits::Miss => 0,
            BoxHits::Touch(_) => 1,
            BoxHits::Through(..) => 2,
        }
    }

    /// The distinct points, in order along the line.
    pub fn points(&self) -> Vec<Point3> {
        match *self {
            BoxHits::Miss => Vec::new(),
            BoxHits::Touch(point) => vec![point],
            BoxHits::Through(entry, exit) => vec![entry, exit],
        }
    }

    /// Returns true unless the box is missed.
    pub fn is_hit(&self) -> bool {
        !matches!(self, BoxHits::Miss)
    }
}

/// Clips the parameter interval `t` against one slab side. `denominator` is the direction
/// component towards the outside of the side, `numerator` the signed distance of the origin
/// behind it. Returns false if the interval becomes empty.
fn clip(denominator: Real, numerator: Real, t: &mut (Real, Real)) -> bool {
    if denominator > 0.0 {
        if numerator > denominator * t.1 {
            return false;
        }
        if numerator > denominator * t.0 {
            t.0 = numerator / denominator;
        }
        true
    } else if denominator < 0.0 {
        if numerator > denominator * t.0 {
            return false;
        }
        if numerator > denominator * t.1 {
            t.1 = numerator / denominator;
        }
        true
    } else {
        numerator <= 0.0
    }
}

/// Liang-Barsky clipping of `origin + t * direction` against the box centered at zero with the
/// given half extents, for `t` in `range`. Returns the clipped parameter interval, or `None` if
/// the box is missed.
pub(crate) fn clip_locally(
    origin: &Vector3,
    direction: &Vector3,
    half_extents: &Vector3,
    range: (Real, Real),
) -> Option<(Real, Real)> {
    let mut t = range;
    let not_culled = (0..3).all(|i| {
        clip(direction[i], -origin[i] - half_extents[i], &mut t)
            && clip(-direction[i], origin[i] - half_extents[i], &mut t)
    });
    if not_culled {
        Some(t)
    } else {
        None
    }
}

impl IntersectsBox for Line {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        Parametric::intersects_box(self, bbox)
    }
}

impl IntersectsBox for Ray {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        Parametric::intersects_box(self, bbox)
    }
}

impl IntersectsBox for Segment {
    fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        Parametric::intersects_box(self, bbox)
    }
}
