//! Utilities module.

use crate::{Point3, Real, Vector3};

/// Arithmetic mean of `points`. Returns `None` for an empty slice.
pub fn centroid_of_points(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |sum, point| sum + point.coords);
    Some(Point3::from(sum / points.len() as Real))
}

#[cfg(test)]
mod tests {
    use crate::utils::centroid_of_points;
    use crate::Point3;

    #[test]
    /// The centroid of a triangle is the mean of its corners, and there is none for no points.
    fn test_centroid_of_points() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        assert_eq!(
            centroid_of_points(&points),
            Some(Point3::new(1.0, 1.0, 0.0))
        );
        assert_eq!(centroid_of_points(&[]), None);
    }
}
