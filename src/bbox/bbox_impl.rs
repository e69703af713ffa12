use std::fmt;

use nalgebra::SymmetricEigen;

use crate::error::{BvhError, Result};
use crate::utils::centroid_of_points;
use crate::{Matrix3, Point3, Real, Vector3, EPSILON};

/// Index of the X axis. Used to access `Vector3`/`Point3` structs via index.
pub const X_AXIS: usize = 0;

/// Index of the Y axis. Used to access `Vector3`/`Point3` structs via index.
pub const Y_AXIS: usize = 1;

/// Index of the Z axis. Used to access `Vector3`/`Point3` structs via index.
pub const Z_AXIS: usize = 2;

/// A box given by a center point, an orthonormal frame and the half sizes along its axes.
///
/// Axis-aligned boxes use the identity matrix as their frame.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Center of the box.
    pub center: Point3,

    /// The unit X, Y and Z axes of the box, stored as columns. Right-handed.
    pub axes: Matrix3,

    /// Half the size of the box along each of its axes.
    pub half_extents: Vector3,
}

impl BoundingBox {
    /// Creates a new [`BoundingBox`] from its parts.
    ///
    /// The columns of `axes` must be orthonormal. This is not checked.
    pub fn new(center: Point3, axes: Matrix3, half_extents: Vector3) -> BoundingBox {
        BoundingBox {
            center,
            axes,
            half_extents,
        }
    }

    /// Creates an axis-aligned [`BoundingBox`] spanning `min` to `max`.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::bbox::BoundingBox;
    /// use facet_bvh::{Point3, Vector3};
    ///
    /// let bbox = BoundingBox::from_bounds(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 4.0, 2.0));
    ///
    /// assert_eq!(bbox.center, Point3::new(0.0, 2.0, 1.0));
    /// assert_eq!(bbox.half_extents, Vector3::new(1.0, 2.0, 1.0));
    /// ```
    pub fn from_bounds(min: Point3, max: Point3) -> BoundingBox {
        BoundingBox {
            center: nalgebra::center(&min, &max),
            axes: Matrix3::identity(),
            half_extents: (max - min) * 0.5,
        }
    }

    /// Creates a [`BoundingBox`] from a frame given by its origin and two in-plane directions,
    /// plus the full box sizes along the frame axes.
    ///
    /// The frame is orthonormalised: the X axis is normalised, the Z axis is the normalised cross
    /// product of X and Y, and Y is recomputed as Z cross X.
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if `xaxis` is zero or parallel to `yaxis`.
    pub fn from_frame(
        center: Point3,
        xaxis: Vector3,
        yaxis: Vector3,
        sizes: Vector3,
    ) -> Result<BoundingBox> {
        let xaxis = xaxis
            .try_normalize(EPSILON)
            .ok_or_else(|| BvhError::InvalidInput("frame x-axis has zero length".to_string()))?;
        let zaxis = xaxis.cross(&yaxis).try_normalize(EPSILON).ok_or_else(|| {
            BvhError::InvalidInput("frame axes are parallel or zero".to_string())
        })?;
        let yaxis = zaxis.cross(&xaxis);

        Ok(BoundingBox {
            center,
            axes: Matrix3::from_columns(&[xaxis, yaxis, zaxis]),
            half_extents: sizes * 0.5,
        })
    }

    /// Computes the axis-aligned [`BoundingBox`] of `points`.
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if `points` is empty.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::bbox::BoundingBox;
    /// use facet_bvh::Point3;
    ///
    /// let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, -2.0, 1.0)];
    /// let bbox = BoundingBox::aligned(&points).unwrap();
    ///
    /// assert_eq!(bbox.min(), Point3::new(0.0, -2.0, 0.0));
    /// assert_eq!(bbox.max(), Point3::new(2.0, 0.0, 1.0));
    /// assert!(BoundingBox::aligned(&[]).is_err());
    /// ```
    pub fn aligned(points: &[Point3]) -> Result<BoundingBox> {
        let first = points.first().ok_or_else(|| {
            BvhError::InvalidInput("an axis-aligned box needs at least one point".to_string())
        })?;
        let (min, max) = points
            .iter()
            .skip(1)
            .fold((*first, *first), |(min, max), point| {
                (min.inf(point), max.sup(point))
            });
        Ok(BoundingBox::from_bounds(min, max))
    }

    /// Computes an oriented [`BoundingBox`] of `points` from the principal components of their
    /// coordinates.
    ///
    /// The axes are the eigenvectors of the covariance matrix, ordered by descending variance.
    /// The points are projected onto the axes to find the extents, and the center is the centroid
    /// shifted to the middle of those extents. The result encloses every point, but it is not
    /// necessarily the box of minimum volume.
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if there are fewer than three points or if the points
    /// are collinear, since the principal axes are not well-defined in that case.
    pub fn oriented(points: &[Point3]) -> Result<BoundingBox> {
        if points.len() < 3 {
            return Err(BvhError::InvalidInput(format!(
                "an oriented box needs at least three points, got {}",
                points.len()
            )));
        }
        let mean = centroid_of_points(points)
            .ok_or_else(|| BvhError::InvalidInput("no points".to_string()))?;

        let mut covariance = Matrix3::zeros();
        for point in points {
            let offset = point - mean;
            covariance += offset * offset.transpose();
        }
        covariance /= (points.len() - 1) as Real;

        let eigen = SymmetricEigen::new(covariance);
        let mut order = [X_AXIS, Y_AXIS, Z_AXIS];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
        let variances = order.map(|i| eigen.eigenvalues[i]);

        // Collinear (or coincident) points leave the second and third axis undetermined. Relative
        // to the main variance, so small meshes are fitted like large ones.
        if variances[0] <= 0.0 || variances[1] <= EPSILON * variances[0] {
            return Err(BvhError::InvalidInput(
                "an oriented box needs at least three non-collinear points".to_string(),
            ));
        }

        let xaxis = eigen.eigenvectors.column(order[0]).normalize();
        let yaxis = eigen.eigenvectors.column(order[1]).normalize();
        let zaxis = xaxis.cross(&yaxis);
        let axes = Matrix3::from_columns(&[xaxis, yaxis, zaxis]);

        let mut local_min = Vector3::repeat(Real::INFINITY);
        let mut local_max = Vector3::repeat(Real::NEG_INFINITY);
        for point in points {
            let local = axes.tr_mul(&(point - mean));
            local_min = local_min.inf(&local);
            local_max = local_max.sup(&local);
        }

        Ok(BoundingBox {
            center: mean + axes * ((local_min + local_max) * 0.5),
            axes,
            half_extents: (local_max - local_min) * 0.5,
        })
    }

    /// Returns the unit vector of the box axis with the given index.
    pub fn axis(&self, index: usize) -> Vector3 {
        self.axes.column(index).into_owned()
    }

    /// Returns the full size of the box along each of its axes.
    pub fn size(&self) -> Vector3 {
        self.half_extents * 2.0
    }

    /// Returns the volume of the box.
    pub fn volume(&self) -> Real {
        self.size().product()
    }

    /// Returns the half sizes of the smallest world-aligned box enclosing this box.
    fn world_half_extents(&self) -> Vector3 {
        self.axes.abs() * self.half_extents
    }

    /// Returns the minimum corner of the smallest world-aligned box enclosing this box.
    pub fn min(&self) -> Point3 {
        self.center - self.world_half_extents()
    }

    /// Returns the maximum corner of the smallest world-aligned box enclosing this box.
    pub fn max(&self) -> Point3 {
        self.center + self.world_half_extents()
    }

    /// Returns the eight corners of the box.
    pub fn corners(&self) -> [Point3; 8] {
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let signs = Vector3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            *corner += self.axes * self.half_extents.component_mul(&signs);
        }
        corners
    }

    /// Returns the index of the box axis along which the box is stretched the most.
    pub fn largest_axis(&self) -> usize {
        let size = self.half_extents;
        if size.x > size.y && size.x > size.z {
            X_AXIS
        } else if size.y > size.z {
            Y_AXIS
        } else {
            Z_AXIS
        }
    }

    /// Returns true if the box axes coincide with the world axes.
    pub fn is_axis_aligned(&self) -> bool {
        (self.axes - Matrix3::identity()).abs().max() <= EPSILON
    }

    /// Expresses `point` in the coordinate frame of the box.
    pub fn to_local_point(&self, point: &Point3) -> Vector3 {
        self.axes.tr_mul(&(point - self.center))
    }

    /// Expresses `vector` in the coordinate frame of the box.
    pub fn to_local_vector(&self, vector: &Vector3) -> Vector3 {
        self.axes.tr_mul(vector)
    }

    /// Returns true if `point` lies inside the box, with respect to the crate [`EPSILON`].
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.approx_contains_eps(point, EPSILON)
    }

    /// Returns true if `point` is approximately inside the box with respect to some `epsilon`.
    pub fn approx_contains_eps(&self, point: &Point3, epsilon: Real) -> bool {
        let local = self.to_local_point(point);
        (0..3).all(|i| local[i].abs() <= self.half_extents[i] + epsilon)
    }

    /// Returns the smallest axis-aligned box which contains both this box and `other`.
    pub fn join(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_bounds(self.min().inf(&other.min()), self.max().sup(&other.max()))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = self.center;
        let h = self.half_extents;
        write!(
            f,
            "Min bound: ({}, {}, {}); Max bound: ({}, {}, {}); Center: ({}, {}, {}); Half extents: ({}, {}, {})",
            self.min().x,
            self.min().y,
            self.min().z,
            self.max().x,
            self.max().y,
            self.max().z,
            c.x,
            c.y,
            c.z,
            h.x,
            h.y,
            h.z
        )
    }
}
