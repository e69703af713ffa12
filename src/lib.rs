//! A crate which exports lines, rays, oriented and axis-aligned bounding boxes, and a binary
//! bounding volume hierarchy over mesh facets.
//!
//! ## About
//!
//! This crate can be used for applications which need to intersect lines, boxes or spheres with
//! the faces of a mesh. A [`Bvh`] is built once from a list of triangles (or any [`FaceMesh`])
//! by recursively splitting the facets at the median of their centroids along the main axis of
//! the enclosing box. Queries then walk the tree and skip every subtree whose bounding volume is
//! missed, which leaves only a handful of candidate facets for the exact intersection test.
//!
//! Two kinds of bounding volume are available. [`Aligned`] nodes use boxes parallel to the world
//! axes. [`Oriented`] nodes fit a box to the principal components of the enclosed points, which
//! hugs slanted geometry more tightly at the cost of a slower build.
//!
//! ## Example
//!
//! ```
//! use facet_bvh::bvh::{Bvh, BvhOptions};
//! use facet_bvh::ray::Ray;
//! use facet_bvh::{Aligned, Point3, Vector3};
//!
//! let triangles = vec![
//!     [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//!     [Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 0.0, 0.0), Point3::new(5.0, 1.0, 0.0)],
//! ];
//! let bvh = Bvh::<Aligned>::from_triangles(&triangles, BvhOptions::default()).unwrap();
//!
//! let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
//! let hits = bvh
//!     .intersect_line(&ray.as_line())
//!     .filter(|node| node.is_leaf())
//!     .flat_map(|node| node.objects())
//!     .filter(|primitive| primitive.intersect_ray(&ray).is_some())
//!     .map(|primitive| primitive.index)
//!     .collect::<Vec<_>>();
//!
//! assert_eq!(hits, vec![0]);
//! ```
//!
//! ## Features
//!
//! - `rayon` (default **enabled**) - adds [`Bvh::build_par`], which builds independent subtrees
//!   in parallel.
//! - `serde` (default **disabled**) - adds `Serialize` and `Deserialize` implementations for the
//!   geometric types and the build options.
//!
//! [`Bvh`]: bvh::Bvh
//! [`Bvh::build_par`]: bvh::Bvh::build_par
//! [`FaceMesh`]: mesh::FaceMesh

/// Float type used by this crate.
pub type Real = f64;

/// Point math type used by this crate. Type alias for [`nalgebra::Point3`].
pub type Point3 = nalgebra::Point3<Real>;

/// Vector math type used by this crate. Type alias for [`nalgebra::Vector3`].
pub type Vector3 = nalgebra::Vector3<Real>;

/// Matrix math type used by this crate. Type alias for [`nalgebra::Matrix3`].
pub type Matrix3 = nalgebra::Matrix3<Real>;

/// Absolute tolerance used by every geometric comparison in this crate.
pub const EPSILON: Real = 1e-9;

pub mod ball;
pub mod bbox;
pub mod bounding_hierarchy;
pub mod bvh;
pub mod error;
pub mod mesh;
pub mod ray;
mod utils;

#[cfg(test)]
mod testbase;

pub use bounding_hierarchy::{Aligned, BoundingVolumeKind, Oriented, Primitive};
pub use error::{BvhError, Result};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
