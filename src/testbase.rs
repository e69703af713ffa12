//! Common utilities shared by unit tests.
#![cfg(test)]

use std::collections::HashSet;
use std::f64::consts::PI;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bvh::Bvh;
use crate::mesh::TriangleMesh;
use crate::ray::{Parametric, Ray};
use crate::{BoundingVolumeKind, Point3, Vector3};

/// A vector represented as a tuple
pub type TupleVec = (f64, f64, f64);

/// Generate a `TupleVec` for [`proptest::strategy::Strategy`] from -10e3 to 10e3.
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (-10e3_f64..10e3_f64, -10e3_f64..10e3_f64, -10e3_f64..10e3_f64)
}

/// Convert a `TupleVec` to a [`Point3`].
pub fn tuple_to_point(tpl: &TupleVec) -> Point3 {
    Point3::new(tpl.0, tpl.1, tpl.2)
}

/// Creates a triangulated sphere around the origin with `u` segments around the z-axis and `v`
/// segments from pole to pole. The caps are triangle fans, the rings between them are quads split
/// into two triangles each.
pub fn uv_sphere_mesh(radius: f64, u: usize, v: usize) -> TriangleMesh {
    let mut vertices = vec![Point3::new(0.0, 0.0, radius)];
    for i in 1..v {
        let theta = PI * i as f64 / v as f64;
        for j in 0..u {
            let phi = 2.0 * PI * j as f64 / u as f64;
            vertices.push(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    vertices.push(Point3::new(0.0, 0.0, -radius));

    let south = vertices.len() - 1;
    let ring = |i: usize, j: usize| 1 + (i - 1) * u + j % u;
    let mut faces = Vec::new();
    for j in 0..u {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..v - 1 {
        for j in 0..u {
            faces.push([ring(i, j), ring(i + 1, j), ring(i + 1, j + 1)]);
            faces.push([ring(i, j), ring(i + 1, j + 1), ring(i, j + 1)]);
        }
    }
    for j in 0..u {
        faces.push([south, ring(v - 1, j + 1), ring(v - 1, j)]);
    }

    TriangleMesh::new(vertices, faces).expect("sphere faces refer to existing vertices")
}

/// Generate 21 unit triangles along the X axis at whole numbers (-10,9,..,10), in the plane
/// `z = 0`. The triangle at `x` spans `[x, x + 0.5]` along the X axis.
pub fn generate_aligned_triangles() -> Vec<[Point3; 3]> {
    (-10..11)
        .map(|x| {
            let x = x as f64;
            [
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 0.5, 0.0, 0.0),
                Point3::new(x, 0.5, 0.0),
            ]
        })
        .collect()
}

/// Generates `n` random unit directions from a fixed seed.
pub fn random_directions(seed: u64, n: usize) -> Vec<Vector3> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut directions = Vec::with_capacity(n);
    while directions.len() < n {
        let direction = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        if direction.norm() > 1e-3 {
            directions.push(direction.normalize());
        }
    }
    directions
}

/// Indices of the primitives hit by `ray`, found through the leaves the [`Bvh`] yields for the
/// line carrying the ray.
pub fn ray_hits<K: BoundingVolumeKind>(bvh: &Bvh<K>, ray: &Ray) -> HashSet<usize> {
    bvh.intersect_line(&ray.as_line())
        .filter(|node| node.is_leaf())
        .flat_map(|node| node.objects())
        .filter(|primitive| primitive.intersect_ray(ray).is_some())
        .map(|primitive| primitive.index)
        .collect()
}

/// Indices of the primitives hit by `ray`, testing every primitive.
pub fn ray_hits_brute_force<K: BoundingVolumeKind>(
    bvh: &Bvh<K>,
    ray: &impl Parametric,
) -> HashSet<usize> {
    bvh.primitives()
        .iter()
        .filter(|primitive| primitive.intersect_ray(ray).is_some())
        .map(|primitive| primitive.index)
        .collect()
}
