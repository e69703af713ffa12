//! Meshes as a source of [`Primitive`]s.

use crate::error::{BvhError, Result};
use crate::{Point3, Primitive};

/// A mesh whose faces can be stored in a [`Bvh`].
///
/// [`Bvh`]: crate::bvh::Bvh
pub trait FaceMesh {
    /// Identifiers of the faces of the mesh.
    fn faces(&self) -> impl Iterator<Item = usize> + '_;

    /// The reference point of a face.
    fn face_centroid(&self, face: usize) -> Point3;

    /// The boundary points of a face, in order.
    fn face_points(&self, face: usize) -> Vec<Point3>;

    /// Converts every face into a [`Primitive`] indexed by its face identifier.
    fn to_primitives(&self) -> Vec<Primitive> {
        self.faces()
            .map(|face| Primitive::new(face, self.face_centroid(face), self.face_points(face)))
            .collect()
    }
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangleMesh {
    vertices: Vec<Point3>,
    faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Creates a new [`TriangleMesh`].
    ///
    /// # Errors
    /// Fails with [`BvhError::InvalidInput`] if a face refers to a vertex which does not exist.
    ///
    /// # Examples
    /// ```
    /// use facet_bvh::mesh::{FaceMesh, TriangleMesh};
    /// use facet_bvh::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(3.0, 0.0, 0.0),
    ///     Point3::new(0.0, 3.0, 0.0),
    /// ];
    /// let mesh = TriangleMesh::new(vertices.clone(), vec![[0, 1, 2]]).unwrap();
    ///
    /// assert_eq!(mesh.face_centroid(0), Point3::new(1.0, 1.0, 0.0));
    /// assert!(TriangleMesh::new(vertices, vec![[0, 1, 3]]).is_err());
    /// ```
    pub fn new(vertices: Vec<Point3>, faces: Vec<[usize; 3]>) -> Result<TriangleMesh> {
        if let Some((face, corners)) = faces
            .iter()
            .enumerate()
            .find(|(_, corners)| corners.iter().any(|&v| v >= vertices.len()))
        {
            return Err(BvhError::InvalidInput(format!(
                "face {face} refers to a missing vertex: {corners:?}, {} vertices",
                vertices.len()
            )));
        }
        Ok(TriangleMesh { vertices, faces })
    }

    /// The vertices of the mesh.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// The faces of the mesh as vertex indices.
    pub fn face_indices(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// The three corners of a face.
    pub fn triangle(&self, face: usize) -> [Point3; 3] {
        self.faces[face].map(|v| self.vertices[v])
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if the mesh has no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl FaceMesh for TriangleMesh {
    fn faces(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.faces.len()
    }

    fn face_centroid(&self, face: usize) -> Point3 {
        let [a, b, c] = self.triangle(face);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    fn face_points(&self, face: usize) -> Vec<Point3> {
        self.triangle(face).to_vec()
    }
}
