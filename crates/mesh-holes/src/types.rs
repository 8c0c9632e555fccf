//! Indexed mesh data types.
//!
//! [`Mesh`] is the exchange format between file I/O and the topological
//! structures. Hole repair converts it into a
//! [`HalfEdgeMesh`](crate::HalfEdgeMesh) and back.

use nalgebra::{Point3, Vector3};

use crate::bounds::HoleBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl VertexColor {
    #[inline]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A vertex position with the attributes carried through from the input file.
///
/// Only the position takes part in any computation. Normals and colors are
/// passed through untouched, and vertices created while patching holes have
/// neither.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Option<Vector3<f64>>,
    pub color: Option<VertexColor>,
}

impl Vertex {
    /// Vertex with a position and no attributes.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position, normal: None, color: None }
    }

    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// Triangle mesh: a vertex array and counter-clockwise index triples.
///
/// Nothing here checks that indices are in range; see
/// [`validate_mesh_data`](crate::validate_mesh_data).
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh from bare positions and triangles.
    pub fn from_parts(positions: impl IntoIterator<Item = Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to draw: no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Axis-aligned `(min, max)` corners of all vertices, referenced or not.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let bbox = HoleBox::from_points(self.vertices.iter().map(|v| &v.position));
        (!bbox.is_empty()).then_some((bbox.min, bbox.max))
    }

    /// Faces resolved to their corner positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[a, b, c]| {
            Triangle::new(
                self.vertices[a as usize].position,
                self.vertices[b as usize].position,
                self.vertices[c as usize].position,
            )
        })
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }
}

/// Three corner positions, counter-clockwise seen from the front.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`; its length is twice the area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` when the triangle has no area.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.normal_unnormalized().try_normalize(f64::EPSILON)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        0.5 * self.normal_unnormalized().norm()
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }
}
