//! Input checks and mesh statistics.

use std::fmt;

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::adjacency::MeshAdjacency;
use crate::boundary::extract_boundary_cycles;
use crate::bounds::Axis;
use crate::classify::measure_loop;
use crate::components::find_connected_components;
use crate::error::{MeshError, MeshResult};
use crate::halfedge::HalfEdgeMesh;
use crate::types::Mesh;

/// Reject meshes the rest of the crate cannot work with: no faces, face
/// indices past the vertex list, or non-finite coordinates.
pub fn validate_mesh_data(mesh: &Mesh) -> MeshResult<()> {
    if mesh.vertices.is_empty() || mesh.faces.is_empty() {
        return Err(MeshError::empty_mesh(format!(
            "mesh has {} vertices and {} faces",
            mesh.vertices.len(),
            mesh.faces.len()
        )));
    }

    for (vertex_index, v) in mesh.vertices.iter().enumerate() {
        for (coordinate, value) in [("x", v.position.x), ("y", v.position.y), ("z", v.position.z)] {
            if !value.is_finite() {
                return Err(MeshError::InvalidCoordinate {
                    vertex_index,
                    coordinate,
                    value,
                });
            }
        }
    }

    let vertex_count = mesh.vertices.len();
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if let Some(&vertex_index) = face.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(MeshError::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// Size of one boundary loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleSummary {
    pub edge_count: usize,
    /// Per-axis extent of the loop's bounding box.
    pub extent: Vector3<f64>,
}

impl HoleSummary {
    pub fn diameter(&self) -> f64 {
        self.extent.max()
    }
}

/// Statistics for the `info` command.
#[derive(Debug, Clone)]
pub struct MeshReport {
    pub vertex_count: usize,
    pub face_count: usize,
    pub edge_count: usize,
    pub boundary_edge_count: usize,
    pub non_manifold_edge_count: usize,
    pub component_count: usize,
    pub surface_area: f64,
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
    /// Boundary loops, largest first. `None` if the mesh cannot be built as a
    /// half-edge mesh.
    pub holes: Option<Vec<HoleSummary>>,
}

impl MeshReport {
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    pub fn is_watertight(&self) -> bool {
        self.boundary_edge_count == 0 && self.is_manifold()
    }
}

impl fmt::Display for MeshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vertices: {}", self.vertex_count)?;
        writeln!(f, "Faces: {}", self.face_count)?;
        writeln!(f, "Edges: {}", self.edge_count)?;
        writeln!(f, "Components: {}", self.component_count)?;
        writeln!(f, "Boundary edges: {}", self.boundary_edge_count)?;
        writeln!(f, "Non-manifold edges: {}", self.non_manifold_edge_count)?;
        writeln!(f, "Surface area: {:.6}", self.surface_area)?;
        match &self.holes {
            Some(holes) => {
                writeln!(f, "Holes: {}", holes.len())?;
                for (i, h) in holes.iter().enumerate() {
                    writeln!(
                        f,
                        "  Hole {}: {} edges, extent {:.4} x {:.4} x {:.4}",
                        i + 1,
                        h.edge_count,
                        h.extent.x,
                        h.extent.y,
                        h.extent.z
                    )?;
                }
            }
            None => writeln!(f, "Holes: unavailable (not a manifold surface)")?,
        }
        Ok(())
    }
}

/// Gather counts, boundary loops and components of `mesh`.
pub fn validate_mesh(mesh: &Mesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);

    let holes = match HalfEdgeMesh::from_mesh(mesh) {
        Ok(he_mesh) => {
            let mut holes: Vec<HoleSummary> = extract_boundary_cycles(&he_mesh)
                .iter()
                .map(|l| {
                    let m = measure_loop(&he_mesh, l);
                    HoleSummary {
                        edge_count: m.edge_count,
                        extent: Vector3::new(
                            m.bbox.extent(Axis::X),
                            m.bbox.extent(Axis::Y),
                            m.bbox.extent(Axis::Z),
                        ),
                    }
                })
                .collect();
            holes.sort_by(|a, b| b.edge_count.cmp(&a.edge_count));
            Some(holes)
        }
        Err(e) => {
            warn!(error = %e, "Cannot list boundary loops");
            None
        }
    };

    let report = MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        edge_count: adjacency.edge_count(),
        boundary_edge_count: adjacency.boundary_edge_count(),
        non_manifold_edge_count: adjacency.non_manifold_edge_count(),
        component_count: find_connected_components(mesh).component_count(),
        surface_area: mesh.surface_area(),
        bounds: mesh.bounds(),
        holes,
    };
    debug!(
        vertices = report.vertex_count,
        faces = report.face_count,
        boundary_edges = report.boundary_edge_count,
        "Mesh report"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vertex;

    fn tetrahedron() -> Mesh {
        Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 0.866025, 0.0),
                Point3::new(0.5, 0.288675, 0.816497),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    #[test]
    fn test_valid_data() {
        assert!(validate_mesh_data(&tetrahedron()).is_ok());
    }

    #[test]
    fn test_invalid_index() {
        let mut mesh = tetrahedron();
        mesh.faces.push([0, 1, 9]);
        match validate_mesh_data(&mesh) {
            Err(MeshError::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            }) => {
                assert_eq!((face_index, vertex_index, vertex_count), (4, 9, 4));
            }
            other => panic!("expected InvalidVertexIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_coordinate() {
        let mut mesh = tetrahedron();
        mesh.vertices[2] = Vertex::from_coords(0.0, f64::NEG_INFINITY, 0.0);
        assert!(matches!(
            validate_mesh_data(&mesh),
            Err(MeshError::InvalidCoordinate {
                vertex_index: 2,
                coordinate: "y",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(validate_mesh_data(&Mesh::new()), Err(MeshError::EmptyMesh { .. })));
    }

    #[test]
    fn test_report_closed_mesh() {
        let report = validate_mesh(&tetrahedron());
        assert!(report.is_watertight());
        assert_eq!(report.edge_count, 6);
        assert_eq!(report.holes.as_deref().map(<[_]>::len), Some(0));
        assert_eq!(report.component_count, 1);
    }

    #[test]
    fn test_report_lists_holes() {
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        let report = validate_mesh(&mesh);
        let holes = report.holes.clone().unwrap();
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].edge_count, 3);
        assert!((holes[0].diameter() - 0.866025).abs() < 1e-9);
        assert!(report.to_string().contains("Hole 1: 3 edges"));
    }

    #[test]
    fn test_report_non_manifold_has_no_holes() {
        let mut mesh = tetrahedron();
        mesh.vertices.push(Vertex::from_coords(0.5, -1.0, 0.0));
        mesh.faces.push([0, 1, 4]);
        let report = validate_mesh(&mesh);
        assert!(!report.is_manifold());
        assert!(report.holes.is_none());
    }
}
