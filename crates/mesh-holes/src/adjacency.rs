//! Undirected adjacency over indexed triangles.
//!
//! Used by the passes that work on a plain [`Mesh`](crate::Mesh) instead of the
//! half-edge arena: component analysis, simplification, smoothing, soup repair
//! and mesh statistics.

use hashbrown::{HashMap, HashSet};

/// Edge and vertex incidence for a triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Maps edge (v0, v1) with v0 < v1 to the faces using it.
    pub edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
    /// Maps vertex index to the faces using it.
    pub vertex_to_faces: HashMap<u32, Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency information from a list of faces.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertex_to_faces: HashMap<u32, Vec<usize>> = HashMap::with_capacity(faces.len() / 2);

        for (face_idx, &[a, b, c]) in faces.iter().enumerate() {
            for v in [a, b, c] {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }
            for (u, w) in [(a, b), (b, c), (c, a)] {
                edge_to_faces
                    .entry(normalize_edge(u, w))
                    .or_default()
                    .push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Faces adjacent to an edge, in either direction.
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_faces
            .get(&normalize_edge(v0, v1))
            .map(Vec::as_slice)
    }

    /// Faces adjacent to a vertex. Empty for unreferenced vertices.
    pub fn faces_for_vertex(&self, v: u32) -> &[usize] {
        self.vertex_to_faces.get(&v).map_or(&[], Vec::as_slice)
    }

    /// Edges with exactly one adjacent face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Number of edges with exactly one adjacent face.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() == 1).count()
    }

    /// Every vertex touching a boundary edge.
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        self.boundary_edges().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Edges with more than two adjacent faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() > 2)
            .map(|(&edge, _)| edge)
    }

    /// Number of edges with more than two adjacent faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces.values().filter(|f| f.len() > 2).count()
    }

    /// True if no edge has more than two adjacent faces.
    pub fn is_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// True if no edge is a boundary edge.
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() >= 2)
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Number of vertices referenced by at least one face.
    pub fn vertex_count(&self) -> usize {
        self.vertex_to_faces.len()
    }
}

/// Order an edge so v0 < v1.
#[inline]
pub(crate) fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 { (v0, v1) } else { (v1, v0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle() {
        let adj = MeshAdjacency::build(&[[0, 1, 2]]);
        assert_eq!(adj.edge_count(), 3);
        assert_eq!(adj.vertex_count(), 3);
        assert_eq!(adj.boundary_edge_count(), 3);
        assert!(!adj.is_watertight());
        assert_eq!(adj.boundary_vertices().len(), 3);
    }

    #[test]
    fn test_shared_edge() {
        let adj = MeshAdjacency::build(&[[0, 1, 2], [1, 3, 2]]);
        assert_eq!(adj.faces_for_edge(2, 1).map(<[usize]>::len), Some(2));
        assert_eq!(adj.faces_for_edge(0, 1).map(<[usize]>::len), Some(1));
        assert!(adj.faces_for_edge(0, 3).is_none());
        assert_eq!(adj.faces_for_vertex(2).len(), 2);
        assert!(adj.faces_for_vertex(9).is_empty());
        assert_eq!(adj.boundary_edge_count(), 4);
        assert!(adj.is_manifold());
    }

    #[test]
    fn test_non_manifold_fan() {
        let adj = MeshAdjacency::build(&[[0, 1, 2], [0, 1, 3], [1, 0, 4]]);
        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert_eq!(adj.non_manifold_edges().next(), Some((0, 1)));
        assert!(!adj.is_manifold());
    }

    #[test]
    fn test_tetrahedron_is_watertight() {
        let adj = MeshAdjacency::build(&[[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]]);
        assert!(adj.is_watertight());
        assert_eq!(adj.edge_count(), 6);
        assert_eq!(adj.boundary_edges().count(), 0);
    }
}
