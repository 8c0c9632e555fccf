//! Connected components.
//!
//! Two faces belong to the same component if they share an edge. Scanned
//! meshes often carry small floating islands of triangles; these passes find
//! them and drop them by size.

use std::cmp::Reverse;
use std::fmt;

use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::error::MeshResult;
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// Faces of each edge-connected component.
#[derive(Debug, Clone, Default)]
pub struct ComponentAnalysis {
    /// Face indices per component, largest first. Equal sizes keep the order
    /// in which their first face appears.
    pub components: Vec<Vec<u32>>,
}

impl ComponentAnalysis {
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn is_connected(&self) -> bool {
        self.components.len() == 1
    }

    pub fn largest_component_size(&self) -> usize {
        self.components.first().map_or(0, Vec::len)
    }

    pub fn smallest_component_size(&self) -> usize {
        self.components.last().map_or(0, Vec::len)
    }
}

impl fmt::Display for ComponentAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connected components: {}", self.component_count())?;
        for (i, comp) in self.components.iter().enumerate() {
            writeln!(f, "  Component {}: {} faces", i + 1, comp.len())?;
        }
        Ok(())
    }
}

/// Find the edge-connected components of `mesh`.
///
/// Faces around a non-manifold edge all join the same component.
///
/// ```
/// use mesh_holes::Mesh;
/// use mesh_holes::components::find_connected_components;
/// use nalgebra::Point3;
///
/// let mesh = Mesh::from_parts(
///     [
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(10.0, 0.0, 0.0),
///         Point3::new(11.0, 0.0, 0.0),
///         Point3::new(10.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2], [3, 4, 5]],
/// );
/// assert_eq!(find_connected_components(&mesh).component_count(), 2);
/// ```
pub fn find_connected_components(mesh: &Mesh) -> ComponentAnalysis {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return ComponentAnalysis::default();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let mut face_neighbors: Vec<Vec<u32>> = vec![Vec::new(); face_count];
    for faces in adjacency.edge_to_faces.values() {
        for (i, &a) in faces.iter().enumerate() {
            for &b in &faces[i + 1..] {
                face_neighbors[a].push(b as u32);
                face_neighbors[b].push(a as u32);
            }
        }
    }

    let mut visited = vec![false; face_count];
    let mut components = Vec::new();
    for start in 0..face_count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = Vec::new();
        let mut stack = vec![start as u32];
        while let Some(face) = stack.pop() {
            component.push(face);
            for &next in &face_neighbors[face as usize] {
                if !visited[next as usize] {
                    visited[next as usize] = true;
                    stack.push(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    // Stable, so ties stay in discovery order.
    components.sort_by_key(|c| Reverse(c.len()));

    debug!(
        count = components.len(),
        sizes = ?components.iter().map(Vec::len).collect::<Vec<_>>(),
        "Found connected components"
    );
    ComponentAnalysis { components }
}

/// Parameters for [`remove_components`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentParams {
    /// Drop components with fewer faces than this. 0 disables the filter.
    pub min_faces: usize,
    /// After the size filter, keep only this many of the largest components.
    /// 0 keeps them all.
    pub keep: usize,
}

impl ComponentParams {
    pub fn new(min_faces: usize, keep: usize) -> Self {
        Self { min_faces, keep }
    }

    /// Keep only the largest component.
    pub fn largest_only() -> Self {
        Self::new(0, 1)
    }

    pub fn validate(&self) -> MeshResult<()> {
        Ok(())
    }
}

/// Outcome of [`remove_components`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentReport {
    pub components_before: usize,
    pub removed_small: usize,
    pub removed_extra: usize,
    pub faces_removed: usize,
    pub vertices_removed: usize,
}

impl ComponentReport {
    pub fn components_after(&self) -> usize {
        self.components_before - self.removed_small - self.removed_extra
    }
}

impl fmt::Display for ComponentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Components before: {}", self.components_before)?;
        writeln!(f, "Removed (too small): {}", self.removed_small)?;
        writeln!(f, "Removed (not among largest): {}", self.removed_extra)?;
        writeln!(f, "Components left: {}", self.components_after())
    }
}

/// Drop small components, then all but the largest `keep`, in place.
///
/// Vertices left without faces are removed as well.
pub fn remove_components(mesh: &mut Mesh, params: &ComponentParams) -> MeshResult<ComponentReport> {
    params.validate()?;
    let _timer = OperationTimer::with_context("remove_components", mesh.face_count(), mesh.vertex_count());

    let analysis = find_connected_components(mesh);
    let mut report = ComponentReport {
        components_before: analysis.component_count(),
        ..Default::default()
    };

    let mut kept: Vec<&Vec<u32>> = analysis.components.iter().collect();
    if params.min_faces > 0 {
        kept.retain(|c| c.len() >= params.min_faces);
        report.removed_small = report.components_before - kept.len();
    }
    if params.keep > 0 && kept.len() > params.keep {
        report.removed_extra = kept.len() - params.keep;
        kept.truncate(params.keep);
    }

    if report.removed_small + report.removed_extra > 0 {
        let mut keep_face = vec![false; mesh.faces.len()];
        for &f in kept.iter().flat_map(|c| c.iter()) {
            keep_face[f as usize] = true;
        }
        let (faces_removed, vertices_removed) = retain_faces(mesh, &keep_face);
        report.faces_removed = faces_removed;
        report.vertices_removed = vertices_removed;
    }

    info!(
        before = report.components_before,
        removed_small = report.removed_small,
        removed_extra = report.removed_extra,
        "Component filter finished"
    );
    Ok(report)
}

/// Keep the flagged faces and the vertices they use, preserving order.
///
/// Returns the number of faces and vertices removed.
pub(crate) fn retain_faces(mesh: &mut Mesh, keep_face: &[bool]) -> (usize, usize) {
    let mut used = vec![false; mesh.vertices.len()];
    for (face, _) in mesh.faces.iter().zip(keep_face).filter(|(_, k)| **k) {
        for &v in face {
            used[v as usize] = true;
        }
    }

    let mut remap = vec![u32::MAX; mesh.vertices.len()];
    let mut next = 0u32;
    for (old, &u) in used.iter().enumerate() {
        if u {
            remap[old] = next;
            next += 1;
        }
    }

    let faces_before = mesh.faces.len();
    let vertices_before = mesh.vertices.len();

    let mut flags = keep_face.iter();
    mesh.faces.retain(|_| flags.next().copied().unwrap_or(false));
    for face in &mut mesh.faces {
        *face = face.map(|v| remap[v as usize]);
    }
    let mut used_iter = used.iter();
    mesh.vertices.retain(|_| used_iter.next().copied().unwrap_or(false));

    (faces_before - mesh.faces.len(), vertices_before - mesh.vertices.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    /// Strip of `n` triangles starting at `x`.
    fn push_strip(positions: &mut Vec<Point3<f64>>, faces: &mut Vec<[u32; 3]>, n: u32, x: f64) {
        let base = positions.len() as u32;
        for i in 0..n + 2 {
            positions.push(Point3::new(x + (i / 2) as f64, (i % 2) as f64, 0.0));
        }
        for i in 0..n {
            let t = base + i;
            if i % 2 == 0 {
                faces.push([t, t + 1, t + 2]);
            } else {
                faces.push([t + 1, t, t + 2]);
            }
        }
    }

    fn strips(sizes: &[u32]) -> Mesh {
        let mut positions = Vec::new();
        let mut faces = Vec::new();
        for (i, &n) in sizes.iter().enumerate() {
            push_strip(&mut positions, &mut faces, n, 100.0 * i as f64);
        }
        Mesh::from_parts(positions, faces)
    }

    #[test]
    fn test_empty_mesh() {
        let analysis = find_connected_components(&Mesh::new());
        assert_eq!(analysis.component_count(), 0);
        assert_eq!(analysis.largest_component_size(), 0);
    }

    #[test]
    fn test_components_sorted_by_size() {
        let analysis = find_connected_components(&strips(&[2, 5, 1]));
        assert_eq!(analysis.component_count(), 3);
        let sizes: Vec<usize> = analysis.components.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 2, 1]);
        assert!(!analysis.is_connected());
    }

    #[test]
    fn test_vertex_contact_does_not_connect() {
        // Two triangles touching at a single vertex.
        let mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        assert_eq!(find_connected_components(&mesh).component_count(), 2);
    }

    #[test]
    fn test_min_faces_filter() {
        let mut mesh = strips(&[2, 5, 1]);
        let report = remove_components(&mut mesh, &ComponentParams::new(2, 0)).unwrap();
        assert_eq!(report.removed_small, 1);
        assert_eq!(report.removed_extra, 0);
        assert_eq!(mesh.face_count(), 7);
        assert_eq!(mesh.vertex_count(), 4 + 7);
        assert_eq!(report.vertices_removed, 3);
    }

    #[test]
    fn test_keep_largest() {
        let mut mesh = strips(&[2, 5, 1]);
        let report = remove_components(&mut mesh, &ComponentParams::largest_only()).unwrap();
        assert_eq!(report.components_after(), 1);
        assert_eq!(mesh.face_count(), 5);
        assert!(mesh.faces.iter().flatten().all(|&v| (v as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_filter_then_keep() {
        let mut mesh = strips(&[3, 4, 1, 6]);
        let report = remove_components(&mut mesh, &ComponentParams::new(2, 2)).unwrap();
        assert_eq!(report.removed_small, 1);
        assert_eq!(report.removed_extra, 1);
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut mesh = strips(&[2, 5]);
        let before = mesh.clone();
        let report = remove_components(&mut mesh, &ComponentParams::default()).unwrap();
        assert_eq!(report.components_after(), 2);
        assert_eq!(mesh.faces, before.faces);
    }

    #[test]
    fn test_everything_removed() {
        let mut mesh = strips(&[1, 1]);
        let report = remove_components(&mut mesh, &ComponentParams::new(5, 0)).unwrap();
        assert_eq!(report.components_after(), 0);
        assert!(mesh.is_empty());
    }
}
