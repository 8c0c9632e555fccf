//! Edge-collapse simplification with quadric error metrics.
//!
//! Each vertex carries the sum of the plane quadrics of its faces. Edges are
//! collapsed cheapest first until the undirected edge count drops to the
//! requested fraction of the original. A collapse is only performed if it
//! keeps the surface manifold and does not flip any surviving face.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::AddAssign;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Matrix3, Point3, Vector3};
use tracing::{debug, info};

use crate::adjacency::{MeshAdjacency, normalize_edge};
use crate::error::{MeshError, MeshResult};
use crate::service::{SimplifyResult, Simplifier};
use crate::tracing_ext::OperationTimer;
use crate::types::{Mesh, Triangle, Vertex};

/// Parameters for [`simplify_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifyParams {
    /// Fraction of undirected edges to keep, in (0, 1]. Default: 0.5
    pub edge_keep_ratio: f64,
    /// Never collapse boundary edges. Default: false
    pub preserve_boundary: bool,
    /// Cost multiplier for boundary edges when they may collapse. Default: 10.0
    pub boundary_penalty: f64,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            edge_keep_ratio: 0.5,
            preserve_boundary: false,
            boundary_penalty: 10.0,
        }
    }
}

impl SimplifyParams {
    pub fn with_ratio(edge_keep_ratio: f64) -> Self {
        Self {
            edge_keep_ratio,
            ..Default::default()
        }
    }

    /// Keep open boundaries exactly where they are.
    pub fn conservative() -> Self {
        Self {
            edge_keep_ratio: 0.75,
            preserve_boundary: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> MeshResult<()> {
        if !(self.edge_keep_ratio > 0.0 && self.edge_keep_ratio <= 1.0) {
            return Err(MeshError::invalid_parameter(
                "edge_keep_ratio",
                self.edge_keep_ratio,
                "must be in (0, 1]",
            ));
        }
        if !(self.boundary_penalty.is_finite() && self.boundary_penalty >= 0.0) {
            return Err(MeshError::invalid_parameter(
                "boundary_penalty",
                self.boundary_penalty,
                "must be a finite non-negative number",
            ));
        }
        Ok(())
    }
}

/// [`Simplifier`] backed by [`simplify_mesh`].
#[derive(Debug, Clone, Default)]
pub struct QuadricSimplifier {
    pub params: SimplifyParams,
}

impl QuadricSimplifier {
    pub fn new(params: SimplifyParams) -> Self {
        Self { params }
    }
}

impl Simplifier for QuadricSimplifier {
    fn simplify(&self, mesh: &Mesh) -> MeshResult<SimplifyResult> {
        simplify_mesh(mesh, &self.params)
    }
}

/// Squared distance to a set of planes: `pᵀAp + 2bᵀp + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quadric {
    a: Matrix3<f64>,
    b: Vector3<f64>,
    c: f64,
}

impl Default for Quadric {
    fn default() -> Self {
        Self {
            a: Matrix3::zeros(),
            b: Vector3::zeros(),
            c: 0.0,
        }
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.a += rhs.a;
        self.b += rhs.b;
        self.c += rhs.c;
    }
}

impl Quadric {
    /// Plane `n·p + d = 0` with unit `n`.
    fn from_plane(n: Vector3<f64>, d: f64) -> Self {
        Self {
            a: n * n.transpose(),
            b: n * d,
            c: d * d,
        }
    }

    fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let v = p.coords;
        v.dot(&(self.a * v)) + 2.0 * self.b.dot(&v) + self.c
    }

    /// Point of least error, if the planes pin one down.
    fn optimal_point(&self) -> Option<Point3<f64>> {
        if self.a.determinant().abs() < 1e-10 {
            return None;
        }
        self.a.try_inverse().map(|inv| Point3::from(-(inv * self.b)))
    }
}

#[derive(Debug, Clone)]
struct EdgeCollapse {
    keep: u32,
    remove: u32,
    cost: f64,
    target: Point3<f64>,
    /// Versions of `keep` and `remove` when this entry was queued.
    stamps: [u32; 2],
}

impl PartialEq for EdgeCollapse {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EdgeCollapse {}

impl PartialOrd for EdgeCollapse {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCollapse {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on cost; ties broken by vertex ids for a stable order.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.keep, other.remove).cmp(&(self.keep, self.remove)))
    }
}

/// Simplify `mesh` until at most `edge_keep_ratio` of its undirected edges remain.
///
/// The input must be edge-manifold. Stops early if no valid collapse is left.
pub fn simplify_mesh(mesh: &Mesh, params: &SimplifyParams) -> MeshResult<SimplifyResult> {
    params.validate()?;
    let _timer = OperationTimer::with_context("simplify", mesh.face_count(), mesh.vertex_count());

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let original_edges = adjacency.edge_count();

    if mesh.faces.is_empty() {
        return Ok(SimplifyResult {
            mesh: mesh.clone(),
            original_edges: 0,
            edges_removed: 0,
            edges_left: 0,
            collapses_performed: 0,
            collapses_rejected: 0,
        });
    }
    if !adjacency.is_manifold() {
        return Err(MeshError::simplify_failed(format!(
            "{} edges are shared by more than two faces",
            adjacency.non_manifold_edge_count()
        )));
    }

    let target = (params.edge_keep_ratio * original_edges as f64).floor() as usize;
    let mut state = CollapseState::new(mesh, &adjacency, params);
    let mut heap = state.initial_queue(&adjacency);

    let mut edges = original_edges;
    let mut collapses_performed = 0;
    let mut collapses_rejected = 0;

    while edges > target {
        let Some(collapse) = heap.pop() else {
            debug!(edges, target, "No collapsible edges left");
            break;
        };
        if state.is_stale(&collapse) {
            continue;
        }
        if !state.is_collapse_valid(collapse.keep, collapse.remove, &collapse.target) {
            collapses_rejected += 1;
            continue;
        }

        state.collapse(collapse.keep, collapse.remove, collapse.target);
        edges = state.edge_count();
        collapses_performed += 1;
        state.requeue(collapse.keep, &mut heap);
    }

    let simplified = state.into_mesh();
    let edges_left = MeshAdjacency::build(&simplified.faces).edge_count();
    let edges_removed = original_edges.saturating_sub(edges_left);

    info!(
        edges_removed,
        edges_left, collapses_performed, collapses_rejected, "Simplification finished"
    );

    Ok(SimplifyResult {
        mesh: simplified,
        original_edges,
        edges_removed,
        edges_left,
        collapses_performed,
        collapses_rejected,
    })
}

/// The two corners of `face` other than `v`, in winding order after `v`.
fn other_corners(face: [u32; 3], v: u32) -> [u32; 2] {
    let i = face.iter().position(|&u| u == v).unwrap_or(0);
    [face[(i + 1) % 3], face[(i + 2) % 3]]
}

/// Working copy of the mesh while edges are being collapsed.
///
/// Edge face counts, vertex neighbourhoods and boundary degrees are updated
/// with every collapse, so each query costs at most one pass over a vertex's
/// neighbours.
struct CollapseState<'p> {
    params: &'p SimplifyParams,
    vertices: Vec<Option<Vertex>>,
    faces: Vec<Option<[u32; 3]>>,
    /// Faces around each vertex. May hold removed faces until pruned.
    vertex_faces: Vec<Vec<usize>>,
    /// Live faces on each undirected edge; edges without faces are absent.
    edge_faces: HashMap<(u32, u32), u32>,
    neighbors: Vec<HashSet<u32>>,
    /// Number of single-face edges at each vertex.
    boundary_degree: Vec<u32>,
    quadrics: Vec<Quadric>,
    stamps: Vec<u32>,
}

impl<'p> CollapseState<'p> {
    fn new(mesh: &Mesh, adjacency: &MeshAdjacency, params: &'p SimplifyParams) -> Self {
        let mut quadrics = vec![Quadric::default(); mesh.vertices.len()];
        for (face, tri) in mesh.faces.iter().zip(mesh.triangles()) {
            let Some(n) = tri.normal() else {
                continue;
            };
            let q = Quadric::from_plane(n, -n.dot(&tri.v0.coords));
            for &v in face {
                quadrics[v as usize] += q;
            }
        }

        let vertex_faces = (0..mesh.vertices.len() as u32)
            .map(|v| adjacency.faces_for_vertex(v).to_vec())
            .collect();

        let mut neighbors = vec![HashSet::new(); mesh.vertices.len()];
        let mut boundary_degree = vec![0; mesh.vertices.len()];
        let mut edge_faces = HashMap::with_capacity(adjacency.edge_to_faces.len());
        for (&(a, b), around) in &adjacency.edge_to_faces {
            neighbors[a as usize].insert(b);
            neighbors[b as usize].insert(a);
            if around.len() == 1 {
                boundary_degree[a as usize] += 1;
                boundary_degree[b as usize] += 1;
            }
            edge_faces.insert((a, b), around.len() as u32);
        }

        Self {
            params,
            vertices: mesh.vertices.iter().cloned().map(Some).collect(),
            faces: mesh.faces.iter().copied().map(Some).collect(),
            vertex_faces,
            edge_faces,
            neighbors,
            boundary_degree,
            quadrics,
            stamps: vec![0; mesh.vertices.len()],
        }
    }

    fn edge_count(&self) -> usize {
        self.edge_faces.len()
    }

    fn position(&self, v: u32) -> Option<&Point3<f64>> {
        self.vertices[v as usize].as_ref().map(|vx| &vx.position)
    }

    fn live_faces(&self, v: u32) -> impl Iterator<Item = (usize, [u32; 3])> + '_ {
        self.vertex_faces[v as usize]
            .iter()
            .filter_map(|&f| self.faces[f].map(|face| (f, face)))
    }

    fn neighbors(&self, v: u32) -> &HashSet<u32> {
        &self.neighbors[v as usize]
    }

    fn edge_face_count(&self, a: u32, b: u32) -> u32 {
        self.edge_faces.get(&normalize_edge(a, b)).copied().unwrap_or(0)
    }

    #[inline]
    fn is_boundary_vertex(&self, v: u32) -> bool {
        self.boundary_degree[v as usize] > 0
    }

    /// Add `delta` faces to edge `a`-`b`, keeping neighbourhoods and boundary
    /// degrees in step.
    fn adjust_edge(&mut self, a: u32, b: u32, delta: i32) {
        let key = normalize_edge(a, b);
        let before = self.edge_faces.get(&key).copied().unwrap_or(0);
        let after = before.saturating_add_signed(delta);

        if before == 1 {
            self.boundary_degree[a as usize] -= 1;
            self.boundary_degree[b as usize] -= 1;
        }
        if after == 1 {
            self.boundary_degree[a as usize] += 1;
            self.boundary_degree[b as usize] += 1;
        }
        if after == 0 {
            self.edge_faces.remove(&key);
            self.neighbors[a as usize].remove(&b);
            self.neighbors[b as usize].remove(&a);
        } else {
            self.edge_faces.insert(key, after);
            self.neighbors[a as usize].insert(b);
            self.neighbors[b as usize].insert(a);
        }
    }

    fn initial_queue(&self, adjacency: &MeshAdjacency) -> BinaryHeap<EdgeCollapse> {
        let mut edges: Vec<(u32, u32)> = adjacency.edge_to_faces.keys().copied().collect();
        edges.sort_unstable();
        edges
            .into_iter()
            .filter_map(|(a, b)| self.candidate(a, b))
            .collect()
    }

    fn candidate(&self, mut keep: u32, mut remove: u32) -> Option<EdgeCollapse> {
        let boundary = self.edge_face_count(keep, remove) == 1;
        let mut pinned = false;
        if self.params.preserve_boundary {
            if boundary {
                return None;
            }
            // A boundary endpoint stays where it is.
            if self.is_boundary_vertex(remove) {
                std::mem::swap(&mut keep, &mut remove);
                pinned = true;
            } else {
                pinned = self.is_boundary_vertex(keep);
            }
        }
        let (pk, pr) = (self.position(keep)?, self.position(remove)?);

        let mut q = self.quadrics[keep as usize];
        q += self.quadrics[remove as usize];
        let target = if pinned {
            *pk
        } else {
            q.optimal_point().unwrap_or_else(|| Point3::from((pk.coords + pr.coords) / 2.0))
        };
        let mut cost = q.evaluate(&target).max(0.0);
        if boundary {
            cost *= self.params.boundary_penalty;
        }

        Some(EdgeCollapse {
            keep,
            remove,
            cost,
            target,
            stamps: [self.stamps[keep as usize], self.stamps[remove as usize]],
        })
    }

    fn is_stale(&self, c: &EdgeCollapse) -> bool {
        self.vertices[c.keep as usize].is_none()
            || self.vertices[c.remove as usize].is_none()
            || self.stamps[c.keep as usize] != c.stamps[0]
            || self.stamps[c.remove as usize] != c.stamps[1]
    }

    /// Link condition, boundary pinching, duplicate faces and normal flips.
    fn is_collapse_valid(&self, keep: u32, remove: u32, target: &Point3<f64>) -> bool {
        let shared = self.edge_face_count(keep, remove);
        if shared == 0 {
            return false;
        }

        let nk = self.neighbors(keep);
        let nr = self.neighbors(remove);
        if nk.intersection(nr).count() != shared as usize {
            return false;
        }
        if shared == 2 && self.is_boundary_vertex(keep) && self.is_boundary_vertex(remove) {
            return false;
        }

        let sorted = |mut f: [u32; 3]| {
            f.sort_unstable();
            f
        };
        let kept: HashSet<[u32; 3]> = self
            .live_faces(keep)
            .filter(|(_, f)| !f.contains(&remove))
            .map(|(_, f)| sorted(f))
            .collect();

        for (v, other) in [(keep, remove), (remove, keep)] {
            for (_, face) in self.live_faces(v).filter(|(_, f)| !f.contains(&other)) {
                let moved = face.map(|u| if u == remove { keep } else { u });
                if v == remove && kept.contains(&sorted(moved)) {
                    return false;
                }
                if self.flips(face, v, target) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether moving corner `v` of `face` to `target` reverses the face.
    fn flips(&self, face: [u32; 3], v: u32, target: &Point3<f64>) -> bool {
        let corner = |u: u32| -> Point3<f64> {
            if u == v {
                *target
            } else {
                self.position(u).copied().unwrap_or_else(Point3::origin)
            }
        };
        let before = self.triangle(face).normal_unnormalized();
        let after = Triangle::new(corner(face[0]), corner(face[1]), corner(face[2])).normal_unnormalized();
        before.dot(&after) <= 0.0
    }

    fn triangle(&self, face: [u32; 3]) -> Triangle {
        let p = |u: u32| self.position(u).copied().unwrap_or_else(Point3::origin);
        Triangle::new(p(face[0]), p(face[1]), p(face[2]))
    }

    /// Merge `remove` into `keep`.
    fn collapse(&mut self, keep: u32, remove: u32, target: Point3<f64>) {
        if let Some(v) = self.vertices[keep as usize].as_mut() {
            v.position = target;
        }
        let q = self.quadrics[remove as usize];
        self.quadrics[keep as usize] += q;
        self.vertices[remove as usize] = None;

        let moved = std::mem::take(&mut self.vertex_faces[remove as usize]);
        for f in moved {
            let Some(face) = self.faces[f] else {
                continue;
            };
            let [a, b] = other_corners(face, remove);
            self.adjust_edge(remove, a, -1);
            self.adjust_edge(remove, b, -1);
            if face.contains(&keep) {
                let c = if a == keep { b } else { a };
                self.adjust_edge(keep, c, -1);
                self.faces[f] = None;
            } else {
                self.adjust_edge(keep, a, 1);
                self.adjust_edge(keep, b, 1);
                self.faces[f] = Some(face.map(|u| if u == remove { keep } else { u }));
                self.vertex_faces[keep as usize].push(f);
            }
        }

        let faces = &self.faces;
        self.vertex_faces[keep as usize].retain(|&f| faces[f].is_some());
        self.stamps[keep as usize] += 1;
    }

    fn requeue(&self, v: u32, heap: &mut BinaryHeap<EdgeCollapse>) {
        let mut around: Vec<u32> = self.neighbors(v).iter().copied().collect();
        around.sort_unstable();
        for u in around {
            let (a, b) = normalize_edge(v, u);
            if let Some(c) = self.candidate(a, b) {
                heap.push(c);
            }
        }
    }

    /// Compact the surviving vertices and faces.
    fn into_mesh(self) -> Mesh {
        let mut vertices = Vec::new();
        let mut remap: HashMap<u32, u32> = HashMap::new();
        for (old, v) in self.vertices.into_iter().enumerate() {
            if let Some(v) = v {
                remap.insert(old as u32, vertices.len() as u32);
                vertices.push(v);
            }
        }

        let mut faces = Vec::new();
        for face in self.faces.into_iter().flatten() {
            if let (Some(&i0), Some(&i1), Some(&i2)) =
                (remap.get(&face[0]), remap.get(&face[1]), remap.get(&face[2]))
                && i0 != i1
                && i1 != i2
                && i0 != i2
            {
                faces.push([i0, i1, i2]);
            }
        }

        Mesh { vertices, faces }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed latitude/longitude sphere.
    fn uv_sphere(stacks: u32, slices: u32) -> Mesh {
        let mut positions = vec![Point3::new(0.0, 0.0, 1.0)];
        for i in 1..stacks {
            let phi = std::f64::consts::PI * i as f64 / stacks as f64;
            for j in 0..slices {
                let theta = std::f64::consts::TAU * j as f64 / slices as f64;
                positions.push(Point3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()));
            }
        }
        let south = positions.len() as u32;
        positions.push(Point3::new(0.0, 0.0, -1.0));

        let ring = |i: u32, j: u32| 1 + i * slices + j % slices;
        let mut faces = Vec::new();
        for j in 0..slices {
            faces.push([0, ring(0, j), ring(0, j + 1)]);
            faces.push([south, ring(stacks - 2, j + 1), ring(stacks - 2, j)]);
        }
        for i in 0..stacks - 2 {
            for j in 0..slices {
                faces.push([ring(i, j), ring(i + 1, j), ring(i + 1, j + 1)]);
                faces.push([ring(i, j), ring(i + 1, j + 1), ring(i, j + 1)]);
            }
        }
        Mesh::from_parts(positions, faces)
    }

    #[test]
    fn test_simplify_sphere_halves_edges() {
        let mesh = uv_sphere(12, 16);
        let result = simplify_mesh(&mesh, &SimplifyParams::with_ratio(0.5)).unwrap();

        let adj = MeshAdjacency::build(&result.mesh.faces);
        assert!(result.edges_left <= result.original_edges / 2);
        assert_eq!(result.edges_left + result.edges_removed, result.original_edges);
        assert!(adj.is_manifold());
        assert!(adj.is_watertight());
        // Euler characteristic of a sphere.
        let chi = result.mesh.vertex_count() as i64 - adj.edge_count() as i64 + result.mesh.face_count() as i64;
        assert_eq!(chi, 2);
    }

    #[test]
    fn test_ratio_one_keeps_mesh() {
        let mesh = uv_sphere(6, 8);
        let result = simplify_mesh(&mesh, &SimplifyParams::with_ratio(1.0)).unwrap();
        assert_eq!(result.collapses_performed, 0);
        assert_eq!(result.edges_removed, 0);
        assert_eq!(result.mesh.face_count(), mesh.face_count());
    }

    #[test]
    fn test_preserve_boundary_keeps_rim() {
        let mut mesh = uv_sphere(10, 12);
        // Open the south cap.
        let south = mesh.vertex_count() as u32 - 1;
        mesh.faces.retain(|f| !f.contains(&south));
        let rim_before = MeshAdjacency::build(&mesh.faces).boundary_edge_count();

        let params = SimplifyParams {
            edge_keep_ratio: 0.6,
            preserve_boundary: true,
            ..Default::default()
        };
        let result = simplify_mesh(&mesh, &params).unwrap();
        let adj = MeshAdjacency::build(&result.mesh.faces);
        assert_eq!(adj.boundary_edge_count(), rim_before);
        assert!(result.collapses_performed > 0);
    }

    #[test]
    fn test_empty_mesh() {
        let result = simplify_mesh(&Mesh::new(), &SimplifyParams::default()).unwrap();
        assert_eq!(result.original_edges, 0);
        assert_eq!(result.collapses_performed, 0);
    }

    #[test]
    fn test_non_manifold_input_rejected() {
        let mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        let err = simplify_mesh(&mesh, &SimplifyParams::default()).unwrap_err();
        assert!(matches!(err, MeshError::SimplifyFailed { .. }));
    }

    #[test]
    fn test_ratio_validation() {
        for r in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(SimplifyParams::with_ratio(r).validate().is_err(), "{}", r);
        }
        assert!(SimplifyParams::with_ratio(1.0).validate().is_ok());
    }

    #[test]
    fn test_quadric_from_plane() {
        let q = Quadric::from_plane(Vector3::z(), 0.0);
        assert!(q.evaluate(&Point3::new(1.0, 2.0, 0.0)).abs() < 1e-10);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 1.0)) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_quadric_optimal_point() {
        let mut q = Quadric::from_plane(Vector3::x(), -1.0);
        q += Quadric::from_plane(Vector3::y(), -2.0);
        q += Quadric::from_plane(Vector3::z(), -3.0);
        let p = q.optimal_point().unwrap();
        assert!((p - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-9);

        // Parallel planes leave the point undetermined.
        let mut flat = Quadric::from_plane(Vector3::z(), 0.0);
        flat += Quadric::from_plane(Vector3::z(), -2.0);
        assert!(flat.optimal_point().is_none());
    }

    /// Fan of `n` triangles around one apex, open along the rim.
    fn cone(n: u32) -> Mesh {
        let mut positions = vec![Point3::new(0.0, 0.0, 1.0)];
        for i in 0..n {
            let t = std::f64::consts::TAU * i as f64 / n as f64;
            positions.push(Point3::new(t.cos(), t.sin(), 0.0));
        }
        let faces = (0..n).map(|i| [0, 1 + i, 1 + (i + 1) % n]).collect();
        Mesh::from_parts(positions, faces)
    }

    #[test]
    fn test_high_valence_apex() {
        // The apex touches every edge of the fan.
        let mesh = cone(4000);
        let result = simplify_mesh(&mesh, &SimplifyParams::with_ratio(0.5)).unwrap();
        assert!(result.collapses_performed > 0);
        assert!(result.edges_left < result.original_edges);
        assert_eq!(result.edges_left + result.edges_removed, result.original_edges);
        assert!(MeshAdjacency::build(&result.mesh.faces).is_manifold());
    }

    #[test]
    fn test_incremental_adjacency_matches_rebuild() {
        let mut mesh = uv_sphere(10, 12);
        let south = mesh.vertex_count() as u32 - 1;
        mesh.faces.retain(|f| !f.contains(&south));
        let params = SimplifyParams::default();
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let mut state = CollapseState::new(&mesh, &adjacency, &params);
        let mut heap = state.initial_queue(&adjacency);

        let mut done = 0;
        while done < 40 {
            let Some(c) = heap.pop() else { break };
            if state.is_stale(&c) || !state.is_collapse_valid(c.keep, c.remove, &c.target) {
                continue;
            }
            state.collapse(c.keep, c.remove, c.target);
            state.requeue(c.keep, &mut heap);
            done += 1;
        }
        assert_eq!(done, 40);

        let live: Vec<[u32; 3]> = state.faces.iter().flatten().copied().collect();
        let rebuilt = MeshAdjacency::build(&live);
        assert_eq!(state.edge_count(), rebuilt.edge_count());
        for (&(a, b), around) in &rebuilt.edge_to_faces {
            assert_eq!(state.edge_face_count(a, b), around.len() as u32);
        }
        let rim = rebuilt.boundary_vertices();
        for v in 0..mesh.vertex_count() as u32 {
            assert_eq!(state.is_boundary_vertex(v), rim.contains(&v), "vertex {}", v);
            let expected: HashSet<u32> = live
                .iter()
                .filter(|f| f.contains(&v))
                .flatten()
                .copied()
                .filter(|&u| u != v)
                .collect();
            assert_eq!(state.neighbors(v), &expected, "vertex {}", v);
        }
    }

    #[test]
    fn test_simplifier_trait() {
        let simplifier = QuadricSimplifier::new(SimplifyParams::with_ratio(0.8));
        let result = simplifier.simplify(&uv_sphere(8, 10)).unwrap();
        assert!(result.edges_left < result.original_edges);
    }
}
