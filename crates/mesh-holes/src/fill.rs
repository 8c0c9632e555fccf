//! Default hole filler: triangulate, refine, fair.
//!
//! 1. Ear-clip the boundary polygon in its average plane.
//! 2. Split triangles larger than the boundary's edge scale at their centroid,
//!    then flip patch edges toward a Delaunay configuration.
//! 3. Relax the new interior vertices with a uniform Laplacian while the
//!    boundary stays fixed.
//! 4. Stitch the patch into the arena.
//!
//! Everything up to the stitch works on patch-local indices: `0..n` are the
//! boundary vertices in loop order and `n..` are vertices created by
//! refinement. The mesh is only touched in the final step, and only after the
//! patch passes [`HalfEdgeMesh::stitch_patch`]'s checks.
//!
//! A loop that passes through a vertex more than once (two holes meeting at a
//! single vertex) is cut at the repeated vertex into simple polygons, and each
//! polygon is triangulated on its own.

use std::f64::consts::PI;

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use tracing::{debug, trace, warn};

use crate::boundary::BoundaryLoop;
use crate::error::{MeshError, MeshResult};
use crate::halfedge::{HalfEdgeMesh, VertexId};
use crate::service::{HoleFiller, PatchResult};
use crate::types::Triangle;

const MAX_FLIP_SWEEPS: usize = 8;

/// Parameters for [`TriangulateRefineFair`].
#[derive(Debug, Clone, PartialEq)]
pub struct FillParams {
    /// Patch density relative to the hole's mean boundary edge length. A
    /// triangle is split when its area exceeds that of an equilateral
    /// triangle with side `mean_edge / density`. Default: √2
    pub density: f64,
    /// Maximum number of refinement passes. Zero leaves the bare triangulation.
    /// Default: 6
    pub refine_passes: usize,
    /// Maximum fairing iterations. Default: 200
    pub fairing_iterations: usize,
    /// Fairing stops once no vertex moves more than this fraction of the mean
    /// boundary edge length in one iteration. Default: 1e-4
    pub fairing_tolerance: f64,
    /// Upper bound on vertices created for one patch. Default: 20000
    pub max_patch_vertices: usize,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            density: std::f64::consts::SQRT_2,
            refine_passes: 6,
            fairing_iterations: 200,
            fairing_tolerance: 1e-4,
            max_patch_vertices: 20_000,
        }
    }
}

impl FillParams {
    /// Triangulate only: no new vertices, no fairing.
    pub fn triangulate_only() -> Self {
        Self {
            refine_passes: 0,
            fairing_iterations: 0,
            ..Default::default()
        }
    }

    /// Denser patches that follow curved surroundings more closely.
    pub fn fine() -> Self {
        Self {
            density: 2.0,
            refine_passes: 8,
            fairing_iterations: 500,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> MeshResult<()> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(MeshError::invalid_parameter(
                "density",
                self.density,
                "must be a positive number",
            ));
        }
        if !(self.fairing_tolerance.is_finite() && self.fairing_tolerance > 0.0) {
            return Err(MeshError::invalid_parameter(
                "fairing_tolerance",
                self.fairing_tolerance,
                "must be a positive number",
            ));
        }
        Ok(())
    }
}

/// Ear clipping, centroid refinement and Laplacian fairing.
#[derive(Debug, Clone, Default)]
pub struct TriangulateRefineFair {
    pub params: FillParams,
}

impl TriangulateRefineFair {
    pub fn new(params: FillParams) -> Self {
        Self { params }
    }
}

impl HoleFiller for TriangulateRefineFair {
    fn fill(&mut self, mesh: &mut HalfEdgeMesh, hole: &BoundaryLoop) -> MeshResult<PatchResult> {
        let halfedges = hole.halfedges(mesh);
        let ring: Vec<VertexId> = halfedges.iter().map(|&h| mesh.source(h)).collect();
        let n = ring.len();
        if n < 3 {
            return Err(MeshError::hole_fill_failed(format!(
                "hole has {} edges, at least 3 are required",
                n
            )));
        }
        let polygons = split_at_repeated_vertices(&ring);
        if let Some(short) = polygons.iter().find(|p| p.len() < 3) {
            return Err(MeshError::hole_fill_failed(format!(
                "hole boundary closes a {}-edge loop at vertex {}",
                short.len(),
                ring[short[0]].0
            )));
        }

        let mut positions: Vec<Point3<f64>> = ring.iter().map(|&v| *mesh.position(v)).collect();
        let mean_edge =
            (0..n).map(|i| (positions[(i + 1) % n] - positions[i]).norm()).sum::<f64>() / n as f64;

        let (triangles, faired) = {
            let existing_edge = |a: u32, b: u32| {
                (a as usize) < n
                    && (b as usize) < n
                    && mesh.find_halfedge(ring[a as usize], ring[b as usize]).is_some()
            };

            let mut triangles = Vec::with_capacity(n);
            for polygon in &polygons {
                let corners: Vec<Point3<f64>> = polygon.iter().map(|&i| positions[i]).collect();
                let normal = hole_normal(&corners);
                triangles.extend(ear_clip(&positions, polygon, &normal, &existing_edge));
            }
            if polygons.len() > 1 {
                trace!(polygons = polygons.len(), "Split hole at repeated vertices");
            }

            let side = mean_edge / self.params.density;
            let target_area = 3f64.sqrt() / 4.0 * side * side;
            for pass in 0..self.params.refine_passes {
                let budget = self.params.max_patch_vertices.saturating_sub(positions.len() - n);
                let split = refine_pass(&mut positions, &mut triangles, target_area, budget);
                if split == 0 {
                    break;
                }
                let flips = flip_edges(&positions, &mut triangles, &existing_edge);
                trace!(pass, split, flips, "Refined patch");
            }

            let faired = fair(
                &mut positions,
                &triangles,
                n,
                self.params.fairing_iterations,
                self.params.fairing_tolerance * mean_edge,
            );
            (triangles, faired)
        };

        let (new_vertices, new_faces) = mesh.stitch_patch(&halfedges, &positions[n..], &triangles)?;

        debug!(
            edges = n,
            faces = new_faces.len(),
            vertices = new_vertices.len(),
            faired,
            "Patched hole"
        );
        Ok(PatchResult {
            new_vertices,
            new_faces,
            faired,
        })
    }
}

/// Average plane normal of a closed polygon, oriented by its winding.
fn hole_normal(positions: &[Point3<f64>]) -> Vector3<f64> {
    let n = positions.len();
    let centroid = Point3::from(
        positions.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n as f64,
    );

    let mut normal = Vector3::zeros();
    for i in 0..n {
        let v0 = positions[i] - centroid;
        let v1 = positions[(i + 1) % n] - centroid;
        normal += v0.cross(&v1);
    }

    let len = normal.norm();
    if len > f64::EPSILON {
        normal / len
    } else {
        Vector3::z()
    }
}

/// Cut a closed vertex ring into simple polygons of local indices.
///
/// Local `i` stands for `ring[i]` and the edge leaving it. Whenever the walk
/// returns to a vertex still open on the stack, the edges since its last
/// visit are closed off as one polygon. Every edge ends up in exactly one
/// polygon, and no polygon repeats a vertex.
fn split_at_repeated_vertices(ring: &[VertexId]) -> Vec<Vec<usize>> {
    let mut polygons = Vec::new();
    let mut stack: Vec<usize> = Vec::with_capacity(ring.len());
    let mut open: HashMap<VertexId, usize> = HashMap::with_capacity(ring.len());
    for (i, &v) in ring.iter().enumerate() {
        if let Some(&depth) = open.get(&v) {
            let closed = stack.split_off(depth);
            for &j in &closed {
                open.remove(&ring[j]);
            }
            polygons.push(closed);
        }
        open.insert(v, stack.len());
        stack.push(i);
    }
    polygons.push(stack);
    polygons
}

/// Ear-clipping triangulation of `polygon`, a simple cycle of indices into
/// `positions`.
///
/// Triangles keep the polygon's winding. Ears whose closing diagonal is
/// `blocked` are passed over. If no ear can be cut, the rest is fanned from the
/// first remaining vertex with no blocked diagonal.
fn ear_clip(
    positions: &[Point3<f64>],
    polygon: &[usize],
    normal: &Vector3<f64>,
    blocked: &impl Fn(u32, u32) -> bool,
) -> Vec<[u32; 3]> {
    let mut remaining = polygon.to_vec();
    let mut triangles = Vec::with_capacity(polygon.len().saturating_sub(2));

    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let curr = remaining[i];
            let next = remaining[(i + 1) % len];
            !blocked(prev as u32, next as u32)
                && is_ear(positions, &remaining, prev, curr, next, normal)
        });

        match ear {
            Some(i) => {
                let prev = remaining[(i + len - 1) % len];
                let next = remaining[(i + 1) % len];
                triangles.push([prev as u32, remaining[i] as u32, next as u32]);
                remaining.remove(i);
            }
            None => {
                warn!(
                    remaining = len,
                    "Ear clipping stuck, using fan triangulation"
                );
                break;
            }
        }
    }

    if remaining.len() == 3 {
        triangles.push([remaining[0] as u32, remaining[1] as u32, remaining[2] as u32]);
    } else if remaining.len() > 3 {
        let len = remaining.len();
        let centre = (0..len)
            .find(|&c| {
                (2..len - 1).all(|k| !blocked(remaining[c] as u32, remaining[(c + k) % len] as u32))
            })
            .unwrap_or(0);
        for k in 1..len - 1 {
            triangles.push([
                remaining[centre] as u32,
                remaining[(centre + k) % len] as u32,
                remaining[(centre + k + 1) % len] as u32,
            ]);
        }
    }

    triangles
}

/// Whether `curr` is a convex corner with no other remaining vertex inside
/// the triangle it closes.
fn is_ear(
    positions: &[Point3<f64>],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    hole_normal: &Vector3<f64>,
) -> bool {
    let (p_prev, p_curr, p_next) = (positions[prev], positions[curr], positions[next]);
    let Some(tri_normal) = Triangle::new(p_prev, p_curr, p_next).normal() else {
        return false;
    };
    if tri_normal.dot(hole_normal) < 0.0 {
        return false;
    }

    remaining
        .iter()
        .filter(|&&idx| idx != prev && idx != curr && idx != next)
        .all(|&idx| !point_in_triangle_2d(&positions[idx], &p_prev, &p_curr, &p_next, hole_normal))
}

/// Point-in-triangle test after projecting along the dominant normal axis.
fn point_in_triangle_2d(
    p: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
    normal: &Vector3<f64>,
) -> bool {
    let abs = normal.abs();
    let project = |q: &Point3<f64>| -> (f64, f64) {
        if abs.z >= abs.x && abs.z >= abs.y {
            (q.x, q.y)
        } else if abs.y >= abs.x {
            (q.x, q.z)
        } else {
            (q.y, q.z)
        }
    };
    let (p, a, b, c) = (project(p), project(v0), project(v1), project(v2));

    let sign = |p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)| -> f64 {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Split every triangle larger than `target_area` at its centroid, creating at
/// most `budget` vertices. Returns the number of splits.
fn refine_pass(
    positions: &mut Vec<Point3<f64>>,
    triangles: &mut Vec<[u32; 3]>,
    target_area: f64,
    budget: usize,
) -> usize {
    let mut split = 0;
    let mut refined = Vec::with_capacity(triangles.len() * 2);
    for &[a, b, c] in triangles.iter() {
        let tri = Triangle::new(
            positions[a as usize],
            positions[b as usize],
            positions[c as usize],
        );
        if split < budget && tri.area() > target_area {
            let m = positions.len() as u32;
            positions.push(tri.centroid());
            refined.extend_from_slice(&[[a, b, m], [b, c, m], [c, a, m]]);
            split += 1;
        } else {
            refined.push([a, b, c]);
        }
    }
    *triangles = refined;
    split
}

/// Corner of `tri` opposite its directed edge `u -> w`.
fn apex(tri: &[u32; 3], u: u32, w: u32) -> Option<u32> {
    (0..3)
        .find(|&i| tri[i] == u && tri[(i + 1) % 3] == w)
        .map(|i| tri[(i + 2) % 3])
}

fn corner_angle(at: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let (da, db) = (a - at, b - at);
    let denom = da.norm() * db.norm();
    if denom < f64::EPSILON {
        return 0.0;
    }
    (da.dot(&db) / denom).clamp(-1.0, 1.0).acos()
}

/// Flip interior patch edges whose opposite angles sum to more than π.
/// Returns the number of flips.
fn flip_edges(
    positions: &[Point3<f64>],
    triangles: &mut [[u32; 3]],
    blocked: &impl Fn(u32, u32) -> bool,
) -> usize {
    let mut owner: HashMap<(u32, u32), usize> = HashMap::with_capacity(triangles.len() * 3);
    for (t, &[a, b, c]) in triangles.iter().enumerate() {
        for e in [(a, b), (b, c), (c, a)] {
            owner.insert(e, t);
        }
    }
    let normal_of = |tri: &[u32; 3]| {
        Triangle::new(
            positions[tri[0] as usize],
            positions[tri[1] as usize],
            positions[tri[2] as usize],
        )
        .normal_unnormalized()
    };

    let mut total = 0;
    for _ in 0..MAX_FLIP_SWEEPS {
        let mut edges: Vec<(u32, u32)> = owner.keys().filter(|(u, w)| u < w).copied().collect();
        edges.sort_unstable();

        let mut flipped = 0;
        for (u, w) in edges {
            let (Some(&t), Some(&s)) = (owner.get(&(u, w)), owner.get(&(w, u))) else {
                continue;
            };
            let (Some(p), Some(q)) = (apex(&triangles[t], u, w), apex(&triangles[s], w, u)) else {
                continue;
            };
            if p == q || owner.contains_key(&(p, q)) || owner.contains_key(&(q, p)) || blocked(p, q) {
                continue;
            }

            let pos = |i: u32| &positions[i as usize];
            let opposite = corner_angle(pos(p), pos(u), pos(w)) + corner_angle(pos(q), pos(w), pos(u));
            if opposite <= PI + 1e-9 {
                continue;
            }

            let facing = normal_of(&triangles[t]) + normal_of(&triangles[s]);
            let (nt, ns) = ([p, u, q], [q, w, p]);
            if normal_of(&nt).dot(&facing) <= 0.0 || normal_of(&ns).dot(&facing) <= 0.0 {
                continue;
            }

            owner.remove(&(u, w));
            owner.remove(&(w, u));
            triangles[t] = nt;
            triangles[s] = ns;
            for e in [(p, u), (u, q), (q, p)] {
                owner.insert(e, t);
            }
            for e in [(q, w), (w, p), (p, q)] {
                owner.insert(e, s);
            }
            flipped += 1;
        }

        total += flipped;
        if flipped == 0 {
            break;
        }
    }
    total
}

/// Jacobi iterations of the uniform Laplacian over vertices `n..`, with the
/// boundary `0..n` fixed. True once an iteration moves no vertex farther than
/// `tolerance`; a patch without interior vertices is trivially faired.
fn fair(
    positions: &mut [Point3<f64>],
    triangles: &[[u32; 3]],
    n: usize,
    iterations: usize,
    tolerance: f64,
) -> bool {
    let interior = positions.len() - n;
    if interior == 0 {
        return true;
    }

    let mut neighbours: Vec<Vec<u32>> = vec![Vec::new(); interior];
    for &[a, b, c] in triangles {
        for (u, w) in [(a, b), (b, c), (c, a)] {
            if u as usize >= n {
                neighbours[u as usize - n].push(w);
            }
            if w as usize >= n {
                neighbours[w as usize - n].push(u);
            }
        }
    }
    for list in &mut neighbours {
        list.sort_unstable();
        list.dedup();
    }

    let mut updated = vec![Point3::origin(); interior];
    for iteration in 0..iterations {
        let mut max_move: f64 = 0.0;
        for (j, list) in neighbours.iter().enumerate() {
            let sum = list
                .iter()
                .fold(Vector3::zeros(), |acc, &k| acc + positions[k as usize].coords);
            let avg = Point3::from(sum / list.len().max(1) as f64);
            max_move = max_move.max((avg - positions[n + j]).norm());
            updated[j] = avg;
        }
        positions[n..].copy_from_slice(&updated);

        if max_move < tolerance {
            trace!(iteration, max_move, "Fairing converged");
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::extract_boundary_cycles;
    use crate::types::Mesh;

    fn grid_with_hole() -> Mesh {
        // 4x4 cells with the centre 2x2 block removed.
        let n = 4u32;
        let w = n + 1;
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for j in 0..n {
            for i in 0..n {
                if (1..3).contains(&i) && (1..3).contains(&j) {
                    continue;
                }
                let a = j * w + i;
                faces.push([a, a + 1, a + w + 1]);
                faces.push([a, a + w + 1, a + w]);
            }
        }
        Mesh::from_parts(positions, faces)
    }

    fn inner_loop(hm: &HalfEdgeMesh) -> BoundaryLoop {
        extract_boundary_cycles(hm)
            .into_iter()
            .find(|l| l.edge_count(hm) == 8)
            .unwrap()
    }

    #[test]
    fn test_triangulate_only_uses_boundary_vertices() {
        let mut hm = HalfEdgeMesh::from_mesh(&grid_with_hole()).unwrap();
        let hole = inner_loop(&hm);
        let mut filler = TriangulateRefineFair::new(FillParams::triangulate_only());
        let patch = filler.fill(&mut hm, &hole).unwrap();

        assert!(patch.new_vertices.is_empty());
        assert_eq!(patch.new_faces.len(), 6);
        assert!(patch.faired);
        assert_eq!(hm.boundary_halfedge_count(), 16);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_refined_patch_stays_in_plane() {
        let mut hm = HalfEdgeMesh::from_mesh(&grid_with_hole()).unwrap();
        let hole = inner_loop(&hm);
        let mut filler = TriangulateRefineFair::default();
        let patch = filler.fill(&mut hm, &hole).unwrap();

        assert!(!patch.new_vertices.is_empty());
        assert!(patch.faired);
        for &v in &patch.new_vertices {
            let p = hm.position(v);
            assert!(p.z.abs() < 1e-12);
            assert!((1.0..=3.0).contains(&p.x) && (1.0..=3.0).contains(&p.y));
        }
        assert_eq!(hm.boundary_halfedge_count(), 16);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_avoids_diagonal_already_in_mesh() {
        // The whole boundary of a two-triangle quad; the quad's own diagonal 0-2
        // must not be reused.
        let mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let mut hm = HalfEdgeMesh::from_mesh(&mesh).unwrap();
        let hole = extract_boundary_cycles(&hm)[0];
        let mut filler = TriangulateRefineFair::new(FillParams::triangulate_only());
        filler.fill(&mut hm, &hole).unwrap();

        assert_eq!(hm.face_count(), 4);
        assert!(hm.find_halfedge(VertexId(1), VertexId(3)).is_some());
        assert_eq!(hm.boundary_halfedge_count(), 0);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_fills_loop_through_shared_vertex() {
        // Cells (1, 1) and (2, 2) of a 4x4 grid removed: the two square holes
        // meet at vertex 12 and form one loop that passes through it twice.
        let w = 5u32;
        let mut positions = Vec::new();
        for j in 0..w {
            for i in 0..w {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let mut faces = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                if (i, j) == (1, 1) || (i, j) == (2, 2) {
                    continue;
                }
                let a = j * w + i;
                faces.push([a, a + 1, a + w + 1]);
                faces.push([a, a + w + 1, a + w]);
            }
        }
        let mut hm = HalfEdgeMesh::from_mesh(&Mesh::from_parts(positions, faces)).unwrap();
        let hole = inner_loop(&hm);
        assert_eq!(
            hole.vertices(&hm).iter().filter(|&&v| v == VertexId(12)).count(),
            2
        );

        let patch = TriangulateRefineFair::new(FillParams::triangulate_only())
            .fill(&mut hm, &hole)
            .unwrap();
        assert!(patch.new_vertices.is_empty());
        assert_eq!(patch.new_faces.len(), 4);
        // Only the outer rim is left open.
        assert_eq!(hm.boundary_halfedge_count(), 16);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_refined_fill_through_shared_vertex() {
        let w = 5u32;
        let positions: Vec<_> = (0..w)
            .flat_map(|j| (0..w).map(move |i| Point3::new(i as f64, j as f64, 0.0)))
            .collect();
        let mut faces = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                if (i, j) != (1, 1) && (i, j) != (2, 2) {
                    let a = j * w + i;
                    faces.push([a, a + 1, a + w + 1]);
                    faces.push([a, a + w + 1, a + w]);
                }
            }
        }
        let mut hm = HalfEdgeMesh::from_mesh(&Mesh::from_parts(positions, faces)).unwrap();
        let hole = inner_loop(&hm);
        let params = FillParams {
            density: 4.0,
            ..Default::default()
        };
        let patch = TriangulateRefineFair::new(params).fill(&mut hm, &hole).unwrap();
        assert!(!patch.new_vertices.is_empty());
        assert_eq!(hm.boundary_halfedge_count(), 16);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_split_ring_at_repeated_vertex() {
        let ring: Vec<VertexId> = [12, 7, 6, 11, 12, 17, 18, 13].map(VertexId).to_vec();
        let polygons = split_at_repeated_vertices(&ring);
        assert_eq!(polygons, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);

        let simple: Vec<VertexId> = (0..5).map(VertexId).collect();
        assert_eq!(split_at_repeated_vertices(&simple), vec![vec![0, 1, 2, 3, 4]]);

        // The repeat is found mid-ring; the remainder wraps back to the start.
        let ring: Vec<VertexId> = [1, 2, 3, 4, 2, 5, 6].map(VertexId).to_vec();
        assert_eq!(split_at_repeated_vertices(&ring), vec![vec![1, 2, 3], vec![0, 4, 5, 6]]);
    }

    #[test]
    fn test_ear_clip_concave_polygon() {
        // L-shaped hexagon, counter-clockwise.
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let normal = hole_normal(&pts);
        assert!(normal.z > 0.0);
        let tris = ear_clip(&pts, &[0, 1, 2, 3, 4, 5], &normal, &|_, _| false);
        assert_eq!(tris.len(), 4);
        let area: f64 = tris
            .iter()
            .map(|t| Triangle::new(pts[t[0] as usize], pts[t[1] as usize], pts[t[2] as usize]).area())
            .sum();
        assert!((area - 3.0).abs() < 1e-12);
        for t in &tris {
            let tri = Triangle::new(pts[t[0] as usize], pts[t[1] as usize], pts[t[2] as usize]);
            assert!(tri.normal_unnormalized().z > 0.0);
        }
    }

    #[test]
    fn test_fair_relaxes_to_average() {
        // One interior vertex surrounded by a square, started off-centre.
        let mut positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.3, 1.7, 0.5),
        ];
        let tris = [[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
        assert!(fair(&mut positions, &tris, 4, 10, 1e-9));
        assert!((positions[4] - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
        assert!(!fair(&mut positions.clone(), &tris, 4, 0, 1e-9));
    }

    #[test]
    fn test_params_validation() {
        assert!(FillParams::default().validate().is_ok());
        let bad = FillParams {
            density: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(MeshError::InvalidParameter { name: "density", .. })
        ));
    }
}
