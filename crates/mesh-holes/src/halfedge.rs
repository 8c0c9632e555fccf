//! Arena half-edge mesh.
//!
//! Vertices, half-edges and faces live in append-only vectors addressed by
//! `u32` newtype ids. Nothing is ever removed or renumbered, so an id handed out
//! before a hole is patched stays valid afterwards, and so does the relative
//! order of every id below the arena length at any earlier point.
//!
//! Every half-edge has an opposite. Half-edges on an open boundary carry
//! [`FaceId::NULL`] and are chained through `next`/`prev` around the hole they
//! border. At a vertex where several boundary fans meet, each incoming boundary
//! half-edge is paired with the outgoing one of the same fan, so the boundary
//! `next` relation is a permutation and every walk closes.

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::types::{Mesh, Vertex};

const NULL_ID: u32 = u32::MAX;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Sentinel for "no element".
            pub const NULL: $name = $name(NULL_ID);

            #[inline]
            pub fn is_null(self) -> bool {
                self.0 == NULL_ID
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_null() {
                    write!(f, "{}(NULL)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }
        }
    };
}

arena_id!(
    /// Index of a vertex in the arena.
    VertexId
);
arena_id!(
    /// Index of a half-edge in the arena.
    HalfEdgeId
);
arena_id!(
    /// Index of a face in the arena.
    FaceId
);

/// One directed side of an edge.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Vertex this half-edge points to.
    pub target: VertexId,
    /// Same edge, opposite direction.
    pub opposite: HalfEdgeId,
    /// Next half-edge around the face, or around the hole for boundary half-edges.
    pub next: HalfEdgeId,
    pub prev: HalfEdgeId,
    /// Owning face, `NULL` on a boundary.
    pub face: FaceId,
}

impl HalfEdge {
    fn dangling(target: VertexId, face: FaceId) -> Self {
        Self {
            target,
            opposite: HalfEdgeId::NULL,
            next: HalfEdgeId::NULL,
            prev: HalfEdgeId::NULL,
            face,
        }
    }
}

/// Triangle mesh with explicit half-edge connectivity.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    vertices: Vec<Vertex>,
    halfedges: Vec<HalfEdge>,
    /// One half-edge per face.
    faces: Vec<HalfEdgeId>,
    /// Directed edge (source, target) to half-edge, boundary half-edges included.
    edges: HashMap<(VertexId, VertexId), HalfEdgeId>,
}

impl HalfEdgeMesh {
    /// Build connectivity for an indexed triangle mesh.
    ///
    /// Fails with [`MeshError::InvalidTopology`] if a face repeats a vertex or a
    /// directed edge is used by two faces (non-manifold edge or inconsistent
    /// orientation). Vertices not used by any face are kept.
    pub fn from_mesh(mesh: &Mesh) -> MeshResult<Self> {
        let vertex_count = mesh.vertices.len();
        let mut hm = Self {
            vertices: mesh.vertices.clone(),
            halfedges: Vec::with_capacity(mesh.faces.len() * 3 + mesh.faces.len() / 4),
            faces: Vec::with_capacity(mesh.faces.len()),
            edges: HashMap::with_capacity(mesh.faces.len() * 3),
        };

        for (face_index, face) in mesh.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(MeshError::InvalidVertexIndex {
                    face_index,
                    vertex_index: bad,
                    vertex_count,
                });
            }
            let [a, b, c] = *face;
            if a == b || b == c || c == a {
                return Err(MeshError::invalid_topology(
                    format!("face {} repeats a vertex: [{}, {}, {}]", face_index, a, b, c),
                    None,
                ));
            }

            let fid = FaceId(hm.faces.len() as u32);
            let corners = [VertexId(a), VertexId(b), VertexId(c)];
            let base = hm.halfedges.len() as u32;
            for i in 0..3 {
                let (src, dst) = (corners[i], corners[(i + 1) % 3]);
                let he = HalfEdgeId(base + i as u32);
                if hm.edges.insert((src, dst), he).is_some() {
                    return Err(MeshError::invalid_topology(
                        format!(
                            "directed edge {} -> {} is used by more than one face (face {})",
                            src.0, dst.0, face_index
                        ),
                        Some((src.0, dst.0)),
                    ));
                }
                let mut half = HalfEdge::dangling(dst, fid);
                half.next = HalfEdgeId(base + ((i + 1) % 3) as u32);
                half.prev = HalfEdgeId(base + ((i + 2) % 3) as u32);
                hm.halfedges.push(half);
            }
            hm.faces.push(HalfEdgeId(base));
        }

        // Pair interior half-edges, create boundary half-edges for the rest.
        let interior_count = hm.halfedges.len();
        for i in 0..interior_count {
            let he = HalfEdgeId(i as u32);
            if !hm.halfedges[i].opposite.is_null() {
                continue;
            }
            let (src, dst) = (hm.target(hm.prev(he)), hm.target(he));
            let twin = match hm.edges.get(&(dst, src)) {
                Some(&twin) => twin,
                None => {
                    let twin = HalfEdgeId(hm.halfedges.len() as u32);
                    hm.halfedges.push(HalfEdge::dangling(src, FaceId::NULL));
                    hm.edges.insert((dst, src), twin);
                    twin
                }
            };
            hm.halfedges[i].opposite = twin;
            hm.halfedges[twin.index()].opposite = he;
        }

        hm.link_boundary(interior_count)?;

        debug!(
            vertices = hm.vertex_count(),
            faces = hm.face_count(),
            halfedges = hm.halfedge_count(),
            boundary_halfedges = hm.halfedge_count() - interior_count,
            "Built half-edge mesh"
        );
        Ok(hm)
    }

    /// Chain the boundary half-edges created after `first_boundary` into loops.
    fn link_boundary(&mut self, first_boundary: usize) -> MeshResult<()> {
        let limit = self.halfedges.len();
        for i in first_boundary..self.halfedges.len() {
            let incoming = HalfEdgeId(i as u32);
            let outgoing = self.fan_exit(incoming, limit)?;
            self.halfedges[i].next = outgoing;
            self.halfedges[outgoing.index()].prev = incoming;
        }
        Ok(())
    }

    /// Rotate around the target of boundary half-edge `incoming` through the
    /// faces of its fan until the outgoing boundary half-edge is reached.
    fn fan_exit(&self, incoming: HalfEdgeId, limit: usize) -> MeshResult<HalfEdgeId> {
        let mut h = self.opposite(incoming);
        for _ in 0..limit {
            let out = self.opposite(self.prev(h));
            if self.is_boundary(out) {
                return Ok(out);
            }
            h = out;
        }
        let v = self.target(incoming);
        Err(MeshError::invalid_topology(
            format!("no boundary exit around vertex {}", v.0),
            None,
        ))
    }

    /// Convert back to an indexed triangle mesh.
    ///
    /// Vertex and face order follow the arena, so ids map directly onto indices.
    pub fn to_mesh(&self) -> Mesh {
        let faces = (0..self.faces.len())
            .map(|f| {
                let [a, b, c] = self.face_vertices(FaceId(f as u32));
                [a.0, b.0, c.0]
            })
            .collect();
        Mesh {
            vertices: self.vertices.clone(),
            faces,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn halfedge_count(&self) -> usize {
        self.halfedges.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Half-edge ids in arena order.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + use<> {
        (0..self.halfedges.len() as u32).map(HalfEdgeId)
    }

    #[inline]
    pub fn halfedge(&self, he: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[he.index()]
    }

    #[inline]
    pub fn target(&self, he: HalfEdgeId) -> VertexId {
        self.halfedges[he.index()].target
    }

    #[inline]
    pub fn source(&self, he: HalfEdgeId) -> VertexId {
        self.target(self.opposite(he))
    }

    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[he.index()].next
    }

    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[he.index()].prev
    }

    #[inline]
    pub fn opposite(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[he.index()].opposite
    }

    #[inline]
    pub fn face(&self, he: HalfEdgeId) -> FaceId {
        self.halfedges[he.index()].face
    }

    /// True if the half-edge borders a hole.
    #[inline]
    pub fn is_boundary(&self, he: HalfEdgeId) -> bool {
        self.face(he).is_null()
    }

    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertices[v.index()].position
    }

    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.vertices[v.index()]
    }

    /// Half-edge from `src` to `dst`, if the edge exists in that direction.
    #[inline]
    pub fn find_halfedge(&self, src: VertexId, dst: VertexId) -> Option<HalfEdgeId> {
        self.edges.get(&(src, dst)).copied()
    }

    /// The three corners of a face in winding order.
    pub fn face_vertices(&self, f: FaceId) -> [VertexId; 3] {
        let h0 = self.faces[f.index()];
        let h1 = self.next(h0);
        [self.source(h0), self.target(h0), self.target(h1)]
    }

    /// Number of half-edges currently on a boundary.
    pub fn boundary_halfedge_count(&self) -> usize {
        self.halfedges.iter().filter(|h| h.face.is_null()).count()
    }

    /// Splice a triangulated patch into a hole.
    ///
    /// `hole` lists the boundary half-edges of one loop in `next` order. Local
    /// vertex `i < hole.len()` is the source of `hole[i]`; local vertex
    /// `hole.len() + j` is `new_positions[j]`. Triangles must wind so that each
    /// hole half-edge appears as a triangle edge in its own direction.
    ///
    /// The patch is checked completely before the arena is touched. It must
    /// cover every hole half-edge exactly once, every other edge it uses must
    /// appear in both directions inside the patch, and no diagonal between two
    /// hole vertices may coincide with an edge already in the mesh.
    ///
    /// Returns the ids of the appended vertices and faces.
    pub fn stitch_patch(
        &mut self,
        hole: &[HalfEdgeId],
        new_positions: &[Point3<f64>],
        triangles: &[[u32; 3]],
    ) -> MeshResult<(Vec<VertexId>, Vec<FaceId>)> {
        self.check_patch(hole, new_positions.len(), triangles)?;

        let n = hole.len();
        let first_new = self.vertices.len() as u32;
        let resolve = |local: u32, mesh: &Self| -> VertexId {
            let local = local as usize;
            if local < n {
                mesh.source(hole[local])
            } else {
                VertexId(first_new + (local - n) as u32)
            }
        };

        let new_vertices: Vec<VertexId> = new_positions
            .iter()
            .map(|p| {
                let id = VertexId(self.vertices.len() as u32);
                self.vertices.push(Vertex::new(*p));
                id
            })
            .collect();

        let mut created = Vec::new();
        let mut new_faces = Vec::with_capacity(triangles.len());
        for tri in triangles {
            let fid = FaceId(self.faces.len() as u32);
            let corners = tri.map(|l| resolve(l, self));
            let mut ring = [HalfEdgeId::NULL; 3];
            for i in 0..3 {
                let (src, dst) = (corners[i], corners[(i + 1) % 3]);
                ring[i] = match self.edges.get(&(src, dst)) {
                    Some(&existing) => existing,
                    None => {
                        let he = HalfEdgeId(self.halfedges.len() as u32);
                        self.halfedges.push(HalfEdge::dangling(dst, fid));
                        self.edges.insert((src, dst), he);
                        created.push((he, src, dst));
                        he
                    }
                };
            }
            for i in 0..3 {
                let half = &mut self.halfedges[ring[i].index()];
                half.face = fid;
                half.next = ring[(i + 1) % 3];
                half.prev = ring[(i + 2) % 3];
            }
            self.faces.push(ring[0]);
            new_faces.push(fid);
        }

        for (he, src, dst) in created {
            let twin = self.edges.get(&(dst, src)).copied().ok_or_else(|| {
                MeshError::hole_fill_failed(format!("patch edge {} -> {} has no twin", src.0, dst.0))
            })?;
            self.halfedges[he.index()].opposite = twin;
        }

        Ok((new_vertices, new_faces))
    }

    fn check_patch(
        &self,
        hole: &[HalfEdgeId],
        new_vertex_count: usize,
        triangles: &[[u32; 3]],
    ) -> MeshResult<()> {
        let n = hole.len();
        if n < 3 {
            return Err(MeshError::hole_fill_failed(format!(
                "hole has {} edges, at least 3 are required",
                n
            )));
        }
        if let Some(&he) = hole.iter().find(|&&he| !self.is_boundary(he)) {
            return Err(MeshError::hole_fill_failed(format!(
                "{} is not a boundary half-edge",
                he
            )));
        }
        for (i, &he) in hole.iter().enumerate() {
            if self.next(he) != hole[(i + 1) % n] {
                return Err(MeshError::hole_fill_failed(
                    "hole half-edges are not in boundary order",
                ));
            }
        }

        // Patch edges are compared as vertex pairs: a hole that passes through
        // the same vertex twice gives that vertex two local indices.
        let local_count = (n + new_vertex_count) as u32;
        let first_new = self.vertices.len() as u32;
        let resolve = |local: u32| -> VertexId {
            if (local as usize) < n {
                self.source(hole[local as usize])
            } else {
                VertexId(first_new + local - n as u32)
            }
        };
        let mut directed: HashMap<(VertexId, VertexId), usize> = HashMap::with_capacity(triangles.len() * 3);
        for (t, tri) in triangles.iter().enumerate() {
            let [a, b, c] = *tri;
            if tri.iter().any(|&l| l >= local_count) {
                return Err(MeshError::hole_fill_failed(format!(
                    "patch triangle {} is malformed: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
            let [a, b, c] = tri.map(resolve);
            if a == b || b == c || c == a {
                return Err(MeshError::hole_fill_failed(format!(
                    "patch triangle {} is degenerate: [{}, {}, {}]",
                    t, a.0, b.0, c.0
                )));
            }
            for (u, w) in [(a, b), (b, c), (c, a)] {
                if directed.insert((u, w), t).is_some() {
                    return Err(MeshError::hole_fill_failed(format!(
                        "patch uses edge {} -> {} twice",
                        u.0, w.0
                    )));
                }
            }
        }

        let hole_edges: HashSet<(VertexId, VertexId)> =
            hole.iter().map(|&he| (self.source(he), self.target(he))).collect();
        for (i, edge) in hole.iter().map(|&he| (self.source(he), self.target(he))).enumerate() {
            if !directed.contains_key(&edge) {
                return Err(MeshError::hole_fill_failed(format!(
                    "patch leaves hole edge {} uncovered",
                    i
                )));
            }
        }
        for &(u, w) in directed.keys() {
            if hole_edges.contains(&(u, w)) {
                continue;
            }
            if !directed.contains_key(&(w, u)) {
                return Err(MeshError::hole_fill_failed(format!(
                    "patch edge {} -> {} would open a new boundary",
                    u.0, w.0
                )));
            }
            if u.0 < first_new && w.0 < first_new && self.edges.contains_key(&(u, w)) {
                return Err(MeshError::hole_fill_failed(format!(
                    "diagonal {} -> {} duplicates an existing mesh edge",
                    u.0, w.0
                )));
            }
        }
        Ok(())
    }

    /// Verify the structural invariants of the arena.
    ///
    /// Opposites are involutive and reverse direction, `next`/`prev` are
    /// inverse, faces are triangles and boundary `next` stays on the boundary.
    pub fn check_consistency(&self) -> MeshResult<()> {
        let fail = |msg: String| Err(MeshError::invalid_topology(msg, None));
        for he in self.halfedge_ids() {
            let h = self.halfedge(he);
            if h.opposite.is_null() || self.opposite(h.opposite) != he {
                return fail(format!("{} has a broken opposite", he));
            }
            if self.target(h.opposite) == h.target {
                return fail(format!("{} and its opposite share a target", he));
            }
            if h.next.is_null() || self.prev(h.next) != he {
                return fail(format!("{} has a broken next/prev link", he));
            }
            if self.face(h.next) != h.face {
                return fail(format!("{} leaves its face through next", he));
            }
            if self.source(h.next) != h.target {
                return fail(format!("{} is not continued at its target", he));
            }
            if self.find_halfedge(self.source(he), h.target) != Some(he) {
                return fail(format!("{} is missing from the edge index", he));
            }
        }
        for f in 0..self.faces.len() {
            let h0 = self.faces[f];
            if self.next(self.next(self.next(h0))) != h0 {
                return fail(format!("face {} is not a triangle", f));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn tetrahedron() -> Mesh {
        Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
        )
    }

    #[test]
    fn test_build_quad() {
        let hm = HalfEdgeMesh::from_mesh(&quad()).unwrap();
        assert_eq!(hm.face_count(), 2);
        assert_eq!(hm.halfedge_count(), 10);
        assert_eq!(hm.boundary_halfedge_count(), 4);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_closed_mesh_has_no_boundary() {
        let hm = HalfEdgeMesh::from_mesh(&tetrahedron()).unwrap();
        assert_eq!(hm.halfedge_count(), 12);
        assert_eq!(hm.boundary_halfedge_count(), 0);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_boundary_runs_against_faces() {
        let hm = HalfEdgeMesh::from_mesh(&quad()).unwrap();
        let he = hm.find_halfedge(VertexId(1), VertexId(0)).unwrap();
        assert!(hm.is_boundary(he));
        assert_eq!(hm.target(hm.next(he)), VertexId(3));
    }

    #[test]
    fn test_round_trip_preserves_faces() {
        let mesh = quad();
        let back = HalfEdgeMesh::from_mesh(&mesh).unwrap().to_mesh();
        assert_eq!(back.faces, mesh.faces);
        assert_eq!(back.vertex_count(), mesh.vertex_count());
    }

    #[test]
    fn test_rejects_duplicate_directed_edge() {
        let mut mesh = quad();
        mesh.faces[1] = [0, 1, 3];
        let err = HalfEdgeMesh::from_mesh(&mesh).unwrap_err();
        assert!(matches!(
            err,
            MeshError::InvalidTopology {
                edge: Some((0, 1)),
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_repeated_corner() {
        let mut mesh = quad();
        mesh.faces[0] = [0, 0, 2];
        assert!(matches!(
            HalfEdgeMesh::from_mesh(&mesh),
            Err(MeshError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let mut mesh = quad();
        mesh.faces[1] = [0, 2, 9];
        assert!(matches!(
            HalfEdgeMesh::from_mesh(&mesh),
            Err(MeshError::InvalidVertexIndex { vertex_index: 9, .. })
        ));
    }

    #[test]
    fn test_bowtie_boundary_is_a_permutation() {
        // Two triangles touching only at vertex 0.
        let mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(-1.0, -1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        let hm = HalfEdgeMesh::from_mesh(&mesh).unwrap();
        hm.check_consistency().unwrap();

        let boundary: Vec<HalfEdgeId> = hm.halfedge_ids().filter(|&h| hm.is_boundary(h)).collect();
        let mut seen: Vec<HalfEdgeId> = boundary.iter().map(|&h| hm.next(h)).collect();
        seen.sort();
        let mut expected = boundary.clone();
        expected.sort();
        assert_eq!(seen, expected);

        // Each fan closes on its own: three steps return to the start.
        for &h in &boundary {
            assert_eq!(hm.next(hm.next(hm.next(h))), h);
        }
    }

    #[test]
    fn test_stitch_single_triangle_hole() {
        // Tetrahedron with one face removed leaves a triangular hole.
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        let mut hm = HalfEdgeMesh::from_mesh(&mesh).unwrap();
        let start = hm.halfedge_ids().find(|&h| hm.is_boundary(h)).unwrap();
        let hole = vec![start, hm.next(start), hm.next(hm.next(start))];

        let (verts, faces) = hm.stitch_patch(&hole, &[], &[[0, 1, 2]]).unwrap();
        assert!(verts.is_empty());
        assert_eq!(faces.len(), 1);
        assert_eq!(hm.boundary_halfedge_count(), 0);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_stitch_with_interior_vertex() {
        let mut hm = HalfEdgeMesh::from_mesh(&quad()).unwrap();
        let start = hm.find_halfedge(VertexId(1), VertexId(0)).unwrap();
        let hole = vec![start, hm.next(start), hm.next(hm.next(start)), hm.prev(start)];
        let centre = Point3::new(0.5, 0.5, -0.1);
        let tris = [[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];

        let ids_before = hm.halfedge_count();
        let (verts, faces) = hm.stitch_patch(&hole, &[centre], &tris).unwrap();
        assert_eq!(verts, vec![VertexId(4)]);
        assert_eq!(faces.len(), 4);
        assert_eq!(hm.boundary_halfedge_count(), 0);
        assert!(hm.halfedge_count() > ids_before);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_stitch_rejects_partial_patch_without_mutation() {
        let mut hm = HalfEdgeMesh::from_mesh(&quad()).unwrap();
        let start = hm.find_halfedge(VertexId(1), VertexId(0)).unwrap();
        let hole = vec![start, hm.next(start), hm.next(hm.next(start)), hm.prev(start)];
        let before = (hm.vertex_count(), hm.halfedge_count(), hm.face_count());

        let err = hm.stitch_patch(&hole, &[], &[[0, 1, 2]]).unwrap_err();
        assert!(matches!(err, MeshError::HoleFillFailed { .. }));
        assert_eq!(before, (hm.vertex_count(), hm.halfedge_count(), hm.face_count()));
    }

    #[test]
    fn test_stitch_rejects_existing_diagonal() {
        // The quad's hole, filled across the diagonal 0-2 that the quad already uses.
        let mut hm = HalfEdgeMesh::from_mesh(&quad()).unwrap();
        let start = hm.find_halfedge(VertexId(1), VertexId(0)).unwrap();
        let hole = vec![start, hm.next(start), hm.next(hm.next(start)), hm.prev(start)];
        // Local 1 is vertex 0 and local 3 is vertex 2.
        let err = hm
            .stitch_patch(&hole, &[], &[[0, 1, 3], [1, 2, 3]])
            .unwrap_err();
        assert!(err.to_string().contains("duplicates an existing mesh edge"));
        hm.check_consistency().unwrap();
    }

    /// 4x4 grid of unit cells with cells (1, 1) and (2, 2) removed. The two
    /// holes touch at vertex 12.
    fn grid_with_diagonal_holes() -> Mesh {
        let v = |i: u32, j: u32| j * 5 + i;
        let positions = (0..5).flat_map(|j| (0..5).map(move |i| Point3::new(i as f64, j as f64, 0.0)));
        let mut faces = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                if (i, j) == (1, 1) || (i, j) == (2, 2) {
                    continue;
                }
                faces.push([v(i, j), v(i + 1, j), v(i + 1, j + 1)]);
                faces.push([v(i, j), v(i + 1, j + 1), v(i, j + 1)]);
            }
        }
        Mesh::from_parts(positions, faces)
    }

    #[test]
    fn test_build_grid_with_interior_edges() {
        let hm = HalfEdgeMesh::from_mesh(&grid_with_diagonal_holes()).unwrap();
        assert_eq!(hm.face_count(), 28);
        // Outer rim plus both holes.
        assert_eq!(hm.boundary_halfedge_count(), 16 + 8);
        hm.check_consistency().unwrap();
    }

    #[test]
    fn test_stitch_patch_through_pinch_vertex() {
        let mut hm = HalfEdgeMesh::from_mesh(&grid_with_diagonal_holes()).unwrap();
        let start = hm
            .halfedge_ids()
            .find(|&h| hm.is_boundary(h) && hm.source(h) == VertexId(6))
            .unwrap();
        let mut hole = vec![start];
        while hm.next(*hole.last().unwrap()) != start {
            hole.push(hm.next(*hole.last().unwrap()));
        }
        assert_eq!(hole.len(), 8);

        // Vertex 12 opens both squares; each square is closed by two triangles.
        let pinch: Vec<u32> = (0..8).filter(|&i| hm.source(hole[i as usize]) == VertexId(12)).collect();
        assert_eq!(pinch.len(), 2);
        let square = |first: u32| [first, (first + 1) % 8, (first + 2) % 8, (first + 3) % 8];
        let mut tris = Vec::new();
        for [a, b, c, d] in pinch.iter().map(|&p| square(p)) {
            tris.push([a, b, c]);
            tris.push([a, c, d]);
        }

        let (verts, faces) = hm.stitch_patch(&hole, &[], &tris).unwrap();
        assert!(verts.is_empty());
        assert_eq!(faces.len(), 4);
        assert_eq!(hm.boundary_halfedge_count(), 16);
        hm.check_consistency().unwrap();
    }
}
