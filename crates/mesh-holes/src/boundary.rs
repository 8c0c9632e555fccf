//! Boundary loop extraction.
//!
//! A boundary loop is a `next` cycle of boundary half-edges. It is identified
//! by any one of its half-edges; two representatives name the same loop iff a
//! walk from one reaches the other.

use tracing::debug;

use crate::halfedge::{HalfEdgeId, HalfEdgeMesh, VertexId};

/// How the repair pass finds loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryStrategy {
    /// Enumerate every loop up front, then process them in order. No walk is
    /// repeated and mutation never affects what is visited.
    #[default]
    CycleFirst,
    /// Visit half-edge ids `0..n`, with `n` fixed before the first patch, and
    /// treat every half-edge that is still on a boundary when reached as a
    /// discovery point. Half-edges added by patches are never visited. A loop
    /// is discovered once per half-edge, so a duplicate guard is required.
    LiveScan,
}

impl std::str::FromStr for DiscoveryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cycle-first" | "cycle_first" | "cycles" => Ok(Self::CycleFirst),
            "live-scan" | "live_scan" | "scan" => Ok(Self::LiveScan),
            other => Err(format!(
                "unknown discovery strategy '{}' (expected cycle-first or live-scan)",
                other
            )),
        }
    }
}

/// Handle to one hole boundary.
///
/// Only valid until a patch is stitched into the loop it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryLoop {
    pub representative: HalfEdgeId,
}

impl BoundaryLoop {
    #[inline]
    pub fn new(representative: HalfEdgeId) -> Self {
        Self { representative }
    }

    /// Walk the loop starting at the representative.
    pub fn walk<'a>(&self, mesh: &'a HalfEdgeMesh) -> LoopWalk<'a> {
        LoopWalk::new(mesh, self.representative)
    }

    /// Half-edges of the loop in `next` order.
    pub fn halfedges(&self, mesh: &HalfEdgeMesh) -> Vec<HalfEdgeId> {
        self.walk(mesh).collect()
    }

    /// Source vertex of each loop half-edge, in `next` order.
    pub fn vertices(&self, mesh: &HalfEdgeMesh) -> Vec<VertexId> {
        self.walk(mesh).map(|h| mesh.source(h)).collect()
    }

    /// Number of half-edges on the loop.
    pub fn edge_count(&self, mesh: &HalfEdgeMesh) -> usize {
        self.walk(mesh).count()
    }
}

/// Iterator over the half-edges of one `next` cycle.
///
/// Bounded by the arena size, so a stale or corrupted handle cannot spin.
#[derive(Debug, Clone)]
pub struct LoopWalk<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
    remaining: usize,
}

impl<'a> LoopWalk<'a> {
    fn new(mesh: &'a HalfEdgeMesh, start: HalfEdgeId) -> Self {
        Self {
            mesh,
            start,
            current: (!start.is_null()).then_some(start),
            remaining: mesh.halfedge_count(),
        }
    }
}

impl Iterator for LoopWalk<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<HalfEdgeId> {
        let cur = self.current?;
        if self.remaining == 0 {
            self.current = None;
            return None;
        }
        self.remaining -= 1;
        let next = self.mesh.next(cur);
        self.current = (next != self.start && !next.is_null()).then_some(next);
        Some(cur)
    }
}

/// Every boundary loop of the mesh, one representative each.
///
/// Each boundary half-edge belongs to exactly one reported loop. Loops are
/// ordered by their lowest half-edge id, which is also the representative.
/// A closed mesh yields an empty list.
pub fn extract_boundary_cycles(mesh: &HalfEdgeMesh) -> Vec<BoundaryLoop> {
    let mut visited = vec![false; mesh.halfedge_count()];
    let mut loops = Vec::new();
    let mut boundary_halfedges = 0usize;

    for he in mesh.halfedge_ids() {
        if visited[he.index()] || !mesh.is_boundary(he) {
            continue;
        }
        let cycle = BoundaryLoop::new(he);
        for h in cycle.walk(mesh) {
            visited[h.index()] = true;
            boundary_halfedges += 1;
        }
        loops.push(cycle);
    }

    debug!(
        loops = loops.len(),
        boundary_halfedges, "Extracted boundary loops"
    );
    loops
}
