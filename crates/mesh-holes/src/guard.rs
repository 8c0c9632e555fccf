//! Guard against judging the same hole twice in one repair pass.

use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::trace;

use crate::boundary::BoundaryLoop;
use crate::classify::{HoleSizer, HoleThresholds, Verdict, classify};
use crate::halfedge::{HalfEdgeId, HalfEdgeMesh};

/// What the guard remembers about holes it has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Remember every boundary point. A hole touching a point remembered from
    /// an earlier hole is skipped, which also skips holes that share a vertex
    /// with an earlier one. A boundary passing through the same vertex twice
    /// does not count against itself.
    #[default]
    SharedVertex,
    /// Remember every half-edge of each admitted hole. Only a rediscovery of the
    /// same cycle is skipped.
    Representative,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared-vertex" | "shared_vertex" | "vertex" => Ok(Self::SharedVertex),
            "representative" | "loop" => Ok(Self::Representative),
            other => Err(format!(
                "unknown duplicate policy '{}' (expected shared-vertex or representative)",
                other
            )),
        }
    }
}

/// Exact bit pattern of a point, with `-0.0` folded onto `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey([u64; 3]);

impl PointKey {
    pub fn new(p: &Point3<f64>) -> Self {
        let bits = |c: f64| if c == 0.0 { 0.0f64.to_bits() } else { c.to_bits() };
        Self([bits(p.x), bits(p.y), bits(p.z)])
    }
}

/// Points or half-edges already judged in the current pass. Only grows.
#[derive(Debug, Clone)]
pub struct ExaminedSet {
    policy: DuplicatePolicy,
    /// Point to the number of the hole that recorded it.
    points: HashMap<PointKey, u32>,
    halfedges: HashSet<HalfEdgeId>,
    holes: u32,
}

impl ExaminedSet {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            points: HashMap::new(),
            halfedges: HashSet::new(),
            holes: 0,
        }
    }

    #[inline]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Judge a newly discovered hole: `None` if it was already examined,
    /// otherwise its size verdict.
    ///
    /// Under [`DuplicatePolicy::SharedVertex`] the duplicate check and the
    /// size check share one walk. Each point is recorded as the walk reaches
    /// it, and the walk stops at the first point recorded by an earlier hole
    /// or as soon as the hole is too large. Points recorded before the stop
    /// stay recorded, so rejecting a large hole costs at most
    /// `max_edges + 1` steps.
    ///
    /// Under [`DuplicatePolicy::Representative`] a new hole is classified and
    /// then every half-edge of its cycle is recorded.
    pub fn judge(&mut self, mesh: &HalfEdgeMesh, hole: &BoundaryLoop, thresholds: &HoleThresholds) -> Option<Verdict> {
        self.holes += 1;
        match self.policy {
            DuplicatePolicy::SharedVertex => {
                let mut sizer = HoleSizer::new(thresholds);
                for he in hole.walk(mesh) {
                    let point = mesh.position(mesh.target(he));
                    match self.points.entry(PointKey::new(point)) {
                        Entry::Occupied(earlier) if *earlier.get() != self.holes => {
                            trace!(%he, hole = *earlier.get(), "Hole touches an examined point");
                            return None;
                        }
                        Entry::Occupied(_) => {}
                        Entry::Vacant(slot) => {
                            slot.insert(self.holes);
                        }
                    }
                    if let Some(reason) = sizer.push(point) {
                        trace!(%he, %reason, "Hole exceeds size limit");
                        return Some(Verdict::Reject(reason));
                    }
                }
                Some(sizer.verdict())
            }
            DuplicatePolicy::Representative => {
                if self.halfedges.contains(&hole.representative) {
                    return None;
                }
                let verdict = classify(mesh, hole, thresholds);
                self.halfedges.extend(hole.walk(mesh));
                Some(verdict)
            }
        }
    }

    /// Whether `hole` is new, recording it as examined. Same as
    /// [`judge`](Self::judge) with filtering off.
    pub fn admit(&mut self, mesh: &HalfEdgeMesh, hole: &BoundaryLoop) -> bool {
        self.judge(mesh, hole, &HoleThresholds::disabled()).is_some()
    }

    /// Number of recorded points or half-edges.
    pub fn len(&self) -> usize {
        self.points.len() + self.halfedges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
