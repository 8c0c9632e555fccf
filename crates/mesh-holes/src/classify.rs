//! Size classification of hole boundaries.
//!
//! A hole is small enough to patch when its boundary has at most
//! `max_edges` edges and the box around its vertices is no wider than
//! `max_diameter` along any axis. The walk stops at the first step where
//! either limit is exceeded, so very large openings (a scan's outer rim, the
//! open bottom of a bust) cost only `max_edges + 1` steps to reject.

use nalgebra::Point3;
use tracing::trace;

use crate::boundary::BoundaryLoop;
use crate::bounds::{Axis, HoleBox};
use crate::error::{MeshError, MeshResult};
use crate::halfedge::HalfEdgeMesh;

/// Size limits for holes that may be patched.
///
/// Both limits must be positive for the filter to apply. If either is zero or
/// negative, every hole is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleThresholds {
    /// Largest allowed extent of the hole's bounding box along any axis.
    pub max_diameter: f64,
    /// Largest allowed number of boundary edges.
    pub max_edges: i64,
}

impl Default for HoleThresholds {
    /// No filtering: every hole is a candidate.
    fn default() -> Self {
        Self::disabled()
    }
}

impl HoleThresholds {
    pub fn new(max_diameter: f64, max_edges: i64) -> Self {
        Self {
            max_diameter,
            max_edges,
        }
    }

    /// Thresholds that accept every hole.
    pub fn disabled() -> Self {
        Self::new(0.0, 0)
    }

    /// True if holes are actually filtered.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.max_diameter > 0.0 && self.max_edges > 0
    }

    /// Reject values the comparison cannot work with.
    pub fn validate(&self) -> MeshResult<()> {
        if self.max_diameter.is_nan() {
            return Err(MeshError::invalid_parameter(
                "max_hole_diameter",
                self.max_diameter,
                "must be a number",
            ));
        }
        Ok(())
    }
}

/// Why a hole was left open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// The walk passed `max_edges`; `seen` is the count at the point it stopped.
    TooManyEdges { seen: usize },
    /// The box grew wider than `max_diameter` along `axis`.
    TooWide { axis: Axis, extent: f64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooManyEdges { seen } => write!(f, "more than {} edges", seen - 1),
            RejectReason::TooWide { axis, extent } => {
                write!(f, "{} extent {:.4} too wide", axis, extent)
            }
        }
    }
}

/// Result of classifying one hole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Within both limits.
    Accept,
    /// Outside a limit.
    Reject(RejectReason),
    /// Filtering is disabled; treated as accepted.
    Unfiltered,
}

impl Verdict {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Reject(_))
    }
}

/// Classify a hole against the thresholds, stopping as soon as it is known
/// to be too large.
///
/// After each boundary vertex is added: reject if the edge count exceeds
/// `max_edges`, then reject if any axis extent exceeds `max_diameter`. Values
/// equal to a limit are accepted.
pub fn classify(mesh: &HalfEdgeMesh, hole: &BoundaryLoop, thresholds: &HoleThresholds) -> Verdict {
    if !thresholds.is_active() {
        return Verdict::Unfiltered;
    }
    let mut sizer = HoleSizer::new(thresholds);
    for he in hole.walk(mesh) {
        if let Some(reason) = sizer.push(mesh.position(mesh.target(he))) {
            trace!(%he, %reason, "Hole exceeds size limit");
            return Verdict::Reject(reason);
        }
    }
    sizer.verdict()
}

/// [`classify`] one boundary point at a time, for walks that do other work
/// per step.
#[derive(Debug, Clone)]
pub struct HoleSizer {
    thresholds: HoleThresholds,
    count: usize,
    bbox: HoleBox,
}

impl HoleSizer {
    pub fn new(thresholds: &HoleThresholds) -> Self {
        Self {
            thresholds: *thresholds,
            count: 0,
            bbox: HoleBox::empty(),
        }
    }

    /// Add the target of the next boundary half-edge. Returns the reason as
    /// soon as the hole is too large; never rejects when filtering is off.
    pub fn push(&mut self, point: &Point3<f64>) -> Option<RejectReason> {
        if !self.thresholds.is_active() {
            return None;
        }
        self.count += 1;
        self.bbox.extend(point);

        if self.count > self.thresholds.max_edges as usize {
            return Some(RejectReason::TooManyEdges { seen: self.count });
        }
        self.bbox
            .first_axis_exceeding(self.thresholds.max_diameter)
            .map(|(axis, extent)| RejectReason::TooWide { axis, extent })
    }

    /// Verdict for a walk that completed without a rejection.
    pub fn verdict(&self) -> Verdict {
        if self.thresholds.is_active() {
            Verdict::Accept
        } else {
            Verdict::Unfiltered
        }
    }
}

/// Full size of a hole, without early exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopMeasure {
    pub edge_count: usize,
    pub bbox: HoleBox,
}

impl LoopMeasure {
    /// Whether a hole of this size passes the thresholds.
    pub fn fits(&self, thresholds: &HoleThresholds) -> bool {
        if !thresholds.is_active() {
            return true;
        }
        self.edge_count as u64 <= thresholds.max_edges as u64
            && self.bbox.first_axis_exceeding(thresholds.max_diameter).is_none()
    }

    /// Largest per-axis extent.
    pub fn diameter(&self) -> f64 {
        self.bbox.widest_axis().1
    }
}

/// Walk the whole hole and return its edge count and bounding box.
pub fn measure_loop(mesh: &HalfEdgeMesh, hole: &BoundaryLoop) -> LoopMeasure {
    let mut edge_count = 0;
    let mut bbox = HoleBox::empty();
    for he in hole.walk(mesh) {
        edge_count += 1;
        bbox.extend(mesh.position(mesh.target(he)));
    }
    LoopMeasure { edge_count, bbox }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::extract_boundary_cycles;
    use crate::types::Mesh;
    use nalgebra::Point3;

    /// A fan of `n` triangles around an apex; the rim is one open loop.
    fn cone(n: u32, radius: f64) -> Mesh {
        let mut positions = vec![Point3::new(0.0, 0.0, 1.0)];
        for i in 0..n {
            let t = std::f64::consts::TAU * i as f64 / n as f64;
            positions.push(Point3::new(radius * t.cos(), radius * t.sin(), 0.0));
        }
        let faces = (0..n).map(|i| [0, 1 + i, 1 + (i + 1) % n]).collect();
        Mesh::from_parts(positions, faces)
    }

    fn single_loop(mesh: &Mesh) -> (HalfEdgeMesh, BoundaryLoop) {
        let hm = HalfEdgeMesh::from_mesh(mesh).unwrap();
        let l = extract_boundary_cycles(&hm)[0];
        (hm, l)
    }

    #[test]
    fn test_accepts_small_hole() {
        let (hm, l) = single_loop(&cone(6, 0.25));
        let v = classify(&hm, &l, &HoleThresholds::new(1.0, 50));
        assert_eq!(v, Verdict::Accept);
    }

    #[test]
    fn test_rejects_on_edge_count_first() {
        let (hm, l) = single_loop(&cone(200, 5.0));
        let v = classify(&hm, &l, &HoleThresholds::new(100.0, 50));
        assert_eq!(v, Verdict::Reject(RejectReason::TooManyEdges { seen: 51 }));
    }

    #[test]
    fn test_rejects_on_width() {
        let (hm, l) = single_loop(&cone(8, 5.0));
        match classify(&hm, &l, &HoleThresholds::new(1.0, 50)) {
            Verdict::Reject(RejectReason::TooWide { extent, .. }) => assert!(extent > 1.0),
            other => panic!("expected TooWide, got {:?}", other),
        }
    }

    #[test]
    fn test_limits_are_inclusive() {
        // Square rim with side 2 and four edges.
        let mesh = Mesh::from_parts(
            [
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]],
        );
        let (hm, l) = single_loop(&mesh);
        assert_eq!(classify(&hm, &l, &HoleThresholds::new(2.0, 4)), Verdict::Accept);
        assert!(!classify(&hm, &l, &HoleThresholds::new(1.999, 4)).is_accepted());
        assert!(!classify(&hm, &l, &HoleThresholds::new(2.0, 3)).is_accepted());
    }

    #[test]
    fn test_disabled_when_either_limit_not_positive() {
        let (hm, l) = single_loop(&cone(200, 5.0));
        for t in [
            HoleThresholds::new(0.0, 50),
            HoleThresholds::new(1.0, 0),
            HoleThresholds::new(-1.0, -1),
        ] {
            assert!(!t.is_active());
            assert_eq!(classify(&hm, &l, &t), Verdict::Unfiltered);
        }
    }

    #[test]
    fn test_early_exit_matches_full_measure() {
        let (hm, l) = single_loop(&cone(40, 2.0));
        let m = measure_loop(&hm, &l);
        assert_eq!(m.edge_count, 40);
        for &(d, e) in &[(1.0, 10), (4.0, 39), (4.0, 40), (3.9, 40), (10.0, 100)] {
            let t = HoleThresholds::new(d, e);
            assert_eq!(classify(&hm, &l, &t).is_accepted(), m.fits(&t), "thresholds {:?}", t);
        }
    }

    #[test]
    fn test_validate_rejects_nan() {
        assert!(HoleThresholds::new(f64::NAN, 5).validate().is_err());
        assert!(HoleThresholds::new(f64::INFINITY, 5).validate().is_ok());
    }
}
