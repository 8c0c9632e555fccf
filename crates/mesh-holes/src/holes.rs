//! Selective hole repair.
//!
//! Walks the boundary loops of a half-edge mesh and patches the ones that are
//! small enough to be defects, leaving large openings (a scan's outer rim, the
//! cut at the base of a bust) alone. Each discovered loop goes through three
//! steps in order:
//!
//! 1. the duplicate guard, so no hole is judged twice;
//! 2. the size classifier;
//! 3. the hole filler, for loops that passed.
//!
//! The mesh is edited in place while the pass is still running. With
//! [`DiscoveryStrategy::CycleFirst`] all loops are collected before the first
//! edit. With [`DiscoveryStrategy::LiveScan`] half-edge ids are scanned up to
//! the count taken before the first edit; ids never move, so the faces and
//! half-edges a patch appends are not visited.

use std::fmt;

use tracing::{debug, warn};

use crate::boundary::{BoundaryLoop, DiscoveryStrategy, extract_boundary_cycles};
use crate::classify::{HoleThresholds, RejectReason, Verdict};
use crate::error::MeshResult;
use crate::fill::TriangulateRefineFair;
use crate::guard::{DuplicatePolicy, ExaminedSet};
use crate::halfedge::{HalfEdgeId, HalfEdgeMesh};
use crate::service::HoleFiller;
use crate::tracing_ext::{OperationTimer, log_hole_report, log_mesh_stats};
use crate::types::Mesh;

/// Parameters for [`repair_holes`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoleRepairParams {
    /// Size limits. Disabled by default, which patches every hole.
    pub thresholds: HoleThresholds,
    /// How boundary loops are found.
    pub discovery: DiscoveryStrategy,
    /// What counts as an already judged hole.
    pub duplicates: DuplicatePolicy,
}

impl HoleRepairParams {
    /// Patch holes no wider than `max_diameter` along any axis and with at
    /// most `max_edges` boundary edges.
    pub fn new(max_diameter: f64, max_edges: i64) -> Self {
        Self {
            thresholds: HoleThresholds::new(max_diameter, max_edges),
            ..Default::default()
        }
    }

    pub fn with_discovery(mut self, discovery: DiscoveryStrategy) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_duplicate_policy(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn validate(&self) -> MeshResult<()> {
        self.thresholds.validate()
    }
}

/// What happened to one discovered loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// Already judged earlier in the pass.
    Skipped,
    /// Too large to be treated as a defect.
    Rejected(RejectReason),
    /// Closed by the filler.
    Patched { faired: bool, new_faces: usize },
    /// Accepted, but the filler could not build a patch. The mesh is unchanged.
    Unfillable { reason: String },
}

/// A discovery point and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRecord {
    pub representative: HalfEdgeId,
    pub outcome: LoopOutcome,
}

/// Summary of one [`repair_holes`] pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoleRepairReport {
    /// Holes patched, faired or not.
    pub filled: usize,
    /// Holes left open because they exceeded a threshold.
    pub rejected: usize,
    /// Discoveries skipped by the duplicate guard.
    pub skipped: usize,
    /// Accepted holes the filler gave up on.
    pub unfillable: usize,
    /// Patched holes whose fairing did not converge.
    pub unfaired: usize,
    /// Discovery points visited.
    pub loops_discovered: usize,
    /// Per-discovery outcomes in visiting order.
    pub outcomes: Vec<LoopRecord>,
}

impl HoleRepairReport {
    fn record(&mut self, representative: HalfEdgeId, outcome: LoopOutcome) {
        match &outcome {
            LoopOutcome::Skipped => self.skipped += 1,
            LoopOutcome::Rejected(_) => self.rejected += 1,
            LoopOutcome::Patched { faired, .. } => {
                self.filled += 1;
                if !faired {
                    self.unfaired += 1;
                }
            }
            LoopOutcome::Unfillable { .. } => self.unfillable += 1,
        }
        self.outcomes.push(LoopRecord {
            representative,
            outcome,
        });
    }

    /// Loops that were patched.
    pub fn patched(&self) -> impl Iterator<Item = &LoopRecord> {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, LoopOutcome::Patched { .. }))
    }
}

impl fmt::Display for HoleRepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hole Repair Report")?;
        writeln!(f, "  Loops discovered: {}", self.loops_discovered)?;
        writeln!(f, "  Filled: {}", self.filled)?;
        if self.unfaired > 0 {
            writeln!(f, "    (fairing not converged: {})", self.unfaired)?;
        }
        writeln!(f, "  Rejected (too large): {}", self.rejected)?;
        writeln!(f, "  Skipped (already examined): {}", self.skipped)?;
        if self.unfillable > 0 {
            writeln!(f, "  Unfillable: {}", self.unfillable)?;
        }
        Ok(())
    }
}

/// Patch every hole that passes `params`, in place.
///
/// Loops are judged one at a time and each accepted loop is handed to
/// `filler` before the next one is looked at. A filler error leaves that hole
/// open and is recorded as [`LoopOutcome::Unfillable`]; it does not stop the
/// pass.
pub fn repair_holes<F: HoleFiller + ?Sized>(
    mesh: &mut HalfEdgeMesh,
    params: &HoleRepairParams,
    filler: &mut F,
) -> HoleRepairReport {
    let _timer = OperationTimer::with_context("repair_holes", mesh.face_count(), mesh.vertex_count());

    let mut report = HoleRepairReport::default();
    let mut examined = ExaminedSet::new(params.duplicates);

    match params.discovery {
        DiscoveryStrategy::CycleFirst => {
            let loops = extract_boundary_cycles(mesh);
            debug!(loops = loops.len(), "Collected boundary loops");
            for hole in loops {
                visit_loop(mesh, hole, params, &mut examined, filler, &mut report);
            }
        }
        DiscoveryStrategy::LiveScan => {
            for he in mesh.halfedge_ids() {
                if mesh.is_boundary(he) {
                    visit_loop(mesh, BoundaryLoop::new(he), params, &mut examined, filler, &mut report);
                }
            }
        }
    }

    log_hole_report(&report);
    report
}

fn visit_loop<F: HoleFiller + ?Sized>(
    mesh: &mut HalfEdgeMesh,
    hole: BoundaryLoop,
    params: &HoleRepairParams,
    examined: &mut ExaminedSet,
    filler: &mut F,
    report: &mut HoleRepairReport,
) {
    report.loops_discovered += 1;
    let he = hole.representative;

    match examined.judge(mesh, &hole, &params.thresholds) {
        None => {
            debug!(%he, "Skipping examined hole");
            report.record(he, LoopOutcome::Skipped);
            return;
        }
        Some(Verdict::Reject(reason)) => {
            debug!(%he, %reason, "Leaving hole open");
            report.record(he, LoopOutcome::Rejected(reason));
            return;
        }
        Some(Verdict::Accept | Verdict::Unfiltered) => {}
    }

    let outcome = match filler.fill(mesh, &hole) {
        Ok(patch) => {
            if !patch.faired {
                debug!(%he, "Patch fairing did not converge");
            }
            LoopOutcome::Patched {
                faired: patch.faired,
                new_faces: patch.new_faces.len(),
            }
        }
        Err(e) => {
            warn!(%he, error = %e, "Could not patch hole");
            LoopOutcome::Unfillable {
                reason: e.to_string(),
            }
        }
    };
    report.record(he, outcome);
}

/// Run [`repair_holes`] on an indexed mesh and replace it with the result.
pub fn repair_mesh_holes<F: HoleFiller + ?Sized>(
    mesh: &mut Mesh,
    params: &HoleRepairParams,
    filler: &mut F,
) -> MeshResult<HoleRepairReport> {
    params.validate()?;
    log_mesh_stats(mesh, "before hole repair");

    let mut he_mesh = HalfEdgeMesh::from_mesh(mesh)?;
    let report = repair_holes(&mut he_mesh, params, filler);
    *mesh = he_mesh.to_mesh();

    log_mesh_stats(mesh, "after hole repair");
    Ok(report)
}

/// Patch holes up to the given size with the default filler.
///
/// Either limit at zero or below patches every hole.
pub fn fill_small_holes(mesh: &mut Mesh, max_diameter: f64, max_edges: i64) -> MeshResult<HoleRepairReport> {
    let params = HoleRepairParams::new(max_diameter, max_edges);
    let mut filler = TriangulateRefineFair::default();
    repair_mesh_holes(mesh, &params, &mut filler)
}
