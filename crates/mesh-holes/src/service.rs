//! Geometry services used by the repair commands.
//!
//! The hole repair pass only decides which holes to patch; building the patch
//! is delegated to a [`HoleFiller`]. Simplification and smoothing follow the
//! same pattern so callers can substitute their own implementations, and so
//! does reconstruction of a surface from bare points.

use crate::boundary::BoundaryLoop;
use crate::error::MeshResult;
use crate::halfedge::{FaceId, HalfEdgeMesh, VertexId};
use crate::types::{Mesh, Vertex};

/// What a successful fill added to the mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchResult {
    /// Vertices appended for the patch interior.
    pub new_vertices: Vec<VertexId>,
    /// Faces appended to close the hole.
    pub new_faces: Vec<FaceId>,
    /// Whether the fairing step converged. An unfaired patch is still kept.
    pub faired: bool,
}

/// Closes one hole in place.
pub trait HoleFiller {
    /// Patch `hole`.
    ///
    /// On error the mesh must be left exactly as it was. The repair pass treats
    /// an error as "this hole cannot be patched" and moves on.
    fn fill(&mut self, mesh: &mut HalfEdgeMesh, hole: &BoundaryLoop) -> MeshResult<PatchResult>;
}

impl<F> HoleFiller for F
where
    F: FnMut(&mut HalfEdgeMesh, &BoundaryLoop) -> MeshResult<PatchResult>,
{
    fn fill(&mut self, mesh: &mut HalfEdgeMesh, hole: &BoundaryLoop) -> MeshResult<PatchResult> {
        self(mesh, hole)
    }
}

/// Statistics from one simplification run.
#[derive(Debug, Clone)]
pub struct SimplifyResult {
    /// The simplified mesh.
    pub mesh: Mesh,
    /// Undirected edges before simplification.
    pub original_edges: usize,
    /// Undirected edges removed.
    pub edges_removed: usize,
    /// Undirected edges left.
    pub edges_left: usize,
    /// Edge collapses performed.
    pub collapses_performed: usize,
    /// Edge collapses rejected by the topology checks.
    pub collapses_rejected: usize,
}

/// Reduces the edge count of a triangle mesh.
pub trait Simplifier {
    fn simplify(&self, mesh: &Mesh) -> MeshResult<SimplifyResult>;
}

/// Statistics from one smoothing run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothResult {
    /// Vertices held in place.
    pub constrained_vertices: usize,
    /// Iterations run.
    pub iterations: usize,
    /// Largest single-vertex displacement in the final iteration.
    pub last_max_displacement: f64,
}

/// Moves vertices in place to reduce surface noise.
pub trait Smoother {
    fn smooth(&self, mesh: &mut Mesh) -> MeshResult<SmoothResult>;
}

/// Statistics from one surface reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructionResult {
    /// Every input point, with the triangles found between them.
    pub mesh: Mesh,
    /// Seed triangles the front was started from.
    pub seeds: usize,
    /// Points referenced by at least one triangle.
    pub points_used: usize,
    /// Directed edges left on the open front.
    pub boundary_edges: usize,
}

/// Builds a triangle surface over a set of points.
pub trait Reconstructor {
    fn reconstruct(&self, points: &[Vertex]) -> MeshResult<ReconstructionResult>;
}
