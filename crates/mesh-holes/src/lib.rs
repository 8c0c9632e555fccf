//! Selective hole repair for triangle meshes.
//!
//! Scanned and exported surfaces are often left with small gaps that should be
//! closed and large openings that are part of the shape. This crate finds
//! every boundary loop of a mesh, measures it against a size limit, and
//! patches only the loops small enough to be defects.
//!
//! # Features
//!
//! - **Hole repair**: boundary loop discovery, early-exit size classification,
//!   duplicate-loop guard, triangulate/refine/fair patching
//! - **Simplification**: quadric edge collapse down to a ratio of the edges
//! - **Smoothing**: Laplacian relaxation with optional fixed boundary
//! - **Components**: drop small islands or keep the N largest parts
//! - **Soup repair**: merge points, remove broken and duplicate polygons,
//!   orient consistently
//! - **Reconstruction**: advancing-front triangulation of a point set under a
//!   perimeter bound
//! - **File I/O**: PLY, OBJ and STL
//!
//! # Quick Start
//!
//! ```no_run
//! use mesh_holes::{HoleRepairParams, Mesh, TriangulateRefineFair, repair_mesh_holes};
//!
//! let mut mesh = Mesh::load("scan.ply").unwrap();
//!
//! // Close holes no wider than 1.0 along any axis and with at most 50 edges.
//! let params = HoleRepairParams::new(1.0, 50);
//! let report = repair_mesh_holes(&mut mesh, &params, &mut TriangulateRefineFair::default()).unwrap();
//! println!("{}", report);
//!
//! mesh.save("repaired.ply").unwrap();
//! ```
//!
//! # Hole size
//!
//! A hole is too large if its boundary has more than `max_edges` edges or its
//! axis-aligned bounding box is wider than `max_diameter` along x, y or z.
//! Either limit at zero or below disables filtering and every hole is filled.
//!
//! # Working on the half-edge mesh
//!
//! [`repair_mesh_holes`] converts to a [`HalfEdgeMesh`] and back. Callers that
//! already hold one can drive the pipeline directly and choose how loops are
//! discovered:
//!
//! ```
//! use mesh_holes::{
//!     DiscoveryStrategy, HalfEdgeMesh, HoleRepairParams, Mesh, TriangulateRefineFair,
//!     repair_holes,
//! };
//! use nalgebra::Point3;
//!
//! // A lone triangle is bounded by one three-edge loop.
//! let mesh = Mesh::from_parts(
//!     [
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! );
//! let mut he_mesh = HalfEdgeMesh::from_mesh(&mesh).unwrap();
//! let params = HoleRepairParams::new(0.0, 0).with_discovery(DiscoveryStrategy::LiveScan);
//! let report = repair_holes(&mut he_mesh, &params, &mut TriangulateRefineFair::default());
//! assert_eq!(report.filled, 1);
//! assert_eq!(he_mesh.boundary_halfedge_count(), 0);
//! ```
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | PLY    | `.ply`    | ✓    | ✓    | ASCII & binary in, ASCII double out, colors/normals |
//! | OBJ    | `.obj`    | ✓    | ✓    | Polygons kept for soup repair |
//! | STL    | `.stl`    | ✓    | ✓    | Binary & ASCII in, binary out |

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
pub mod tracing_ext;
mod types;

pub mod adjacency;
pub mod boundary;
pub mod bounds;
pub mod classify;
pub mod components;
pub mod fill;
pub mod guard;
pub mod halfedge;
pub mod holes;
pub mod io;
pub mod reconstruct;
pub mod service;
pub mod simplify;
pub mod smooth;
pub mod soup;
pub mod validate;

// Re-export core types at crate root
pub use error::{ErrorCode, MeshError, MeshLocation, MeshResult, RecoverySuggestion};
pub use types::{Mesh, Triangle, Vertex, VertexColor};

pub use adjacency::MeshAdjacency;
pub use boundary::{BoundaryLoop, DiscoveryStrategy, extract_boundary_cycles};
pub use bounds::{Axis, HoleBox};
pub use classify::{HoleThresholds, LoopMeasure, RejectReason, Verdict, classify, measure_loop};
pub use components::{
    ComponentAnalysis, ComponentParams, ComponentReport, find_connected_components, remove_components,
};
pub use fill::{FillParams, TriangulateRefineFair};
pub use guard::{DuplicatePolicy, ExaminedSet};
pub use halfedge::{FaceId, HalfEdgeId, HalfEdgeMesh, VertexId};
pub use holes::{
    HoleRepairParams, HoleRepairReport, LoopOutcome, LoopRecord, fill_small_holes, repair_holes,
    repair_mesh_holes,
};
pub use io::{MeshFormat, load_mesh, load_polygon_soup, save_mesh, save_polygon_soup};
pub use reconstruct::{AdvancingFront, ReconstructParams, reconstruct_surface};
pub use service::{
    HoleFiller, PatchResult, ReconstructionResult, Reconstructor, SimplifyResult, Simplifier, SmoothResult,
    Smoother,
};
pub use simplify::{QuadricSimplifier, SimplifyParams, simplify_mesh};
pub use smooth::{LaplacianSmoother, SmoothParams, smooth_mesh};
pub use soup::{PolygonSoup, SoupRepairParams, SoupRepairReport, repair_polygon_soup};
pub use validate::{HoleSummary, MeshReport, validate_mesh, validate_mesh_data};

pub use tracing_ext::{OperationTimer, log_hole_report, log_io_operation, log_mesh_stats};

// Convenience methods on Mesh
impl Mesh {
    /// Load a mesh from a file, auto-detecting format from extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh to a file, auto-detecting format from extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> MeshResult<()> {
        io::save_mesh(self, path.as_ref())
    }

    /// Counts, components and boundary loops.
    pub fn report(&self) -> MeshReport {
        validate::validate_mesh(self)
    }

    /// Fill holes up to the given size with the default patcher.
    pub fn fill_holes(&mut self, max_diameter: f64, max_edges: i64) -> MeshResult<HoleRepairReport> {
        holes::fill_small_holes(self, max_diameter, max_edges)
    }

    /// Find connected components in the mesh.
    pub fn find_components(&self) -> ComponentAnalysis {
        components::find_connected_components(self)
    }

    /// Keep only the largest connected component.
    /// Returns the number of components removed.
    pub fn keep_largest_component(&mut self) -> MeshResult<usize> {
        let report = components::remove_components(self, &ComponentParams::largest_only())?;
        Ok(report.removed_extra)
    }

    /// Simplified copy of the mesh keeping `edge_keep_ratio` of its edges.
    pub fn simplify(&self, edge_keep_ratio: f64) -> MeshResult<SimplifyResult> {
        simplify::simplify_mesh(self, &SimplifyParams::with_ratio(edge_keep_ratio))
    }

    /// Smooth in place with default parameters and a fixed boundary.
    pub fn smooth(&mut self) -> MeshResult<SmoothResult> {
        smooth::smooth_mesh(self, &SmoothParams::default())
    }
}
