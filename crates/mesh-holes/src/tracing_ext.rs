//! Tracing helpers shared by the mesh operations.
//!
//! Targets:
//!
//! - `mesh_holes::timing`: operation start and duration
//! - `mesh_holes::mesh_state`: vertex/face counts and dimensions
//! - `mesh_holes::repair`: per-run hole repair summaries
//! - `mesh_holes::io`: file reads and writes
//!
//! Set `RUST_LOG=mesh_holes=debug` for per-hole decisions, `trace` for the
//! individual classification and refinement steps.

use std::time::Instant;
use tracing::span::EnteredSpan;
use tracing::{debug, info, warn};

use crate::holes::HoleRepairReport;

/// Enters an `operation` span for its lifetime and logs the elapsed time
/// when dropped.
///
/// ```rust,ignore
/// let _timer = OperationTimer::with_context("simplify", mesh.face_count(), mesh.vertex_count());
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    _span: EnteredSpan,
}

impl OperationTimer {
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            faces = face_count,
            vertices = vertex_count
        )
        .entered();
        debug!(target: "mesh_holes::timing", operation = name, "Starting");
        Self {
            name,
            start: Instant::now(),
            _span: span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1e3
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "mesh_holes::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Finished"
        );
    }
}

/// Log vertex/face counts and extent at debug level.
pub fn log_mesh_stats(mesh: &crate::Mesh, context: &str) {
    let (min_bounds, max_bounds) = mesh.bounds().unwrap_or_default();
    let dims = max_bounds - min_bounds;

    debug!(
        target: "mesh_holes::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log the outcome counts of a hole repair pass.
pub fn log_hole_report(report: &HoleRepairReport) {
    info!(
        target: "mesh_holes::repair",
        discovered = report.loops_discovered,
        filled = report.filled,
        rejected = report.rejected,
        skipped = report.skipped,
        unfaired = report.unfaired,
        "Hole repair finished"
    );
    if report.unfillable > 0 {
        warn!(
            target: "mesh_holes::repair",
            unfillable = report.unfillable,
            "Some accepted holes could not be patched"
        );
    }
}

/// Log a file read or write.
pub fn log_io_operation(operation: &str, path: &std::path::Path, format: &str, success: bool) {
    if success {
        info!(
            target: "mesh_holes::io",
            operation = operation,
            path = %path.display(),
            format = format,
            "I/O operation completed"
        );
    } else {
        warn!(
            target: "mesh_holes::io",
            operation = operation,
            path = %path.display(),
            format = format,
            "I/O operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mesh;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::with_context("test_operation", 0, 0);
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_logging_helpers_accept_empty_input() {
        log_mesh_stats(&Mesh::new(), "test");
        log_hole_report(&HoleRepairReport::default());
        log_io_operation("load", std::path::Path::new("missing.ply"), "ply", false);
    }
}
