#![no_main]

use libfuzzer_sys::fuzz_target;
use mesh_holes::{FillParams, HoleRepairParams, Mesh, TriangulateRefineFair, repair_mesh_holes};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    let mut file = match NamedTempFile::with_suffix(".obj") {
        Ok(f) => f,
        Err(_) => return,
    };

    if file.write_all(data).is_err() {
        return;
    }

    // Loading and repairing must never panic, whatever the input.
    if let Ok(mut mesh) = Mesh::load(file.path()) {
        let params = HoleRepairParams::new(1.0, 64);
        let _ = repair_mesh_holes(&mut mesh, &params, &mut TriangulateRefineFair::new(FillParams::triangulate_only()));
    }
});
