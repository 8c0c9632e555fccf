//! Property-based tests for hole classification and repair.
//!
//! Run with: cargo test -p mesh-holes --test proptest_holes

use mesh_holes::{
    Axis, DiscoveryStrategy, HalfEdgeMesh, HoleBox, HoleRepairParams, HoleThresholds, Mesh, MeshAdjacency,
    FillParams, TriangulateRefineFair, classify, extract_boundary_cycles, measure_loop, repair_holes,
};
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Rim points of a cone: `n` points around a circle of random radius, each
/// lifted by its own random height.
fn arb_rim() -> impl Strategy<Value = Vec<Point3<f64>>> {
    (3usize..48, 0.05..20.0f64).prop_flat_map(|(n, radius)| {
        prop::collection::vec(-1.0..1.0f64, n).prop_map(move |heights| {
            heights
                .iter()
                .enumerate()
                .map(|(i, &z)| {
                    let t = std::f64::consts::TAU * i as f64 / heights.len() as f64;
                    Point3::new(radius * t.cos(), radius * t.sin(), z)
                })
                .collect()
        })
    })
}

/// Positive thresholds.
fn arb_thresholds() -> impl Strategy<Value = HoleThresholds> {
    (0.01..50.0f64, 1i64..64).prop_map(|(d, e)| HoleThresholds::new(d, e))
}

/// Fan from an apex above the rim. The rim is the only hole.
fn cone(rim: &[Point3<f64>]) -> Mesh {
    let n = rim.len() as u32;
    let apex = Point3::new(0.0, 0.0, 5.0);
    let faces = (0..n).map(|i| [0, 1 + i, 1 + (i + 1) % n]).collect();
    Mesh::from_parts(std::iter::once(apex).chain(rim.iter().copied()), faces)
}

fn he_cone(rim: &[Point3<f64>]) -> HalfEdgeMesh {
    HalfEdgeMesh::from_mesh(&cone(rim)).unwrap()
}

// =============================================================================
// Classification
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Stopping early never changes the verdict.
    #[test]
    fn early_exit_matches_full_measurement(rim in arb_rim(), thresholds in arb_thresholds()) {
        let mesh = he_cone(&rim);
        let loops = extract_boundary_cycles(&mesh);
        prop_assert_eq!(loops.len(), 1);

        let verdict = classify(&mesh, &loops[0], &thresholds);
        let measure = measure_loop(&mesh, &loops[0]);
        prop_assert_eq!(verdict.is_accepted(), measure.fits(&thresholds));
    }

    /// Loosening either limit never rejects a hole that was accepted.
    #[test]
    fn rejection_is_monotonic(
        rim in arb_rim(),
        thresholds in arb_thresholds(),
        extra_diameter in 0.0..10.0f64,
        extra_edges in 0i64..10,
    ) {
        let mesh = he_cone(&rim);
        let hole = extract_boundary_cycles(&mesh)[0];
        let looser = HoleThresholds::new(
            thresholds.max_diameter + extra_diameter,
            thresholds.max_edges + extra_edges,
        );

        if classify(&mesh, &hole, &thresholds).is_accepted() {
            prop_assert!(classify(&mesh, &hole, &looser).is_accepted());
        }
    }

    /// The measured box is exactly the box of the rim points.
    #[test]
    fn loop_box_matches_rim(rim in arb_rim()) {
        let mesh = he_cone(&rim);
        let hole = extract_boundary_cycles(&mesh)[0];
        let measure = measure_loop(&mesh, &hole);
        let expected = HoleBox::from_points(&rim);

        prop_assert_eq!(measure.edge_count, rim.len());
        for axis in Axis::ALL {
            prop_assert_eq!(measure.bbox.extent(axis), expected.extent(axis));
        }
    }

    /// Disabled thresholds accept every hole.
    #[test]
    fn disabled_thresholds_accept(rim in arb_rim(), diameter in -5.0..0.0f64, edges in -5i64..=0) {
        let mesh = he_cone(&rim);
        let hole = extract_boundary_cycles(&mesh)[0];
        prop_assert!(classify(&mesh, &hole, &HoleThresholds::new(diameter, 10)).is_accepted());
        prop_assert!(classify(&mesh, &hole, &HoleThresholds::new(1e-9, edges)).is_accepted());
    }
}

// =============================================================================
// Repair
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// With filtering off the first run closes everything and a second run
    /// finds nothing.
    #[test]
    fn unfiltered_repair_is_idempotent(rim in arb_rim(), live in any::<bool>()) {
        let mut mesh = he_cone(&rim);
        let discovery = if live { DiscoveryStrategy::LiveScan } else { DiscoveryStrategy::CycleFirst };
        let params = HoleRepairParams::default().with_discovery(discovery);
        let mut filler = TriangulateRefineFair::new(FillParams::triangulate_only());

        let first = repair_holes(&mut mesh, &params, &mut filler);
        prop_assert_eq!(first.filled, 1);
        prop_assert_eq!(mesh.boundary_halfedge_count(), 0);

        let faces = mesh.face_count();
        let second = repair_holes(&mut mesh, &params, &mut filler);
        prop_assert_eq!(second.loops_discovered, 0);
        prop_assert_eq!(mesh.face_count(), faces);
    }

    /// A rejected hole leaves the mesh untouched.
    #[test]
    fn rejected_hole_is_not_modified(rim in arb_rim(), thresholds in arb_thresholds()) {
        let input = cone(&rim);
        let mut mesh = HalfEdgeMesh::from_mesh(&input).unwrap();
        let params = HoleRepairParams { thresholds, ..Default::default() };
        let mut filler = TriangulateRefineFair::new(FillParams::triangulate_only());

        let report = repair_holes(&mut mesh, &params, &mut filler);
        let output = mesh.to_mesh();
        if report.rejected == 1 {
            prop_assert_eq!(&output.faces, &input.faces);
        } else {
            prop_assert_eq!(report.filled, 1);
            prop_assert!(MeshAdjacency::build(&output.faces).is_watertight());
        }
    }
}
