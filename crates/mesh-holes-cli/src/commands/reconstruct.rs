//! mesh-holes reconstruct command - triangulate a point set.

use std::path::Path;

use anyhow::{Context, Result};
use mesh_holes::{ReconstructParams, load_polygon_soup, reconstruct_surface};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ReconstructResult {
    input: String,
    output: String,
    max_triangle_perimeter: f64,
    radius_ratio_bound: f64,
    points: usize,
    points_used: usize,
    faces: usize,
    seeds: usize,
    boundary_edges: usize,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    max_triangle_perimeter: f64,
    radius_ratio_bound: f64,
    cli: &Cli,
) -> Result<()> {
    let params = ReconstructParams::new(max_triangle_perimeter).with_radius_ratio_bound(radius_ratio_bound);
    params.validate()?;

    output::info(&format!("Reading points: {}", input.display()), cli.format, cli.quiet);
    // Any faces in the input are ignored.
    let soup = load_polygon_soup(input).with_context(|| format!("Failed to load points from {:?}", input))?;

    let reconstruction = reconstruct_surface(&soup.points, &params).context("Reconstruction failed")?;

    output::info(&format!("Writing output mesh: {}", output_path.display()), cli.format, cli.quiet);
    reconstruction
        .mesh
        .save(output_path)
        .with_context(|| format!("Failed to save mesh to {:?}", output_path))?;

    let result = ReconstructResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        max_triangle_perimeter,
        radius_ratio_bound,
        points: soup.points.len(),
        points_used: reconstruction.points_used,
        faces: reconstruction.mesh.face_count(),
        seeds: reconstruction.seeds,
        boundary_edges: reconstruction.boundary_edges,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::field("Seeds", result.seeds, cli.format, cli.quiet);
            output::field("Boundary edges", result.boundary_edges, cli.format, cli.quiet);
            output::success(
                &format!(
                    "Built {} faces over {} of {} points",
                    result.faces, result.points_used, result.points
                ),
                cli.format,
                cli.quiet,
            );
        }
    }

    Ok(())
}
