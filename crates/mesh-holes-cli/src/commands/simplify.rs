//! mesh-holes simplify command - reduce the edge count by edge collapse.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_holes::{Mesh, SimplifyParams, simplify_mesh};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct SimplifyResult {
    input: String,
    output: String,
    edge_keep_ratio: f64,
    original_edges: usize,
    edges_removed: usize,
    edges_left: usize,
    original_faces: usize,
    final_faces: usize,
    collapses_performed: usize,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    edge_keep_ratio: f64,
    preserve_boundary: bool,
    cli: &Cli,
) -> Result<()> {
    let params = SimplifyParams {
        preserve_boundary,
        ..SimplifyParams::with_ratio(edge_keep_ratio)
    };
    params.validate()?;

    output::info(&format!("Edge keep ratio: {}", edge_keep_ratio), cli.format, cli.quiet);
    output::info(&format!("Reading mesh:       {}", input.display()), cli.format, cli.quiet);
    let mesh = Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let simplified = simplify_mesh(&mesh, &params).context("Simplification failed")?;

    output::info(&format!("Writing output mesh: {}", output_path.display()), cli.format, cli.quiet);
    simplified
        .mesh
        .save(output_path)
        .with_context(|| format!("Failed to save simplified mesh to {:?}", output_path))?;

    let result = SimplifyResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        edge_keep_ratio,
        original_edges: simplified.original_edges,
        edges_removed: simplified.edges_removed,
        edges_left: simplified.edges_left,
        original_faces: mesh.face_count(),
        final_faces: simplified.mesh.face_count(),
        collapses_performed: simplified.collapses_performed,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                println!(
                    "  {}: {} removed, {} left",
                    "Edges".cyan(),
                    result.edges_removed,
                    result.edges_left
                );
                println!(
                    "  {}: {} → {}",
                    "Faces".cyan(),
                    result.original_faces,
                    result.final_faces
                );
            }
        }
    }

    Ok(())
}
