//! mesh-holes fill-holes command - patch holes below a size limit.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_holes::{
    DiscoveryStrategy, DuplicatePolicy, FillParams, HoleRepairParams, LoopOutcome, Mesh,
    TriangulateRefineFair, repair_mesh_holes,
};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

pub struct Options {
    pub max_hole_diameter: f64,
    pub max_num_hole_edges: i64,
    pub discovery: DiscoveryStrategy,
    pub duplicates: DuplicatePolicy,
    pub refine: bool,
}

#[derive(Serialize)]
struct FillHolesResult {
    input: String,
    output: String,
    max_hole_diameter: f64,
    max_num_hole_edges: i64,
    loops_discovered: usize,
    filled: usize,
    rejected: usize,
    skipped: usize,
    unfillable: usize,
    unfaired: usize,
    faces_added: usize,
    vertices_added: usize,
}

pub fn run(input: &Path, output_path: &Path, options: Options, cli: &Cli) -> Result<()> {
    let params = HoleRepairParams::new(options.max_hole_diameter, options.max_num_hole_edges)
        .with_discovery(options.discovery)
        .with_duplicate_policy(options.duplicates);
    params.validate()?;

    output::info(&format!("Reading mesh:       {}", input.display()), cli.format, cli.quiet);
    output::info(
        &format!("Max num hole edges: {}", options.max_num_hole_edges),
        cli.format,
        cli.quiet,
    );
    output::info(
        &format!("Max hole diameter:  {}", options.max_hole_diameter),
        cli.format,
        cli.quiet,
    );

    let mut mesh = Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let (faces_before, vertices_before) = (mesh.face_count(), mesh.vertex_count());

    let fill_params = if options.refine {
        FillParams::default()
    } else {
        FillParams::triangulate_only()
    };
    fill_params.validate()?;
    let mut filler = TriangulateRefineFair::new(fill_params);
    let report = repair_mesh_holes(&mut mesh, &params, &mut filler).context("Hole repair failed")?;

    output::info(&format!("Writing output mesh: {}", output_path.display()), cli.format, cli.quiet);
    mesh.save(output_path)
        .with_context(|| format!("Failed to save mesh to {:?}", output_path))?;

    let result = FillHolesResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        max_hole_diameter: options.max_hole_diameter,
        max_num_hole_edges: options.max_num_hole_edges,
        loops_discovered: report.loops_discovered,
        filled: report.filled,
        rejected: report.rejected,
        skipped: report.skipped,
        unfillable: report.unfillable,
        unfaired: report.unfaired,
        faces_added: mesh.face_count() - faces_before,
        vertices_added: mesh.vertex_count() - vertices_before,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::success(
                &format!("{} holes have been filled", result.filled),
                cli.format,
                cli.quiet,
            );
            output::field("Rejected (too large)", result.rejected, cli.format, cli.quiet);
            if result.skipped > 0 {
                output::field("Skipped (already examined)", result.skipped, cli.format, cli.quiet);
            }
            if result.unfaired > 0 {
                output::field("Patches not faired", result.unfaired, cli.format, cli.quiet);
            }
            output::field(
                "Added",
                format!("{} faces, {} vertices", result.faces_added, result.vertices_added),
                cli.format,
                cli.quiet,
            );
            if result.unfillable > 0 && !cli.quiet {
                println!(
                    "  {}: {} holes could not be patched",
                    "Warning".yellow().bold(),
                    result.unfillable
                );
                for record in &report.outcomes {
                    if let LoopOutcome::Unfillable { reason } = &record.outcome {
                        println!("    {} {}", "-".yellow(), reason);
                    }
                }
            }
        }
    }

    Ok(())
}
