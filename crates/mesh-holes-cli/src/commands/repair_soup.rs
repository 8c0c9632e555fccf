//! mesh-holes repair-soup command - clean and orient a polygon soup.

use std::path::Path;

use anyhow::{Context, Result};
use mesh_holes::{SoupRepairParams, load_polygon_soup, repair_polygon_soup, save_polygon_soup};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct RepairSoupResult {
    input: String,
    output: String,
    points_before: usize,
    polygons_before: usize,
    points_merged: usize,
    degenerate_polygons_removed: usize,
    duplicate_polygons_removed: usize,
    unreferenced_points_removed: usize,
    polygons_flipped: usize,
    points_after: usize,
    polygons_after: usize,
}

pub fn run(input: &Path, output_path: &Path, cli: &Cli) -> Result<()> {
    output::info(&format!("Reading: {}", input.display()), cli.format, cli.quiet);
    let mut soup =
        load_polygon_soup(input).with_context(|| format!("Failed to load polygon soup from {:?}", input))?;
    let (points_before, polygons_before) = (soup.point_count(), soup.polygon_count());

    let report = repair_polygon_soup(&mut soup, &SoupRepairParams::default()).context("Soup repair failed")?;

    output::info(&format!("Writing output mesh: {}", output_path.display()), cli.format, cli.quiet);
    save_polygon_soup(&soup, output_path)
        .with_context(|| format!("Failed to save mesh to {:?}", output_path))?;

    let result = RepairSoupResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        points_before,
        polygons_before,
        points_merged: report.points_merged,
        degenerate_polygons_removed: report.degenerate_polygons_removed,
        duplicate_polygons_removed: report.duplicate_polygons_removed,
        unreferenced_points_removed: report.unreferenced_points_removed,
        polygons_flipped: report.polygons_flipped,
        points_after: report.points_after,
        polygons_after: report.polygons_after,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::field("Points merged", result.points_merged, cli.format, cli.quiet);
            output::field(
                "Degenerate polygons removed",
                result.degenerate_polygons_removed,
                cli.format,
                cli.quiet,
            );
            output::field(
                "Duplicate polygons removed",
                result.duplicate_polygons_removed,
                cli.format,
                cli.quiet,
            );
            output::field(
                "Unreferenced points removed",
                result.unreferenced_points_removed,
                cli.format,
                cli.quiet,
            );
            output::field("Polygons flipped", result.polygons_flipped, cli.format, cli.quiet);
            output::info(
                &format!(
                    "After repair, the soup has {} vertices and {} faces",
                    result.points_after, result.polygons_after
                ),
                cli.format,
                cli.quiet,
            );
        }
    }

    Ok(())
}
