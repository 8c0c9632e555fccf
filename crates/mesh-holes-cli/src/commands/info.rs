//! mesh-holes info command - display mesh statistics and holes.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use mesh_holes::Mesh;
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    faces: usize,
    edges: usize,
    components: usize,
    boundary_edges: usize,
    non_manifold_edges: usize,
    watertight: bool,
    surface_area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    /// Absent when the mesh is not manifold enough to trace its boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    holes: Option<Vec<HoleInfo>>,
    has_normals: bool,
    has_colors: bool,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

#[derive(Serialize)]
struct HoleInfo {
    edges: usize,
    extent: [f64; 3],
    diameter: f64,
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let mesh = Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let report = mesh.report();

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: report.vertex_count,
        faces: report.face_count,
        edges: report.edge_count,
        components: report.component_count,
        boundary_edges: report.boundary_edge_count,
        non_manifold_edges: report.non_manifold_edge_count,
        watertight: report.is_watertight(),
        surface_area: report.surface_area,
        bounds: report.bounds.map(|(min, max)| {
            let dims = max - min;
            BoundsInfo {
                min: [min.x, min.y, min.z],
                max: [max.x, max.y, max.z],
                dimensions: [dims.x, dims.y, dims.z],
            }
        }),
        holes: report.holes.as_ref().map(|holes| {
            holes
                .iter()
                .map(|h| HoleInfo {
                    edges: h.edge_count,
                    extent: [h.extent.x, h.extent.y, h.extent.z],
                    diameter: h.diameter(),
                })
                .collect()
        }),
        has_normals: mesh.vertices.iter().any(|v| v.normal.is_some()),
        has_colors: mesh.vertices.iter().any(|v| v.color.is_some()),
    };

    match cli.format {
        OutputFormat::Json => output::print(&info, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                print_text(input, &info);
            }
        }
    }

    Ok(())
}

fn print_text(input: &Path, info: &MeshInfo) {
    println!("{}", "Mesh Information".bold().underline());
    println!("  {}: {}", "File".cyan(), input.display());
    println!("  {}: {}", "Vertices".cyan(), info.vertices);
    println!("  {}: {}", "Faces".cyan(), info.faces);
    println!("  {}: {}", "Edges".cyan(), info.edges);
    println!("  {}: {}", "Components".cyan(), info.components);

    if let Some(ref b) = info.bounds {
        println!(
            "  {}: {:.4} x {:.4} x {:.4}",
            "Dimensions".cyan(),
            b.dimensions[0],
            b.dimensions[1],
            b.dimensions[2]
        );
    }
    println!("  {}: {:.4}", "Surface area".cyan(), info.surface_area);

    let closed = if info.watertight { "yes".green() } else { "no".yellow() };
    println!("  {}: {}", "Watertight".cyan(), closed);
    if info.non_manifold_edges > 0 {
        println!("  {}: {}", "Non-manifold edges".cyan(), info.non_manifold_edges.to_string().red());
    }

    match &info.holes {
        Some(holes) => {
            println!("  {}: {}", "Holes".cyan(), holes.len());
            for (i, h) in holes.iter().enumerate() {
                println!(
                    "    #{:<3} {:>6} edges, extent {:.4} x {:.4} x {:.4}",
                    i + 1,
                    h.edges,
                    h.extent[0],
                    h.extent[1],
                    h.extent[2]
                );
            }
        }
        None => println!(
            "  {}: {}",
            "Holes".cyan(),
            "unavailable (boundary is not manifold)".yellow()
        ),
    }
}
