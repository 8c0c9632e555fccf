//! mesh-holes rm-components command - drop small or surplus components.

use std::path::Path;

use anyhow::{Context, Result};
use mesh_holes::{ComponentParams, Mesh, remove_components};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ComponentsResult {
    input: String,
    output: String,
    components_before: usize,
    components_after: usize,
    removed_small: usize,
    removed_extra: usize,
    faces_removed: usize,
    vertices_removed: usize,
}

pub fn run(
    input: &Path,
    output_path: &Path,
    min_faces_in_component: usize,
    components_to_keep: usize,
    cli: &Cli,
) -> Result<()> {
    let params = ComponentParams::new(min_faces_in_component, components_to_keep);
    params.validate()?;

    output::info(&format!("Reading mesh:              {}", input.display()), cli.format, cli.quiet);
    output::info(
        &format!("Min faces in component:    {}", min_faces_in_component),
        cli.format,
        cli.quiet,
    );
    output::info(
        &format!("Components to keep:        {}", components_to_keep),
        cli.format,
        cli.quiet,
    );

    let mut mesh = Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    let report = remove_components(&mut mesh, &params).context("Component removal failed")?;

    output::info(
        &format!("The mesh has {} connected components.", report.components_before),
        cli.format,
        cli.quiet,
    );
    output::info(&format!("Writing output mesh: {}", output_path.display()), cli.format, cli.quiet);
    mesh.save(output_path)
        .with_context(|| format!("Failed to save mesh to {:?}", output_path))?;

    let result = ComponentsResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        components_before: report.components_before,
        components_after: report.components_after(),
        removed_small: report.removed_small,
        removed_extra: report.removed_extra,
        faces_removed: report.faces_removed,
        vertices_removed: report.vertices_removed,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::field("Removed (too small)", result.removed_small, cli.format, cli.quiet);
            output::field("Removed (not among largest)", result.removed_extra, cli.format, cli.quiet);
            output::field("Components left", result.components_after, cli.format, cli.quiet);
        }
    }

    Ok(())
}
