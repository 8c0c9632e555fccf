//! mesh-holes: command-line tools for selective hole filling and mesh cleanup.
//!
//! Each subcommand reads one mesh, applies one operation and writes the
//! result, so steps can be chained in shell scripts.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_holes=info` - Operation summaries
//! - `RUST_LOG=mesh_holes=debug` - Per-hole decisions
//! - `RUST_LOG=mesh_holes::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Close holes up to 1.0 wide and 50 edges long
//! mesh-holes fill-holes 1.0 50 scan.ply filled.ply
//!
//! # Same, with per-hole decisions logged
//! mesh-holes -vv fill-holes 1.0 50 scan.ply filled.ply
//!
//! # Triangulate scanned points with triangle perimeters up to 2.0
//! mesh-holes reconstruct --input-mesh points.ply --output-mesh surface.ply \
//!     --max-triangle-perimeter 2.0
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mesh_holes::{DiscoveryStrategy, DuplicatePolicy};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{fill_holes, info, reconstruct, repair_soup, rm_components, simplify, smooth};

/// mesh-holes - Selective hole filling and cleanup for triangle meshes.
///
/// Reads and writes PLY, OBJ and STL. PLY output is ASCII with full double
/// precision coordinates.
#[derive(Parser)]
#[command(name = "mesh-holes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill holes no larger than the given limits
    ///
    /// A hole is too large if its boundary has more than MAX_NUM_HOLE_EDGES
    /// edges or its bounding box is wider than MAX_HOLE_DIAMETER along any
    /// axis. If either limit is zero or negative, every hole is filled.
    #[command(allow_negative_numbers = true)]
    FillHoles {
        /// Largest hole extent along x, y or z
        max_hole_diameter: f64,

        /// Largest number of boundary edges
        max_num_hole_edges: i64,

        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// How holes are discovered (cycle-first or live-scan)
        #[arg(long, default_value = "cycle-first")]
        discovery: DiscoveryStrategy,

        /// What marks a hole as already examined (shared-vertex or representative)
        #[arg(long, default_value = "shared-vertex")]
        duplicates: DuplicatePolicy,

        /// Triangulate holes without refining or fairing the patch
        #[arg(long)]
        no_refine: bool,
    },

    /// Simplify by quadric edge collapse
    Simplify {
        /// Fraction of edges to keep, in (0, 1]
        edge_keep_ratio: f64,

        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Never move or remove boundary vertices
        #[arg(long)]
        preserve_boundary: bool,
    },

    /// Laplacian shape smoothing
    Smooth {
        /// Number of smoothing iterations
        num_iterations: usize,

        /// Step size per iteration
        smoothing_time: f64,

        /// Nonzero to move boundary vertices as well
        smooth_boundary: i64,

        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,
    },

    /// Remove small or surplus connected components
    RmComponents {
        /// Drop components with fewer faces (0 keeps all sizes)
        min_faces_in_component: usize,

        /// Keep only this many of the largest components (0 keeps all)
        components_to_keep: usize,

        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,
    },

    /// Clean up a polygon soup and orient it consistently
    RepairSoup {
        /// Input mesh file
        #[arg(long)]
        input_mesh: PathBuf,

        /// Output mesh file
        #[arg(long)]
        output_mesh: PathBuf,
    },

    /// Triangulate a point set by advancing-front reconstruction
    ///
    /// Faces in the input are ignored. Every input point is written out,
    /// including points no triangle reached.
    Reconstruct {
        /// Input points (PLY, OBJ or STL)
        #[arg(long)]
        input_mesh: PathBuf,

        /// Output mesh file
        #[arg(long)]
        output_mesh: PathBuf,

        /// Largest perimeter of a created triangle
        #[arg(long)]
        max_triangle_perimeter: f64,

        /// Largest circumradius to shortest edge ratio of a created triangle
        #[arg(long, default_value_t = 5.0)]
        radius_ratio_bound: f64,
    },

    /// Display mesh statistics and holes
    Info {
        /// Input mesh file
        input: PathBuf,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_holes=info",
            2 => "mesh_holes=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    // Usage errors exit 1; --help and --version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::FillHoles {
            max_hole_diameter,
            max_num_hole_edges,
            input,
            output,
            discovery,
            duplicates,
            no_refine,
        } => fill_holes::run(
            input,
            output,
            fill_holes::Options {
                max_hole_diameter: *max_hole_diameter,
                max_num_hole_edges: *max_num_hole_edges,
                discovery: *discovery,
                duplicates: *duplicates,
                refine: !*no_refine,
            },
            &cli,
        ),
        Commands::Simplify {
            edge_keep_ratio,
            input,
            output,
            preserve_boundary,
        } => simplify::run(input, output, *edge_keep_ratio, *preserve_boundary, &cli),
        Commands::Smooth {
            num_iterations,
            smoothing_time,
            smooth_boundary,
            input,
            output,
        } => smooth::run(
            input,
            output,
            *num_iterations,
            *smoothing_time,
            *smooth_boundary != 0,
            &cli,
        ),
        Commands::RmComponents {
            min_faces_in_component,
            components_to_keep,
            input,
            output,
        } => rm_components::run(input, output, *min_faces_in_component, *components_to_keep, &cli),
        Commands::RepairSoup {
            input_mesh,
            output_mesh,
        } => repair_soup::run(input_mesh, output_mesh, &cli),
        Commands::Reconstruct {
            input_mesh,
            output_mesh,
            max_triangle_perimeter,
            radius_ratio_bound,
        } => reconstruct::run(
            input_mesh,
            output_mesh,
            *max_triangle_perimeter,
            *radius_ratio_bound,
            &cli,
        ),
        Commands::Info { input } => info::run(input, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(mesh_err) = e.downcast_ref::<mesh_holes::MeshError>() {
                eprintln!("{}: {}", "Error".red().bold(), mesh_err);
                eprintln!("  {}: {}", "Code".cyan(), mesh_err.code());
                eprintln!("  {}: {}", "Suggestion".green(), mesh_err.recovery_suggestion());
                if let Some(location) = mesh_err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
