//! Laplacian shape smoothing.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult};
use crate::service::{SmoothResult, Smoother};
use crate::tracing_ext::OperationTimer;
use crate::types::Mesh;

/// Parameters for [`smooth_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothParams {
    /// Number of relaxation steps. Default: 10
    pub num_iterations: usize,
    /// Step size per iteration, as a fraction of the distance to the
    /// neighbour average. Values above 1 are clamped to 1. Default: 0.5
    pub smoothing_time: f64,
    /// Move boundary vertices too. Default: false
    pub smooth_boundary: bool,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            num_iterations: 10,
            smoothing_time: 0.5,
            smooth_boundary: false,
        }
    }
}

impl SmoothParams {
    pub fn new(num_iterations: usize, smoothing_time: f64, smooth_boundary: bool) -> Self {
        Self {
            num_iterations,
            smoothing_time,
            smooth_boundary,
        }
    }

    /// A few small steps that take off scanner noise without shrinking much.
    pub fn gentle() -> Self {
        Self {
            num_iterations: 3,
            smoothing_time: 0.25,
            smooth_boundary: false,
        }
    }

    pub fn validate(&self) -> MeshResult<()> {
        if !(self.smoothing_time.is_finite() && self.smoothing_time > 0.0) {
            return Err(MeshError::invalid_parameter(
                "smoothing_time",
                self.smoothing_time,
                "must be a positive number",
            ));
        }
        Ok(())
    }

    fn step(&self) -> f64 {
        self.smoothing_time.min(1.0)
    }
}

/// [`Smoother`] backed by [`smooth_mesh`].
#[derive(Debug, Clone, Default)]
pub struct LaplacianSmoother {
    pub params: SmoothParams,
}

impl LaplacianSmoother {
    pub fn new(params: SmoothParams) -> Self {
        Self { params }
    }
}

impl Smoother for LaplacianSmoother {
    fn smooth(&self, mesh: &mut Mesh) -> MeshResult<SmoothResult> {
        smooth_mesh(mesh, &self.params)
    }
}

/// Move every free vertex toward the average of its neighbours, in place.
///
/// Unless `smooth_boundary` is set, vertices on an open boundary are held
/// fixed so holes and rims keep their outline. Vertices without faces never
/// move.
pub fn smooth_mesh(mesh: &mut Mesh, params: &SmoothParams) -> MeshResult<SmoothResult> {
    params.validate()?;
    let _timer = OperationTimer::with_context("smooth", mesh.face_count(), mesh.vertex_count());

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let constrained: HashSet<u32> = if params.smooth_boundary {
        HashSet::new()
    } else {
        adjacency.boundary_vertices()
    };
    info!(count = constrained.len(), "Constraining border vertices");

    let neighbors = vertex_neighbors(mesh.vertex_count(), &mesh.faces);
    let step = params.step();

    let mut last_max_displacement = 0.0;
    for iteration in 0..params.num_iterations {
        let positions: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();

        let moved: Vec<Point3<f64>> = positions
            .par_iter()
            .enumerate()
            .map(|(vi, p)| {
                let around = &neighbors[vi];
                if around.is_empty() || constrained.contains(&(vi as u32)) {
                    return *p;
                }
                let sum = around
                    .iter()
                    .fold(Vector3::zeros(), |acc, &u| acc + positions[u as usize].coords);
                let average = sum / around.len() as f64;
                p + (average - p.coords) * step
            })
            .collect();

        last_max_displacement = moved
            .par_iter()
            .zip(positions.par_iter())
            .map(|(a, b)| (a - b).norm())
            .reduce(|| 0.0, f64::max);

        for (v, p) in mesh.vertices.iter_mut().zip(moved) {
            v.position = p;
        }
        debug!(iteration, max_displacement = last_max_displacement, "Smoothing step");
    }

    Ok(SmoothResult {
        constrained_vertices: constrained.len(),
        iterations: params.num_iterations,
        last_max_displacement,
    })
}

/// Sorted, de-duplicated neighbour lists.
fn vertex_neighbors(vertex_count: usize, faces: &[[u32; 3]]) -> Vec<Vec<u32>> {
    let mut neighbors = vec![Vec::new(); vertex_count];
    for &[a, b, c] in faces {
        for (u, w) in [(a, b), (b, c), (c, a)] {
            neighbors[u as usize].push(w);
            neighbors[w as usize].push(u);
        }
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }
    neighbors
}
