//! Surface reconstruction from bare points by an advancing front.
//!
//! A seed triangle is placed among unused points, then every open edge of the
//! growing surface pivots onto the nearby point that gives the triangle with
//! the smallest circumscribed circle. Two filters bound the triangles that may
//! be created:
//!
//! - the perimeter may not exceed `max_triangle_perimeter`
//! - the ratio of circumradius to shortest edge may not exceed
//!   `radius_ratio_bound`, which keeps slivers out
//!
//! When the front has no edge left that can pivot, the next seed is tried
//! among the points still unused. The output keeps every input point, used
//! or not, in input order.
//!
//! Neighbour lookups go through a k-d tree, so a run costs roughly the number
//! of points times the number of points within half a perimeter bound.

use std::collections::VecDeque;

use hashbrown::HashMap;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::error::{MeshError, MeshResult};
use crate::service::{ReconstructionResult, Reconstructor};
use crate::tracing_ext::OperationTimer;
use crate::types::{Mesh, Triangle, Vertex};

/// New faces folding back over their neighbour past this cosine are refused.
const MIN_FOLD_COS: f64 = -0.5;

/// Nearest unused points paired up when looking for a seed.
const SEED_NEIGHBOURS: usize = 16;

/// Parameters for [`reconstruct_surface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructParams {
    /// Largest perimeter of a created triangle. Required, must be positive.
    pub max_triangle_perimeter: f64,
    /// Largest circumradius to shortest edge ratio of a created triangle.
    /// Default: 5.0
    pub radius_ratio_bound: f64,
}

impl ReconstructParams {
    pub fn new(max_triangle_perimeter: f64) -> Self {
        Self {
            max_triangle_perimeter,
            radius_ratio_bound: 5.0,
        }
    }

    pub fn with_radius_ratio_bound(mut self, radius_ratio_bound: f64) -> Self {
        self.radius_ratio_bound = radius_ratio_bound;
        self
    }

    pub fn validate(&self) -> MeshResult<()> {
        if !(self.max_triangle_perimeter.is_finite() && self.max_triangle_perimeter > 0.0) {
            return Err(MeshError::invalid_parameter(
                "max_triangle_perimeter",
                self.max_triangle_perimeter,
                "must be a positive number",
            ));
        }
        if !(self.radius_ratio_bound.is_finite() && self.radius_ratio_bound > 0.0) {
            return Err(MeshError::invalid_parameter(
                "radius_ratio_bound",
                self.radius_ratio_bound,
                "must be a positive number",
            ));
        }
        Ok(())
    }
}

/// [`Reconstructor`] backed by [`reconstruct_surface`].
#[derive(Debug, Clone)]
pub struct AdvancingFront {
    pub params: ReconstructParams,
}

impl AdvancingFront {
    pub fn new(params: ReconstructParams) -> Self {
        Self { params }
    }
}

impl Reconstructor for AdvancingFront {
    fn reconstruct(&self, points: &[Vertex]) -> MeshResult<ReconstructionResult> {
        reconstruct_surface(points, &self.params)
    }
}

/// Triangulate a surface through `points`.
///
/// Seed triangles are oriented to agree with the point normals when all three
/// corners carry one; otherwise their orientation is arbitrary. Faces grown
/// from a seed share its orientation. Fewer than three points give a mesh
/// without faces.
pub fn reconstruct_surface(points: &[Vertex], params: &ReconstructParams) -> MeshResult<ReconstructionResult> {
    params.validate()?;
    for (vertex_index, v) in points.iter().enumerate() {
        for (coordinate, value) in [("x", v.position.x), ("y", v.position.y), ("z", v.position.z)] {
            if !value.is_finite() {
                return Err(MeshError::InvalidCoordinate {
                    vertex_index,
                    coordinate,
                    value,
                });
            }
        }
    }
    let _timer = OperationTimer::with_context("reconstruct", 0, points.len());

    let mut front = Front::new(points, params);
    let mut seeds = 0;
    let mut cursor = 0;

    loop {
        while let Some((a, b)) = front.queue.pop_front() {
            if !front.is_open(a, b) {
                continue;
            }
            if let Some(p) = front.pivot(a, b) {
                front.add_face([b, a, p]);
            }
        }
        match front.next_seed(&mut cursor) {
            Some(seed) => {
                debug!(?seed, "Seeding front");
                front.add_face(seed);
                seeds += 1;
            }
            None => break,
        }
    }

    let boundary_edges = front
        .apex
        .keys()
        .filter(|&&(a, b)| !front.apex.contains_key(&(b, a)))
        .count();
    let points_used = front.used.iter().filter(|&&u| u).count();

    info!(
        points = points.len(),
        faces = front.faces.len(),
        seeds,
        points_used,
        boundary_edges,
        "Reconstructed surface"
    );

    Ok(ReconstructionResult {
        mesh: Mesh {
            vertices: points.to_vec(),
            faces: front.faces,
        },
        seeds,
        points_used,
        boundary_edges,
    })
}

/// Growing surface: its faces and the directed edges still open.
struct Front<'a> {
    points: &'a [Vertex],
    params: &'a ReconstructParams,
    tree: KdTree<f64, 3>,
    /// Squared search radius. No point farther than half the perimeter bound
    /// from an edge midpoint can close a triangle on that edge.
    reach_sq: f64,
    faces: Vec<[u32; 3]>,
    /// Directed face edge to the opposite corner of its face.
    apex: HashMap<(u32, u32), u32>,
    used: Vec<bool>,
    queue: VecDeque<(u32, u32)>,
}

impl<'a> Front<'a> {
    fn new(points: &'a [Vertex], params: &'a ReconstructParams) -> Self {
        let mut tree: KdTree<f64, 3> = KdTree::new();
        for (i, v) in points.iter().enumerate() {
            let p = v.position;
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        let reach = params.max_triangle_perimeter / 2.0;

        Self {
            points,
            params,
            tree,
            reach_sq: reach * reach,
            faces: Vec::new(),
            apex: HashMap::new(),
            used: vec![false; points.len()],
            queue: VecDeque::new(),
        }
    }

    #[inline]
    fn position(&self, i: u32) -> Point3<f64> {
        self.points[i as usize].position
    }

    /// `a -> b` belongs to a face and its twin does not.
    fn is_open(&self, a: u32, b: u32) -> bool {
        self.apex.contains_key(&(a, b)) && !self.apex.contains_key(&(b, a))
    }

    /// Points within reach of `center`, nearest first.
    fn within_reach(&self, center: &Point3<f64>) -> Vec<u32> {
        self.tree
            .within::<SquaredEuclidean>(&[center.x, center.y, center.z], self.reach_sq)
            .into_iter()
            .map(|n| n.item as u32)
            .collect()
    }

    /// Circumradius of triangle `a b c`, if it passes both shape filters.
    fn score(&self, a: u32, b: u32, c: u32) -> Option<f64> {
        let (pa, pb, pc) = (self.position(a), self.position(b), self.position(c));
        let (ab, bc, ca) = ((pb - pa).norm(), (pc - pb).norm(), (pa - pc).norm());
        let perimeter = ab + bc + ca;
        if perimeter > self.params.max_triangle_perimeter {
            return None;
        }

        let shortest = ab.min(bc).min(ca);
        let double_area = Triangle::new(pa, pb, pc).normal_unnormalized().norm();
        if shortest <= 0.0 || double_area <= f64::EPSILON * perimeter * perimeter {
            return None;
        }

        let circumradius = ab * bc * ca / (2.0 * double_area);
        (circumradius / shortest <= self.params.radius_ratio_bound).then_some(circumradius)
    }

    /// Best seed triangle around the next unused point at or after `cursor`.
    ///
    /// Points only ever become used, so a point that gave no seed once never
    /// will and the cursor only moves forward.
    fn next_seed(&self, cursor: &mut usize) -> Option<[u32; 3]> {
        while *cursor < self.points.len() {
            let i = *cursor as u32;
            *cursor += 1;
            if self.used[i as usize] {
                continue;
            }

            let near: Vec<u32> = self
                .within_reach(&self.position(i))
                .into_iter()
                .filter(|&j| j != i && !self.used[j as usize])
                .take(SEED_NEIGHBOURS)
                .collect();

            let mut best: Option<(f64, u32, u32)> = None;
            for (x, &j) in near.iter().enumerate() {
                for &k in &near[x + 1..] {
                    if let Some(radius) = self.score(i, j, k)
                        && best.is_none_or(|(r, _, _)| radius < r)
                    {
                        best = Some((radius, j, k));
                    }
                }
            }
            if let Some((_, j, k)) = best {
                return Some(self.orient([i, j, k]));
            }
        }
        None
    }

    /// Flip `face` if it disagrees with the normals stored on its corners.
    fn orient(&self, face: [u32; 3]) -> [u32; 3] {
        let normals: Option<Vec<_>> = face.iter().map(|&v| self.points[v as usize].normal).collect();
        let Some(normals) = normals else {
            return face;
        };
        let expected = normals[0] + normals[1] + normals[2];
        let [a, b, c] = face;
        let actual = Triangle::new(self.position(a), self.position(b), self.position(c)).normal_unnormalized();
        if actual.dot(&expected) < 0.0 { [a, c, b] } else { face }
    }

    /// Point to close open edge `a -> b` with, making face `b a p`.
    ///
    /// A point already on the surface is only taken when it is joined to `a`
    /// or `b` by an open edge, so the new face closes a corner of the front
    /// instead of pinching the surface at `p`.
    fn pivot(&self, a: u32, b: u32) -> Option<u32> {
        let c = *self.apex.get(&(a, b))?;
        let (pa, pb) = (self.position(a), self.position(b));
        let facing = Triangle::new(pa, pb, self.position(c)).normal()?;
        let midpoint = Point3::from((pa.coords + pb.coords) / 2.0);

        let mut best: Option<(f64, u32)> = None;
        for p in self.within_reach(&midpoint) {
            if p == a || p == b || p == c {
                continue;
            }
            if self.apex.contains_key(&(a, p)) || self.apex.contains_key(&(p, b)) {
                continue;
            }
            if self.used[p as usize] && !self.is_open(p, a) && !self.is_open(b, p) {
                continue;
            }
            let Some(radius) = self.score(b, a, p) else {
                continue;
            };
            let Some(normal) = Triangle::new(pb, pa, self.position(p)).normal() else {
                continue;
            };
            if normal.dot(&facing) < MIN_FOLD_COS {
                continue;
            }
            if best.is_none_or(|(r, _)| radius < r) {
                best = Some((radius, p));
            }
        }
        best.map(|(_, p)| p)
    }

    fn add_face(&mut self, face: [u32; 3]) {
        let [a, b, c] = face;
        for (x, y, z) in [(a, b, c), (b, c, a), (c, a, b)] {
            self.apex.insert((x, y), z);
            self.used[x as usize] = true;
        }
        for (x, y) in [(a, b), (b, c), (c, a)] {
            if !self.apex.contains_key(&(y, x)) {
                self.queue.push_back((x, y));
            }
        }
        self.faces.push(face);
    }
}
