//! Polygon soup cleanup.
//!
//! A soup is a list of points and polygons with no connectivity guarantees.
//! Scanner exports and format converters commonly produce soups with repeated
//! points, collapsed polygons and inconsistent winding. [`repair_polygon_soup`]
//! cleans such input so it can be turned into a proper half-edge mesh.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info};

use crate::error::MeshResult;
use crate::guard::PointKey;
use crate::tracing_ext::OperationTimer;
use crate::types::{Mesh, Vertex};

/// Points and polygons of any size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSoup {
    pub points: Vec<Vertex>,
    pub polygons: Vec<Vec<u32>>,
}

impl PolygonSoup {
    pub fn new(points: Vec<Vertex>, polygons: Vec<Vec<u32>>) -> Self {
        Self { points, polygons }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Fan-triangulate every polygon with at least three corners.
    pub fn to_mesh(&self) -> Mesh {
        let mut faces = Vec::with_capacity(self.polygons.len());
        for poly in self.polygons.iter().filter(|p| p.len() >= 3) {
            for i in 1..poly.len() - 1 {
                faces.push([poly[0], poly[i], poly[i + 1]]);
            }
        }
        Mesh {
            vertices: self.points.clone(),
            faces,
        }
    }
}

impl From<&Mesh> for PolygonSoup {
    fn from(mesh: &Mesh) -> Self {
        Self {
            points: mesh.vertices.clone(),
            polygons: mesh.faces.iter().map(|f| f.to_vec()).collect(),
        }
    }
}

/// Which cleanup steps [`repair_polygon_soup`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoupRepairParams {
    /// Merge points with bit-identical coordinates. Default: true
    pub merge_duplicate_points: bool,
    /// Drop polygons visiting the same corners as an earlier one. Default: true
    pub remove_duplicate_polygons: bool,
    /// Make neighbouring polygons agree on winding. Default: true
    pub orient: bool,
}

impl Default for SoupRepairParams {
    fn default() -> Self {
        Self {
            merge_duplicate_points: true,
            remove_duplicate_polygons: true,
            orient: true,
        }
    }
}

impl SoupRepairParams {
    /// Only drop broken polygons and unused points.
    pub fn minimal() -> Self {
        Self {
            merge_duplicate_points: false,
            remove_duplicate_polygons: false,
            orient: false,
        }
    }

    pub fn validate(&self) -> MeshResult<()> {
        Ok(())
    }
}

/// What [`repair_polygon_soup`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoupRepairReport {
    pub points_merged: usize,
    pub degenerate_polygons_removed: usize,
    pub duplicate_polygons_removed: usize,
    pub unreferenced_points_removed: usize,
    pub polygons_flipped: usize,
    pub points_after: usize,
    pub polygons_after: usize,
}

impl fmt::Display for SoupRepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Points merged: {}", self.points_merged)?;
        writeln!(f, "Degenerate polygons removed: {}", self.degenerate_polygons_removed)?;
        writeln!(f, "Duplicate polygons removed: {}", self.duplicate_polygons_removed)?;
        writeln!(f, "Unreferenced points removed: {}", self.unreferenced_points_removed)?;
        writeln!(f, "Polygons flipped: {}", self.polygons_flipped)?;
        writeln!(
            f,
            "After repair, the soup has {} vertices and {} faces",
            self.points_after, self.polygons_after
        )
    }
}

/// Clean `soup` in place.
///
/// Steps, in order: merge coincident points, drop polygons with fewer than
/// three distinct corners, drop duplicate polygons, drop unused points, and
/// orient each edge-connected patch consistently.
pub fn repair_polygon_soup(soup: &mut PolygonSoup, params: &SoupRepairParams) -> MeshResult<SoupRepairReport> {
    params.validate()?;
    let _timer = OperationTimer::with_context("repair_soup", soup.polygon_count(), soup.point_count());
    let mut report = SoupRepairReport::default();

    if params.merge_duplicate_points {
        report.points_merged = merge_duplicate_points(soup);
    }
    report.degenerate_polygons_removed = remove_degenerate_polygons(soup);
    if params.remove_duplicate_polygons {
        report.duplicate_polygons_removed = remove_duplicate_polygons(soup);
    }
    report.unreferenced_points_removed = remove_unreferenced_points(soup);
    if params.orient {
        report.polygons_flipped = orient_polygons(soup);
    }

    report.points_after = soup.point_count();
    report.polygons_after = soup.polygon_count();
    info!(
        points = report.points_after,
        polygons = report.polygons_after,
        merged = report.points_merged,
        flipped = report.polygons_flipped,
        "Soup repaired"
    );
    Ok(report)
}

/// Point every polygon at the first point with the same coordinates.
///
/// The merged-away points stay in place until unreferenced points are removed.
pub fn merge_duplicate_points(soup: &mut PolygonSoup) -> usize {
    let mut first: HashMap<PointKey, u32> = HashMap::with_capacity(soup.points.len());
    let remap: Vec<u32> = soup
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| *first.entry(PointKey::new(&p.position)).or_insert(i as u32))
        .collect();

    let merged = soup.points.len() - first.len();
    if merged > 0 {
        for poly in &mut soup.polygons {
            for v in poly.iter_mut() {
                if let Some(&to) = remap.get(*v as usize) {
                    *v = to;
                }
            }
        }
        debug!(merged, "Merged coincident points");
    }
    merged
}

/// Collapse repeated consecutive corners and drop polygons left with fewer
/// than three, or that reference a point that does not exist.
pub fn remove_degenerate_polygons(soup: &mut PolygonSoup) -> usize {
    let point_count = soup.points.len() as u32;
    let before = soup.polygons.len();
    for poly in &mut soup.polygons {
        poly.dedup();
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
    }
    soup.polygons.retain(|p| {
        if p.len() < 3 || p.iter().any(|&v| v >= point_count) {
            return false;
        }
        let mut corners = p.clone();
        corners.sort_unstable();
        corners.dedup();
        corners.len() >= 3
    });
    before - soup.polygons.len()
}

/// Drop polygons with the same corner cycle as an earlier one, in either
/// direction.
pub fn remove_duplicate_polygons(soup: &mut PolygonSoup) -> usize {
    let before = soup.polygons.len();
    let mut seen: HashSet<Vec<u32>> = HashSet::with_capacity(before);
    soup.polygons.retain(|p| seen.insert(canonical_cycle(p)));
    before - soup.polygons.len()
}

/// Smallest rotation of the cycle or its reverse.
fn canonical_cycle(poly: &[u32]) -> Vec<u32> {
    let rotated = |cycle: &[u32]| -> Vec<u32> {
        let start = cycle
            .iter()
            .enumerate()
            .min_by_key(|&(_, v)| v)
            .map_or(0, |(i, _)| i);
        cycle[start..].iter().chain(&cycle[..start]).copied().collect()
    };
    let forward = rotated(poly);
    let mut reversed: Vec<u32> = poly.to_vec();
    reversed.reverse();
    forward.min(rotated(&reversed))
}

/// Drop points no polygon uses, preserving order.
pub fn remove_unreferenced_points(soup: &mut PolygonSoup) -> usize {
    let mut used = vec![false; soup.points.len()];
    for &v in soup.polygons.iter().flatten() {
        if let Some(u) = used.get_mut(v as usize) {
            *u = true;
        }
    }

    let mut remap = vec![u32::MAX; soup.points.len()];
    let mut next = 0u32;
    for (i, &u) in used.iter().enumerate() {
        if u {
            remap[i] = next;
            next += 1;
        }
    }

    let before = soup.points.len();
    let mut flags = used.iter();
    soup.points.retain(|_| flags.next().copied().unwrap_or(false));
    for v in soup.polygons.iter_mut().flatten() {
        *v = remap.get(*v as usize).copied().unwrap_or(u32::MAX);
    }
    before - soup.points.len()
}

/// Flip polygons so that every edge shared by exactly two polygons is
/// traversed in opposite directions, where the patch allows it.
///
/// Each edge-connected patch is flood-filled from its lowest-numbered polygon,
/// which keeps its winding. Edges shared by more than two polygons do not
/// propagate orientation. Returns the number of polygons reversed.
pub fn orient_polygons(soup: &mut PolygonSoup) -> usize {
    let mut edge_polys: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (pi, poly) in soup.polygons.iter().enumerate() {
        for (a, b) in cycle_edges(poly) {
            edge_polys.entry((a.min(b), a.max(b))).or_default().push(pi);
        }
    }

    let count = soup.polygons.len();
    let mut visited = vec![false; count];
    let mut flip = vec![false; count];
    let mut patches = 0;

    for start in 0..count {
        if visited[start] {
            continue;
        }
        patches += 1;
        visited[start] = true;
        let mut queue = VecDeque::from([start]);

        while let Some(pi) = queue.pop_front() {
            for (a, b) in cycle_edges(&soup.polygons[pi]) {
                // Direction of this edge once `pi`'s own flip is applied.
                let (a, b) = if flip[pi] { (b, a) } else { (a, b) };
                let Some(polys) = edge_polys.get(&(a.min(b), a.max(b))) else {
                    continue;
                };
                if polys.len() != 2 {
                    continue;
                }
                let Some(&other) = polys.iter().find(|&&q| q != pi) else {
                    continue;
                };
                if visited[other] {
                    continue;
                }
                visited[other] = true;
                // Same direction in the neighbour means it must be reversed.
                flip[other] = cycle_edges(&soup.polygons[other]).any(|e| e == (a, b));
                queue.push_back(other);
            }
        }
    }

    let mut flipped = 0;
    for (poly, _) in soup.polygons.iter_mut().zip(&flip).filter(|(_, f)| **f) {
        poly.reverse();
        flipped += 1;
    }
    debug!(patches, flipped, "Oriented polygons");
    flipped
}

fn cycle_edges(poly: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    poly.iter().zip(poly.iter().cycle().skip(1)).map(|(&a, &b)| (a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::MeshAdjacency;
    use nalgebra::Point3;

    fn pts(coords: &[[f64; 3]]) -> Vec<Vertex> {
        coords.iter().map(|c| Vertex::from_coords(c[0], c[1], c[2])).collect()
    }

    /// Unit square as two triangles, with the shared corners stored twice
    /// and the second triangle wound backwards.
    fn split_square() -> PolygonSoup {
        PolygonSoup::new(
            pts(&[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ]),
            vec![vec![0, 1, 2], vec![3, 5, 4]],
        )
    }

    #[test]
    fn test_merge_and_orient() {
        let mut soup = split_square();
        let report = repair_polygon_soup(&mut soup, &SoupRepairParams::default()).unwrap();

        assert_eq!(report.points_merged, 2);
        assert_eq!(report.unreferenced_points_removed, 2);
        assert_eq!(report.polygons_flipped, 1);
        assert_eq!(soup.point_count(), 4);

        let mesh = soup.to_mesh();
        let adj = MeshAdjacency::build(&mesh.faces);
        assert_eq!(adj.boundary_edge_count(), 4);
        // Both triangles now face +z.
        for tri in mesh.triangles() {
            assert!(tri.normal_unnormalized().z > 0.0);
        }
    }

    #[test]
    fn test_degenerate_polygons_removed() {
        let mut soup = PolygonSoup::new(
            pts(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            vec![vec![0, 1, 2], vec![0, 0, 1], vec![0, 1, 1, 0], vec![0, 1], vec![0, 1, 7]],
        );
        let removed = remove_degenerate_polygons(&mut soup);
        assert_eq!(removed, 4);
        assert_eq!(soup.polygons, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_duplicate_polygons_any_rotation_or_direction() {
        let mut soup = PolygonSoup::new(
            pts(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            vec![vec![0, 1, 2, 3], vec![2, 3, 0, 1], vec![3, 2, 1, 0], vec![0, 2, 1, 3]],
        );
        assert_eq!(remove_duplicate_polygons(&mut soup), 2);
        assert_eq!(soup.polygon_count(), 2);
    }

    #[test]
    fn test_negative_zero_merges() {
        let mut soup = PolygonSoup::new(
            pts(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-0.0, 0.0, 0.0]]),
            vec![vec![3, 1, 2]],
        );
        assert_eq!(merge_duplicate_points(&mut soup), 1);
        assert_eq!(soup.polygons[0], vec![0, 1, 2]);
    }

    #[test]
    fn test_quad_fan_triangulation() {
        let soup = PolygonSoup::new(
            pts(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
            vec![vec![0, 1, 2, 3]],
        );
        let mesh = soup.to_mesh();
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!((mesh.surface_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_orient_chain_of_flips() {
        // Strip of four triangles with alternating bad winding.
        let mut soup = PolygonSoup::new(
            (0..6)
                .map(|i| Vertex::new(Point3::new((i / 2) as f64, (i % 2) as f64, 0.0)))
                .collect(),
            vec![vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]],
        );
        orient_polygons(&mut soup);
        let mesh = soup.to_mesh();
        let sign = mesh.triangles().next().map(|t| t.normal_unnormalized().z.signum());
        assert!(mesh.triangles().all(|t| Some(t.normal_unnormalized().z.signum()) == sign));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut soup = split_square();
        repair_polygon_soup(&mut soup, &SoupRepairParams::default()).unwrap();
        let once = soup.clone();
        let report = repair_polygon_soup(&mut soup, &SoupRepairParams::default()).unwrap();
        assert_eq!(soup, once);
        assert_eq!(report.points_merged + report.polygons_flipped, 0);
    }

    #[test]
    fn test_minimal_params_keep_duplicates() {
        let mut soup = split_square();
        let report = repair_polygon_soup(&mut soup, &SoupRepairParams::minimal()).unwrap();
        assert_eq!(report.points_merged, 0);
        assert_eq!(report.polygons_flipped, 0);
        assert_eq!(soup.point_count(), 6);
    }
}
