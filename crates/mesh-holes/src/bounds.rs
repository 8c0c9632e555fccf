//! Incremental axis-aligned bounding box for hole boundaries.

use nalgebra::Point3;

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in x, y, z order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Running min/max box grown one point at a time.
///
/// Starts empty. The classifier extends it with each boundary vertex it visits
/// and checks the per-axis extent after every step.
///
/// ```
/// use mesh_holes::{Axis, HoleBox};
/// use nalgebra::Point3;
///
/// let mut bbox = HoleBox::empty();
/// bbox.extend(&Point3::new(0.0, 0.0, 0.0));
/// bbox.extend(&Point3::new(2.0, -1.0, 0.5));
/// assert_eq!(bbox.extent(Axis::X), 2.0);
/// assert_eq!(bbox.extent(Axis::Y), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl HoleBox {
    /// Box containing nothing. Extents of an empty box are zero.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Box around the given points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.extend(p);
        }
        bbox
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `p`.
    #[inline]
    pub fn extend(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// `max - min` along one axis.
    #[inline]
    pub fn extent(&self, axis: Axis) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let i = axis.index();
        self.max[i] - self.min[i]
    }

    /// The axis with the largest extent and that extent. Ties go to the earlier axis.
    pub fn widest_axis(&self) -> (Axis, f64) {
        Axis::ALL
            .into_iter()
            .map(|a| (a, self.extent(a)))
            .fold((Axis::X, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            })
    }

    /// First axis, in x, y, z order, whose extent exceeds `limit`.
    #[inline]
    pub fn first_axis_exceeding(&self, limit: f64) -> Option<(Axis, f64)> {
        Axis::ALL
            .into_iter()
            .map(|a| (a, self.extent(a)))
            .find(|&(_, e)| e > limit)
    }
}

impl Default for HoleBox {
    fn default() -> Self {
        Self::empty()
    }
}
