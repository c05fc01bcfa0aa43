//! Polygons

use super::coord::CoordDims;
use super::curve::LineString;

/// A polygon with one exterior ring and any number of holes.
///
/// An empty exterior ring means an empty polygon.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub exterior: LineString,
    pub interiors: Vec<LineString>,
    pub dims: CoordDims,
}

impl Polygon {
    pub fn new(exterior: LineString, interiors: Vec<LineString>) -> Self {
        let dims = exterior.dims;
        Self {
            exterior,
            interiors,
            dims,
        }
    }

    pub fn empty(dims: CoordDims) -> Self {
        Self {
            exterior: LineString::empty(dims),
            interiors: Vec::new(),
            dims,
        }
    }

    /// Build a 2D polygon without holes from `(x, y)` pairs, closing the ring if needed
    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        let mut ring = LineString::from_xy(points);
        if !ring.is_closed() {
            if let Some(first) = ring.coords.first().copied() {
                ring.coords.push(first);
            }
        }
        Self::new(ring, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.is_empty()
    }

    /// Exterior followed by interior rings
    pub fn rings(&self) -> impl Iterator<Item = &LineString> {
        std::iter::once(&self.exterior)
            .filter(|r| !r.is_empty())
            .chain(self.interiors.iter())
    }

    pub fn num_rings(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            1 + self.interiors.len()
        }
    }

    /// Ring by index, 0 being the exterior
    pub fn ring(&self, index: usize) -> Option<&LineString> {
        if index == 0 {
            (!self.exterior.is_empty()).then_some(&self.exterior)
        } else {
            self.interiors.get(index - 1)
        }
    }

    /// Perimeter over all rings
    pub fn perimeter(&self) -> f64 {
        self.rings().map(LineString::length).sum()
    }
}
