//! Vertex and dimensionality types

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Which optional ordinates a geometry node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CoordDims {
    pub z: bool,
    pub m: bool,
}

impl CoordDims {
    pub const XY: CoordDims = CoordDims { z: false, m: false };
    pub const XYZ: CoordDims = CoordDims { z: true, m: false };
    pub const XYM: CoordDims = CoordDims { z: false, m: true };
    pub const XYZM: CoordDims = CoordDims { z: true, m: true };

    pub fn new(z: bool, m: bool) -> Self {
        Self { z, m }
    }

    /// Number of ordinates per vertex (2 to 4)
    pub fn ordinate_count(&self) -> usize {
        2 + usize::from(self.z) + usize::from(self.m)
    }

    /// Dimensions shared by both inputs
    pub fn intersect(&self, other: CoordDims) -> CoordDims {
        CoordDims {
            z: self.z && other.z,
            m: self.m && other.m,
        }
    }

    /// WKT dimension tag, empty for plain XY
    pub fn wkt_tag(&self) -> &'static str {
        match (self.z, self.m) {
            (false, false) => "",
            (true, false) => "Z",
            (false, true) => "M",
            (true, true) => "ZM",
        }
    }
}

/// A single vertex.
///
/// `z` and `m` are only meaningful when the owning geometry's [`CoordDims`]
/// flags say so; otherwise they hold `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0, m: 0.0 }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, m: 0.0 }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Self {
        Self { x, y, z: 0.0, m }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self { x, y, z, m }
    }

    /// Planar part of the vertex
    pub fn xy(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }

    /// True when the planar ordinates match exactly
    pub fn same_xy(&self, other: &Coordinate) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn distance_2d(&self, other: &Coordinate) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Clear the ordinates not covered by `dims`
    pub fn masked(mut self, dims: CoordDims) -> Self {
        if !dims.z {
            self.z = 0.0;
        }
        if !dims.m {
            self.m = 0.0;
        }
        self
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::new(c.x, c.y)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Coordinate::new(x, y)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        c.xy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinate_count() {
        assert_eq!(CoordDims::XY.ordinate_count(), 2);
        assert_eq!(CoordDims::XYZ.ordinate_count(), 3);
        assert_eq!(CoordDims::XYZM.ordinate_count(), 4);
    }

    #[test]
    fn test_masked_clears_missing_ordinates() {
        let c = Coordinate::xyzm(1.0, 2.0, 3.0, 4.0).masked(CoordDims::XYM);
        assert_eq!(c, Coordinate::xym(1.0, 2.0, 4.0));
    }
}
