//! Multi-part geometries

use super::coord::CoordDims;
use super::curve::LineString;
use super::surface::Polygon;
use super::{Geometry, Point};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPoint {
    pub points: Vec<Point>,
    pub dims: CoordDims,
}

impl MultiPoint {
    pub fn new(points: Vec<Point>, dims: CoordDims) -> Self {
        Self { points, dims }
    }

    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        Self {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            dims: CoordDims::XY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiLineString {
    pub lines: Vec<LineString>,
    pub dims: CoordDims,
}

impl MultiLineString {
    pub fn new(lines: Vec<LineString>, dims: CoordDims) -> Self {
        Self { lines, dims }
    }

    pub fn length(&self) -> f64 {
        self.lines.iter().map(LineString::length).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
    pub dims: CoordDims,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>, dims: CoordDims) -> Self {
        Self { polygons, dims }
    }
}

/// Heterogeneous collection of geometries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryCollection {
    pub geometries: Vec<Geometry>,
    pub dims: CoordDims,
}

impl GeometryCollection {
    pub fn new(geometries: Vec<Geometry>, dims: CoordDims) -> Self {
        Self { geometries, dims }
    }
}
