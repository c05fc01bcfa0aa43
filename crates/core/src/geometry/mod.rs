//! Abstract geometry model
//!
//! A closed set of geometry variants, each carrying its own dimensionality
//! flags ([`CoordDims`]). This is the representation exchanged with the
//! geometry engine and the tracer; it keeps Z and M values that the planar
//! algorithms ignore.

mod collection;
mod coord;
mod curve;
mod rect;
mod surface;
mod wkt;

pub use collection::{GeometryCollection, MultiLineString, MultiPoint, MultiPolygon};
pub use coord::{CoordDims, Coordinate};
pub use curve::{CircularString, LineString, DEFAULT_ARC_STEP};
pub use rect::Rectangle;
pub use surface::Polygon;

use crate::error::Result;
use std::fmt;

/// A single position; `None` is the empty point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point {
    pub coord: Option<Coordinate>,
    pub dims: CoordDims,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coord: Some(Coordinate::new(x, y)),
            dims: CoordDims::XY,
        }
    }

    pub fn from_coord(coord: Coordinate, dims: CoordDims) -> Self {
        Self {
            coord: Some(coord.masked(dims)),
            dims,
        }
    }

    pub fn empty(dims: CoordDims) -> Self {
        Self { coord: None, dims }
    }

    pub fn x(&self) -> f64 {
        self.coord.map_or(f64::NAN, |c| c.x)
    }

    pub fn y(&self) -> f64 {
        self.coord.map_or(f64::NAN, |c| c.y)
    }
}

/// Variant tag of a [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    CircularString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Topological dimension of the variant (collections report 0 here;
    /// use [`Geometry::dimension`] for their content)
    pub fn dimension(&self) -> u8 {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => 0,
            GeometryType::LineString
            | GeometryType::CircularString
            | GeometryType::MultiLineString => 1,
            GeometryType::Polygon | GeometryType::MultiPolygon => 2,
            GeometryType::GeometryCollection => 0,
        }
    }

    pub fn wkt_name(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::CircularString => "CircularString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wkt_name())
    }
}

/// Abstract geometry tree
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    CircularString(CircularString),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
}

impl Geometry {
    /// Parse a WKT string
    pub fn from_wkt(text: &str) -> Result<Geometry> {
        wkt::parse(text)
    }

    /// Serialize to WKT
    pub fn to_wkt(&self) -> String {
        wkt::write(self)
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::CircularString(_) => GeometryType::CircularString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    pub fn dims(&self) -> CoordDims {
        match self {
            Geometry::Point(g) => g.dims,
            Geometry::LineString(g) => g.dims,
            Geometry::CircularString(g) => g.dims,
            Geometry::Polygon(g) => g.dims,
            Geometry::MultiPoint(g) => g.dims,
            Geometry::MultiLineString(g) => g.dims,
            Geometry::MultiPolygon(g) => g.dims,
            Geometry::GeometryCollection(g) => g.dims,
        }
    }

    /// Topological dimension: 0 for points, 1 for curves, 2 for surfaces.
    /// Collections report the highest dimension among their members.
    pub fn dimension(&self) -> u8 {
        match self {
            Geometry::GeometryCollection(gc) => gc
                .geometries
                .iter()
                .map(Geometry::dimension)
                .max()
                .unwrap_or(0),
            other => other.geometry_type().dimension(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(p) => p.coord.is_none(),
            Geometry::LineString(l) => l.is_empty(),
            Geometry::CircularString(c) => c.is_empty(),
            Geometry::Polygon(p) => p.is_empty(),
            Geometry::MultiPoint(mp) => mp.points.iter().all(|p| p.coord.is_none()),
            Geometry::MultiLineString(ml) => ml.lines.iter().all(LineString::is_empty),
            Geometry::MultiPolygon(mp) => mp.polygons.iter().all(Polygon::is_empty),
            Geometry::GeometryCollection(gc) => gc.geometries.iter().all(Geometry::is_empty),
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(
            self,
            Geometry::MultiPoint(_)
                | Geometry::MultiLineString(_)
                | Geometry::MultiPolygon(_)
                | Geometry::GeometryCollection(_)
        )
    }

    /// All vertices in traversal order
    pub fn coordinates(&self) -> Vec<Coordinate> {
        let mut out = Vec::new();
        self.visit_coordinates(&mut |c| out.push(*c));
        out
    }

    pub fn num_vertices(&self) -> usize {
        let mut n = 0;
        self.visit_coordinates(&mut |_| n += 1);
        n
    }

    fn visit_coordinates(&self, f: &mut dyn FnMut(&Coordinate)) {
        match self {
            Geometry::Point(p) => {
                if let Some(c) = &p.coord {
                    f(c);
                }
            }
            Geometry::LineString(l) => l.coords.iter().for_each(|c| f(c)),
            Geometry::CircularString(l) => l.coords.iter().for_each(|c| f(c)),
            Geometry::Polygon(p) => p.rings().flat_map(|r| r.coords.iter()).for_each(|c| f(c)),
            Geometry::MultiPoint(mp) => mp.points.iter().filter_map(|p| p.coord.as_ref()).for_each(|c| f(c)),
            Geometry::MultiLineString(ml) => ml.lines.iter().flat_map(|l| l.coords.iter()).for_each(|c| f(c)),
            Geometry::MultiPolygon(mp) => mp
                .polygons
                .iter()
                .flat_map(|p| p.rings())
                .flat_map(|r| r.coords.iter())
                .for_each(|c| f(c)),
            Geometry::GeometryCollection(gc) => {
                for g in &gc.geometries {
                    g.visit_coordinates(f);
                }
            }
        }
    }

    /// Bounding rectangle of all vertices (empty rectangle for empty geometries)
    pub fn bounding_box(&self) -> Rectangle {
        let mut rect = Rectangle::empty();
        self.visit_coordinates(&mut |c| rect.include(c.x, c.y));
        rect
    }

    /// Number of parts: members of a multi geometry, 1 for a non-empty single
    /// geometry.
    pub fn num_parts(&self) -> usize {
        match self {
            Geometry::MultiPoint(mp) => mp.points.len(),
            Geometry::MultiLineString(ml) => ml.lines.len(),
            Geometry::MultiPolygon(mp) => mp.polygons.len(),
            Geometry::GeometryCollection(gc) => gc.geometries.len(),
            other => usize::from(!other.is_empty()),
        }
    }

    /// Parts as standalone geometries
    pub fn parts(&self) -> Vec<Geometry> {
        match self {
            Geometry::MultiPoint(mp) => mp.points.iter().cloned().map(Geometry::Point).collect(),
            Geometry::MultiLineString(ml) => {
                ml.lines.iter().cloned().map(Geometry::LineString).collect()
            }
            Geometry::MultiPolygon(mp) => {
                mp.polygons.iter().cloned().map(Geometry::Polygon).collect()
            }
            Geometry::GeometryCollection(gc) => gc.geometries.clone(),
            other if other.is_empty() => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Replace circular strings by straight-segment approximations
    pub fn linearize(&self, max_angle: f64) -> Geometry {
        match self {
            Geometry::CircularString(c) => Geometry::LineString(c.linearize(max_angle)),
            Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection::new(
                gc.geometries.iter().map(|g| g.linearize(max_angle)).collect(),
                gc.dims,
            )),
            other => other.clone(),
        }
    }

    /// True when the geometry contains circular arcs
    pub fn has_curves(&self) -> bool {
        match self {
            Geometry::CircularString(_) => true,
            Geometry::GeometryCollection(gc) => gc.geometries.iter().any(Geometry::has_curves),
            _ => false,
        }
    }

    /// Apply a fallible mapping to every vertex, keeping the structure
    pub fn try_map_coordinates<F>(&self, f: &mut F) -> Result<Geometry>
    where
        F: FnMut(Coordinate) -> Result<Coordinate>,
    {
        fn map_line<F>(l: &LineString, f: &mut F) -> Result<LineString>
        where
            F: FnMut(Coordinate) -> Result<Coordinate>,
        {
            let coords = l.coords.iter().map(|c| f(*c)).collect::<Result<Vec<_>>>()?;
            Ok(LineString::new(coords, l.dims))
        }
        fn map_polygon<F>(p: &Polygon, f: &mut F) -> Result<Polygon>
        where
            F: FnMut(Coordinate) -> Result<Coordinate>,
        {
            let exterior = map_line(&p.exterior, f)?;
            let interiors = p
                .interiors
                .iter()
                .map(|r| map_line(r, f))
                .collect::<Result<Vec<_>>>()?;
            Ok(Polygon { exterior, interiors, dims: p.dims })
        }
        fn map_point<F>(p: &Point, f: &mut F) -> Result<Point>
        where
            F: FnMut(Coordinate) -> Result<Coordinate>,
        {
            Ok(Point {
                coord: p.coord.map(|c| f(c)).transpose()?,
                dims: p.dims,
            })
        }

        Ok(match self {
            Geometry::Point(p) => Geometry::Point(map_point(p, f)?),
            Geometry::LineString(l) => Geometry::LineString(map_line(l, f)?),
            Geometry::CircularString(c) => {
                let coords = c.coords.iter().map(|v| f(*v)).collect::<Result<Vec<_>>>()?;
                Geometry::CircularString(CircularString::new(coords, c.dims))
            }
            Geometry::Polygon(p) => Geometry::Polygon(map_polygon(p, f)?),
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
                mp.points.iter().map(|p| map_point(p, f)).collect::<Result<Vec<_>>>()?,
                mp.dims,
            )),
            Geometry::MultiLineString(ml) => Geometry::MultiLineString(MultiLineString::new(
                ml.lines.iter().map(|l| map_line(l, f)).collect::<Result<Vec<_>>>()?,
                ml.dims,
            )),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
                mp.polygons.iter().map(|p| map_polygon(p, f)).collect::<Result<Vec<_>>>()?,
                mp.dims,
            )),
            Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection::new(
                gc.geometries
                    .iter()
                    .map(|g| g.try_map_coordinates(f))
                    .collect::<Result<Vec<_>>>()?,
                gc.dims,
            )),
        })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

impl From<Point> for Geometry {
    fn from(g: Point) -> Self {
        Geometry::Point(g)
    }
}

impl From<LineString> for Geometry {
    fn from(g: LineString) -> Self {
        Geometry::LineString(g)
    }
}

impl From<CircularString> for Geometry {
    fn from(g: CircularString) -> Self {
        Geometry::CircularString(g)
    }
}

impl From<Polygon> for Geometry {
    fn from(g: Polygon) -> Self {
        Geometry::Polygon(g)
    }
}

impl From<MultiPoint> for Geometry {
    fn from(g: MultiPoint) -> Self {
        Geometry::MultiPoint(g)
    }
}

impl From<MultiLineString> for Geometry {
    fn from(g: MultiLineString) -> Self {
        Geometry::MultiLineString(g)
    }
}

impl From<MultiPolygon> for Geometry {
    fn from(g: MultiPolygon) -> Self {
        Geometry::MultiPolygon(g)
    }
}

impl From<GeometryCollection> for Geometry {
    fn from(g: GeometryCollection) -> Self {
        Geometry::GeometryCollection(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_and_type() {
        let poly = Geometry::from(Polygon::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]));
        assert_eq!(poly.geometry_type(), GeometryType::Polygon);
        assert_eq!(poly.dimension(), 2);
        assert_eq!(poly.num_vertices(), 4);

        let gc = Geometry::from(GeometryCollection::new(
            vec![Point::new(0.0, 0.0).into(), LineString::from_xy(&[(0.0, 0.0), (1.0, 1.0)]).into()],
            CoordDims::XY,
        ));
        assert_eq!(gc.dimension(), 1);
        assert_eq!(gc.num_parts(), 2);
    }

    #[test]
    fn test_empty_geometries() {
        assert!(Geometry::Point(Point::empty(CoordDims::XY)).is_empty());
        assert!(Geometry::Polygon(Polygon::empty(CoordDims::XY)).is_empty());
        assert!(Geometry::MultiPoint(MultiPoint::default()).is_empty());
        assert!(Geometry::Point(Point::empty(CoordDims::XY)).bounding_box().is_empty());
    }

    #[test]
    fn test_bounding_box() {
        let line = Geometry::from(LineString::from_xy(&[(0.0, 5.0), (10.0, -2.0), (3.0, 8.0)]));
        assert_eq!(line.bounding_box(), Rectangle::new(0.0, -2.0, 10.0, 8.0));
    }

    #[test]
    fn test_try_map_coordinates_keeps_structure() {
        let g = Geometry::from(MultiPoint::from_xy(&[(1.0, 2.0), (3.0, 4.0)]));
        let shifted = g
            .try_map_coordinates(&mut |c| Ok(Coordinate::new(c.x + 1.0, c.y)))
            .unwrap();
        assert_eq!(shifted, Geometry::from(MultiPoint::from_xy(&[(2.0, 2.0), (4.0, 4.0)])));
    }
}
