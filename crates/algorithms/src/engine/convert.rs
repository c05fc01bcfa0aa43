//! Conversion between the abstract geometry tree and the backend's native
//! `geo` representation.
//!
//! `geo` geometries are planar; Z and M values are carried alongside in
//! traversal order so that a round trip restores them exactly.

use geo::{Coord, Geometry as GeoGeometry};
use topotrace_core::geometry::{
    CoordDims, Coordinate, Geometry, GeometryCollection, GeometryType, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, DEFAULT_ARC_STEP,
};

use super::error::{EngineError, Result};

/// Geometry in backend form, owned by the engine that built it
#[derive(Debug, Clone, PartialEq)]
pub struct NativeGeometry {
    geom: GeoGeometry<f64>,
    source: GeometryType,
    dims: CoordDims,
    /// (z, m) per vertex, only filled when `dims` carries Z or M
    extra: Vec<(f64, f64)>,
}

impl NativeGeometry {
    /// Wrap a planar backend geometry (results of backend operations)
    pub fn planar(geom: GeoGeometry<f64>) -> Self {
        let source = native_type(&geom);
        Self {
            geom,
            source,
            dims: CoordDims::XY,
            extra: Vec::new(),
        }
    }

    pub fn geo(&self) -> &GeoGeometry<f64> {
        &self.geom
    }

    pub fn into_geo(self) -> GeoGeometry<f64> {
        self.geom
    }

    pub fn dims(&self) -> CoordDims {
        self.dims
    }

    /// Variant of the abstract geometry this was built from
    pub fn source_type(&self) -> GeometryType {
        self.source
    }
}

fn native_type(geom: &GeoGeometry<f64>) -> GeometryType {
    match geom {
        GeoGeometry::Point(_) => GeometryType::Point,
        GeoGeometry::Line(_) | GeoGeometry::LineString(_) => GeometryType::LineString,
        GeoGeometry::Polygon(_) | GeoGeometry::Rect(_) | GeoGeometry::Triangle(_) => {
            GeometryType::Polygon
        }
        GeoGeometry::MultiPoint(_) => GeometryType::MultiPoint,
        GeoGeometry::MultiLineString(_) => GeometryType::MultiLineString,
        GeoGeometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        GeoGeometry::GeometryCollection(_) => GeometryType::GeometryCollection,
    }
}

/// Round to the nearest multiple of `precision` (no-op when `precision <= 0`)
#[inline]
pub fn snap_value(value: f64, precision: f64) -> f64 {
    if precision > 0.0 {
        (value / precision).round() * precision
    } else {
        value
    }
}

struct Builder {
    precision: f64,
    dims: CoordDims,
    extra: Vec<(f64, f64)>,
}

impl Builder {
    fn keeps_extra(&self) -> bool {
        self.dims.z || self.dims.m
    }

    fn coord(&mut self, c: &Coordinate) -> Coord<f64> {
        if self.keeps_extra() {
            let z = if self.dims.z { snap_value(c.z, self.precision) } else { 0.0 };
            let m = if self.dims.m { c.m } else { 0.0 };
            self.extra.push((z, m));
        }
        Coord {
            x: snap_value(c.x, self.precision),
            y: snap_value(c.y, self.precision),
        }
    }

    fn point(&mut self, c: &Coordinate) -> geo::Point<f64> {
        geo::Point(self.coord(c))
    }

    fn line(&mut self, line: &LineString) -> Result<geo::LineString<f64>> {
        if line.coords.len() == 1 {
            return Err(EngineError::InvalidInput(
                "LineString must contain 0 or more than 1 points".to_string(),
            ));
        }
        let coords: Vec<Coord<f64>> = line.coords.iter().map(|c| self.coord(c)).collect();
        Ok(geo::LineString::new(coords))
    }

    fn ring(&mut self, ring: &LineString) -> Result<geo::LineString<f64>> {
        if ring.is_empty() {
            return Ok(geo::LineString::new(Vec::new()));
        }
        let mut coords: Vec<Coord<f64>> = ring.coords.iter().map(|c| self.coord(c)).collect();
        if coords.first() != coords.last() {
            if let Some(first) = ring.coords.first() {
                let closing = self.coord(first);
                coords.push(closing);
            }
        }
        if coords.len() < 4 {
            return Err(EngineError::InvalidInput(format!(
                "Invalid number of points in LinearRing found {} - must be 0 or >= 4",
                coords.len()
            )));
        }
        Ok(geo::LineString::new(coords))
    }

    fn polygon(&mut self, polygon: &Polygon) -> Result<geo::Polygon<f64>> {
        if polygon.is_empty() {
            return Ok(geo::Polygon::new(geo::LineString::new(Vec::new()), Vec::new()));
        }
        let exterior = self.ring(&polygon.exterior)?;
        let interiors = polygon
            .interiors
            .iter()
            .map(|r| self.ring(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(geo::Polygon::new(exterior, interiors))
    }

    fn geometry(&mut self, geometry: &Geometry) -> Result<GeoGeometry<f64>> {
        Ok(match geometry {
            Geometry::Point(p) => match &p.coord {
                Some(c) => GeoGeometry::Point(self.point(c)),
                None => GeoGeometry::MultiPoint(geo::MultiPoint::new(Vec::new())),
            },
            Geometry::LineString(l) => GeoGeometry::LineString(self.line(l)?),
            Geometry::CircularString(c) => {
                GeoGeometry::LineString(self.line(&c.linearize(DEFAULT_ARC_STEP))?)
            }
            Geometry::Polygon(p) => GeoGeometry::Polygon(self.polygon(p)?),
            Geometry::MultiPoint(mp) => GeoGeometry::MultiPoint(geo::MultiPoint::new(
                mp.points
                    .iter()
                    .filter_map(|p| p.coord.as_ref())
                    .map(|c| self.point(c))
                    .collect(),
            )),
            Geometry::MultiLineString(ml) => GeoGeometry::MultiLineString(geo::MultiLineString::new(
                ml.lines.iter().map(|l| self.line(l)).collect::<Result<Vec<_>>>()?,
            )),
            Geometry::MultiPolygon(mp) => GeoGeometry::MultiPolygon(geo::MultiPolygon::new(
                mp.polygons
                    .iter()
                    .map(|p| self.polygon(p))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Geometry::GeometryCollection(gc) => {
                GeoGeometry::GeometryCollection(geo::GeometryCollection(
                    gc.geometries
                        .iter()
                        .map(|g| self.geometry(g))
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
        })
    }
}

/// Build the native form of `geometry`, snapping coordinates to `precision`
/// when it is positive.
pub fn to_native(geometry: &Geometry, precision: f64) -> Result<NativeGeometry> {
    let mut builder = Builder {
        precision,
        dims: geometry.dims(),
        extra: Vec::new(),
    };
    let geom = builder.geometry(geometry)?;
    Ok(NativeGeometry {
        geom,
        source: geometry.geometry_type(),
        dims: builder.dims,
        extra: builder.extra,
    })
}

/// Build a native point directly from a coordinate
pub fn point_to_native(coord: &Coordinate, dims: CoordDims, precision: f64) -> NativeGeometry {
    let mut builder = Builder {
        precision,
        dims,
        extra: Vec::new(),
    };
    let point = builder.point(coord);
    NativeGeometry {
        geom: GeoGeometry::Point(point),
        source: GeometryType::Point,
        dims,
        extra: builder.extra,
    }
}

struct Reader<'a> {
    dims: CoordDims,
    extra: std::slice::Iter<'a, (f64, f64)>,
}

impl Reader<'_> {
    fn coord(&mut self, c: &Coord<f64>) -> Coordinate {
        let (z, m) = self.extra.next().copied().unwrap_or((0.0, 0.0));
        Coordinate { x: c.x, y: c.y, z, m }.masked(self.dims)
    }

    fn line(&mut self, line: &geo::LineString<f64>) -> LineString {
        LineString::new(line.0.iter().map(|c| self.coord(c)).collect(), self.dims)
    }

    fn polygon(&mut self, polygon: &geo::Polygon<f64>) -> Polygon {
        if polygon.exterior().0.is_empty() {
            return Polygon::empty(self.dims);
        }
        Polygon {
            exterior: self.line(polygon.exterior()),
            interiors: polygon.interiors().iter().map(|r| self.line(r)).collect(),
            dims: self.dims,
        }
    }

    fn geometry(&mut self, geom: &GeoGeometry<f64>) -> Geometry {
        let dims = self.dims;
        match geom {
            GeoGeometry::Point(p) => Geometry::Point(Point::from_coord(self.coord(&p.0), dims)),
            GeoGeometry::Line(l) => Geometry::LineString(LineString::new(
                vec![self.coord(&l.start), self.coord(&l.end)],
                dims,
            )),
            GeoGeometry::LineString(l) => Geometry::LineString(self.line(l)),
            GeoGeometry::Polygon(p) => Geometry::Polygon(self.polygon(p)),
            GeoGeometry::Rect(r) => Geometry::Polygon(self.polygon(&r.to_polygon())),
            GeoGeometry::Triangle(t) => Geometry::Polygon(self.polygon(&t.to_polygon())),
            GeoGeometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
                mp.0.iter().map(|p| Point::from_coord(self.coord(&p.0), dims)).collect(),
                dims,
            )),
            GeoGeometry::MultiLineString(ml) => Geometry::MultiLineString(MultiLineString::new(
                ml.0.iter().map(|l| self.line(l)).collect(),
                dims,
            )),
            GeoGeometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
                mp.0.iter().map(|p| self.polygon(p)).collect(),
                dims,
            )),
            GeoGeometry::GeometryCollection(gc) => Geometry::GeometryCollection(
                GeometryCollection::new(gc.0.iter().map(|g| self.geometry(g)).collect(), dims),
            ),
        }
    }
}

/// Convert a native geometry back into the abstract tree
pub fn from_native(native: &NativeGeometry) -> Geometry {
    let mut reader = Reader {
        dims: native.dims,
        extra: native.extra.iter(),
    };
    match (&native.geom, native.source) {
        (GeoGeometry::MultiPoint(mp), GeometryType::Point) if mp.0.is_empty() => {
            Geometry::Point(Point::empty(native.dims))
        }
        (geom, _) => reader.geometry(geom),
    }
}

/// Convert a planar backend result into the abstract tree, in XY only
pub fn from_geo(geom: &GeoGeometry<f64>) -> Geometry {
    let mut reader = Reader {
        dims: CoordDims::XY,
        extra: (&[] as &[(f64, f64)]).iter(),
    };
    reader.geometry(geom)
}

/// Planar line from abstract line (Z/M dropped, no validation)
pub fn line_to_geo(line: &LineString) -> geo::LineString<f64> {
    geo::LineString::new(line.coords.iter().map(Coordinate::xy).collect())
}

pub fn line_from_geo(line: &geo::LineString<f64>) -> LineString {
    LineString::new(line.0.iter().map(|c| Coordinate::new(c.x, c.y)).collect(), CoordDims::XY)
}

/// Collapse a list of planar parts into the simplest geometry holding them:
/// a single part stays single, homogeneous parts become a multi geometry
/// and mixed parts a collection.
pub fn collapse(parts: Vec<GeoGeometry<f64>>) -> GeoGeometry<f64> {
    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut polygons = Vec::new();
    let mut others = Vec::new();

    for part in parts {
        match part {
            GeoGeometry::Point(p) => points.push(p),
            GeoGeometry::MultiPoint(mp) => points.extend(mp.0),
            GeoGeometry::Line(l) => lines.push(geo::LineString::new(vec![l.start, l.end])),
            GeoGeometry::LineString(l) => lines.push(l),
            GeoGeometry::MultiLineString(ml) => lines.extend(ml.0),
            GeoGeometry::Polygon(p) => polygons.push(p),
            GeoGeometry::MultiPolygon(mp) => polygons.extend(mp.0),
            GeoGeometry::Rect(r) => polygons.push(r.to_polygon()),
            GeoGeometry::Triangle(t) => polygons.push(t.to_polygon()),
            GeoGeometry::GeometryCollection(gc) => others.extend(gc.0),
        }
    }

    if !others.is_empty() {
        let mut all: Vec<GeoGeometry<f64>> = Vec::new();
        all.extend(polygons.into_iter().map(GeoGeometry::Polygon));
        all.extend(lines.into_iter().map(GeoGeometry::LineString));
        all.extend(points.into_iter().map(GeoGeometry::Point));
        all.extend(others);
        return GeoGeometry::GeometryCollection(geo::GeometryCollection(all));
    }

    let kinds = usize::from(!points.is_empty())
        + usize::from(!lines.is_empty())
        + usize::from(!polygons.is_empty());
    if kinds > 1 {
        let mut all: Vec<GeoGeometry<f64>> = Vec::new();
        all.extend(polygons.into_iter().map(GeoGeometry::Polygon));
        all.extend(lines.into_iter().map(GeoGeometry::LineString));
        all.extend(points.into_iter().map(GeoGeometry::Point));
        return GeoGeometry::GeometryCollection(geo::GeometryCollection(all));
    }

    if polygons.len() == 1 {
        return GeoGeometry::Polygon(polygons.remove(0));
    }
    if !polygons.is_empty() {
        return GeoGeometry::MultiPolygon(geo::MultiPolygon::new(polygons));
    }
    if lines.len() == 1 {
        return GeoGeometry::LineString(lines.remove(0));
    }
    if !lines.is_empty() {
        return GeoGeometry::MultiLineString(geo::MultiLineString::new(lines));
    }
    if points.len() == 1 {
        return GeoGeometry::Point(points.remove(0));
    }
    if !points.is_empty() {
        return GeoGeometry::MultiPoint(geo::MultiPoint::new(points));
    }
    GeoGeometry::GeometryCollection(geo::GeometryCollection(Vec::new()))
}

/// Empty geometry of the given topological dimension
pub fn empty_of_dimension(dimension: u8) -> GeoGeometry<f64> {
    match dimension {
        0 => GeoGeometry::MultiPoint(geo::MultiPoint::new(Vec::new())),
        1 => GeoGeometry::LineString(geo::LineString::new(Vec::new())),
        _ => GeoGeometry::Polygon(geo::Polygon::new(geo::LineString::new(Vec::new()), Vec::new())),
    }
}

/// True when the backend geometry has no vertices
pub fn is_empty_geo(geom: &GeoGeometry<f64>) -> bool {
    match geom {
        GeoGeometry::Point(_) | GeoGeometry::Line(_) | GeoGeometry::Rect(_) | GeoGeometry::Triangle(_) => false,
        GeoGeometry::LineString(l) => l.0.is_empty(),
        GeoGeometry::Polygon(p) => p.exterior().0.is_empty(),
        GeoGeometry::MultiPoint(mp) => mp.0.is_empty(),
        GeoGeometry::MultiLineString(ml) => ml.0.iter().all(|l| l.0.is_empty()),
        GeoGeometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().all(is_empty_geo),
    }
}

/// Topological dimension of a backend geometry (highest member for collections)
pub fn dimension_geo(geom: &GeoGeometry<f64>) -> u8 {
    match geom {
        GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => 0,
        GeoGeometry::Line(_) | GeoGeometry::LineString(_) | GeoGeometry::MultiLineString(_) => 1,
        GeoGeometry::Polygon(_)
        | GeoGeometry::MultiPolygon(_)
        | GeoGeometry::Rect(_)
        | GeoGeometry::Triangle(_) => 2,
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().map(dimension_geo).max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(wkt: &str) {
        let g = Geometry::from_wkt(wkt).unwrap();
        let native = to_native(&g, 0.0).unwrap();
        assert_eq!(from_native(&native), g, "round trip of {}", wkt);
    }

    #[test]
    fn test_roundtrip_preserves_coordinates_and_dims() {
        roundtrip("POINT (1 2)");
        roundtrip("POINT Z (1 2 3)");
        roundtrip("POINT M (1 2 4)");
        roundtrip("POINT ZM (1 2 3 4)");
        roundtrip("POINT EMPTY");
        roundtrip("LINESTRING (0 0, 10 0, 20 10)");
        roundtrip("LINESTRING ZM (0 0 1 2, 10 0 3 4)");
        roundtrip("LINESTRING EMPTY");
        roundtrip("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 2))");
        roundtrip("POLYGON Z ((0 0 1, 10 0 2, 10 10 3, 0 0 1))");
        roundtrip("POLYGON EMPTY");
        roundtrip("MULTIPOINT M ((0 0 1), (5 5 2))");
        roundtrip("MULTILINESTRING ((0 0, 1 1), (2 2, 3 3))");
        roundtrip("MULTIPOLYGON Z (((0 0 1, 1 0 1, 1 1 1, 0 0 1)), ((5 5 2, 6 5 2, 6 6 2, 5 5 2)))");
        roundtrip("GEOMETRYCOLLECTION (POINT (1 1), LINESTRING (0 0, 1 1))");
    }

    #[test]
    fn test_precision_snaps_xy_and_z() {
        let g = Geometry::from_wkt("POINT ZM (1.26 2.24 3.31 4.47)").unwrap();
        let native = to_native(&g, 0.1).unwrap();
        match from_native(&native) {
            Geometry::Point(p) => {
                let c = p.coord.unwrap();
                assert!((c.x - 1.3).abs() < 1e-12);
                assert!((c.y - 2.2).abs() < 1e-12);
                assert!((c.z - 3.3).abs() < 1e-12);
                assert_eq!(c.m, 4.47);
            }
            other => panic!("unexpected {:?}", other),
        }
        let p = point_to_native(&Coordinate::new(0.4, 0.6), CoordDims::XY, 1.0);
        assert_eq!(p.geo(), &GeoGeometry::Point(geo::Point::new(0.0, 1.0)));
    }

    #[test]
    fn test_single_point_line_is_rejected() {
        let g = Geometry::LineString(LineString::from_xy(&[(1.0, 1.0)]));
        assert!(matches!(to_native(&g, 0.0), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_open_ring_is_closed() {
        let g = Geometry::Polygon(Polygon::new(
            LineString::from_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            vec![],
        ));
        let native = to_native(&g, 0.0).unwrap();
        match native.geo() {
            GeoGeometry::Polygon(p) => assert_eq!(p.exterior().0.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collapse_single_and_mixed() {
        let single = collapse(vec![GeoGeometry::Point(geo::Point::new(1.0, 1.0))]);
        assert!(matches!(single, GeoGeometry::Point(_)));
        let mixed = collapse(vec![
            GeoGeometry::Point(geo::Point::new(1.0, 1.0)),
            GeoGeometry::LineString(geo::LineString::from(vec![(0.0, 0.0), (1.0, 0.0)])),
        ]);
        assert!(matches!(mixed, GeoGeometry::GeometryCollection(_)));
    }
}
