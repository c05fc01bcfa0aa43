//! Validity and simplicity checks.
//!
//! Follows the OGC rules: rings are closed with at least four points and do
//! not self-intersect, holes lie inside their shell and not inside each
//! other, and the polygons of a multi-polygon do not overlap.

use geo::{Coord, Geometry as GeoGeometry, LineString, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::noding::{segment_intersection, SegmentIntersection};
use super::planar::{self, locate_in_ring, Location};

/// Why a geometry is not valid, with the offending location when known
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityError {
    pub reason: String,
    pub location: Option<Coord<f64>>,
}

impl ValidityError {
    fn new(reason: &str, location: Option<Coord<f64>>) -> Self {
        Self {
            reason: reason.to_string(),
            location,
        }
    }
}

impl std::fmt::Display for ValidityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(c) => write!(f, "{} at or near point {} {}", self.reason, c.x, c.y),
            None => write!(f, "{}", self.reason),
        }
    }
}

struct Seg {
    line: usize,
    index: usize,
    a: Coord<f64>,
    b: Coord<f64>,
}

/// Every intersection between segments of the given lines, excluding the
/// shared vertex of consecutive segments on the same line
fn intersections(lines: &[Vec<Coord<f64>>]) -> Vec<(usize, usize, SegmentIntersection)> {
    let mut segs = Vec::new();
    for (li, l) in lines.iter().enumerate() {
        for (si, w) in l.windows(2).enumerate() {
            if w[0] != w[1] {
                segs.push(Seg { line: li, index: si, a: w[0], b: w[1] });
            }
        }
    }
    let tree = RTree::bulk_load(
        segs.iter()
            .enumerate()
            .map(|(i, s)| GeomWithData::new(Rectangle::from_corners([s.a.x, s.a.y], [s.b.x, s.b.y]), i))
            .collect(),
    );

    let mut found = Vec::new();
    for (i, s) in segs.iter().enumerate() {
        let envelope = AABB::from_corners(
            [s.a.x.min(s.b.x), s.a.y.min(s.b.y)],
            [s.a.x.max(s.b.x), s.a.y.max(s.b.y)],
        );
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            let j = candidate.data;
            if j <= i {
                continue;
            }
            let t = &segs[j];
            let Some(ix) = segment_intersection(s.a, s.b, t.a, t.b) else {
                continue;
            };
            if s.line == t.line {
                let line = &lines[s.line];
                let closed = line.first() == line.last();
                let last = line.len() - 2;
                let (lo, hi) = (s.index.min(t.index), s.index.max(t.index));
                let consecutive = hi == lo + 1 || (closed && lo == 0 && hi == last && last > 1);
                if consecutive {
                    if let SegmentIntersection::Point(p) = ix {
                        let shared = if hi == lo + 1 { line[hi] } else { line[0] };
                        if p == shared {
                            continue;
                        }
                    }
                }
            }
            found.push((s.line, t.line, ix));
        }
    }
    found
}

fn point_of(ix: &SegmentIntersection) -> Coord<f64> {
    match ix {
        SegmentIntersection::Point(p) | SegmentIntersection::Overlap(p, _) => *p,
    }
}

fn check_coords(coords: &[Coord<f64>]) -> Result<(), ValidityError> {
    match coords.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
        Some(c) => Err(ValidityError::new("Invalid Coordinate", Some(*c))),
        None => Ok(()),
    }
}

fn check_ring(ring: &LineString<f64>) -> Result<(), ValidityError> {
    check_coords(&ring.0)?;
    if ring.0.is_empty() {
        return Ok(());
    }
    if ring.0.first() != ring.0.last() {
        return Err(ValidityError::new("Ring is not closed", ring.0.first().copied()));
    }
    let mut distinct = ring.0.clone();
    distinct.dedup();
    if distinct.len() < 4 {
        return Err(ValidityError::new(
            "Too few points in geometry component",
            ring.0.first().copied(),
        ));
    }
    if let Some((_, _, ix)) = intersections(&[distinct]).first() {
        return Err(ValidityError::new("Ring Self-intersection", Some(point_of(ix))));
    }
    Ok(())
}

/// A vertex of `ring` not lying on `other`, with its location against `other`
fn ring_location(ring: &LineString<f64>, other: &LineString<f64>) -> Location {
    for c in &ring.0 {
        match locate_in_ring(*c, &other.0) {
            Location::Boundary => continue,
            loc => return loc,
        }
    }
    Location::Boundary
}

fn check_polygon(poly: &Polygon<f64>) -> Result<(), ValidityError> {
    let shell = poly.exterior();
    if shell.0.is_empty() {
        return Ok(());
    }
    check_ring(shell)?;
    for hole in poly.interiors() {
        check_ring(hole)?;
    }

    let rings: Vec<Vec<Coord<f64>>> = std::iter::once(shell)
        .chain(poly.interiors().iter())
        .map(|r| {
            let mut c = r.0.clone();
            c.dedup();
            c
        })
        .collect();
    for (a, b, ix) in intersections(&rings) {
        if a == b {
            continue;
        }
        match ix {
            SegmentIntersection::Overlap(p, _) => {
                return Err(ValidityError::new("Self-intersection", Some(p)));
            }
            SegmentIntersection::Point(p) => {
                let on_vertex = rings[a].contains(&p) || rings[b].contains(&p);
                if !on_vertex {
                    return Err(ValidityError::new("Self-intersection", Some(p)));
                }
            }
        }
    }

    for hole in poly.interiors() {
        if ring_location(hole, shell) == Location::Exterior {
            return Err(ValidityError::new("Hole lies outside shell", hole.0.first().copied()));
        }
    }
    let holes = poly.interiors();
    for (i, a) in holes.iter().enumerate() {
        for b in holes.iter().skip(i + 1) {
            if ring_location(a, b) == Location::Interior || ring_location(b, a) == Location::Interior {
                return Err(ValidityError::new("Nested holes", a.0.first().copied()));
            }
        }
    }
    Ok(())
}

fn check_multipolygon(polys: &[Polygon<f64>]) -> Result<(), ValidityError> {
    for p in polys {
        check_polygon(p)?;
    }
    let shells: Vec<Vec<Coord<f64>>> = polys
        .iter()
        .map(|p| {
            let mut c = p.exterior().0.clone();
            c.dedup();
            c
        })
        .collect();
    for (a, b, ix) in intersections(&shells) {
        if a == b {
            continue;
        }
        match ix {
            SegmentIntersection::Overlap(p, _) => {
                return Err(ValidityError::new("Self-intersection", Some(p)));
            }
            SegmentIntersection::Point(p) => {
                if !shells[a].contains(&p) && !shells[b].contains(&p) {
                    return Err(ValidityError::new("Self-intersection", Some(p)));
                }
            }
        }
    }
    for (i, a) in polys.iter().enumerate() {
        for (j, b) in polys.iter().enumerate() {
            if i == j {
                continue;
            }
            let inside = a
                .exterior()
                .0
                .iter()
                .find(|c| planar::locate_in_polygon(**c, b) == Location::Interior);
            if let Some(c) = inside {
                return Err(ValidityError::new("Nested shells", Some(*c)));
            }
        }
    }
    Ok(())
}

/// Check a geometry, returning the first problem found
pub fn validate(geom: &GeoGeometry<f64>) -> Result<(), ValidityError> {
    match geom {
        GeoGeometry::Point(p) => check_coords(&[p.0]),
        GeoGeometry::MultiPoint(mp) => check_coords(&mp.0.iter().map(|p| p.0).collect::<Vec<_>>()),
        GeoGeometry::Line(l) => check_coords(&[l.start, l.end]),
        GeoGeometry::LineString(l) => check_line(l),
        GeoGeometry::MultiLineString(ml) => ml.0.iter().try_for_each(check_line),
        GeoGeometry::Polygon(p) => check_polygon(p),
        GeoGeometry::MultiPolygon(mp) => check_multipolygon(&mp.0),
        GeoGeometry::Rect(r) => check_polygon(&r.to_polygon()),
        GeoGeometry::Triangle(t) => check_polygon(&t.to_polygon()),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().try_for_each(validate),
    }
}

fn check_line(l: &LineString<f64>) -> Result<(), ValidityError> {
    check_coords(&l.0)?;
    if l.0.is_empty() {
        return Ok(());
    }
    let mut distinct = l.0.clone();
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(ValidityError::new("Too few points in geometry component", l.0.first().copied()));
    }
    Ok(())
}

pub fn is_valid(geom: &GeoGeometry<f64>) -> bool {
    validate(geom).is_ok()
}

/// Lines are simple when they only meet at endpoints of both lines
fn lines_simple(lines: &[LineString<f64>]) -> bool {
    let coords: Vec<Vec<Coord<f64>>> = lines
        .iter()
        .map(|l| {
            let mut c = l.0.clone();
            c.dedup();
            c
        })
        .filter(|c| c.len() >= 2)
        .collect();
    let is_endpoint = |line: usize, p: Coord<f64>| {
        let c = &coords[line];
        c.first() != c.last() && (c.first() == Some(&p) || c.last() == Some(&p))
    };
    intersections(&coords).into_iter().all(|(a, b, ix)| match ix {
        SegmentIntersection::Overlap(..) => false,
        // Ring closure is already excluded, so any other self contact counts
        SegmentIntersection::Point(p) => a != b && is_endpoint(a, p) && is_endpoint(b, p),
    })
}

/// True when the geometry has no anomalous self-intersection or
/// self-tangency
pub fn is_simple(geom: &GeoGeometry<f64>) -> bool {
    match geom {
        GeoGeometry::Point(_) => true,
        GeoGeometry::MultiPoint(mp) => {
            let mut seen = std::collections::HashSet::new();
            mp.0.iter().all(|p| seen.insert(planar::coord_key(p.0)))
        }
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().all(is_simple),
        GeoGeometry::Line(_) => true,
        GeoGeometry::LineString(_) | GeoGeometry::MultiLineString(_) => lines_simple(&planar::lines(geom)),
        _ => planar::linework(geom).iter().all(|ring| lines_simple(std::slice::from_ref(ring))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon, MultiLineString, MultiPolygon};

    #[test]
    fn test_valid_polygon_with_hole() {
        let p = GeoGeometry::Polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0), (x: 2.0, y: 4.0), (x: 2.0, y: 2.0)]],
        ));
        assert!(is_valid(&p));
        assert!(is_simple(&p));
    }

    #[test]
    fn test_bowtie_is_invalid() {
        let p = GeoGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]);
        let err = validate(&p).unwrap_err();
        assert_eq!(err.reason, "Ring Self-intersection");
        assert_eq!(err.location, Some(Coord { x: 5.0, y: 5.0 }));
    }

    #[test]
    fn test_hole_outside_shell() {
        let p = GeoGeometry::Polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 20.0, y: 20.0), (x: 24.0, y: 20.0), (x: 24.0, y: 24.0), (x: 20.0, y: 20.0)]],
        ));
        assert_eq!(validate(&p).unwrap_err().reason, "Hole lies outside shell");
    }

    #[test]
    fn test_overlapping_multipolygon_is_invalid() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)];
        let b = polygon![(x: 5.0, y: 5.0), (x: 15.0, y: 5.0), (x: 15.0, y: 15.0), (x: 5.0, y: 15.0), (x: 5.0, y: 5.0)];
        assert!(!is_valid(&GeoGeometry::MultiPolygon(MultiPolygon::new(vec![a, b]))));
    }

    #[test]
    fn test_simplicity_of_lines() {
        let straight = GeoGeometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)]);
        assert!(is_simple(&straight));
        let crossing = GeoGeometry::LineString(line_string![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 0.0)
        ]);
        assert!(!is_simple(&crossing));
        let touching = GeoGeometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (5.0, 0.0)]),
            LineString::from(vec![(5.0, 0.0), (10.0, 0.0)]),
        ]));
        assert!(is_simple(&touching));
        let ring = GeoGeometry::LineString(line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 0.0)
        ]);
        assert!(is_simple(&ring));
    }

    #[test]
    fn test_too_few_points() {
        let l = GeoGeometry::LineString(line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)]);
        assert_eq!(validate(&l).unwrap_err().reason, "Too few points in geometry component");
    }
}
