//! Planar primitives shared by the engine algorithms: orientation, point
//! location, segment distances and linework extraction.

use geo::{Coord, Geometry as GeoGeometry, Line, LineString};

/// Location of a point relative to a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Interior,
    Boundary,
    Exterior,
}

/// Twice the signed area of the triangle (a, b, c); > 0 when c lies left of a→b
#[inline]
pub fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

#[inline]
pub fn dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Signed area of a closed ring; positive for counter-clockwise rings
pub fn signed_area(ring: &[Coord<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for w in ring.windows(2) {
        sum += w[0].x * w[1].y - w[1].x * w[0].y;
    }
    sum / 2.0
}

/// Parameter of the projection of `p` onto segment a→b, clamped to [0, 1]
pub fn project_param(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return 0.0;
    }
    (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
}

#[inline]
pub fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Closest point to `p` on segment a→b
pub fn closest_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let t = project_param(p, a, b);
    if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        lerp(a, b, t)
    }
}

pub fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    dist(p, closest_on_segment(p, a, b))
}

/// Exact test for `p` lying on segment a→b
pub fn on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    orient(a, b, p) == 0.0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// True when the closed segments share at least one point
pub fn segments_intersect(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    on_segment(a, c, d) || on_segment(b, c, d) || on_segment(c, a, b) || on_segment(d, a, b)
}

/// Closest pair of points between two segments (first on a→b)
pub fn segment_segment_closest(
    a: Coord<f64>,
    b: Coord<f64>,
    c: Coord<f64>,
    d: Coord<f64>,
) -> (Coord<f64>, Coord<f64>) {
    if segments_intersect(a, b, c, d) {
        if let Some(p) = line_crossing(a, b, c, d) {
            return (p, p);
        }
        // Collinear overlap: any shared endpoint will do
        for p in [a, b] {
            if on_segment(p, c, d) {
                return (p, p);
            }
        }
        for p in [c, d] {
            if on_segment(p, a, b) {
                return (p, p);
            }
        }
    }
    let candidates = [
        (a, closest_on_segment(a, c, d)),
        (b, closest_on_segment(b, c, d)),
        (closest_on_segment(c, a, b), c),
        (closest_on_segment(d, a, b), d),
    ];
    let mut best = candidates[0];
    for cand in candidates.iter().skip(1) {
        if dist(cand.0, cand.1) < dist(best.0, best.1) {
            best = *cand;
        }
    }
    best
}

/// Intersection point of two non-parallel segments' supporting lines, if it
/// falls within both segments
pub fn line_crossing(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> Option<Coord<f64>> {
    let r = Coord { x: b.x - a.x, y: b.y - a.y };
    let s = Coord { x: d.x - c.x, y: d.y - c.y };
    let denom = r.x * s.y - r.y * s.x;
    if denom == 0.0 {
        return None;
    }
    let t = ((c.x - a.x) * s.y - (c.y - a.y) * s.x) / denom;
    let u = ((c.x - a.x) * r.y - (c.y - a.y) * r.x) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    if t == 0.0 {
        return Some(a);
    }
    if t == 1.0 {
        return Some(b);
    }
    if u == 0.0 {
        return Some(c);
    }
    if u == 1.0 {
        return Some(d);
    }
    Some(lerp(a, b, t))
}

/// Location of `p` relative to a closed ring (winding number test)
pub fn locate_in_ring(p: Coord<f64>, ring: &[Coord<f64>]) -> Location {
    let mut wn = 0i32;
    for w in ring.windows(2) {
        let (p1, p2) = (w[0], w[1]);
        if on_segment(p, p1, p2) {
            return Location::Boundary;
        }
        if p1.y <= p.y {
            if p2.y > p.y && orient(p1, p2, p) > 0.0 {
                wn += 1;
            }
        } else if p2.y <= p.y && orient(p1, p2, p) < 0.0 {
            wn -= 1;
        }
    }
    if wn != 0 {
        Location::Interior
    } else {
        Location::Exterior
    }
}

pub fn locate_in_polygon(p: Coord<f64>, polygon: &geo::Polygon<f64>) -> Location {
    if polygon.exterior().0.is_empty() {
        return Location::Exterior;
    }
    match locate_in_ring(p, &polygon.exterior().0) {
        Location::Interior => {}
        other => return other,
    }
    for hole in polygon.interiors() {
        match locate_in_ring(p, &hole.0) {
            Location::Interior => return Location::Exterior,
            Location::Boundary => return Location::Boundary,
            Location::Exterior => {}
        }
    }
    Location::Interior
}

/// Location of `p` relative to a line, using the mod-2 boundary rule for
/// endpoints
pub fn locate_on_lines(p: Coord<f64>, lines: &[&LineString<f64>]) -> Location {
    let mut endpoint_hits = 0usize;
    let mut on_line = false;
    for line in lines {
        if line.0.len() < 2 {
            continue;
        }
        let closed = line.0.first() == line.0.last();
        if !closed {
            if line.0.first() == Some(&p) {
                endpoint_hits += 1;
            }
            if line.0.last() == Some(&p) {
                endpoint_hits += 1;
            }
        }
        if !on_line && line.lines().any(|l| on_segment(p, l.start, l.end)) {
            on_line = true;
        }
    }
    if endpoint_hits % 2 == 1 {
        Location::Boundary
    } else if on_line {
        Location::Interior
    } else {
        Location::Exterior
    }
}

/// Location of `p` relative to an arbitrary geometry. For mixed collections
/// the highest-priority location among the members wins.
pub fn locate(p: Coord<f64>, geom: &GeoGeometry<f64>) -> Location {
    match geom {
        GeoGeometry::Point(q) => {
            if q.0 == p {
                Location::Interior
            } else {
                Location::Exterior
            }
        }
        GeoGeometry::MultiPoint(mp) => {
            if mp.0.iter().any(|q| q.0 == p) {
                Location::Interior
            } else {
                Location::Exterior
            }
        }
        GeoGeometry::Line(l) => {
            let ls = LineString::new(vec![l.start, l.end]);
            locate_on_lines(p, &[&ls])
        }
        GeoGeometry::LineString(l) => locate_on_lines(p, &[l]),
        GeoGeometry::MultiLineString(ml) => {
            let refs: Vec<&LineString<f64>> = ml.0.iter().collect();
            locate_on_lines(p, &refs)
        }
        GeoGeometry::Polygon(poly) => locate_in_polygon(p, poly),
        GeoGeometry::MultiPolygon(mp) => {
            let mut result = Location::Exterior;
            for poly in &mp.0 {
                match locate_in_polygon(p, poly) {
                    Location::Interior => return Location::Interior,
                    Location::Boundary => result = Location::Boundary,
                    Location::Exterior => {}
                }
            }
            result
        }
        GeoGeometry::Rect(r) => locate_in_polygon(p, &r.to_polygon()),
        GeoGeometry::Triangle(t) => locate_in_polygon(p, &t.to_polygon()),
        GeoGeometry::GeometryCollection(gc) => {
            let mut result = Location::Exterior;
            for g in &gc.0 {
                match locate(p, g) {
                    Location::Interior => return Location::Interior,
                    Location::Boundary => result = Location::Boundary,
                    Location::Exterior => {}
                }
            }
            result
        }
    }
}

/// Line components of a geometry: lines as they are, polygon rings as
/// closed lines
pub fn linework(geom: &GeoGeometry<f64>) -> Vec<LineString<f64>> {
    let mut out = Vec::new();
    collect_linework(geom, &mut out);
    out
}

fn collect_linework(geom: &GeoGeometry<f64>, out: &mut Vec<LineString<f64>>) {
    match geom {
        GeoGeometry::Line(l) => out.push(LineString::new(vec![l.start, l.end])),
        GeoGeometry::LineString(l) => {
            if l.0.len() >= 2 {
                out.push(l.clone());
            }
        }
        GeoGeometry::MultiLineString(ml) => {
            out.extend(ml.0.iter().filter(|l| l.0.len() >= 2).cloned())
        }
        GeoGeometry::Polygon(p) => polygon_rings(p, out),
        GeoGeometry::MultiPolygon(mp) => mp.0.iter().for_each(|p| polygon_rings(p, out)),
        GeoGeometry::Rect(r) => polygon_rings(&r.to_polygon(), out),
        GeoGeometry::Triangle(t) => polygon_rings(&t.to_polygon(), out),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().for_each(|g| collect_linework(g, out)),
        GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => {}
    }
}

fn polygon_rings(p: &geo::Polygon<f64>, out: &mut Vec<LineString<f64>>) {
    if p.exterior().0.len() >= 2 {
        out.push(p.exterior().clone());
    }
    out.extend(p.interiors().iter().filter(|r| r.0.len() >= 2).cloned());
}

/// Every segment of a geometry's linework
pub fn segments(geom: &GeoGeometry<f64>) -> Vec<Line<f64>> {
    linework(geom).iter().flat_map(|l| l.lines()).collect()
}

/// Point components of a geometry
pub fn points(geom: &GeoGeometry<f64>) -> Vec<Coord<f64>> {
    match geom {
        GeoGeometry::Point(p) => vec![p.0],
        GeoGeometry::MultiPoint(mp) => mp.0.iter().map(|p| p.0).collect(),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().flat_map(points).collect(),
        _ => Vec::new(),
    }
}

/// Polygon components of a geometry
pub fn polygons(geom: &GeoGeometry<f64>) -> Vec<geo::Polygon<f64>> {
    match geom {
        GeoGeometry::Polygon(p) if !p.exterior().0.is_empty() => vec![p.clone()],
        GeoGeometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .filter(|p| !p.exterior().0.is_empty())
            .cloned()
            .collect(),
        GeoGeometry::Rect(r) => vec![r.to_polygon()],
        GeoGeometry::Triangle(t) => vec![t.to_polygon()],
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygons).collect(),
        _ => Vec::new(),
    }
}

/// Line components (not polygon rings) of a geometry
pub fn lines(geom: &GeoGeometry<f64>) -> Vec<LineString<f64>> {
    match geom {
        GeoGeometry::Line(l) => vec![LineString::new(vec![l.start, l.end])],
        GeoGeometry::LineString(l) if l.0.len() >= 2 => vec![l.clone()],
        GeoGeometry::MultiLineString(ml) => ml.0.iter().filter(|l| l.0.len() >= 2).cloned().collect(),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().flat_map(lines).collect(),
        _ => Vec::new(),
    }
}

/// All vertices of a geometry
pub fn vertices(geom: &GeoGeometry<f64>) -> Vec<Coord<f64>> {
    let mut out = points(geom);
    for l in linework(geom) {
        out.extend(l.0);
    }
    out
}

/// Bit-exact key of a coordinate; -0.0 and 0.0 map to the same key
#[inline]
pub fn coord_key(c: Coord<f64>) -> (u64, u64) {
    fn norm(v: f64) -> u64 {
        if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
    }
    (norm(c.x), norm(c.y))
}

/// Remove consecutive duplicate vertices
pub fn dedup_coords(coords: &mut Vec<Coord<f64>>) {
    coords.dedup_by(|a, b| a == b);
}
