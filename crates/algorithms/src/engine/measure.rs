//! Geometric measurements: area, length, centroid, envelope, hull,
//! distances and linear referencing.

use std::collections::HashSet;

use geo::{
    Area as GeoArea, BoundingRect, Centroid, ConvexHull, Coord, Euclidean, Geometry, InteriorPoint,
    Length, LineString, MultiPoint, Point,
};

use super::convert::{empty_of_dimension, is_empty_geo};
use super::error::{EngineError, Result};
use super::planar::{self, closest_on_segment, coord_key, dist, orient, segment_segment_closest, Location};

/// Unsigned area of a geometry; zero for points and lines
pub fn area(geom: &Geometry<f64>) -> f64 {
    planar::polygons(geom).iter().map(|p| p.unsigned_area()).sum()
}

/// Euclidean length of the linework: line length, polygon perimeter
pub fn length(geom: &Geometry<f64>) -> f64 {
    planar::linework(geom).iter().map(|l| l.length::<Euclidean>()).sum()
}

pub fn centroid(geom: &Geometry<f64>) -> Option<Point<f64>> {
    if is_empty_geo(geom) {
        return None;
    }
    geom.centroid()
}

/// A point guaranteed to lie on the geometry
pub fn point_on_surface(geom: &Geometry<f64>) -> Option<Point<f64>> {
    if is_empty_geo(geom) {
        return None;
    }
    geom.interior_point()
}

/// Envelope as a polygon; degenerate envelopes collapse to a point or a line
pub fn envelope(geom: &Geometry<f64>) -> Geometry<f64> {
    if is_empty_geo(geom) {
        return empty_of_dimension(2);
    }
    let Some(rect) = geom.bounding_rect() else {
        return empty_of_dimension(2);
    };
    let (min, max) = (rect.min(), rect.max());
    if min == max {
        Geometry::Point(Point(min))
    } else if min.x == max.x || min.y == max.y {
        Geometry::LineString(LineString::new(vec![min, max]))
    } else {
        Geometry::Polygon(rect.to_polygon())
    }
}

/// Convex hull; fewer than three non-collinear vertices give a point or line
pub fn convex_hull(geom: &Geometry<f64>) -> Geometry<f64> {
    let mut seen = HashSet::new();
    let unique: Vec<Coord<f64>> = planar::vertices(geom)
        .into_iter()
        .filter(|c| seen.insert(coord_key(*c)))
        .collect();
    match unique.len() {
        0 => return empty_of_dimension(2),
        1 => return Geometry::Point(Point(unique[0])),
        _ => {}
    }
    let (a, b) = (unique[0], unique[1]);
    if unique.iter().all(|c| orient(a, b, *c) == 0.0) {
        let along = |c: &Coord<f64>| (c.x - a.x) * (b.x - a.x) + (c.y - a.y) * (b.y - a.y);
        let mut sorted = unique.clone();
        sorted.sort_by(|p, q| along(p).total_cmp(&along(q)));
        return Geometry::LineString(LineString::new(vec![sorted[0], sorted[sorted.len() - 1]]));
    }
    Geometry::Polygon(MultiPoint::from(unique).convex_hull())
}

/// Segments and isolated points of a geometry, used by the distance searches
struct Components {
    segments: Vec<(Coord<f64>, Coord<f64>)>,
    points: Vec<Coord<f64>>,
}

impl Components {
    fn of(geom: &Geometry<f64>) -> Self {
        Self {
            segments: planar::segments(geom).into_iter().map(|l| (l.start, l.end)).collect(),
            points: planar::points(geom),
        }
    }

    /// Closest point of these components to `p`
    fn closest_to(&self, p: Coord<f64>) -> Option<Coord<f64>> {
        let from_segments = self.segments.iter().map(|(a, b)| closest_on_segment(p, *a, *b));
        from_segments
            .chain(self.points.iter().copied())
            .min_by(|x, y| dist(p, *x).total_cmp(&dist(p, *y)))
    }
}

/// Pair of closest points, the first on `a` and the second on `b`
pub fn nearest_points(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    if is_empty_geo(a) || is_empty_geo(b) {
        return None;
    }

    // A part of one geometry lying inside the other's area
    for (inner, outer) in [(b, a), (a, b)] {
        if planar::polygons(outer).is_empty() {
            continue;
        }
        if let Some(p) = planar::vertices(inner)
            .into_iter()
            .find(|p| planar::locate(*p, outer) == Location::Interior)
        {
            return Some((p, p));
        }
    }

    let ca = Components::of(a);
    let cb = Components::of(b);
    let mut best: Option<(Coord<f64>, Coord<f64>)> = None;
    let mut consider = |pair: (Coord<f64>, Coord<f64>)| {
        if best.map_or(true, |b| dist(pair.0, pair.1) < dist(b.0, b.1)) {
            best = Some(pair);
        }
    };

    for (s1, e1) in &ca.segments {
        for (s2, e2) in &cb.segments {
            consider(segment_segment_closest(*s1, *e1, *s2, *e2));
        }
    }
    for p in &ca.points {
        if let Some(q) = cb.closest_to(*p) {
            consider((*p, q));
        }
    }
    for q in &cb.points {
        if let Some(p) = ca.closest_to(*q) {
            consider((p, *q));
        }
    }
    best
}

/// Minimum Euclidean distance between two geometries
pub fn distance(a: &Geometry<f64>, b: &Geometry<f64>) -> Result<f64> {
    nearest_points(a, b)
        .map(|(p, q)| dist(p, q))
        .ok_or_else(|| EngineError::InvalidInput("distance to an empty geometry".into()))
}

/// Point on `a` closest to `b`
pub fn closest_point(a: &Geometry<f64>, b: &Geometry<f64>) -> Result<Point<f64>> {
    nearest_points(a, b)
        .map(|(p, _)| Point(p))
        .ok_or_else(|| EngineError::InvalidInput("closest point of an empty geometry".into()))
}

/// Shortest line connecting `a` to `b`
pub fn shortest_line(a: &Geometry<f64>, b: &Geometry<f64>) -> Result<LineString<f64>> {
    nearest_points(a, b)
        .map(|(p, q)| LineString::new(vec![p, q]))
        .ok_or_else(|| EngineError::InvalidInput("shortest line to an empty geometry".into()))
}

/// Sample points of a geometry with every segment split into
/// `pieces` equal parts
fn densified_vertices(geom: &Geometry<f64>, pieces: usize) -> Vec<Coord<f64>> {
    let mut out = planar::points(geom);
    for l in planar::linework(geom) {
        for w in l.0.windows(2) {
            for i in 0..pieces {
                out.push(planar::lerp(w[0], w[1], i as f64 / pieces as f64));
            }
        }
        if let Some(last) = l.0.last() {
            out.push(*last);
        }
    }
    out
}

fn directed_hausdorff(from: &[Coord<f64>], to: &Components) -> f64 {
    from.iter()
        .filter_map(|p| to.closest_to(*p).map(|q| dist(*p, q)))
        .fold(0.0, f64::max)
}

fn hausdorff(a: &Geometry<f64>, b: &Geometry<f64>, pieces: usize) -> Result<f64> {
    if is_empty_geo(a) || is_empty_geo(b) {
        return Err(EngineError::InvalidInput("hausdorff distance of an empty geometry".into()));
    }
    let (ca, cb) = (Components::of(a), Components::of(b));
    let ab = directed_hausdorff(&densified_vertices(a, pieces), &cb);
    let ba = directed_hausdorff(&densified_vertices(b, pieces), &ca);
    Ok(ab.max(ba))
}

/// Discrete Hausdorff distance measured at the vertices
pub fn hausdorff_distance(a: &Geometry<f64>, b: &Geometry<f64>) -> Result<f64> {
    hausdorff(a, b, 1)
}

/// Discrete Hausdorff distance with every segment densified into pieces of
/// `fraction` of its length
pub fn hausdorff_distance_densify(a: &Geometry<f64>, b: &Geometry<f64>, fraction: f64) -> Result<f64> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(EngineError::InvalidInput(format!(
            "densify fraction {} must be in (0, 1]",
            fraction
        )));
    }
    hausdorff(a, b, (1.0 / fraction).ceil() as usize)
}

fn lineal(geom: &Geometry<f64>) -> Result<Vec<LineString<f64>>> {
    let lines = planar::lines(geom);
    if lines.is_empty() {
        return Err(EngineError::InvalidBaseGeometry("geometry is not lineal".into()));
    }
    Ok(lines)
}

/// Distance along a line to the projection of `point`
pub fn line_locate_point(line: &Geometry<f64>, point: Coord<f64>) -> Result<f64> {
    let lines = lineal(line)?;
    let mut best = (f64::INFINITY, 0.0);
    let mut walked = 0.0;
    for l in &lines {
        for w in l.0.windows(2) {
            let q = closest_on_segment(point, w[0], w[1]);
            let d = dist(point, q);
            if d < best.0 {
                best = (d, walked + dist(w[0], q));
            }
            walked += dist(w[0], w[1]);
        }
    }
    Ok(best.1)
}

/// Point at `distance` along a line; negative distances count from the end
pub fn interpolate(line: &Geometry<f64>, distance: f64) -> Result<Point<f64>> {
    let lines = lineal(line)?;
    let total: f64 = lines.iter().map(|l| l.length::<Euclidean>()).sum();
    let mut target = if distance < 0.0 { total + distance } else { distance };
    target = target.clamp(0.0, total);

    let mut walked = 0.0;
    for l in &lines {
        for w in l.0.windows(2) {
            let d = dist(w[0], w[1]);
            if walked + d >= target && d > 0.0 {
                return Ok(Point(planar::lerp(w[0], w[1], (target - walked) / d)));
            }
            walked += d;
        }
    }
    lines
        .last()
        .and_then(|l| l.0.last().copied())
        .map(Point)
        .ok_or_else(|| EngineError::InvalidBaseGeometry("line has no vertices".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{line_string, point, polygon, Line, MultiLineString};

    fn square() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_area_and_perimeter() {
        assert_relative_eq!(area(&square()), 100.0);
        assert_relative_eq!(length(&square()), 40.0);
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0)]);
        assert_eq!(area(&line), 0.0);
        assert_relative_eq!(length(&line), 5.0);
    }

    #[test]
    fn test_length_multiline_and_segment() {
        let mls = Geometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 0.0), (0.0, 5.0)]),
        ]));
        assert_relative_eq!(length(&mls), 15.0);
        let seg = Geometry::Line(Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 6.0, y: 8.0 }));
        assert_relative_eq!(length(&seg), 10.0);
    }

    #[test]
    fn test_centroid_and_point_on_surface() {
        let c = centroid(&square()).unwrap();
        assert_relative_eq!(c.x(), 5.0);
        assert_relative_eq!(c.y(), 5.0);
        let p = point_on_surface(&square()).unwrap();
        assert_eq!(planar::locate(p.0, &square()), Location::Interior);
    }

    #[test]
    fn test_envelope_degenerate_cases() {
        let pt = Geometry::Point(point!(x: 1.0, y: 2.0));
        assert_eq!(envelope(&pt), pt);
        let horizontal = Geometry::LineString(line_string![(x: 0.0, y: 1.0), (x: 5.0, y: 1.0)]);
        assert!(matches!(envelope(&horizontal), Geometry::LineString(_)));
        assert_relative_eq!(area(&envelope(&square())), 100.0);
    }

    #[test]
    fn test_convex_hull() {
        let pts = Geometry::MultiPoint(MultiPoint::from(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 2.0), (5.0, 10.0)]));
        assert_relative_eq!(area(&convex_hull(&pts)), 50.0);
        let collinear = Geometry::MultiPoint(MultiPoint::from(vec![(0.0, 0.0), (2.0, 2.0), (1.0, 1.0)]));
        assert_eq!(
            convex_hull(&collinear),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)])
        );
    }

    #[test]
    fn test_distance_and_shortest_line() {
        let a = square();
        let b = Geometry::Point(point!(x: 13.0, y: 14.0));
        assert_relative_eq!(distance(&a, &b).unwrap(), 5.0);
        let line = shortest_line(&a, &b).unwrap();
        assert_eq!(line.0[0], Coord { x: 10.0, y: 10.0 });
        assert_eq!(line.0[1], Coord { x: 13.0, y: 14.0 });
        let inside = Geometry::Point(point!(x: 3.0, y: 3.0));
        assert_eq!(distance(&a, &inside).unwrap(), 0.0);
    }

    #[test]
    fn test_hausdorff() {
        let a = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 10.0, y: 100.0), (x: 10.0, y: 100.0)]);
        let b = Geometry::LineString(line_string![(x: 0.0, y: 100.0), (x: 0.0, y: 10.0), (x: 80.0, y: 10.0)]);
        assert_relative_eq!(hausdorff_distance(&a, &b).unwrap(), 22.360679774997898, epsilon = 1e-9);
        let c = Geometry::LineString(line_string![(x: 130.0, y: 0.0), (x: 0.0, y: 0.0), (x: 0.0, y: 150.0)]);
        let d = Geometry::LineString(line_string![(x: 10.0, y: 10.0), (x: 10.0, y: 150.0), (x: 130.0, y: 10.0)]);
        assert_relative_eq!(hausdorff_distance(&c, &d).unwrap(), 14.142135623730951, epsilon = 1e-9);
        assert_relative_eq!(hausdorff_distance_densify(&c, &d, 0.5).unwrap(), 70.0, epsilon = 1e-9);
        assert!(hausdorff_distance_densify(&c, &d, 0.0).is_err());
    }

    #[test]
    fn test_line_locate_and_interpolate() {
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)]);
        assert_relative_eq!(line_locate_point(&line, Coord { x: 12.0, y: 5.0 }).unwrap(), 15.0);
        assert_eq!(interpolate(&line, 15.0).unwrap(), Point::new(10.0, 5.0));
        assert_eq!(interpolate(&line, -5.0).unwrap(), Point::new(10.0, 5.0));
        assert_eq!(interpolate(&line, 100.0).unwrap(), Point::new(10.0, 10.0));
        assert!(line_locate_point(&square(), Coord { x: 0.0, y: 0.0 }).is_err());
    }
}
