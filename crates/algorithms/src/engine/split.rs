//! Splitting lines and polygons with a cutting line.

use geo::{Area, BooleanOps, Coord, Geometry as GeoGeometry, LineString, MultiLineString, MultiPolygon, Point};
use tracing::debug;

use super::convert::{dimension_geo, is_empty_geo};
use super::error::{EngineError, OperationResult, Result};
use super::noding::node_all;
use super::overlay::{overlay, OverlayOp};
use super::planar;
use super::polygonize::polygonize;
use super::predicates::{evaluate, Matrix, Predicate};
use super::validity::{is_simple, is_valid};

/// A polygonized face belongs to the original when the share of its area
/// inside the original differs from 1 by less than this
pub const SPLIT_AREA_TOLERANCE: f64 = 0.01;

/// Outcome of a split with the pieces it produced
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub outcome: OperationResult,
    pub new_geometries: Vec<GeoGeometry<f64>>,
    /// Points where the cutting line meets the geometry, for topological
    /// editing of neighbouring features
    pub topology_test_points: Vec<Coord<f64>>,
}

impl SplitResult {
    fn failed(outcome: OperationResult, topology_test_points: Vec<Coord<f64>>) -> Self {
        Self {
            outcome,
            new_geometries: Vec::new(),
            topology_test_points,
        }
    }
}

/// Split `base` with the line through `cut`. A single coordinate cuts a
/// lineal geometry at that point.
pub fn split_geometry(base: &GeoGeometry<f64>, cut: &[Coord<f64>], topological: bool) -> SplitResult {
    let base = &drop_empty_parts(base);
    if is_empty_geo(base) {
        return SplitResult::failed(OperationResult::InvalidBaseGeometry, Vec::new());
    }
    let dimension = dimension_geo(base);
    if dimension == 0 || !is_valid(base) {
        return SplitResult::failed(OperationResult::InvalidBaseGeometry, Vec::new());
    }
    if (dimension == 1 && cut.is_empty()) || (dimension == 2 && cut.len() < 2) {
        return SplitResult::failed(OperationResult::InvalidInput, Vec::new());
    }

    let cutter = if cut.len() > 1 {
        GeoGeometry::LineString(LineString::new(cut.to_vec()))
    } else {
        GeoGeometry::Point(Point(cut[0]))
    };
    if !is_valid(&cutter) || !is_simple(&cutter) {
        return SplitResult::failed(OperationResult::InvalidInput, Vec::new());
    }

    let topology_test_points = if topological {
        match overlay(base, &cutter, OverlayOp::Intersection) {
            Ok(meeting) => planar::vertices(&meeting),
            Err(e) => {
                debug!(error = %e, "no topology test points for split");
                return SplitResult::failed(OperationResult::InvalidInput, Vec::new());
            }
        }
    } else {
        Vec::new()
    };

    let pieces = if dimension == 1 {
        split_lines(base, &cutter)
    } else {
        split_polygons(base, &cutter)
    };
    match pieces {
        Ok(new_geometries) => SplitResult {
            outcome: OperationResult::Success,
            new_geometries,
            topology_test_points,
        },
        Err(e) => SplitResult::failed(e.outcome(), topology_test_points),
    }
}

/// Multi-part geometry without its empty members
fn drop_empty_parts(geom: &GeoGeometry<f64>) -> GeoGeometry<f64> {
    match geom {
        GeoGeometry::MultiLineString(ml) => GeoGeometry::MultiLineString(MultiLineString::new(
            ml.0.iter().filter(|l| !l.0.is_empty()).cloned().collect(),
        )),
        GeoGeometry::MultiPolygon(mp) => GeoGeometry::MultiPolygon(MultiPolygon::new(
            mp.0.iter().filter(|p| !p.exterior().0.is_empty()).cloned().collect(),
        )),
        GeoGeometry::GeometryCollection(gc) => GeoGeometry::GeometryCollection(geo::GeometryCollection(
            gc.0.iter().filter(|g| !is_empty_geo(g)).map(drop_empty_parts).collect(),
        )),
        other => other.clone(),
    }
}

fn split_lines(base: &GeoGeometry<f64>, cutter: &GeoGeometry<f64>) -> Result<Vec<GeoGeometry<f64>>> {
    if !evaluate(cutter, base, Predicate::Intersects) {
        return Err(EngineError::NothingHappened);
    }
    if Matrix::compute(base, cutter).matches("1********")? {
        return Err(EngineError::InvalidInput("the split line overlaps the geometry".into()));
    }

    let lines: Vec<LineString<f64>> = match cutter {
        GeoGeometry::Point(p) => break_at_point(&planar::lines(base), p.0),
        _ => planar::lines(&overlay(base, cutter, OverlayOp::Difference)?),
    };
    Ok(regroup(base, lines.into_iter().map(GeoGeometry::LineString).collect()))
}

/// Break every line at `point` where it passes through a vertex or the
/// inside of a segment
fn break_at_point(lines: &[LineString<f64>], point: Coord<f64>) -> Vec<LineString<f64>> {
    let mut out = Vec::new();
    for line in lines {
        let coords = &line.0;
        let n = coords.len();
        if n == 0 {
            continue;
        }
        let mut current = vec![coords[0]];
        for (i, w) in coords.windows(2).enumerate() {
            let (a, b) = (w[0], w[1]);
            if point != a && point != b && planar::on_segment(point, a, b) {
                current.push(point);
                out.push(LineString::new(std::mem::replace(&mut current, vec![point])));
            }
            current.push(b);
            let interior_vertex = i + 2 < n;
            if interior_vertex && b == point {
                out.push(LineString::new(std::mem::replace(&mut current, vec![point])));
            }
        }
        out.push(LineString::new(current));
    }
    out
}

fn split_polygons(base: &GeoGeometry<f64>, cutter: &GeoGeometry<f64>) -> Result<Vec<GeoGeometry<f64>>> {
    if !evaluate(cutter, base, Predicate::Intersects) {
        return Err(EngineError::NothingHappened);
    }

    let mut linework = planar::linework(base);
    linework.extend(planar::lines(cutter));
    let noded = node_all(&linework);
    if noded.is_empty() {
        return Err(EngineError::NodedGeometryError);
    }
    let faces = polygonize(&noded).polygons;
    if faces.is_empty() {
        return Err(EngineError::InvalidBaseGeometry("polygonizing the cut produced no faces".into()));
    }

    let original = MultiPolygon::new(planar::polygons(base));
    let kept: Vec<GeoGeometry<f64>> = faces
        .into_iter()
        .filter(|face| {
            let face_area = face.unsigned_area();
            if face_area <= 0.0 {
                return false;
            }
            let inside = original.intersection(&MultiPolygon::new(vec![face.clone()])).unsigned_area();
            let ratio = inside / face_area;
            ratio > 1.0 - SPLIT_AREA_TOLERANCE && ratio < 1.0 + SPLIT_AREA_TOLERANCE
        })
        .map(GeoGeometry::Polygon)
        .collect();

    if kept.len() == part_count(base) {
        return Err(EngineError::NothingHappened);
    }
    let pieces = regroup(base, kept);
    if let Some(bad) = pieces.iter().position(|p| !is_valid(p)) {
        return Err(EngineError::InvalidBaseGeometry(format!("split piece {} is not valid", bad)));
    }
    debug!(pieces = pieces.len(), "polygon split");
    Ok(pieces)
}

fn part_count(geom: &GeoGeometry<f64>) -> usize {
    match geom {
        GeoGeometry::MultiPoint(mp) => mp.0.len(),
        GeoGeometry::MultiLineString(ml) => ml.0.len(),
        GeoGeometry::MultiPolygon(mp) => mp.0.len(),
        GeoGeometry::GeometryCollection(gc) => gc.0.len(),
        _ => 1,
    }
}

/// For multi-part inputs, collect the pieces identical to an original part
/// back into one multi geometry and wrap every new piece as its own multi
/// geometry; single-part inputs keep the pieces as they are
fn regroup(base: &GeoGeometry<f64>, pieces: Vec<GeoGeometry<f64>>) -> Vec<GeoGeometry<f64>> {
    let originals: Vec<GeoGeometry<f64>> = match base {
        GeoGeometry::MultiLineString(ml) => ml.0.iter().cloned().map(GeoGeometry::LineString).collect(),
        GeoGeometry::MultiPolygon(mp) => mp.0.iter().cloned().map(GeoGeometry::Polygon).collect(),
        _ => return pieces,
    };

    let mut unchanged = Vec::new();
    let mut out = Vec::new();
    for piece in pieces {
        if originals.iter().any(|o| evaluate(&piece, o, Predicate::Equals)) {
            unchanged.push(piece);
        } else {
            out.push(wrap_multi(vec![piece]));
        }
    }
    if !unchanged.is_empty() {
        out.push(wrap_multi(unchanged));
    }
    out
}

fn wrap_multi(parts: Vec<GeoGeometry<f64>>) -> GeoGeometry<f64> {
    if parts.iter().all(|p| matches!(p, GeoGeometry::Polygon(_))) {
        GeoGeometry::MultiPolygon(MultiPolygon::new(planar::polygons(&GeoGeometry::GeometryCollection(
            geo::GeometryCollection(parts),
        ))))
    } else {
        GeoGeometry::MultiLineString(MultiLineString::new(planar::lines(&GeoGeometry::GeometryCollection(
            geo::GeometryCollection(parts),
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square() -> GeoGeometry<f64> {
        GeoGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_split_polygon_in_two() {
        let result = split_geometry(&square(), &[c(5.0, -5.0), c(5.0, 15.0)], true);
        assert_eq!(result.outcome, OperationResult::Success);
        assert_eq!(result.new_geometries.len(), 2);
        for piece in &result.new_geometries {
            assert!((piece.unsigned_area() - 50.0).abs() < 1e-9);
        }
        assert_eq!(result.topology_test_points.len(), 2);
    }

    #[test]
    fn test_split_polygon_with_line_outside_does_nothing() {
        let result = split_geometry(&square(), &[c(20.0, -5.0), c(20.0, 15.0)], false);
        assert_eq!(result.outcome, OperationResult::NothingHappened);
        assert!(result.new_geometries.is_empty());
    }

    #[test]
    fn test_split_polygon_line_ending_inside_does_nothing() {
        let result = split_geometry(&square(), &[c(5.0, -5.0), c(5.0, 5.0)], false);
        assert_eq!(result.outcome, OperationResult::NothingHappened);
    }

    #[test]
    fn test_split_point_is_rejected() {
        let result = split_geometry(&GeoGeometry::Point(Point::new(1.0, 1.0)), &[c(0.0, 0.0), c(2.0, 2.0)], false);
        assert_eq!(result.outcome, OperationResult::InvalidBaseGeometry);
    }

    #[test]
    fn test_split_polygon_needs_two_points() {
        let result = split_geometry(&square(), &[c(5.0, 5.0)], false);
        assert_eq!(result.outcome, OperationResult::InvalidInput);
    }

    #[test]
    fn test_split_line_by_crossing_line() {
        let line = GeoGeometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]));
        let result = split_geometry(&line, &[c(5.0, -5.0), c(5.0, 5.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        assert_eq!(result.new_geometries.len(), 2);
    }

    #[test]
    fn test_split_line_overlap_is_invalid_input() {
        let line = GeoGeometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]));
        let result = split_geometry(&line, &[c(2.0, 0.0), c(4.0, 0.0)], false);
        assert_eq!(result.outcome, OperationResult::InvalidInput);
    }

    #[test]
    fn test_split_line_at_point() {
        let line = GeoGeometry::LineString(LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]));
        let result = split_geometry(&line, &[c(5.0, 0.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        assert_eq!(
            result.new_geometries,
            vec![
                GeoGeometry::LineString(LineString::from(vec![(0.0, 0.0), (5.0, 0.0)])),
                GeoGeometry::LineString(LineString::from(vec![(5.0, 0.0), (10.0, 0.0)])),
            ]
        );
    }

    #[test]
    fn test_split_multipolygon_regroups_untouched_parts() {
        let far = polygon![
            (x: 20.0, y: 0.0),
            (x: 30.0, y: 0.0),
            (x: 30.0, y: 10.0),
            (x: 20.0, y: 10.0),
            (x: 20.0, y: 0.0),
        ];
        let GeoGeometry::Polygon(near) = square() else { unreachable!() };
        let base = GeoGeometry::MultiPolygon(MultiPolygon::new(vec![near, far]));
        let result = split_geometry(&base, &[c(5.0, -5.0), c(5.0, 15.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        // Two new halves plus the untouched part
        assert_eq!(result.new_geometries.len(), 3);
        assert!(result
            .new_geometries
            .iter()
            .all(|g| matches!(g, GeoGeometry::MultiPolygon(_))));
    }

    #[test]
    fn test_split_multilinestring_skips_empty_member() {
        let base = GeoGeometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::new(vec![]),
        ]));
        let result = split_geometry(&base, &[c(5.0, -5.0), c(5.0, 5.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        assert_eq!(result.new_geometries.len(), 2);

        let at_point = split_geometry(&base, &[c(5.0, 0.0)], false);
        assert_eq!(at_point.outcome, OperationResult::Success);
        assert_eq!(at_point.new_geometries.len(), 2);
    }

    #[test]
    fn test_break_at_point_ignores_empty_line() {
        let lines = vec![LineString::new(vec![]), LineString::from(vec![(0.0, 0.0), (10.0, 0.0)])];
        let pieces = break_at_point(&lines, c(5.0, 0.0));
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn test_split_polygon_with_hole() {
        let base = GeoGeometry::Polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 4.0, y: 4.0), (x: 6.0, y: 4.0), (x: 6.0, y: 6.0), (x: 4.0, y: 6.0), (x: 4.0, y: 4.0)]],
        ));
        let result = split_geometry(&base, &[c(5.0, -5.0), c(5.0, 15.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        assert_eq!(result.new_geometries.len(), 2);
        for piece in &result.new_geometries {
            assert!(is_valid(piece));
            assert!((piece.unsigned_area() - 48.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_split_multilinestring_regroups_untouched_parts() {
        let untouched = LineString::from(vec![(20.0, 0.0), (30.0, 0.0)]);
        let base = GeoGeometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            untouched.clone(),
        ]));
        let result = split_geometry(&base, &[c(5.0, -5.0), c(5.0, 5.0)], false);
        assert_eq!(result.outcome, OperationResult::Success);
        // Two new single-line multis, then the untouched part
        assert_eq!(result.new_geometries.len(), 3);
        for piece in &result.new_geometries {
            let GeoGeometry::MultiLineString(ml) = piece else {
                panic!("expected MultiLineString, got {:?}", piece);
            };
            assert_eq!(ml.0.len(), 1);
        }
        let last = &result.new_geometries[2];
        assert!(evaluate(last, &GeoGeometry::LineString(untouched), Predicate::Equals));
    }

    #[test]
    fn test_topological_split_of_mixed_collection_is_invalid_input() {
        let GeoGeometry::Polygon(near) = square() else { unreachable!() };
        let base = GeoGeometry::GeometryCollection(geo::GeometryCollection(vec![
            GeoGeometry::Polygon(near),
            GeoGeometry::LineString(LineString::from(vec![(20.0, 0.0), (30.0, 0.0)])),
        ]));
        let result = split_geometry(&base, &[c(5.0, -5.0), c(5.0, 15.0)], true);
        assert_eq!(result.outcome, OperationResult::InvalidInput);
        assert!(result.new_geometries.is_empty());
    }
}
