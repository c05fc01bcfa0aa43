//! Reshaping lines and polygon rings with a replacement path.
//!
//! The replacement is noded against the original and line-merged; every
//! merged piece is then classified by where its endpoints fall and by which
//! of the two inputs it runs along. Coincidence tests use a tolerance scaled
//! to the magnitude of the coordinates.

use geo::{BoundingRect, Coord, Geometry as GeoGeometry, LineString, MultiLineString, MultiPolygon, Polygon};
use tracing::debug;

use super::convert::{dimension_geo, is_empty_geo};
use super::error::{EngineError, Result};
use super::linemerge::merge_lines;
use super::noding::node_all;
use super::overlay::{overlay, OverlayOp};
use super::planar::{dist, lerp, point_segment_distance, project_param, segment_segment_closest};
use super::predicates::{evaluate, Predicate};

/// Bounds of the length ratio for one line to count as lying along another
const CONTAINED_RATIO_MIN: f64 = 0.9;
const CONTAINED_RATIO_MAX: f64 = 1.1;

/// Bisection steps when measuring how much of a segment lies near another
const COVER_BISECTION_STEPS: usize = 60;

/// Order of magnitude of the largest envelope coordinate: the maximum of
/// `ceil(log10(|c|))` over the envelope corners, -1 at least.
///
/// Both x and y of the corners count, so a geometry far from the origin
/// along y only still gets a coarser tolerance.
pub fn geom_digits(geom: &GeoGeometry<f64>) -> i32 {
    let Some(rect) = geom.bounding_rect() else {
        return -1;
    };
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
        .into_iter()
        .map(|v| v.abs().log10().ceil() as i32)
        .fold(-1, i32::max)
}

/// Coincidence tolerance for a geometry: `10^(digits - 11)`
pub fn coincidence_tolerance(geom: &GeoGeometry<f64>) -> f64 {
    10f64.powi(geom_digits(geom) - 11)
}

fn line_geom(line: &LineString<f64>) -> GeoGeometry<f64> {
    GeoGeometry::LineString(line.clone())
}

/// True when `point` lies on `line` within the coincidence tolerance
pub fn point_contained_in_line(point: Coord<f64>, line: &LineString<f64>) -> bool {
    let tolerance = coincidence_tolerance(&line_geom(line));
    line.lines()
        .any(|s| point_segment_distance(point, s.start, s.end) < tolerance)
}

/// Parameter interval of segment p0→p1 within `tolerance` of segment a→b
fn near_interval(p0: Coord<f64>, p1: Coord<f64>, a: Coord<f64>, b: Coord<f64>, tolerance: f64) -> Option<(f64, f64)> {
    let distance_at = |u: f64| point_segment_distance(lerp(p0, p1, u), a, b);
    let (closest, _) = segment_segment_closest(p0, p1, a, b);
    let best = project_param(closest, p0, p1);
    if distance_at(best) > tolerance {
        return None;
    }
    // The distance is convex along the segment: bisect both edges
    let (mut inside, mut outside) = (best, 0.0);
    if distance_at(0.0) <= tolerance {
        inside = 0.0;
    } else {
        for _ in 0..COVER_BISECTION_STEPS {
            let mid = (inside + outside) / 2.0;
            if distance_at(mid) <= tolerance { inside = mid } else { outside = mid }
        }
    }
    let start = inside;
    let (mut inside, mut outside) = (best, 1.0);
    if distance_at(1.0) <= tolerance {
        inside = 1.0;
    } else {
        for _ in 0..COVER_BISECTION_STEPS {
            let mid = (inside + outside) / 2.0;
            if distance_at(mid) <= tolerance { inside = mid } else { outside = mid }
        }
    }
    Some((start, inside))
}

/// Length of `line` lying within `tolerance` of `other`
fn covered_length(line: &LineString<f64>, other: &LineString<f64>, tolerance: f64) -> f64 {
    let mut total = 0.0;
    for s in line.lines() {
        let length = dist(s.start, s.end);
        if length == 0.0 {
            continue;
        }
        let mut intervals: Vec<(f64, f64)> = other
            .lines()
            .filter_map(|t| near_interval(s.start, s.end, t.start, t.end, tolerance))
            .collect();
        intervals.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut covered = 0.0;
        let mut reach = f64::NEG_INFINITY;
        for (lo, hi) in intervals {
            let lo = lo.max(reach);
            if hi > lo {
                covered += hi - lo;
            }
            reach = reach.max(hi);
        }
        total += covered * length;
    }
    total
}

/// True when `line` runs along `other`: the length of `line` over its length
/// within the coincidence tolerance of `other` is close to one
pub fn line_contained_in_line(line: &LineString<f64>, other: &LineString<f64>) -> bool {
    let tolerance = coincidence_tolerance(&line_geom(other));
    let inside = covered_length(line, other, tolerance);
    if inside <= 0.0 {
        return false;
    }
    let ratio = planar_length(line) / inside;
    ratio > CONTAINED_RATIO_MIN && ratio < CONTAINED_RATIO_MAX
}

fn planar_length(line: &LineString<f64>) -> f64 {
    line.0.windows(2).map(|w| dist(w[0], w[1])).sum()
}

fn endpoints(line: &LineString<f64>) -> Option<(Coord<f64>, Coord<f64>)> {
    if line.0.len() < 2 {
        return None;
    }
    Some((line.0[0], line.0[line.0.len() - 1]))
}

/// Join two lines meeting at `point`, when `point` is an endpoint of both
fn merge_at_endpoint(line: &LineString<f64>, reshape: &LineString<f64>, point: Coord<f64>) -> Option<LineString<f64>> {
    let (a0, a1) = endpoints(line)?;
    let (b0, b1) = endpoints(reshape)?;
    if (point == a0 || point == a1) && (point == b0 || point == b1) {
        let mut merged = merge_lines(&[line.clone(), reshape.clone()]);
        if merged.len() == 1 {
            return merged.pop();
        }
    }
    None
}

/// Reshape one line or ring. `None` when the replacement does not apply.
pub fn reshape_line(line: &LineString<f64>, reshape: &LineString<f64>) -> Option<LineString<f64>> {
    let meeting = match overlay(&line_geom(line), &line_geom(reshape), OverlayOp::Intersection) {
        Ok(g) => g,
        Err(e) => {
            debug!(error = %e, "reshape intersection failed");
            return None;
        }
    };
    match &meeting {
        GeoGeometry::Point(p) => return merge_at_endpoint(line, reshape, p.0),
        GeoGeometry::MultiPoint(mp) if mp.0.len() > 1 => {}
        _ => return None,
    }

    let (begin, end) = endpoints(line)?;
    let is_ring = begin == end;

    let noded = node_all(&[reshape.clone(), line.clone()]);
    let merged = merge_lines(&noded);
    if merged.len() < 2 {
        // The replacement runs from one end of the line to the other
        return if merged.len() == 1 { Some(reshape.clone()) } else { None };
    }

    let mut parts: Vec<LineString<f64>> = Vec::new();
    let mut ring_candidates: Vec<LineString<f64>> = Vec::new();
    for piece in merged {
        let Some((p0, p1)) = endpoints(&piece) else {
            continue;
        };
        let on_original = usize::from(point_contained_in_line(p0, line)) + usize::from(point_contained_in_line(p1, line));
        let is_line_end = |p: Coord<f64>| p == begin || p == end;
        let same_as_ends = usize::from(is_line_end(p0)) + usize::from(is_line_end(p1));
        let along_original = line_contained_in_line(&piece, line);
        let along_reshape = line_contained_in_line(&piece, reshape);

        if !is_ring && same_as_ends == 1 && on_original == 2 && along_original {
            parts.push(piece);
        } else if is_ring && on_original == 2 && along_original {
            ring_candidates.push(piece);
        } else if (on_original == 2 || same_as_ends == 2) && !along_original {
            parts.push(piece);
        } else if along_original && along_reshape {
            parts.push(piece);
        }
    }

    // Of the ring pieces the longest one survives
    if is_ring {
        if let Some(longest) = ring_candidates
            .into_iter()
            .max_by(|a, b| planar_length(a).total_cmp(&planar_length(b)))
        {
            parts.push(longest);
        }
    }

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => {
            let mut joined = merge_lines(&parts);
            if joined.len() == 1 { joined.pop() } else { None }
        }
    }
}

/// Reshape the single ring of `polygon` that the replacement meets,
/// dropping holes that end up outside the new shell
pub fn reshape_polygon(polygon: &Polygon<f64>, reshape: &LineString<f64>) -> Option<Polygon<f64>> {
    let reshape_geom = line_geom(reshape);
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter()).collect();
    let hits: Vec<usize> = rings
        .iter()
        .enumerate()
        .filter(|(_, r)| evaluate(&line_geom(r), &reshape_geom, Predicate::Intersects))
        .map(|(i, _)| i)
        .collect();
    let [target] = hits[..] else {
        return None;
    };

    let new_ring = reshape_line(rings[target], reshape)?;
    if new_ring.0.len() < 4 || new_ring.0.first() != new_ring.0.last() {
        return None;
    }

    let shell = if target == 0 { new_ring.clone() } else { polygon.exterior().clone() };
    let shell_polygon = GeoGeometry::Polygon(Polygon::new(shell.clone(), Vec::new()));
    let holes: Vec<LineString<f64>> = (1..rings.len())
        .map(|i| if i == target { new_ring.clone() } else { rings[i].clone() })
        .filter(|hole| evaluate(&shell_polygon, &line_geom(hole), Predicate::Contains))
        .collect();
    Some(Polygon::new(shell, holes))
}

/// Reshape a lineal or areal geometry with the path through `reshape`.
/// Multi-part geometries are reshaped part by part; at least one part must
/// change.
pub fn reshape_geometry(base: &GeoGeometry<f64>, reshape: &[Coord<f64>]) -> Result<GeoGeometry<f64>> {
    if is_empty_geo(base) || dimension_geo(base) == 0 {
        return Err(EngineError::InvalidBaseGeometry("reshape needs a lineal or areal geometry".into()));
    }
    if reshape.len() < 2 {
        return Err(EngineError::InvalidInput("reshape line needs at least two points".into()));
    }
    let reshape = LineString::new(reshape.to_vec());

    let changed = match base {
        GeoGeometry::LineString(l) => reshape_line(l, &reshape).map(GeoGeometry::LineString),
        GeoGeometry::Polygon(p) => reshape_polygon(p, &reshape).map(GeoGeometry::Polygon),
        GeoGeometry::MultiLineString(ml) => {
            let results: Vec<Option<LineString<f64>>> = ml.0.iter().map(|l| reshape_line(l, &reshape)).collect();
            results.iter().any(Option::is_some).then(|| {
                GeoGeometry::MultiLineString(MultiLineString::new(
                    results
                        .into_iter()
                        .zip(&ml.0)
                        .map(|(r, original)| r.unwrap_or_else(|| original.clone()))
                        .collect(),
                ))
            })
        }
        GeoGeometry::MultiPolygon(mp) => {
            let results: Vec<Option<Polygon<f64>>> = mp.0.iter().map(|p| reshape_polygon(p, &reshape)).collect();
            results.iter().any(Option::is_some).then(|| {
                GeoGeometry::MultiPolygon(MultiPolygon::new(
                    results
                        .into_iter()
                        .zip(&mp.0)
                        .map(|(r, original)| r.unwrap_or_else(|| original.clone()))
                        .collect(),
                ))
            })
        }
        _ => {
            return Err(EngineError::InvalidBaseGeometry(
                "reshape is not supported for geometry collections".into(),
            ))
        }
    };
    changed.ok_or(EngineError::NothingHappened)
}
