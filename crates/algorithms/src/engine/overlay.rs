//! Boolean overlay of two geometries.
//!
//! Areal pairs go through `geo`'s boolean operations. Lineal and mixed pairs
//! are noded against each other and every noded piece is classified by the
//! location of its midpoint, the same way an overlay graph labels its edges.

use std::collections::HashSet;

use geo::{BooleanOps, Coord, Geometry as GeoGeometry, LineString, MultiPolygon, Point};

use super::convert::{collapse, dimension_geo, empty_of_dimension, is_empty_geo};
use super::error::{EngineError, Result};
use super::linemerge::{merge_lines, merge_lines_except, Key};
use super::noding::{crossing_points, node_lines};
use super::planar::{self, coord_key, locate_in_polygon, point_segment_distance, Location};

/// Boolean overlay operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOp {
    Intersection,
    Union,
    Difference,
    SymDifference,
}

/// Homogeneous parts of one operand
enum Parts {
    Empty,
    Points(Vec<Coord<f64>>),
    Lines(Vec<LineString<f64>>),
    Areas(MultiPolygon<f64>),
}

impl Parts {
    fn of(geom: &GeoGeometry<f64>) -> Result<Parts> {
        if is_empty_geo(geom) {
            return Ok(Parts::Empty);
        }
        let points = planar::points(geom);
        let lines = planar::lines(geom);
        let polygons = planar::polygons(geom);
        let kinds = usize::from(!points.is_empty())
            + usize::from(!lines.is_empty())
            + usize::from(!polygons.is_empty());
        if kinds > 1 {
            return Err(EngineError::InvalidInput(
                "overlay of collections with mixed dimensions is not supported".into(),
            ));
        }
        Ok(if !polygons.is_empty() {
            Parts::Areas(MultiPolygon::new(polygons))
        } else if !lines.is_empty() {
            Parts::Lines(lines)
        } else if !points.is_empty() {
            let mut seen = HashSet::new();
            Parts::Points(points.into_iter().filter(|p| seen.insert(coord_key(*p))).collect())
        } else {
            Parts::Empty
        })
    }

    fn boundary(&self) -> Vec<LineString<f64>> {
        match self {
            Parts::Areas(mp) => planar::linework(&GeoGeometry::MultiPolygon(mp.clone())),
            Parts::Lines(lines) => lines.clone(),
            _ => Vec::new(),
        }
    }
}

/// Tolerance used to absorb the rounding between our noding and the
/// polygon clipper's own intersection arithmetic
fn snap_tolerance(geoms: &[&GeoGeometry<f64>]) -> f64 {
    let extent = geoms
        .iter()
        .flat_map(|g| planar::vertices(g))
        .fold(1.0f64, |acc, c| acc.max(c.x.abs()).max(c.y.abs()));
    extent * 1e-12
}

/// Location of `p` against an areal geometry, treating points within `eps`
/// of a ring as lying on the boundary
fn locate_area(p: Coord<f64>, areas: &MultiPolygon<f64>, eps: f64) -> Location {
    let mut result = Location::Exterior;
    for poly in &areas.0 {
        let near_ring = std::iter::once(poly.exterior())
            .chain(poly.interiors().iter())
            .flat_map(|r| r.lines())
            .any(|s| point_segment_distance(p, s.start, s.end) <= eps);
        if near_ring {
            result = Location::Boundary;
            continue;
        }
        match locate_in_polygon(p, poly) {
            Location::Interior => return Location::Interior,
            Location::Boundary => result = Location::Boundary,
            Location::Exterior => {}
        }
    }
    result
}

fn on_any_piece(p: Coord<f64>, pieces: &[LineString<f64>]) -> bool {
    pieces.iter().any(|l| l.lines().any(|s| planar::on_segment(p, s.start, s.end)))
}

/// Lines merged back together everywhere except where the other operand
/// met them
fn merge_pieces(pieces: &[LineString<f64>], lines: &[LineString<f64>], other: &[LineString<f64>]) -> Vec<LineString<f64>> {
    let fixed: HashSet<Key> = crossing_points(lines, other).into_iter().map(coord_key).collect();
    merge_lines_except(pieces, &fixed)
}

fn area_geom(mp: MultiPolygon<f64>) -> Vec<GeoGeometry<f64>> {
    if mp.0.is_empty() {
        Vec::new()
    } else {
        vec![GeoGeometry::MultiPolygon(mp)]
    }
}

fn line_geoms(lines: Vec<LineString<f64>>) -> Vec<GeoGeometry<f64>> {
    lines.into_iter().map(GeoGeometry::LineString).collect()
}

fn point_geoms(points: Vec<Coord<f64>>) -> Vec<GeoGeometry<f64>> {
    let mut seen = HashSet::new();
    points
        .into_iter()
        .filter(|p| seen.insert(coord_key(*p)))
        .map(|p| GeoGeometry::Point(Point(p)))
        .collect()
}

/// Pieces of `lines` after noding them against `other`, paired with their
/// midpoint for classification
fn noded_pieces(lines: &[LineString<f64>], other: &[LineString<f64>]) -> Vec<(LineString<f64>, u32, Coord<f64>)> {
    let mut inputs: Vec<(LineString<f64>, u32)> = lines.iter().map(|l| (l.clone(), 1)).collect();
    inputs.extend(other.iter().map(|l| (l.clone(), 2)));
    node_lines(&inputs)
        .into_iter()
        .map(|e| {
            let mid = e.interior_point();
            (e.to_line(), e.sources, mid)
        })
        .collect()
}

/// Parts of lineal `lines` selected by their location against areal `areas`
fn lines_against_area(
    lines: &[LineString<f64>],
    areas: &MultiPolygon<f64>,
    eps: f64,
    keep: impl Fn(Location) -> bool,
) -> Vec<LineString<f64>> {
    let boundary = planar::linework(&GeoGeometry::MultiPolygon(areas.clone()));
    noded_pieces(lines, &boundary)
        .into_iter()
        .filter(|(_, sources, mid)| sources & 1 != 0 && keep(locate_area(*mid, areas, eps)))
        .map(|(l, _, _)| l)
        .collect()
}

fn intersection(a: &Parts, b: &Parts, eps: f64) -> Vec<GeoGeometry<f64>> {
    match (a, b) {
        (Parts::Empty, _) | (_, Parts::Empty) => Vec::new(),
        (Parts::Points(pa), _) => {
            let other = parts_geom(b);
            point_geoms(pa.iter().copied().filter(|p| planar::locate(*p, &other) != Location::Exterior).collect())
        }
        (_, Parts::Points(_)) => intersection(b, a, eps),
        (Parts::Areas(ma), Parts::Areas(mb)) => {
            let area = ma.intersection(mb);
            let (ba, bb) = (a.boundary(), b.boundary());
            let shared: Vec<LineString<f64>> = noded_pieces(&ba, &bb)
                .into_iter()
                .filter(|(_, sources, mid)| *sources == 3 && locate_area(*mid, &area, eps) == Location::Exterior)
                .map(|(l, _, _)| l)
                .collect();
            let touches: Vec<Coord<f64>> = crossing_points(&ba, &bb)
                .into_iter()
                .filter(|p| locate_area(*p, &area, eps) == Location::Exterior && !on_any_piece(*p, &shared))
                .collect();
            let mut out = area_geom(area);
            out.extend(line_geoms(merge_lines(&shared)));
            out.extend(point_geoms(touches));
            out
        }
        (Parts::Lines(la), Parts::Areas(mb)) => {
            let inside = lines_against_area(la, mb, eps, |loc| loc != Location::Exterior);
            let boundary = b.boundary();
            let touches: Vec<Coord<f64>> = crossing_points(la, &boundary)
                .into_iter()
                .filter(|p| !on_any_piece(*p, &inside))
                .collect();
            let mut out = line_geoms(merge_pieces(&inside, la, &boundary));
            out.extend(point_geoms(touches));
            out
        }
        (Parts::Areas(_), Parts::Lines(_)) => intersection(b, a, eps),
        (Parts::Lines(la), Parts::Lines(lb)) => {
            let shared: Vec<LineString<f64>> = noded_pieces(la, lb)
                .into_iter()
                .filter(|(_, sources, _)| *sources == 3)
                .map(|(l, _, _)| l)
                .collect();
            let crossings: Vec<Coord<f64>> = crossing_points(la, lb)
                .into_iter()
                .filter(|p| !on_any_piece(*p, &shared))
                .collect();
            let mut out = line_geoms(merge_lines(&shared));
            out.extend(point_geoms(crossings));
            out
        }
    }
}

fn difference(a: &Parts, b: &Parts, eps: f64) -> Vec<GeoGeometry<f64>> {
    match (a, b) {
        (Parts::Empty, _) => Vec::new(),
        (_, Parts::Empty) => parts_list(a),
        (Parts::Points(pa), _) => {
            let other = parts_geom(b);
            point_geoms(pa.iter().copied().filter(|p| planar::locate(*p, &other) == Location::Exterior).collect())
        }
        // Removing a lower dimension leaves the receiver unchanged
        (Parts::Lines(_), Parts::Points(_)) | (Parts::Areas(_), Parts::Points(_) | Parts::Lines(_)) => {
            parts_list(a)
        }
        (Parts::Areas(ma), Parts::Areas(mb)) => area_geom(ma.difference(mb)),
        (Parts::Lines(la), Parts::Areas(mb)) => {
            let outside = lines_against_area(la, mb, eps, |loc| loc == Location::Exterior);
            line_geoms(merge_pieces(&outside, la, &b.boundary()))
        }
        (Parts::Lines(la), Parts::Lines(lb)) => {
            let only_a: Vec<LineString<f64>> = noded_pieces(la, lb)
                .into_iter()
                .filter(|(_, sources, _)| *sources == 1)
                .map(|(l, _, _)| l)
                .collect();
            line_geoms(merge_pieces(&only_a, la, lb))
        }
    }
}

fn union(a: &Parts, b: &Parts, eps: f64) -> Vec<GeoGeometry<f64>> {
    match (a, b) {
        (Parts::Empty, _) => parts_list(b),
        (_, Parts::Empty) => parts_list(a),
        (Parts::Areas(ma), Parts::Areas(mb)) => area_geom(ma.union(mb)),
        (Parts::Lines(la), Parts::Lines(lb)) => {
            let pieces: Vec<LineString<f64>> = noded_pieces(la, lb).into_iter().map(|(l, _, _)| l).collect();
            line_geoms(merge_lines(&pieces))
        }
        (Parts::Points(pa), Parts::Points(pb)) => point_geoms(pa.iter().chain(pb.iter()).copied().collect()),
        _ => {
            // Mixed dimensions: the higher dimension plus whatever of the
            // lower one lies outside it
            let (high, low) = if parts_dimension(a) >= parts_dimension(b) { (a, b) } else { (b, a) };
            let mut out = parts_list(high);
            out.extend(difference(low, high, eps));
            out
        }
    }
}

fn sym_difference(a: &Parts, b: &Parts, eps: f64) -> Vec<GeoGeometry<f64>> {
    match (a, b) {
        (Parts::Areas(ma), Parts::Areas(mb)) => area_geom(ma.xor(mb)),
        (Parts::Lines(la), Parts::Lines(lb)) => {
            let pieces: Vec<LineString<f64>> = noded_pieces(la, lb)
                .into_iter()
                .filter(|(_, sources, _)| *sources != 3)
                .map(|(l, _, _)| l)
                .collect();
            line_geoms(merge_pieces(&pieces, la, lb))
        }
        _ => {
            let mut out = difference(a, b, eps);
            out.extend(difference(b, a, eps));
            out
        }
    }
}

fn parts_dimension(parts: &Parts) -> u8 {
    match parts {
        Parts::Empty | Parts::Points(_) => 0,
        Parts::Lines(_) => 1,
        Parts::Areas(_) => 2,
    }
}

fn parts_list(parts: &Parts) -> Vec<GeoGeometry<f64>> {
    match parts {
        Parts::Empty => Vec::new(),
        Parts::Points(p) => point_geoms(p.clone()),
        Parts::Lines(l) => line_geoms(l.clone()),
        Parts::Areas(mp) => area_geom(mp.clone()),
    }
}

fn parts_geom(parts: &Parts) -> GeoGeometry<f64> {
    collapse(parts_list(parts))
}

/// Run a boolean overlay on two backend geometries
pub fn overlay(a: &GeoGeometry<f64>, b: &GeoGeometry<f64>, op: OverlayOp) -> Result<GeoGeometry<f64>> {
    let pa = Parts::of(a)?;
    let pb = Parts::of(b)?;
    let eps = snap_tolerance(&[a, b]);
    let (da, db) = (dimension_geo(a), dimension_geo(b));

    let (parts, empty_dim) = match op {
        OverlayOp::Intersection => (intersection(&pa, &pb, eps), da.min(db)),
        OverlayOp::Union => (union(&pa, &pb, eps), da.max(db)),
        OverlayOp::Difference => (difference(&pa, &pb, eps), da),
        OverlayOp::SymDifference => (sym_difference(&pa, &pb, eps), da.max(db)),
    };

    let result = collapse(parts);
    if is_empty_geo(&result) {
        return Ok(empty_of_dimension(empty_dim));
    }
    Ok(result)
}

/// Union of any number of geometries
pub fn unary_union(geoms: &[GeoGeometry<f64>]) -> Result<GeoGeometry<f64>> {
    let mut iter = geoms.iter();
    let Some(first) = iter.next() else {
        return Ok(GeoGeometry::GeometryCollection(geo::GeometryCollection(Vec::new())));
    };
    let mut acc = first.clone();
    for g in iter {
        acc = overlay(&acc, g, OverlayOp::Union)?;
    }
    Ok(acc)
}

/// Union of the receiver with a set of geometries
pub fn combine_many(base: &GeoGeometry<f64>, others: &[GeoGeometry<f64>]) -> Result<GeoGeometry<f64>> {
    let mut all = Vec::with_capacity(others.len() + 1);
    all.push(base.clone());
    all.extend(others.iter().cloned());
    unary_union(&all)
}

/// Merge the lines of a lineal geometry at their degree-two nodes
pub fn line_merge(geom: &GeoGeometry<f64>) -> Result<GeoGeometry<f64>> {
    if dimension_geo(geom) != 1 {
        return Err(EngineError::InvalidInput("line merge requires a lineal geometry".into()));
    }
    let merged = merge_lines(&planar::lines(geom));
    Ok(collapse(line_geoms(merged)))
}
