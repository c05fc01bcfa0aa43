//! Buffer, single-sided buffer and offset curves.
//!
//! Buffers are assembled as the union of simple pieces: one rectangle per
//! segment, a cap at each free line end and a join wedge on the outer side
//! of every turn. Polygons grow by their ring buffer and shrink by
//! subtracting it.

use std::f64::consts::PI;

use geo::{BooleanOps, Coord, Geometry as GeoGeometry, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};
use super::planar::{self, dist};

/// Shape used where two buffered segments meet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinStyle {
    #[default]
    Round,
    Mitre,
    Bevel,
}

/// Shape of the free ends of a buffered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndCapStyle {
    #[default]
    Round,
    Flat,
    Square,
}

/// Side of a line kept by a single-sided buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSide {
    #[default]
    Left,
    Right,
}

/// Parameters for buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferParams {
    /// Number of segments used to approximate a quarter circle
    pub segments: usize,
    pub end_cap: EndCapStyle,
    pub join: JoinStyle,
    /// Largest mitre length allowed, as a multiple of the distance
    pub miter_limit: f64,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            segments: 8,
            end_cap: EndCapStyle::Round,
            join: JoinStyle::Round,
            miter_limit: 5.0,
        }
    }
}

impl BufferParams {
    pub fn with_segments(segments: usize) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    fn quadrant_segments(&self) -> usize {
        self.segments.max(1)
    }

    fn angle_step(&self) -> f64 {
        PI / 2.0 / self.quadrant_segments() as f64
    }
}

/// Polygon approximating a circle with four times `segments` vertices
pub fn circle(center: Coord<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    let n = 4 * segments.max(1);
    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push(Coord {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        });
    }
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

/// Union of many polygons, merged pairwise to keep the intermediate
/// results small
pub fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = polygons
        .into_iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(Vec::new()),
            })
            .collect();
    }
    layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

fn unit(a: Coord<f64>, b: Coord<f64>) -> Option<Coord<f64>> {
    let len = dist(a, b);
    if len == 0.0 {
        return None;
    }
    Some(Coord {
        x: (b.x - a.x) / len,
        y: (b.y - a.y) / len,
    })
}

/// Left-hand normal of a unit direction
fn left_normal(d: Coord<f64>) -> Coord<f64> {
    Coord { x: -d.y, y: d.x }
}

fn offset(p: Coord<f64>, n: Coord<f64>, distance: f64) -> Coord<f64> {
    Coord {
        x: p.x + n.x * distance,
        y: p.y + n.y * distance,
    }
}

fn ring(mut coords: Vec<Coord<f64>>) -> Polygon<f64> {
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    let mut poly = Polygon::new(LineString::new(coords), vec![]);
    if planar::signed_area(&poly.exterior().0) < 0.0 {
        poly.exterior_mut(|r| r.0.reverse());
    }
    poly
}

/// Intersection of the infinite lines through p1 along d1 and p2 along d2
fn line_line(p1: Coord<f64>, d1: Coord<f64>, p2: Coord<f64>, d2: Coord<f64>) -> Option<Coord<f64>> {
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((p2.x - p1.x) * d2.y - (p2.y - p1.y) * d2.x) / denom;
    Some(Coord {
        x: p1.x + d1.x * t,
        y: p1.y + d1.y * t,
    })
}

/// Points of an arc around `center` from `from` to `to`, turning in the
/// direction given by `ccw`, both ends included
fn arc(center: Coord<f64>, from: Coord<f64>, to: Coord<f64>, ccw: bool, step: f64) -> Vec<Coord<f64>> {
    let radius = dist(center, from);
    let a0 = (from.y - center.y).atan2(from.x - center.x);
    let a1 = (to.y - center.y).atan2(to.x - center.x);
    let mut sweep = a1 - a0;
    if ccw {
        while sweep <= 0.0 {
            sweep += 2.0 * PI;
        }
    } else {
        while sweep >= 0.0 {
            sweep -= 2.0 * PI;
        }
    }
    let n = ((sweep.abs() / step) - 1e-9).ceil().max(1.0) as usize;
    let mut out = Vec::with_capacity(n + 1);
    out.push(from);
    for i in 1..n {
        let a = a0 + sweep * i as f64 / n as f64;
        out.push(Coord {
            x: center.x + radius * a.cos(),
            y: center.y + radius * a.sin(),
        });
    }
    out.push(to);
    out
}

/// Join wedge at a vertex on the side given by the sign of `distance`
/// (positive: left)
fn join_wedge(
    v: Coord<f64>,
    d1: Coord<f64>,
    d2: Coord<f64>,
    distance: f64,
    params: &BufferParams,
) -> Option<Polygon<f64>> {
    let n1 = left_normal(d1);
    let n2 = left_normal(d2);
    let p1 = offset(v, n1, distance);
    let p2 = offset(v, n2, distance);
    match params.join {
        JoinStyle::Round => {
            let mut coords = vec![v];
            coords.extend(arc(v, p1, p2, distance < 0.0, params.angle_step()));
            Some(ring(coords))
        }
        JoinStyle::Mitre => match line_line(p1, d1, p2, d2) {
            Some(m) if dist(v, m) <= params.miter_limit * distance.abs() => Some(ring(vec![v, p1, m, p2])),
            _ => Some(ring(vec![v, p1, p2])),
        },
        JoinStyle::Bevel => Some(ring(vec![v, p1, p2])),
    }
}

/// Pieces of the two-sided buffer of one line
fn line_pieces(coords: &[Coord<f64>], distance: f64, params: &BufferParams, out: &mut Vec<Polygon<f64>>) {
    let mut pts = coords.to_vec();
    pts.dedup();
    if pts.len() == 1 {
        if params.end_cap == EndCapStyle::Round {
            out.push(circle(pts[0], distance, params.quadrant_segments()));
        } else if params.end_cap == EndCapStyle::Square {
            let p = pts[0];
            out.push(ring(vec![
                Coord { x: p.x - distance, y: p.y - distance },
                Coord { x: p.x + distance, y: p.y - distance },
                Coord { x: p.x + distance, y: p.y + distance },
                Coord { x: p.x - distance, y: p.y + distance },
            ]));
        }
        return;
    }
    if pts.len() < 2 {
        return;
    }

    let closed = pts.first() == pts.last();
    for w in pts.windows(2) {
        let Some(d) = unit(w[0], w[1]) else { continue };
        let n = left_normal(d);
        out.push(ring(vec![
            offset(w[0], n, -distance),
            offset(w[1], n, -distance),
            offset(w[1], n, distance),
            offset(w[0], n, distance),
        ]));
    }

    let last = pts.len() - 1;
    let mut joins: Vec<usize> = (1..last).collect();
    if closed {
        joins.push(0);
    }
    for i in joins {
        let prev = if i == 0 { pts[last - 1] } else { pts[i - 1] };
        let next = pts[i + 1];
        let (Some(d1), Some(d2)) = (unit(prev, pts[i]), unit(pts[i], next)) else {
            continue;
        };
        let turn = d1.x * d2.y - d1.y * d2.x;
        if turn.abs() < 1e-12 && d1.x * d2.x + d1.y * d2.y > 0.0 {
            continue;
        }
        if params.join == JoinStyle::Round {
            out.push(circle(pts[i], distance, params.quadrant_segments()));
            continue;
        }
        // The outer side of a left turn is the right side
        let side = if turn > 0.0 { -distance } else { distance };
        if let Some(w) = join_wedge(pts[i], d1, d2, side, params) {
            out.push(w);
        }
    }

    if !closed {
        for (end, toward) in [(pts[0], pts[1]), (pts[last], pts[last - 1])] {
            let Some(back) = unit(toward, end) else { continue };
            match params.end_cap {
                EndCapStyle::Round => out.push(circle(end, distance, params.quadrant_segments())),
                EndCapStyle::Square => {
                    let n = left_normal(back);
                    let tip = offset(end, back, distance);
                    out.push(ring(vec![
                        offset(end, n, distance),
                        offset(tip, n, distance),
                        offset(tip, n, -distance),
                        offset(end, n, -distance),
                    ]));
                }
                EndCapStyle::Flat => {}
            }
        }
    }
}

fn empty_polygon() -> GeoGeometry<f64> {
    GeoGeometry::Polygon(Polygon::new(LineString::new(Vec::new()), Vec::new()))
}

fn areal(mut mp: MultiPolygon<f64>) -> GeoGeometry<f64> {
    match mp.0.len() {
        0 => empty_polygon(),
        1 => GeoGeometry::Polygon(mp.0.remove(0)),
        _ => GeoGeometry::MultiPolygon(mp),
    }
}

/// Buffer any geometry by `distance`
pub fn buffer(geom: &GeoGeometry<f64>, distance: f64, params: &BufferParams) -> Result<GeoGeometry<f64>> {
    if !distance.is_finite() {
        return Err(EngineError::InvalidInput(format!("buffer distance {} is not finite", distance)));
    }
    let polygons = planar::polygons(geom);
    let mut lineal = planar::lines(geom);
    let points = planar::points(geom);

    let mut grow: Vec<Polygon<f64>> = Vec::new();
    if distance > 0.0 {
        for p in &points {
            line_pieces(&[*p], distance, params, &mut grow);
        }
        for l in lineal.drain(..) {
            line_pieces(&l.0, distance, params, &mut grow);
        }
    }

    if polygons.is_empty() {
        return Ok(areal(union_all(grow)));
    }

    let base = union_all(polygons.clone());
    if distance == 0.0 {
        return Ok(areal(base));
    }
    let mut ring_pieces = Vec::new();
    for poly in &polygons {
        for r in std::iter::once(poly.exterior()).chain(poly.interiors().iter()) {
            line_pieces(&r.0, distance.abs(), params, &mut ring_pieces);
        }
    }
    let rings = union_all(ring_pieces);
    let result = if distance > 0.0 {
        let mut all = base.union(&rings);
        if !grow.is_empty() {
            all = all.union(&union_all(grow));
        }
        all
    } else {
        base.difference(&rings)
    };
    Ok(areal(result))
}

/// Buffer only one side of a lineal geometry
pub fn single_sided_buffer(
    geom: &GeoGeometry<f64>,
    distance: f64,
    side: BufferSide,
    params: &BufferParams,
) -> Result<GeoGeometry<f64>> {
    let lines = planar::lines(geom);
    if lines.is_empty() {
        return Err(EngineError::InvalidInput(
            "single sided buffer requires a lineal geometry".into(),
        ));
    }
    if distance <= 0.0 {
        return Ok(empty_polygon());
    }
    let signed = match side {
        BufferSide::Left => distance,
        BufferSide::Right => -distance,
    };

    let mut pieces = Vec::new();
    for l in &lines {
        let mut pts = l.0.clone();
        pts.dedup();
        for w in pts.windows(2) {
            let Some(d) = unit(w[0], w[1]) else { continue };
            let n = left_normal(d);
            pieces.push(ring(vec![w[0], w[1], offset(w[1], n, signed), offset(w[0], n, signed)]));
        }
        for i in 1..pts.len().saturating_sub(1) {
            let (Some(d1), Some(d2)) = (unit(pts[i - 1], pts[i]), unit(pts[i], pts[i + 1])) else {
                continue;
            };
            let turn = d1.x * d2.y - d1.y * d2.x;
            // Only turns away from the buffered side leave a gap
            if turn * signed < 0.0 {
                if let Some(w) = join_wedge(pts[i], d1, d2, signed, params) {
                    pieces.push(w);
                }
            }
        }
    }
    Ok(areal(union_all(pieces)))
}

/// Offset one line by `distance` to the left (negative: right)
fn offset_line(coords: &[Coord<f64>], distance: f64, params: &BufferParams) -> Option<LineString<f64>> {
    let mut pts = coords.to_vec();
    pts.dedup();
    if pts.len() < 2 {
        return None;
    }
    let dirs: Vec<Coord<f64>> = pts.windows(2).filter_map(|w| unit(w[0], w[1])).collect();
    if dirs.is_empty() {
        return None;
    }

    let mut out: Vec<Coord<f64>> = vec![offset(pts[0], left_normal(dirs[0]), distance)];
    for i in 1..pts.len() - 1 {
        let (d1, d2) = (dirs[i - 1], dirs[i]);
        let v = pts[i];
        let p1 = offset(v, left_normal(d1), distance);
        let p2 = offset(v, left_normal(d2), distance);
        let turn = d1.x * d2.y - d1.y * d2.x;
        if turn.abs() < 1e-12 && d1.x * d2.x + d1.y * d2.y > 0.0 {
            out.push(p1);
            continue;
        }
        if turn * distance > 0.0 {
            // Inner side: meet at the crossing of the two offset lines
            match line_line(p1, d1, p2, d2) {
                Some(m) => out.push(m),
                None => {
                    out.push(p1);
                    out.push(p2);
                }
            }
            continue;
        }
        match params.join {
            JoinStyle::Round => out.extend(arc(v, p1, p2, distance < 0.0, params.angle_step())),
            JoinStyle::Mitre => match line_line(p1, d1, p2, d2) {
                Some(m) if dist(v, m) <= params.miter_limit * distance.abs() => out.push(m),
                _ => {
                    out.push(p1);
                    out.push(p2);
                }
            },
            JoinStyle::Bevel => {
                out.push(p1);
                out.push(p2);
            }
        }
    }
    let last = pts.len() - 1;
    out.push(offset(pts[last], left_normal(dirs[dirs.len() - 1]), distance));
    out.dedup();
    Some(LineString::new(out))
}

/// Offset curve of a lineal geometry; polygons yield the rings of their buffer
pub fn offset_curve(geom: &GeoGeometry<f64>, distance: f64, params: &BufferParams) -> Result<GeoGeometry<f64>> {
    if !planar::polygons(geom).is_empty() {
        let buffered = buffer(geom, distance, params)?;
        let rings = planar::linework(&buffered);
        return Ok(GeoGeometry::MultiLineString(MultiLineString::new(rings)));
    }
    let lines = planar::lines(geom);
    if lines.is_empty() {
        return Err(EngineError::InvalidInput("offset curve requires a lineal or areal geometry".into()));
    }
    if distance == 0.0 {
        return Ok(geom.clone());
    }
    let mut curves: Vec<LineString<f64>> = lines
        .iter()
        .filter_map(|l| offset_line(&l.0, distance, params))
        .collect();
    Ok(match curves.len() {
        0 => GeoGeometry::LineString(LineString::new(Vec::new())),
        1 => GeoGeometry::LineString(curves.remove(0)),
        _ => GeoGeometry::MultiLineString(MultiLineString::new(curves)),
    })
}
