//! Noding: split lines at every mutual and self intersection so that the
//! resulting pieces only meet at shared endpoints.

use std::collections::{HashMap, HashSet};

use geo::{Coord, LineString};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::planar::{coord_key, dist, line_crossing, on_segment, orient};

/// A noded piece of linework with the set of inputs it came from
#[derive(Debug, Clone, PartialEq)]
pub struct NodedEdge {
    pub coords: Vec<Coord<f64>>,
    /// Bit `i` set when input group `i` contributed this piece
    pub sources: u32,
}

impl NodedEdge {
    pub fn to_line(&self) -> LineString<f64> {
        LineString::new(self.coords.clone())
    }

    pub fn length(&self) -> f64 {
        self.coords.windows(2).map(|w| dist(w[0], w[1])).sum()
    }

    /// A point strictly inside the piece, used to classify it
    pub fn interior_point(&self) -> Coord<f64> {
        let half = self.length() / 2.0;
        let mut walked = 0.0;
        for w in self.coords.windows(2) {
            let d = dist(w[0], w[1]);
            if walked + d >= half && d > 0.0 {
                let t = (half - walked) / d;
                return Coord {
                    x: w[0].x + (w[1].x - w[0].x) * t,
                    y: w[0].y + (w[1].y - w[0].y) * t,
                };
            }
            walked += d;
        }
        self.coords[0]
    }
}

/// Result of intersecting two segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    Point(Coord<f64>),
    Overlap(Coord<f64>, Coord<f64>),
}

/// Intersection of segments a→b and c→d
pub fn segment_intersection(
    a: Coord<f64>,
    b: Coord<f64>,
    c: Coord<f64>,
    d: Coord<f64>,
) -> Option<SegmentIntersection> {
    if a.x.max(b.x) < c.x.min(d.x)
        || c.x.max(d.x) < a.x.min(b.x)
        || a.y.max(b.y) < c.y.min(d.y)
        || c.y.max(d.y) < a.y.min(b.y)
    {
        return None;
    }

    let denom = (b.x - a.x) * (d.y - c.y) - (b.y - a.y) * (d.x - c.x);
    if denom == 0.0 {
        if orient(a, b, c) != 0.0 || orient(a, b, d) != 0.0 {
            return None;
        }
        let mut shared: Vec<Coord<f64>> = Vec::with_capacity(4);
        for p in [a, b] {
            if on_segment(p, c, d) && !shared.contains(&p) {
                shared.push(p);
            }
        }
        for p in [c, d] {
            if on_segment(p, a, b) && !shared.contains(&p) {
                shared.push(p);
            }
        }
        return match shared.len() {
            0 => None,
            1 => Some(SegmentIntersection::Point(shared[0])),
            _ => {
                // Keep the two extreme points along a→b
                let axis = |p: &Coord<f64>| (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
                shared.sort_by(|p, q| axis(p).total_cmp(&axis(q)));
                Some(SegmentIntersection::Overlap(shared[0], shared[shared.len() - 1]))
            }
        };
    }

    if let Some(p) = line_crossing(a, b, c, d) {
        return Some(SegmentIntersection::Point(p));
    }
    // Rounding pushed the crossing just outside; fall back to touching endpoints
    for p in [a, b] {
        if on_segment(p, c, d) {
            return Some(SegmentIntersection::Point(p));
        }
    }
    for p in [c, d] {
        if on_segment(p, a, b) {
            return Some(SegmentIntersection::Point(p));
        }
    }
    None
}

struct Segment {
    line: usize,
    index: usize,
    a: Coord<f64>,
    b: Coord<f64>,
}

/// Node a set of lines. Each input carries a source bitmask; pieces that
/// coincide are merged and their masks combined.
pub fn node_lines(inputs: &[(LineString<f64>, u32)]) -> Vec<NodedEdge> {
    let lines: Vec<Vec<Coord<f64>>> = inputs
        .iter()
        .map(|(l, _)| {
            let mut coords = l.0.clone();
            coords.dedup();
            coords
        })
        .collect();

    let mut segments = Vec::new();
    for (li, coords) in lines.iter().enumerate() {
        for (si, w) in coords.windows(2).enumerate() {
            segments.push(Segment {
                line: li,
                index: si,
                a: w[0],
                b: w[1],
            });
        }
    }

    let tree = RTree::bulk_load(
        segments
            .iter()
            .enumerate()
            .map(|(i, s)| GeomWithData::new(Rectangle::from_corners([s.a.x, s.a.y], [s.b.x, s.b.y]), i))
            .collect(),
    );

    let mut splits: Vec<Vec<Coord<f64>>> = vec![Vec::new(); segments.len()];
    let mut nodes: HashSet<(u64, u64)> = HashSet::new();

    for (i, s) in segments.iter().enumerate() {
        let envelope = AABB::from_corners(
            [s.a.x.min(s.b.x), s.a.y.min(s.b.y)],
            [s.a.x.max(s.b.x), s.a.y.max(s.b.y)],
        );
        for candidate in tree.locate_in_envelope_intersecting(&envelope) {
            let j = candidate.data;
            if j <= i {
                continue;
            }
            let t = &segments[j];
            let Some(ix) = segment_intersection(s.a, s.b, t.a, t.b) else {
                continue;
            };

            if s.line == t.line {
                let n = lines[s.line].len() - 1;
                let closed = lines[s.line].first() == lines[s.line].last();
                let adjacent = t.index == s.index + 1 || (closed && s.index == 0 && t.index == n - 1);
                if adjacent {
                    if let SegmentIntersection::Point(p) = ix {
                        // Only the shared vertex: not a node
                        if p == s.b || p == s.a {
                            continue;
                        }
                    }
                }
            }

            let points = match ix {
                SegmentIntersection::Point(p) => vec![p],
                SegmentIntersection::Overlap(p, q) => vec![p, q],
            };
            for p in &points {
                nodes.insert(coord_key(*p));
                if *p != s.a && *p != s.b {
                    splits[i].push(*p);
                }
                if *p != t.a && *p != t.b {
                    splits[j].push(*p);
                }
            }
        }
    }

    let mut pieces: Vec<NodedEdge> = Vec::new();
    let mut index: HashMap<Vec<(u64, u64)>, usize> = HashMap::new();

    let mut seg_cursor = 0;
    for (li, coords) in lines.iter().enumerate() {
        let source = inputs[li].1;
        if coords.len() < 2 {
            continue;
        }

        // Full vertex sequence with split points inserted
        let mut full: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
        for _ in 0..coords.len() - 1 {
            let seg = &segments[seg_cursor];
            let extra = &mut splits[seg_cursor];
            seg_cursor += 1;
            full.push(seg.a);
            extra.sort_by(|p, q| dist(seg.a, *p).total_cmp(&dist(seg.a, *q)));
            extra.dedup();
            full.extend(extra.iter().copied());
        }
        if let Some(last) = coords.last() {
            full.push(*last);
        }

        let mut current: Vec<Coord<f64>> = vec![full[0]];
        for (k, c) in full.iter().enumerate().skip(1) {
            if current.last() != Some(c) {
                current.push(*c);
            }
            let is_cut = k == full.len() - 1 || nodes.contains(&coord_key(*c));
            if is_cut {
                if current.len() >= 2 {
                    push_piece(&mut pieces, &mut index, std::mem::take(&mut current), source);
                }
                current = vec![*c];
            }
        }
    }

    pieces
}

fn push_piece(
    pieces: &mut Vec<NodedEdge>,
    index: &mut HashMap<Vec<(u64, u64)>, usize>,
    coords: Vec<Coord<f64>>,
    source: u32,
) {
    let forward: Vec<(u64, u64)> = coords.iter().map(|c| coord_key(*c)).collect();
    let mut backward = forward.clone();
    backward.reverse();
    let key = if forward <= backward { forward } else { backward };
    match index.get(&key) {
        Some(&existing) => pieces[existing].sources |= source,
        None => {
            index.insert(key, pieces.len());
            pieces.push(NodedEdge { coords, sources: source });
        }
    }
}

/// Node a set of lines all belonging to one group
pub fn node_all(lines: &[LineString<f64>]) -> Vec<LineString<f64>> {
    let inputs: Vec<(LineString<f64>, u32)> = lines.iter().map(|l| (l.clone(), 1)).collect();
    node_lines(&inputs).into_iter().map(|e| LineString::new(e.coords)).collect()
}

/// Intersection points found while noding two groups of lines: points
/// where lines of both groups meet
pub fn crossing_points(a: &[LineString<f64>], b: &[LineString<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::new();
    let mut seen = HashSet::new();
    let tree = RTree::bulk_load(
        b.iter()
            .flat_map(|l| l.lines())
            .map(|s| GeomWithData::new(Rectangle::from_corners([s.start.x, s.start.y], [s.end.x, s.end.y]), s))
            .collect(),
    );
    for line in a {
        for s in line.lines() {
            let envelope = AABB::from_corners(
                [s.start.x.min(s.end.x), s.start.y.min(s.end.y)],
                [s.start.x.max(s.end.x), s.start.y.max(s.end.y)],
            );
            for candidate in tree.locate_in_envelope_intersecting(&envelope) {
                let t = candidate.data;
                match segment_intersection(s.start, s.end, t.start, t.end) {
                    Some(SegmentIntersection::Point(p)) => {
                        if seen.insert(coord_key(p)) {
                            out.push(p);
                        }
                    }
                    Some(SegmentIntersection::Overlap(p, q)) => {
                        for r in [p, q] {
                            if seen.insert(coord_key(r)) {
                                out.push(r);
                            }
                        }
                    }
                    None => {}
                }
            }
        }
    }
    out
}
