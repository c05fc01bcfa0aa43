//! Planar graph of noded boundary lines and shortest paths over it
//!
//! Vertices are distinct points (closer than [`VERTEX_TOLERANCE`] counts as
//! the same point), edges are polylines between two vertices weighted by
//! their length. Query points that fall on an edge are joined to the graph
//! by temporarily splitting that edge; [`Graph::reset`] undoes the joins.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo::{Coord, LineString};
use rstar::primitives::{GeomWithData, Line};
use rstar::RTree;

use crate::engine::planar::{closest_on_segment, dist, point_segment_distance};

/// Points closer than this are merged into one vertex
pub const VERTEX_TOLERANCE: f64 = 1e-8;

/// Query points closer than this to a vertex or an edge are snapped to it
pub const SNAP_TOLERANCE: f64 = 1e-6;

type IndexedVertex = GeomWithData<[f64; 2], usize>;
/// Segment `(edge, segment index)` of a permanent edge
type IndexedSegment = GeomWithData<Line<[f64; 2]>, (usize, usize)>;

#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Coord<f64>,
    /// Indices of the edges meeting here
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub v1: usize,
    pub v2: usize,
    pub coords: Vec<Coord<f64>>,
    pub cost: f64,
    /// Set while a temporary join replaces this edge
    pub inactive: bool,
}

impl Edge {
    fn other_vertex(&self, v: usize) -> usize {
        if self.v1 == v { self.v2 } else { self.v1 }
    }
}

/// Where a point lies on the graph
#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    Vertex(usize),
    /// Edge and index of the segment within it
    Edge(usize, usize),
}

#[derive(Debug)]
pub struct Graph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    vertex_index: RTree<IndexedVertex>,
    segment_index: RTree<IndexedSegment>,
    /// Counts before any temporary join
    base_vertices: usize,
    base_edges: usize,
    inactive: Vec<usize>,
}

/// Dijkstra queue entry ordered by distance (min-heap via reversed Ord)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    vertex: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: shorter distance has higher priority
        other.distance.partial_cmp(&self.distance).unwrap_or(Ordering::Equal)
    }
}

impl Graph {
    /// Build the graph from noded lines. Lines must only meet at their
    /// endpoints.
    pub fn build(lines: &[LineString<f64>]) -> Graph {
        let mut graph = Graph {
            vertices: Vec::new(),
            edges: Vec::new(),
            vertex_index: RTree::new(),
            segment_index: RTree::new(),
            base_vertices: 0,
            base_edges: 0,
            inactive: Vec::new(),
        };

        for line in lines {
            let mut coords = line.0.clone();
            coords.dedup();
            if coords.len() < 2 {
                continue;
            }
            let v1 = graph.vertex_at(coords[0]);
            let v2 = graph.vertex_at(coords[coords.len() - 1]);
            // Snap the ends onto the shared vertices
            coords[0] = graph.vertices[v1].point;
            let last = coords.len() - 1;
            coords[last] = graph.vertices[v2].point;
            graph.add_edge(v1, v2, coords);
        }

        let segments: Vec<IndexedSegment> = graph
            .edges
            .iter()
            .enumerate()
            .flat_map(|(e, edge)| {
                edge.coords.windows(2).enumerate().map(move |(s, w)| {
                    GeomWithData::new(Line::new([w[0].x, w[0].y], [w[1].x, w[1].y]), (e, s))
                })
            })
            .collect();
        graph.segment_index = RTree::bulk_load(segments);
        graph.base_vertices = graph.vertices.len();
        graph.base_edges = graph.edges.len();
        graph
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Existing vertex within [`VERTEX_TOLERANCE`] of `p`, or a new one
    fn vertex_at(&mut self, p: Coord<f64>) -> usize {
        let found = self
            .vertex_index
            .locate_within_distance([p.x, p.y], VERTEX_TOLERANCE * VERTEX_TOLERANCE)
            .map(|v| v.data)
            .min();
        if let Some(v) = found {
            return v;
        }
        let v = self.vertices.len();
        self.vertices.push(Vertex { point: p, edges: Vec::new() });
        self.vertex_index.insert(GeomWithData::new([p.x, p.y], v));
        v
    }

    fn add_edge(&mut self, v1: usize, v2: usize, coords: Vec<Coord<f64>>) -> usize {
        let cost = coords.windows(2).map(|w| dist(w[0], w[1])).sum();
        let e = self.edges.len();
        self.edges.push(Edge { v1, v2, coords, cost, inactive: false });
        self.vertices[v1].edges.push(e);
        if v2 != v1 {
            self.vertices[v2].edges.push(e);
        }
        e
    }

    fn locate(&self, p: Coord<f64>) -> Option<Anchor> {
        let tolerance_sq = SNAP_TOLERANCE * SNAP_TOLERANCE;

        let nearest_vertex = self
            .vertex_index
            .locate_within_distance([p.x, p.y], tolerance_sq)
            .map(|v| v.data)
            .chain((self.base_vertices..self.vertices.len()).filter(|&v| dist(self.vertices[v].point, p) < SNAP_TOLERANCE))
            .min_by(|&a, &b| dist(self.vertices[a].point, p).total_cmp(&dist(self.vertices[b].point, p)));
        if let Some(v) = nearest_vertex {
            return Some(Anchor::Vertex(v));
        }

        // Temporary edges first: they replace inactive permanent ones
        let temporary = (self.base_edges..self.edges.len()).flat_map(|e| {
            self.edges[e]
                .coords
                .windows(2)
                .enumerate()
                .map(move |(s, w)| (e, s, point_segment_distance(p, w[0], w[1])))
                .collect::<Vec<_>>()
        });
        let permanent = self
            .segment_index
            .locate_within_distance([p.x, p.y], tolerance_sq)
            .filter(|s| !self.edges[s.data.0].inactive)
            .map(|s| {
                let (e, i) = s.data;
                let c = &self.edges[e].coords;
                (e, i, point_segment_distance(p, c[i], c[i + 1]))
            });
        temporary
            .chain(permanent)
            .filter(|&(_, _, d)| d < SNAP_TOLERANCE)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(e, s, _)| Anchor::Edge(e, s))
    }

    /// True when `p` coincides with a vertex or lies on an edge
    pub fn is_snapped(&self, p: Coord<f64>) -> bool {
        self.locate(p).is_some()
    }

    /// Vertex for `p`, splitting the edge under it when needed. `None` when
    /// `p` is off the graph.
    pub fn join_vertex(&mut self, p: Coord<f64>) -> Option<usize> {
        let (e, s) = match self.locate(p)? {
            Anchor::Vertex(v) => return Some(v),
            Anchor::Edge(e, s) => (e, s),
        };
        let edge = self.edges[e].clone();
        let on_edge = closest_on_segment(p, edge.coords[s], edge.coords[s + 1]);

        let v = self.vertices.len();
        self.vertices.push(Vertex { point: on_edge, edges: Vec::new() });

        let mut first: Vec<Coord<f64>> = edge.coords[..=s].to_vec();
        first.push(on_edge);
        first.dedup();
        let mut second = vec![on_edge];
        second.extend_from_slice(&edge.coords[s + 1..]);
        second.dedup();

        self.edges[e].inactive = true;
        self.inactive.push(e);
        self.add_edge(edge.v1, v, first);
        self.add_edge(v, edge.v2, second);
        Some(v)
    }

    /// Undo every temporary join
    pub fn reset(&mut self) {
        for e in self.inactive.drain(..) {
            self.edges[e].inactive = false;
        }
        let base_edges = self.base_edges;
        self.edges.truncate(base_edges);
        self.vertices.truncate(self.base_vertices);
        for vertex in &mut self.vertices {
            vertex.edges.retain(|&e| e < base_edges);
        }
    }

    /// Dijkstra from `from` to `to` over the active edges. The result runs
    /// from the point of `from` to the point of `to`; `None` when `to` is
    /// unreachable.
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<Coord<f64>>> {
        let n = self.vertices.len();
        let mut distance = vec![f64::INFINITY; n];
        let mut via_edge: Vec<Option<usize>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut queue = BinaryHeap::new();

        distance[from] = 0.0;
        queue.push(Candidate { distance: 0.0, vertex: from });

        while let Some(Candidate { distance: d, vertex: u }) = queue.pop() {
            if settled[u] {
                continue;
            }
            settled[u] = true;
            if u == to {
                break;
            }
            for &e in &self.vertices[u].edges {
                let edge = &self.edges[e];
                if edge.inactive {
                    continue;
                }
                let w = edge.other_vertex(u);
                let candidate = d + edge.cost;
                if candidate < distance[w] {
                    distance[w] = candidate;
                    via_edge[w] = Some(e);
                    queue.push(Candidate { distance: candidate, vertex: w });
                }
            }
        }

        if !settled[to] {
            return None;
        }

        // Walk back from the target, then flip
        let mut points: Vec<Coord<f64>> = vec![self.vertices[to].point];
        let mut current = to;
        while current != from {
            let e = via_edge[current]?;
            let edge = &self.edges[e];
            let backward: Vec<Coord<f64>> = if edge.v2 == current {
                edge.coords.iter().rev().copied().collect()
            } else {
                edge.coords.clone()
            };
            points.extend(backward.into_iter().skip(1));
            current = edge.other_vertex(current);
        }
        points.reverse();
        Some(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square_ish() -> Graph {
        Graph::build(&[
            LineString::from(vec![(0.0, 0.0), (0.0, 10.0)]),
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 10.0), (20.0, 10.0)]),
            LineString::from(vec![(10.0, 0.0), (20.0, 10.0)]),
        ])
    }

    #[test]
    fn test_build_shares_vertices() {
        let graph = square_ish();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_close_points_merge() {
        let graph = Graph::build(&[
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]),
            LineString::from(vec![(1.0 + 1e-10, 0.0), (2.0, 0.0)]),
        ]);
        assert_eq!(graph.vertex_count(), 3);
    }

    #[test]
    fn test_shortest_path_between_vertices() {
        let graph = square_ish();
        let from = graph.join_vertex_readonly(c(0.0, 0.0)).unwrap();
        let to = graph.join_vertex_readonly(c(20.0, 10.0)).unwrap();
        assert_eq!(graph.shortest_path(from, to).unwrap(), vec![c(0.0, 0.0), c(10.0, 0.0), c(20.0, 10.0)]);
    }

    #[test]
    fn test_join_splits_edge_and_reset_restores() {
        let mut graph = square_ish();
        let v1 = graph.join_vertex(c(0.0, 1.0)).unwrap();
        let v2 = graph.join_vertex(c(11.0, 1.0)).unwrap();
        assert_eq!(graph.edge_count(), 8);
        let path = graph.shortest_path(v1, v2).unwrap();
        assert_eq!(path, vec![c(0.0, 1.0), c(0.0, 0.0), c(10.0, 0.0), c(11.0, 1.0)]);
        graph.reset();
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.vertex_count(), 4);
        assert!(graph.edges.iter().all(|e| !e.inactive));
    }

    #[test]
    fn test_two_joins_on_one_edge() {
        let mut graph = square_ish();
        let v1 = graph.join_vertex(c(11.0, 1.0)).unwrap();
        let v2 = graph.join_vertex(c(19.0, 9.0)).unwrap();
        assert_eq!(graph.shortest_path(v1, v2).unwrap(), vec![c(11.0, 1.0), c(19.0, 9.0)]);
    }

    #[test]
    fn test_off_graph_point() {
        let mut graph = square_ish();
        assert!(graph.join_vertex(c(1.0, 1.0)).is_none());
        assert!(!graph.is_snapped(c(1.0, 1.0)));
        assert!(graph.is_snapped(c(5.0, 10.0)));
    }

    #[test]
    fn test_disconnected_components() {
        let graph = Graph::build(&[
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]),
            LineString::from(vec![(5.0, 5.0), (6.0, 5.0)]),
        ]);
        assert!(graph.shortest_path(0, 2).is_none());
    }

    impl Graph {
        fn join_vertex_readonly(&self, p: Coord<f64>) -> Option<usize> {
            match self.locate(p)? {
                Anchor::Vertex(v) => Some(v),
                Anchor::Edge(..) => None,
            }
        }
    }
}
