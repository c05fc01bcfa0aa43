//! Polygonization of noded linework.
//!
//! Builds a planar graph from the lines, strips dangles and cut edges, walks
//! the faces with the face kept on the left of each directed edge, and turns
//! counter-clockwise face rings into shells and clockwise rings into holes.

use std::collections::HashMap;

use geo::{Coord, LineString, Polygon};

use super::planar::{coord_key, locate_in_ring, signed_area, Location};

/// Faces found in a set of noded lines plus the linework that bounds none
#[derive(Debug, Clone, Default)]
pub struct Polygonized {
    pub polygons: Vec<Polygon<f64>>,
    /// Edges with a free end
    pub dangles: Vec<LineString<f64>>,
    /// Edges with the same face on both sides
    pub cut_edges: Vec<LineString<f64>>,
}

struct Edge {
    coords: Vec<Coord<f64>>,
    from: usize,
    to: usize,
    active: bool,
}

struct Graph {
    edges: Vec<Edge>,
    /// Outgoing half-edges per node, sorted by angle (counter-clockwise)
    out: Vec<Vec<usize>>,
}

impl Graph {
    fn dest(&self, he: usize) -> usize {
        let e = &self.edges[he / 2];
        if he % 2 == 0 { e.to } else { e.from }
    }

    fn angle(&self, he: usize) -> f64 {
        let c = &self.edges[he / 2].coords;
        let (p, q) = if he % 2 == 0 {
            (c[0], c[1])
        } else {
            (c[c.len() - 1], c[c.len() - 2])
        };
        (q.y - p.y).atan2(q.x - p.x)
    }

    /// Coordinates of a half-edge in walking order
    fn coords(&self, he: usize) -> Vec<Coord<f64>> {
        let mut c = self.edges[he / 2].coords.clone();
        if he % 2 == 1 {
            c.reverse();
        }
        c
    }

    fn degree(&self, node: usize) -> usize {
        self.out[node].iter().filter(|&&he| self.edges[he / 2].active).count()
    }

    /// Next half-edge around the face to the left of `he`: the outgoing edge
    /// immediately clockwise from the twin at the destination node
    fn next(&self, he: usize) -> Option<usize> {
        let v = self.dest(he);
        let twin = he ^ 1;
        let active: Vec<usize> = self.out[v]
            .iter()
            .copied()
            .filter(|&h| self.edges[h / 2].active)
            .collect();
        let pos = active.iter().position(|&h| h == twin)?;
        let prev = if pos == 0 { active.len() - 1 } else { pos - 1 };
        Some(active[prev])
    }
}

fn build_graph(lines: &[LineString<f64>]) -> Graph {
    let mut node_ids: HashMap<(u64, u64), usize> = HashMap::new();
    let mut node_count = 0usize;
    let mut node_of = |c: Coord<f64>| -> usize {
        *node_ids.entry(coord_key(c)).or_insert_with(|| {
            node_count += 1;
            node_count - 1
        })
    };

    let mut edges = Vec::new();
    let mut seen: HashMap<Vec<(u64, u64)>, ()> = HashMap::new();
    for l in lines {
        let mut coords = l.0.clone();
        coords.dedup();
        if coords.len() < 2 {
            continue;
        }
        let forward: Vec<(u64, u64)> = coords.iter().map(|c| coord_key(*c)).collect();
        let mut backward = forward.clone();
        backward.reverse();
        let key = if forward <= backward { forward } else { backward };
        if seen.insert(key, ()).is_some() {
            continue;
        }
        let from = node_of(coords[0]);
        let to = node_of(coords[coords.len() - 1]);
        edges.push(Edge { coords, from, to, active: true });
    }

    let mut graph = Graph {
        out: vec![Vec::new(); node_count],
        edges,
    };
    for e in 0..graph.edges.len() {
        let (from, to) = (graph.edges[e].from, graph.edges[e].to);
        graph.out[from].push(2 * e);
        graph.out[to].push(2 * e + 1);
    }
    for node in 0..graph.out.len() {
        let mut list = std::mem::take(&mut graph.out[node]);
        list.sort_by(|&a, &b| graph.angle(a).total_cmp(&graph.angle(b)));
        graph.out[node] = list;
    }
    graph
}

fn remove_dangles(graph: &mut Graph) -> Vec<LineString<f64>> {
    let mut removed = Vec::new();
    let mut stack: Vec<usize> = (0..graph.out.len()).filter(|&n| graph.degree(n) == 1).collect();
    while let Some(node) = stack.pop() {
        if graph.degree(node) != 1 {
            continue;
        }
        let Some(he) = graph.out[node].iter().copied().find(|&h| graph.edges[h / 2].active) else {
            continue;
        };
        let e = he / 2;
        graph.edges[e].active = false;
        removed.push(LineString::new(graph.edges[e].coords.clone()));
        let other = graph.dest(he);
        if graph.degree(other) == 1 {
            stack.push(other);
        }
    }
    removed
}

/// Trace every face ring; returns the half-edge cycles
fn trace_rings(graph: &Graph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.edges.len() * 2];
    let mut rings = Vec::new();
    for start in 0..graph.edges.len() * 2 {
        if visited[start] || !graph.edges[start / 2].active {
            continue;
        }
        let mut ring = Vec::new();
        let mut he = start;
        loop {
            visited[he] = true;
            ring.push(he);
            match graph.next(he) {
                Some(n) if n == start => break,
                Some(n) if visited[n] => break,
                Some(n) => he = n,
                None => break,
            }
            if ring.len() > visited.len() {
                break;
            }
        }
        rings.push(ring);
    }
    rings
}

fn ring_coords(graph: &Graph, ring: &[usize]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for &he in ring {
        for c in graph.coords(he) {
            if coords.last() != Some(&c) {
                coords.push(c);
            }
        }
    }
    if coords.first() != coords.last() {
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }
    }
    coords
}

fn bbox(ring: &[Coord<f64>]) -> (f64, f64, f64, f64) {
    ring.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), p| (a.min(p.x), b.min(p.y), c.max(p.x), d.max(p.y)),
    )
}

fn ring_inside(hole: &[Coord<f64>], shell: &[Coord<f64>]) -> bool {
    let (hx0, hy0, hx1, hy1) = bbox(hole);
    let (sx0, sy0, sx1, sy1) = bbox(shell);
    if hx0 < sx0 || hy0 < sy0 || hx1 > sx1 || hy1 > sy1 {
        return false;
    }
    for p in hole {
        match locate_in_ring(*p, shell) {
            Location::Interior => return true,
            Location::Exterior => return false,
            Location::Boundary => {}
        }
    }
    // All vertices on the shell: decide with segment midpoints
    for w in hole.windows(2) {
        let mid = Coord {
            x: (w[0].x + w[1].x) / 2.0,
            y: (w[0].y + w[1].y) / 2.0,
        };
        match locate_in_ring(mid, shell) {
            Location::Interior => return true,
            Location::Exterior => return false,
            Location::Boundary => {}
        }
    }
    false
}

/// Polygonize a set of noded lines
pub fn polygonize(lines: &[LineString<f64>]) -> Polygonized {
    let mut graph = build_graph(lines);
    let mut dangles = remove_dangles(&mut graph);
    let mut cut_edges = Vec::new();

    let rings = loop {
        let rings = trace_rings(&graph);
        let mut ring_of = vec![usize::MAX; graph.edges.len() * 2];
        for (r, ring) in rings.iter().enumerate() {
            for &he in ring {
                ring_of[he] = r;
            }
        }
        let cuts: Vec<usize> = (0..graph.edges.len())
            .filter(|&e| graph.edges[e].active && ring_of[2 * e] == ring_of[2 * e + 1])
            .collect();
        if cuts.is_empty() {
            break rings;
        }
        for e in cuts {
            graph.edges[e].active = false;
            cut_edges.push(LineString::new(graph.edges[e].coords.clone()));
        }
        dangles.extend(remove_dangles(&mut graph));
    };

    let mut shells: Vec<(Vec<Coord<f64>>, f64)> = Vec::new();
    let mut holes: Vec<Vec<Coord<f64>>> = Vec::new();
    for ring in &rings {
        let coords = ring_coords(&graph, ring);
        if coords.len() < 4 {
            continue;
        }
        let area = signed_area(&coords);
        if area > 0.0 {
            shells.push((coords, area));
        } else if area < 0.0 {
            holes.push(coords);
        }
    }

    let mut shell_holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for hole in holes {
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, (shell, _))| ring_inside(&hole, shell))
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            shell_holes[i].push(LineString::new(hole));
        }
    }

    let polygons = shells
        .into_iter()
        .zip(shell_holes)
        .map(|((shell, _), holes)| Polygon::new(LineString::new(shell), holes))
        .collect();

    Polygonized {
        polygons,
        dangles,
        cut_edges,
    }
}
