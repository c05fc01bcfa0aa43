//! Line merging: join lines end to end wherever exactly two of them meet.

use std::collections::{HashMap, HashSet};

use geo::{Coord, LineString};

use super::planar::coord_key;

pub type Key = (u64, u64);

struct Incidence {
    /// (line index, true when the line starts at this node)
    ends: Vec<(usize, bool)>,
    fixed: bool,
}

/// Merge lines at nodes of degree two. Lines keep their direction where the
/// walk allows it; closed chains come out as rings.
pub fn merge_lines(lines: &[LineString<f64>]) -> Vec<LineString<f64>> {
    merge_lines_except(lines, &HashSet::new())
}

/// Merge lines at nodes of degree two, except at the `fixed` nodes which
/// always end a line
pub fn merge_lines_except(lines: &[LineString<f64>], fixed: &HashSet<Key>) -> Vec<LineString<f64>> {
    let lines: Vec<Vec<Coord<f64>>> = lines
        .iter()
        .map(|l| {
            let mut c = l.0.clone();
            c.dedup();
            c
        })
        .filter(|c| c.len() >= 2)
        .collect();

    let mut nodes: HashMap<Key, Incidence> = HashMap::new();
    for (i, l) in lines.iter().enumerate() {
        for (c, at_start) in [(l[0], true), (l[l.len() - 1], false)] {
            nodes
                .entry(coord_key(c))
                .or_insert_with(|| Incidence { ends: Vec::new(), fixed: false })
                .ends
                .push((i, at_start));
        }
    }
    for key in fixed {
        if let Some(node) = nodes.get_mut(key) {
            node.fixed = true;
        }
    }
    let degree = |c: Coord<f64>| {
        nodes
            .get(&coord_key(c))
            .map_or(0, |n| if n.fixed { usize::MAX } else { n.ends.len() })
    };

    let mut visited = vec![false; lines.len()];
    let mut out = Vec::new();

    // Walk from `line` oriented away from `start_node`, through degree-2 nodes
    let walk = |first: usize, forward: bool, visited: &mut Vec<bool>| -> Vec<Coord<f64>> {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut current = first;
        let mut dir = forward;
        loop {
            visited[current] = true;
            let l = &lines[current];
            let mut push = |c: Coord<f64>| {
                if coords.last() != Some(&c) {
                    coords.push(c);
                }
            };
            if dir {
                l.iter().copied().for_each(&mut push);
            } else {
                l.iter().rev().copied().for_each(&mut push);
            }
            let end = if dir { l[l.len() - 1] } else { l[0] };
            let Some(node) = nodes.get(&coord_key(end)) else {
                break;
            };
            if node.fixed || node.ends.len() != 2 {
                break;
            }
            let next = node
                .ends
                .iter()
                .find(|(idx, _)| !visited[*idx])
                .copied();
            match next {
                Some((idx, at_start)) => {
                    current = idx;
                    dir = at_start;
                }
                None => break,
            }
        }
        coords
    };

    for i in 0..lines.len() {
        if !visited[i] && degree(lines[i][0]) != 2 {
            out.push(LineString::new(walk(i, true, &mut visited)));
        }
    }
    for i in 0..lines.len() {
        let last = lines[i][lines[i].len() - 1];
        if !visited[i] && degree(last) != 2 {
            out.push(LineString::new(walk(i, false, &mut visited)));
        }
    }
    // Whatever is left forms closed chains
    for i in 0..lines.len() {
        if !visited[i] {
            out.push(LineString::new(walk(i, true, &mut visited)));
        }
    }
    out
}
