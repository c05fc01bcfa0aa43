//! Recursive subdivision of a geometry into parts with a bounded number of
//! vertices.

use geo::{BoundingRect, CoordsIter, Geometry, GeometryCollection, MultiLineString, MultiPoint, MultiPolygon};
use topotrace_core::geometry::Rectangle;

use super::clip::clip_by_rect;
use super::convert::dimension_geo;

/// Smallest vertex threshold accepted by [`subdivide`]
pub const MIN_SUBDIVIDE_NODES: usize = 8;

/// Recursion depth after which a part is emitted whatever its size
pub const MAX_SUBDIVIDE_DEPTH: usize = 50;

fn bounds_of(geom: &Geometry<f64>) -> Rectangle {
    match geom.bounding_rect() {
        Some(r) => Rectangle::new(r.min().x, r.min().y, r.max().x, r.max().y),
        None => Rectangle::empty(),
    }
}

fn recurse(part: &Geometry<f64>, max_nodes: usize, depth: usize, clip: Rectangle, out: &mut Vec<Geometry<f64>>) {
    if clip.width() == 0.0 && clip.height() == 0.0 {
        if let Geometry::Point(_) = part {
            out.push(part.clone());
        }
        return;
    }

    match part {
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                recurse(&Geometry::LineString(ls.clone()), max_nodes, depth, clip, out);
            }
            return;
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                recurse(&Geometry::Polygon(p.clone()), max_nodes, depth, clip, out);
            }
            return;
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                recurse(g, max_nodes, depth, clip, out);
            }
            return;
        }
        _ => {}
    }

    if depth > MAX_SUBDIVIDE_DEPTH {
        out.push(part.clone());
        return;
    }

    let vertex_count = part.coords_count();
    if vertex_count == 0 {
        return;
    }
    if vertex_count < max_nodes {
        out.push(part.clone());
        return;
    }

    // Halve along the longer side
    let width = clip.width();
    let height = clip.height();
    let mut half1 = clip;
    let mut half2 = clip;
    if width > height {
        half1.xmax = clip.xmin + width / 2.0;
        half2.xmin = half1.xmax;
    } else {
        half1.ymax = clip.ymin + height / 2.0;
        half2.ymin = half1.ymax;
    }
    if height <= 0.0 {
        for half in [&mut half1, &mut half2] {
            half.ymin -= f64::EPSILON;
            half.ymax += f64::EPSILON;
        }
    }
    if width <= 0.0 {
        for half in [&mut half1, &mut half2] {
            half.xmin -= f64::EPSILON;
            half.xmax += f64::EPSILON;
        }
    }

    let part1 = clip_by_rect(part, &half1);
    let part2 = clip_by_rect(part, &half2);
    recurse(&part1, max_nodes, depth + 1, half1, out);
    recurse(&part2, max_nodes, depth + 1, half2, out);
}

/// Split `geom` into parts of fewer than `max_nodes` vertices each
/// (`max_nodes` is raised to [`MIN_SUBDIVIDE_NODES`]). The result is a
/// multi geometry of the input's dimension, or a collection when the input
/// is one.
pub fn subdivide(geom: &Geometry<f64>, max_nodes: usize) -> Geometry<f64> {
    let max_nodes = max_nodes.max(MIN_SUBDIVIDE_NODES);
    let mut parts = Vec::new();
    recurse(geom, max_nodes, 0, bounds_of(geom), &mut parts);

    if let Geometry::GeometryCollection(_) = geom {
        return Geometry::GeometryCollection(GeometryCollection(parts));
    }
    match dimension_geo(geom) {
        0 => Geometry::MultiPoint(MultiPoint::new(
            parts
                .into_iter()
                .filter_map(|g| match g {
                    Geometry::Point(p) => Some(vec![p]),
                    Geometry::MultiPoint(mp) => Some(mp.0),
                    _ => None,
                })
                .flatten()
                .collect(),
        )),
        1 => Geometry::MultiLineString(MultiLineString::new(
            parts
                .into_iter()
                .filter_map(|g| match g {
                    Geometry::LineString(l) => Some(l),
                    _ => None,
                })
                .collect(),
        )),
        _ => Geometry::MultiPolygon(MultiPolygon::new(
            parts
                .into_iter()
                .filter_map(|g| match g {
                    Geometry::Polygon(p) => Some(p),
                    _ => None,
                })
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, LineString, Polygon};

    fn star(points: usize) -> Polygon<f64> {
        let coords: Vec<(f64, f64)> = (0..points)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / points as f64;
                let r = if i % 2 == 0 { 100.0 } else { 60.0 };
                (r * angle.cos(), r * angle.sin())
            })
            .collect();
        let mut ring = coords.clone();
        ring.push(coords[0]);
        Polygon::new(LineString::from(ring), vec![])
    }

    #[test]
    fn test_subdivide_bounds_vertex_count() {
        let geom = Geometry::Polygon(star(200));
        let Geometry::MultiPolygon(parts) = subdivide(&geom, 20) else {
            panic!("expected MultiPolygon");
        };
        assert!(parts.0.len() > 1);
        for p in &parts.0 {
            assert!(p.coords_count() < 20, "part with {} vertices", p.coords_count());
        }
        let total: f64 = parts.0.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - geom.unsigned_area()).abs() < 1e-6 * geom.unsigned_area());
    }

    #[test]
    fn test_subdivide_small_geometry_is_kept_whole() {
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let Geometry::MultiPolygon(parts) = subdivide(&Geometry::Polygon(square.clone()), 3) else {
            panic!("expected MultiPolygon");
        };
        assert_eq!(parts.0, vec![square]);
    }

    #[test]
    fn test_subdivide_long_line() {
        let coords: Vec<(f64, f64)> = (0..100).map(|i| (i as f64, (i % 2) as f64)).collect();
        let geom = Geometry::LineString(LineString::from(coords));
        let Geometry::MultiLineString(parts) = subdivide(&geom, 10) else {
            panic!("expected MultiLineString");
        };
        assert!(parts.0.len() >= 10);
        assert!(parts.0.iter().all(|l| l.0.len() < 10));
    }

    #[test]
    fn test_subdivide_single_point_passes_through() {
        let geom = Geometry::Point(geo::Point::new(3.0, 4.0));
        let Geometry::MultiPoint(parts) = subdivide(&geom, 8) else {
            panic!("expected MultiPoint");
        };
        assert_eq!(parts.0, vec![geo::Point::new(3.0, 4.0)]);
    }
}
