//! Delaunay triangulation and Voronoi diagrams of a geometry's vertices.
//!
//! The triangulation is built incrementally with Bowyer-Watson. Voronoi
//! cells are the diagram extent clipped by the bisector half-plane of every
//! other site.

use std::collections::BTreeSet;

use geo::{Coord, Geometry as GeoGeometry, GeometryCollection, LineString, MultiLineString, Polygon};
use topotrace_core::geometry::Rectangle;

use super::planar::{coord_key, dist, orient, vertices};

/// Triangle by vertex indices
#[derive(Debug, Clone, Copy)]
struct Triangle {
    v0: usize,
    v1: usize,
    v2: usize,
}

impl Triangle {
    fn edges(&self) -> [(usize, usize); 3] {
        [(self.v0, self.v1), (self.v1, self.v2), (self.v2, self.v0)]
    }
}

/// Circumcircle of a triangle
#[derive(Debug, Clone, Copy)]
struct Circumcircle {
    cx: f64,
    cy: f64,
    radius_sq: f64,
}

impl Circumcircle {
    fn contains(&self, p: Coord<f64>) -> bool {
        let dx = p.x - self.cx;
        let dy = p.y - self.cy;
        dx * dx + dy * dy <= self.radius_sq
    }
}

fn circumcircle(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Option<Circumcircle> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-12 {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(Circumcircle {
        cx: ux,
        cy: uy,
        radius_sq: (a.x - ux).powi(2) + (a.y - uy).powi(2),
    })
}

/// Distinct sites of a geometry. With a positive tolerance a vertex closer
/// than `tolerance` to an earlier site is dropped.
fn sites(geom: &GeoGeometry<f64>, tolerance: f64) -> Vec<Coord<f64>> {
    let mut seen = BTreeSet::new();
    let mut out: Vec<Coord<f64>> = Vec::new();
    for c in vertices(geom) {
        if !seen.insert(coord_key(c)) {
            continue;
        }
        if tolerance > 0.0 && out.iter().any(|s| dist(*s, c) < tolerance) {
            continue;
        }
        out.push(c);
    }
    out
}

fn bowyer_watson(points: &[Coord<f64>]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let dx = max_x - min_x;
    let dy = max_y - min_y;
    let delta = dx.max(dy).max(1.0);

    // Super-triangle at indices 0, 1, 2
    let mut nodes: Vec<Coord<f64>> = vec![
        Coord { x: min_x - 20.0 * delta, y: min_y - delta },
        Coord { x: min_x + 0.5 * dx, y: max_y + 20.0 * delta },
        Coord { x: max_x + 20.0 * delta, y: min_y - delta },
    ];
    let mut triangles = vec![Triangle { v0: 0, v1: 1, v2: 2 }];

    for &point in points {
        let vi = nodes.len();
        nodes.push(point);

        let bad: Vec<usize> = triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                circumcircle(nodes[t.v0], nodes[t.v1], nodes[t.v2]).is_some_and(|cc| cc.contains(point))
            })
            .map(|(i, _)| i)
            .collect();

        // Hole boundary: edges of bad triangles not shared with another bad one
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for &bi in &bad {
            for (ea, eb) in triangles[bi].edges() {
                let shared = bad.iter().any(|&oi| {
                    oi != bi
                        && triangles[oi]
                            .edges()
                            .iter()
                            .any(|&(oa, ob)| (oa == ea && ob == eb) || (oa == eb && ob == ea))
                });
                if !shared {
                    boundary.push((ea, eb));
                }
            }
        }

        let mut bad = bad;
        bad.sort_unstable_by(|a, b| b.cmp(a));
        for bi in bad {
            triangles.swap_remove(bi);
        }
        triangles.extend(boundary.into_iter().map(|(ea, eb)| Triangle { v0: ea, v1: eb, v2: vi }));
    }

    triangles
        .into_iter()
        .filter(|t| t.v0 >= 3 && t.v1 >= 3 && t.v2 >= 3)
        .filter(|t| orient(nodes[t.v0], nodes[t.v1], nodes[t.v2]) != 0.0)
        .map(|t| Triangle { v0: t.v0 - 3, v1: t.v1 - 3, v2: t.v2 - 3 })
        .collect()
}

/// Delaunay triangulation of the vertices of `geom`: a collection of
/// triangles, or with `edges_only` the distinct triangle edges
pub fn delaunay_triangulation(geom: &GeoGeometry<f64>, tolerance: f64, edges_only: bool) -> GeoGeometry<f64> {
    let points = sites(geom, tolerance);
    let triangles = bowyer_watson(&points);

    if edges_only {
        let mut edges = BTreeSet::new();
        for t in &triangles {
            for (a, b) in t.edges() {
                edges.insert((a.min(b), a.max(b)));
            }
        }
        return GeoGeometry::MultiLineString(MultiLineString::new(
            edges
                .into_iter()
                .map(|(a, b)| LineString::new(vec![points[a], points[b]]))
                .collect(),
        ));
    }

    GeoGeometry::GeometryCollection(GeometryCollection(
        triangles
            .iter()
            .map(|t| {
                // Counter-clockwise shells
                let (a, b, c) = (points[t.v0], points[t.v1], points[t.v2]);
                let ring = if orient(a, b, c) > 0.0 { vec![a, b, c, a] } else { vec![a, c, b, a] };
                GeoGeometry::Polygon(Polygon::new(LineString::new(ring), Vec::new()))
            })
            .collect(),
    ))
}

/// Keep the part of convex polygon `ring` on the side of `site` of the
/// bisector between `site` and `other`
fn clip_half_plane(ring: &[Coord<f64>], site: Coord<f64>, other: Coord<f64>) -> Vec<Coord<f64>> {
    let normal = Coord { x: other.x - site.x, y: other.y - site.y };
    let mid = Coord { x: (site.x + other.x) / 2.0, y: (site.y + other.y) / 2.0 };
    let side = |p: Coord<f64>| (p.x - mid.x) * normal.x + (p.y - mid.y) * normal.y;

    let mut out = Vec::with_capacity(ring.len() + 1);
    for (i, &current) in ring.iter().enumerate() {
        let next = ring[(i + 1) % ring.len()];
        let (sc, sn) = (side(current), side(next));
        if sc <= 0.0 {
            out.push(current);
        }
        if (sc < 0.0 && sn > 0.0) || (sc > 0.0 && sn < 0.0) {
            let t = sc / (sc - sn);
            out.push(Coord {
                x: current.x + t * (next.x - current.x),
                y: current.y + t * (next.y - current.y),
            });
        }
    }
    out
}

/// Diagram extent: the site envelope grown by its larger side, widened to
/// include `extent` when given
fn diagram_extent(points: &[Coord<f64>], extent: Option<&Rectangle>) -> Rectangle {
    let mut bounds = Rectangle::empty();
    for p in points {
        bounds.include(p.x, p.y);
    }
    let grow = bounds.width().max(bounds.height()).max(1.0);
    let mut out = bounds.buffered(grow);
    if let Some(extent) = extent.filter(|e| !e.is_empty()) {
        out.combine(extent);
    }
    out
}

/// Voronoi diagram of the vertices of `geom`: one cell per distinct site in
/// site order, or with `edges_only` the cell edges inside the diagram extent
pub fn voronoi_diagram(
    geom: &GeoGeometry<f64>,
    extent: Option<&Rectangle>,
    tolerance: f64,
    edges_only: bool,
) -> GeoGeometry<f64> {
    let points = sites(geom, tolerance);
    if points.len() < 2 {
        return if edges_only {
            GeoGeometry::MultiLineString(MultiLineString::new(Vec::new()))
        } else {
            GeoGeometry::GeometryCollection(GeometryCollection(Vec::new()))
        };
    }

    let frame = diagram_extent(&points, extent);
    let frame_ring = vec![
        Coord { x: frame.xmin, y: frame.ymin },
        Coord { x: frame.xmax, y: frame.ymin },
        Coord { x: frame.xmax, y: frame.ymax },
        Coord { x: frame.xmin, y: frame.ymax },
    ];

    let cells: Vec<Vec<Coord<f64>>> = points
        .iter()
        .map(|&site| {
            points
                .iter()
                .filter(|&&other| other != site)
                .fold(frame_ring.clone(), |cell, &other| {
                    if cell.is_empty() { cell } else { clip_half_plane(&cell, site, other) }
                })
        })
        .collect();

    if edges_only {
        let on_frame = |a: Coord<f64>, b: Coord<f64>| {
            (a.x == frame.xmin && b.x == frame.xmin)
                || (a.x == frame.xmax && b.x == frame.xmax)
                || (a.y == frame.ymin && b.y == frame.ymin)
                || (a.y == frame.ymax && b.y == frame.ymax)
        };
        let mut seen = BTreeSet::new();
        let mut edges = Vec::new();
        for cell in &cells {
            for i in 0..cell.len() {
                let (a, b) = (cell[i], cell[(i + 1) % cell.len()]);
                if a == b || on_frame(a, b) {
                    continue;
                }
                let (ka, kb) = (coord_key(a), coord_key(b));
                if seen.insert((ka.min(kb), ka.max(kb))) {
                    edges.push(LineString::new(vec![a, b]));
                }
            }
        }
        return GeoGeometry::MultiLineString(MultiLineString::new(edges));
    }

    GeoGeometry::GeometryCollection(GeometryCollection(
        cells
            .into_iter()
            .filter(|cell| cell.len() >= 3)
            .map(|mut cell| {
                cell.push(cell[0]);
                GeoGeometry::Polygon(Polygon::new(LineString::new(cell), Vec::new()))
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{Area, Contains, MultiPoint, Point};

    fn site_set() -> GeoGeometry<f64> {
        GeoGeometry::MultiPoint(MultiPoint::from(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (12.0, 9.0),
            (-1.0, 11.0),
            (4.0, 5.0),
        ]))
    }

    #[test]
    fn test_delaunay_triangle_count() {
        let GeoGeometry::GeometryCollection(triangles) = delaunay_triangulation(&site_set(), 0.0, false) else {
            panic!("expected GeometryCollection");
        };
        // 2n - 2 - h with n = 5 sites and h = 4 hull vertices
        assert_eq!(triangles.0.len(), 4);
        let total: f64 = triangles.0.iter().map(|t| t.signed_area()).sum();
        let hull = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (12.0, 9.0), (-1.0, 11.0), (0.0, 0.0)]),
            vec![],
        );
        assert_relative_eq!(total, hull.unsigned_area(), epsilon = 1e-9);
    }

    #[test]
    fn test_delaunay_edges_only() {
        let GeoGeometry::MultiLineString(edges) = delaunay_triangulation(&site_set(), 0.0, true) else {
            panic!("expected MultiLineString");
        };
        // 3n - 3 - h
        assert_eq!(edges.0.len(), 8);
    }

    #[test]
    fn test_delaunay_collinear_is_empty() {
        let line = GeoGeometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
        let GeoGeometry::GeometryCollection(triangles) = delaunay_triangulation(&line, 0.0, false) else {
            panic!("expected GeometryCollection");
        };
        assert!(triangles.0.is_empty());
    }

    #[test]
    fn test_delaunay_tolerance_merges_close_sites() {
        let points = GeoGeometry::MultiPoint(MultiPoint::from(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (5.0, 8.0),
            (5.0, 8.05),
        ]));
        let GeoGeometry::GeometryCollection(triangles) = delaunay_triangulation(&points, 0.1, false) else {
            panic!("expected GeometryCollection");
        };
        assert_eq!(triangles.0.len(), 1);
    }

    #[test]
    fn test_voronoi_cell_count_and_coverage() {
        let points = GeoGeometry::MultiPoint(MultiPoint::from(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)]));
        let extent = Rectangle::new(-10.0, -10.0, 20.0, 20.0);
        let GeoGeometry::GeometryCollection(cells) = voronoi_diagram(&points, Some(&extent), 0.0, false) else {
            panic!("expected GeometryCollection");
        };
        assert_eq!(cells.0.len(), 3);
        let total: f64 = cells.0.iter().map(|c| c.unsigned_area()).sum();
        assert_relative_eq!(total, 900.0, epsilon = 1e-6);
        for (cell, site) in cells.0.iter().zip([(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)]) {
            let GeoGeometry::Polygon(p) = cell else {
                panic!("expected Polygon");
            };
            assert!(p.contains(&Point::new(site.0, site.1)));
        }
    }

    #[test]
    fn test_voronoi_edges_only() {
        let points = GeoGeometry::MultiPoint(MultiPoint::from(vec![(0.0, 0.0), (10.0, 0.0)]));
        let GeoGeometry::MultiLineString(edges) = voronoi_diagram(&points, None, 0.0, true) else {
            panic!("expected MultiLineString");
        };
        // The perpendicular bisector x = 5 across the frame
        assert_eq!(edges.0.len(), 1);
        assert!(edges.0[0].0.iter().all(|c| (c.x - 5.0).abs() < 1e-12));
    }
}
