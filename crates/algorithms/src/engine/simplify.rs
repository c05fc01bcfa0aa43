//! Geometry simplification
//!
//! - Douglas-Peucker: removes vertices closer than the tolerance to the
//!   simplified line, rings may collapse or self-intersect
//! - Topology preserving: Douglas-Peucker per component, retried with a
//!   smaller tolerance wherever the result would break validity

use geo::{Geometry, LineString, MultiLineString, MultiPolygon, Polygon, Simplify};

use super::validity::{is_simple, is_valid};

/// Attempts made by the topology preserving variant before a component is
/// left untouched
const MAX_TOLERANCE_HALVINGS: usize = 10;

/// Simplify a geometry using the Douglas-Peucker algorithm.
///
/// Rings reduced below four points are dropped (holes) or kept as they were
/// (shells).
pub fn simplify_dp(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geom {
        Geometry::LineString(ls) => Geometry::LineString(ls.simplify(&tolerance)),
        Geometry::Polygon(p) => Geometry::Polygon(simplify_polygon_dp(p, tolerance)),
        Geometry::MultiLineString(mls) => {
            let simplified: Vec<LineString<f64>> =
                mls.0.iter().map(|ls| ls.simplify(&tolerance)).collect();
            Geometry::MultiLineString(MultiLineString::new(simplified))
        }
        Geometry::MultiPolygon(mp) => {
            let simplified: Vec<Polygon<f64>> = mp
                .0
                .iter()
                .map(|p| simplify_polygon_dp(p, tolerance))
                .collect();
            Geometry::MultiPolygon(MultiPolygon::new(simplified))
        }
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(geo::GeometryCollection(
            gc.0.iter().map(|g| simplify_dp(g, tolerance)).collect(),
        )),
        other => other.clone(),
    }
}

fn simplify_polygon_dp(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let mut exterior = polygon.exterior().simplify(&tolerance);
    if exterior.0.len() < 4 {
        exterior = polygon.exterior().clone();
    }
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| ring.simplify(&tolerance))
        .filter(|ring| ring.0.len() >= 4)
        .collect();
    Polygon::new(exterior, interiors)
}

/// Apply `f` with the tolerance halved until `accept` holds
fn with_retries<T: Clone>(original: &T, tolerance: f64, f: impl Fn(&T, f64) -> T, accept: impl Fn(&T) -> bool) -> T {
    let mut t = tolerance;
    for _ in 0..MAX_TOLERANCE_HALVINGS {
        let candidate = f(original, t);
        if accept(&candidate) {
            return candidate;
        }
        t /= 2.0;
    }
    original.clone()
}

fn preserve_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let keep_rings = |p: &Polygon<f64>, t: f64| {
        let shrink = |ring: &LineString<f64>| {
            let s = ring.simplify(&t);
            if s.0.len() < 4 {
                ring.clone()
            } else {
                s
            }
        };
        Polygon::new(shrink(p.exterior()), p.interiors().iter().map(shrink).collect())
    };
    with_retries(polygon, tolerance, keep_rings, |p| is_valid(&Geometry::Polygon(p.clone())))
}

fn preserve_line(line: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let was_simple = is_simple(&Geometry::LineString(line.clone()));
    with_retries(
        line,
        tolerance,
        |l, t| l.simplify(&t),
        |l| !was_simple || is_simple(&Geometry::LineString(l.clone())),
    )
}

/// Simplify without introducing self-intersections or collapsing rings
pub fn simplify_preserve_topology(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geom {
        Geometry::LineString(ls) => Geometry::LineString(preserve_line(ls, tolerance)),
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.0.iter().map(|l| preserve_line(l, tolerance)).collect(),
        )),
        Geometry::Polygon(p) => Geometry::Polygon(preserve_polygon(p, tolerance)),
        Geometry::MultiPolygon(mp) => {
            let simplified = MultiPolygon::new(mp.0.iter().map(|p| preserve_polygon(p, tolerance)).collect());
            if is_valid(&Geometry::MultiPolygon(simplified.clone())) {
                Geometry::MultiPolygon(simplified)
            } else {
                geom.clone()
            }
        }
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(geo::GeometryCollection(
            gc.0.iter().map(|g| simplify_preserve_topology(g, tolerance)).collect(),
        )),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn zigzag_line() -> LineString<f64> {
        LineString::from(vec![
            (0.0, 0.0),
            (1.0, 0.1),
            (2.0, 0.0),
            (3.0, -0.05),
            (4.0, 0.0),
            (5.0, 0.2),
            (6.0, 0.0),
            (10.0, 0.0),
        ])
    }

    #[test]
    fn test_simplify_dp_reduces_vertices() {
        let simplified = simplify_dp(&Geometry::LineString(zigzag_line()), 0.15);
        let Geometry::LineString(ls) = simplified else {
            panic!("expected LineString");
        };
        assert!(ls.0.len() < 8);
        assert_eq!(ls.0.first().unwrap().x, 0.0);
        assert_eq!(ls.0.last().unwrap().x, 10.0);
    }

    #[test]
    fn test_simplify_dp_high_tolerance_keeps_shell() {
        let tri = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 0.5), (0.0, 0.0)]),
            vec![],
        );
        let Geometry::Polygon(p) = simplify_dp(&Geometry::Polygon(tri.clone()), 10.0) else {
            panic!("expected Polygon");
        };
        assert_eq!(p, tri);
    }

    #[test]
    fn test_preserve_topology_keeps_polygon_valid() {
        // At tolerance 40 the apex (50 120) goes and the shell becomes the
        // square under y = 100, which the hole pokes through
        let poly = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (100.0, 0.0),
                (100.0, 100.0),
                (50.0, 120.0),
                (0.0, 100.0),
                (0.0, 0.0),
            ]),
            vec![LineString::from(vec![(1.0, 5.0), (1.0, 95.0), (60.0, 110.0), (1.0, 5.0)])],
        );
        let geom = Geometry::Polygon(poly);
        assert!(is_valid(&geom));

        let Geometry::Polygon(plain) = simplify_dp(&geom, 40.0) else {
            panic!("expected Polygon");
        };
        assert_eq!(plain.exterior().0.len(), 5);
        assert_eq!(plain.interiors().len(), 1);
        assert!(!is_valid(&Geometry::Polygon(plain)));

        let result = simplify_preserve_topology(&geom, 40.0);
        assert!(is_valid(&result));
        let Geometry::Polygon(kept) = result else {
            panic!("expected Polygon");
        };
        assert!(kept.exterior().0.contains(&Coord { x: 50.0, y: 120.0 }));
    }
}
