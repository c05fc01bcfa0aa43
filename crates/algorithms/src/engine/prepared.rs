//! Prepared geometry: an envelope plus an R-tree of the base geometry's
//! segments, answering repeated predicate queries against one base geometry.

use geo::{BoundingRect, Coord, Geometry as GeoGeometry, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use super::convert::{dimension_geo, is_empty_geo};
use super::noding::segment_intersection;
use super::planar::{self, Location};
use super::predicates::{evaluate, Predicate};

type IndexedSegment = GeomWithData<Rectangle<[f64; 2]>, (Coord<f64>, Coord<f64>)>;

/// Index over a base geometry, built once and reused across predicates
pub struct PreparedGeometry {
    geom: GeoGeometry<f64>,
    envelope: Option<Rect<f64>>,
    segments: RTree<IndexedSegment>,
    dimension: u8,
}

impl std::fmt::Debug for PreparedGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedGeometry")
            .field("envelope", &self.envelope)
            .field("segments", &self.segments.size())
            .field("dimension", &self.dimension)
            .finish()
    }
}

fn envelope_contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.min().y >= outer.min().y
        && inner.max().x <= outer.max().x
        && inner.max().y <= outer.max().y
}

fn envelopes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

impl PreparedGeometry {
    pub fn new(geom: &GeoGeometry<f64>) -> Self {
        let segments = planar::segments(geom)
            .into_iter()
            .map(|s| {
                GeomWithData::new(
                    Rectangle::from_corners([s.start.x, s.start.y], [s.end.x, s.end.y]),
                    (s.start, s.end),
                )
            })
            .collect();
        Self {
            geom: geom.clone(),
            envelope: geom.bounding_rect(),
            segments: RTree::bulk_load(segments),
            dimension: dimension_geo(geom),
        }
    }

    pub fn geometry(&self) -> &GeoGeometry<f64> {
        &self.geom
    }

    fn any_segment_crossing(&self, other: &GeoGeometry<f64>) -> bool {
        planar::segments(other).iter().any(|s| {
            let envelope = AABB::from_corners(
                [s.start.x.min(s.end.x), s.start.y.min(s.end.y)],
                [s.start.x.max(s.end.x), s.start.y.max(s.end.y)],
            );
            self.segments
                .locate_in_envelope_intersecting(&envelope)
                .any(|candidate| {
                    let (a, b) = candidate.data;
                    segment_intersection(a, b, s.start, s.end).is_some()
                })
        })
    }

    /// Intersects test using the segment index
    pub fn intersects(&self, other: &GeoGeometry<f64>) -> bool {
        if is_empty_geo(&self.geom) || is_empty_geo(other) {
            return false;
        }
        let (Some(env), Some(other_env)) = (self.envelope, other.bounding_rect()) else {
            return false;
        };
        if !envelopes_intersect(&env, &other_env) {
            return false;
        }

        let other_dim = dimension_geo(other);
        if other_dim == 0 {
            return planar::points(other)
                .into_iter()
                .any(|p| planar::locate(p, &self.geom) != Location::Exterior);
        }
        if self.dimension == 0 {
            return planar::points(&self.geom)
                .into_iter()
                .any(|p| planar::locate(p, other) != Location::Exterior);
        }
        if self.any_segment_crossing(other) {
            return true;
        }
        // No boundaries meet: one geometry must lie wholly inside the other
        if self.dimension == 2 {
            if let Some(p) = planar::vertices(other).first() {
                if planar::locate(*p, &self.geom) != Location::Exterior {
                    return true;
                }
            }
        }
        if other_dim == 2 {
            if let Some(p) = planar::vertices(&self.geom).first() {
                if planar::locate(*p, other) != Location::Exterior {
                    return true;
                }
            }
        }
        false
    }

    /// Evaluate a named predicate, short-circuiting on the envelopes and the
    /// segment index before falling back to the full matrix
    pub fn evaluate(&self, other: &GeoGeometry<f64>, predicate: Predicate) -> bool {
        match predicate {
            Predicate::Intersects => return self.intersects(other),
            Predicate::Disjoint => return !self.intersects(other),
            _ => {}
        }
        let (Some(env), Some(other_env)) = (self.envelope, other.bounding_rect()) else {
            return false;
        };
        if !envelopes_intersect(&env, &other_env) {
            return false;
        }
        let rejected = match predicate {
            Predicate::Contains => !envelope_contains(&env, &other_env),
            Predicate::Within => !envelope_contains(&other_env, &env),
            Predicate::Equals => env != other_env,
            _ => false,
        };
        if rejected {
            return false;
        }
        evaluate(&self.geom, other, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};

    fn square(x0: f64, y0: f64, size: f64) -> GeoGeometry<f64> {
        GeoGeometry::Polygon(polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ])
    }

    #[test]
    fn test_prepared_matches_unprepared() {
        let base = square(0.0, 0.0, 10.0);
        let prepared = PreparedGeometry::new(&base);
        let others = [
            square(5.0, 5.0, 10.0),
            square(20.0, 20.0, 1.0),
            square(2.0, 2.0, 1.0),
            square(10.0, 0.0, 5.0),
            GeoGeometry::Point(point!(x: 5.0, y: 5.0)),
            GeoGeometry::LineString(line_string![(x: -5.0, y: 5.0), (x: 15.0, y: 5.0)]),
        ];
        let predicates = [
            Predicate::Intersects,
            Predicate::Disjoint,
            Predicate::Contains,
            Predicate::Within,
            Predicate::Touches,
            Predicate::Overlaps,
            Predicate::Crosses,
            Predicate::Equals,
        ];
        for other in &others {
            for predicate in predicates {
                assert_eq!(
                    prepared.evaluate(other, predicate),
                    evaluate(&base, other, predicate),
                    "{:?} against {:?}",
                    predicate,
                    other
                );
            }
        }
    }

    #[test]
    fn test_prepared_contained_polygon_intersects() {
        let prepared = PreparedGeometry::new(&square(0.0, 0.0, 10.0));
        assert!(prepared.intersects(&square(2.0, 2.0, 1.0)));
        assert!(!prepared.intersects(&square(20.0, 2.0, 1.0)));
    }
}
