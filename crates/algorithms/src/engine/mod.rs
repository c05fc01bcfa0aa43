//! Geometry engine
//!
//! [`GeometryEngine`] wraps one abstract geometry and answers operations on
//! it through the planar backend. The native form of the geometry and its
//! prepared index are built lazily and dropped together whenever the
//! geometry changes.
//!
//! Available operations:
//! - Overlay: intersection, union, difference, symmetric difference
//! - DE-9IM relate and the named predicates
//! - Buffer, single-sided buffer, offset curve
//! - Subdivision, rectangle clipping, splitting and reshaping
//! - Metrics, nearest points, Hausdorff distance
//! - Delaunay triangulation and Voronoi diagrams
//! - Validity, simplicity and topological equality

pub mod buffer;
pub mod clip;
pub mod context;
pub mod convert;
pub mod error;
pub mod linemerge;
pub mod measure;
pub mod noding;
pub mod overlay;
pub mod planar;
pub mod polygonize;
pub mod predicates;
pub mod prepared;
pub mod reshape;
pub mod simplify;
pub mod split;
pub mod subdivide;
pub mod triangulate;
pub mod validity;

use std::cell::OnceCell;
use std::sync::Arc;

use geo::{Coord, Geometry as GeoGeometry};
use topotrace_core::geometry::{Coordinate, Geometry, LineString, Point, Rectangle};

pub use buffer::{BufferParams, BufferSide, EndCapStyle, JoinStyle};
pub use context::EngineContext;
pub use convert::NativeGeometry;
pub use error::{EngineError, OperationResult, Result};
pub use overlay::OverlayOp;
pub use predicates::{Matrix, Predicate};
pub use prepared::PreparedGeometry;
pub use reshape::geom_digits;
pub use validity::ValidityError;

use convert::{from_geo, snap_value, to_native};

/// Pattern of the topological equality test
const EQUALS_PATTERN: &str = "T*F**FFF*";

/// Outcome of [`GeometryEngine::split_geometry`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub result: OperationResult,
    /// Every piece of the split geometry
    pub new_geometries: Vec<Geometry>,
    pub topology_test_points: Vec<Coordinate>,
}

/// Engine bound to a single geometry.
///
/// An engine belongs to one thread at a time; it can be moved but not
/// shared.
#[derive(Debug)]
pub struct GeometryEngine {
    ctx: Arc<EngineContext>,
    geometry: Geometry,
    precision: f64,
    native: OnceCell<NativeGeometry>,
    prepared: OnceCell<PreparedGeometry>,
}

impl GeometryEngine {
    pub fn new(ctx: Arc<EngineContext>, geometry: Geometry) -> Self {
        Self::with_precision(ctx, geometry, 0.0)
    }

    /// Engine snapping every coordinate to multiples of `precision` before
    /// it reaches the backend
    pub fn with_precision(ctx: Arc<EngineContext>, geometry: Geometry, precision: f64) -> Self {
        Self {
            ctx,
            geometry,
            precision,
            native: OnceCell::new(),
            prepared: OnceCell::new(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Replace the geometry, dropping the cached native and prepared forms
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.geometry_changed();
    }

    /// Drop the cached forms after the geometry was edited in place
    pub fn geometry_changed(&mut self) {
        self.native.take();
        self.prepared.take();
    }

    /// Mutable access to the geometry; the caches are dropped up front
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        self.geometry_changed();
        &mut self.geometry
    }

    /// Build the prepared index so that later predicates use it
    pub fn prepare_geometry(&mut self) -> Result<()> {
        if self.prepared.get().is_some() {
            return Ok(());
        }
        let native = self.native()?.geo().clone();
        let prepared = self.ctx.guard("prepare", || Ok(PreparedGeometry::new(&native)))?;
        let _ = self.prepared.set(prepared);
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    /// Native form of the geometry, built on first use
    pub fn native(&self) -> Result<&NativeGeometry> {
        if let Some(native) = self.native.get() {
            return Ok(native);
        }
        let built = to_native(&self.geometry, self.precision)?;
        Ok(self.native.get_or_init(|| built))
    }

    fn base(&self) -> Result<&GeoGeometry<f64>> {
        Ok(self.native()?.geo())
    }

    fn operand(&self, other: &Geometry) -> Result<GeoGeometry<f64>> {
        Ok(to_native(other, self.precision)?.into_geo())
    }

    fn snapped(&self, c: &Coordinate) -> Coord<f64> {
        Coord {
            x: snap_value(c.x, self.precision),
            y: snap_value(c.y, self.precision),
        }
    }

    // ─── Overlay ────────────────────────────────────────────────────────
    //
    // Overlay results are rebuilt from planar output: Z and M are dropped.

    fn overlay(&self, other: &Geometry, op: OverlayOp, name: &'static str) -> Result<Geometry> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard(name, || {
            let result = overlay::overlay(a, &b, op)?;
            match (op, &result) {
                (OverlayOp::Union, GeoGeometry::MultiLineString(_)) => {
                    Ok(from_geo(&overlay::line_merge(&result)?))
                }
                _ => Ok(from_geo(&result)),
            }
        })
    }

    pub fn intersection(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(other, OverlayOp::Intersection, "intersection")
    }

    /// Union; lineal results are merged at their degree-two nodes
    pub fn union(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(other, OverlayOp::Union, "union")
    }

    pub fn difference(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(other, OverlayOp::Difference, "difference")
    }

    pub fn sym_difference(&self, other: &Geometry) -> Result<Geometry> {
        self.overlay(other, OverlayOp::SymDifference, "sym_difference")
    }

    /// Union of the geometry with every geometry of `others`
    pub fn combine_many(&self, others: &[Geometry]) -> Result<Geometry> {
        let a = self.base()?;
        let rest = others.iter().map(|g| self.operand(g)).collect::<Result<Vec<_>>>()?;
        self.ctx
            .guard("combine", || Ok(from_geo(&overlay::combine_many(a, &rest)?)))
    }

    /// Self-union: dissolves overlapping polygons and nodes linework
    pub fn unary_union(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("unary_union", || {
            let parts = planar_parts(a);
            Ok(from_geo(&overlay::unary_union(&parts)?))
        })
    }

    // ─── Predicates ─────────────────────────────────────────────────────

    fn predicate(&self, other: &Geometry, predicate: Predicate) -> Result<bool> {
        let b = self.operand(other)?;
        if let Some(prepared) = self.prepared.get() {
            return self.ctx.guard("prepared_predicate", || Ok(prepared.evaluate(&b, predicate)));
        }
        let a = self.base()?;
        self.ctx.guard("predicate", || Ok(predicates::evaluate(a, &b, predicate)))
    }

    pub fn intersects(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Intersects)
    }

    pub fn touches(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Touches)
    }

    pub fn crosses(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Crosses)
    }

    pub fn within(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Within)
    }

    pub fn overlaps(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Overlaps)
    }

    pub fn contains(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Contains)
    }

    pub fn disjoint(&self, other: &Geometry) -> Result<bool> {
        self.predicate(other, Predicate::Disjoint)
    }

    /// DE-9IM matrix code, e.g. `212101212`
    pub fn relate(&self, other: &Geometry) -> Result<String> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("relate", || Ok(Matrix::compute(a, &b).code()))
    }

    /// Match the DE-9IM matrix against a pattern of `T F * 0 1 2`
    pub fn relate_pattern(&self, other: &Geometry, pattern: &str) -> Result<bool> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("relate_pattern", || Matrix::compute(a, &b).matches(pattern))
    }

    /// Exact topological equality
    pub fn is_equal(&self, other: &Geometry) -> Result<bool> {
        self.relate_pattern(other, EQUALS_PATTERN)
    }

    // ─── Buffers ────────────────────────────────────────────────────────

    /// Buffered outlines are planar, the result carries no Z or M
    pub fn buffer(&self, distance: f64, params: &BufferParams) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx
            .guard("buffer", || Ok(from_geo(&buffer::buffer(a, distance, params)?)))
    }

    /// Buffer on one side of a lineal geometry; the right side negates the
    /// distance. Z and M are dropped.
    pub fn single_sided_buffer(&self, distance: f64, side: BufferSide, params: &BufferParams) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("single_sided_buffer", || {
            Ok(from_geo(&buffer::single_sided_buffer(a, distance, side, params)?))
        })
    }

    /// Parallel line at `distance`, left of the line when positive, without
    /// Z or M
    pub fn offset_curve(&self, distance: f64, params: &BufferParams) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx
            .guard("offset_curve", || Ok(from_geo(&buffer::offset_curve(a, distance, params)?)))
    }

    // ─── Editing ────────────────────────────────────────────────────────

    /// Split into parts of fewer than `max_nodes` vertices each
    pub fn subdivide(&self, max_nodes: usize) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx
            .guard("subdivide", || Ok(from_geo(&subdivide::subdivide(a, max_nodes))))
    }

    /// Fast clip by an axis-aligned rectangle
    pub fn clip(&self, rect: &Rectangle) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("clip", || Ok(from_geo(&clip::clip_by_rect(a, rect))))
    }

    /// Split the geometry with `split_line`; a one-vertex line cuts a lineal
    /// geometry at that point
    pub fn split_geometry(&self, split_line: &LineString, topological: bool) -> SplitOutcome {
        let cut: Vec<Coord<f64>> = split_line.coords.iter().map(|c| self.snapped(c)).collect();
        let outcome = self.base().and_then(|a| {
            self.ctx
                .guard("split", || Ok(split::split_geometry(a, &cut, topological)))
        });
        match outcome {
            Ok(split) => SplitOutcome {
                result: split.outcome,
                new_geometries: split.new_geometries.iter().map(from_geo).collect(),
                topology_test_points: split
                    .topology_test_points
                    .iter()
                    .map(|c| Coordinate::new(c.x, c.y))
                    .collect(),
            },
            Err(e) => SplitOutcome {
                result: e.outcome(),
                new_geometries: Vec::new(),
                topology_test_points: Vec::new(),
            },
        }
    }

    /// Replace the part of a ring or line between two intersections with
    /// the path of `reshape_line`
    pub fn reshape_geometry(&self, reshape_line: &LineString) -> Result<Geometry> {
        let a = self.base()?;
        let coords: Vec<Coord<f64>> = reshape_line.coords.iter().map(|c| self.snapped(c)).collect();
        self.ctx
            .guard("reshape", || Ok(from_geo(&reshape::reshape_geometry(a, &coords)?)))
    }

    /// Douglas-Peucker; kept vertices lose their Z and M
    pub fn simplify(&self, tolerance: f64) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx
            .guard("simplify", || Ok(from_geo(&simplify::simplify_dp(a, tolerance))))
    }

    /// Like [`Self::simplify`], never breaking validity; Z and M are dropped
    pub fn topology_preserving_simplify(&self, tolerance: f64) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("topology_preserving_simplify", || {
            Ok(from_geo(&simplify::simplify_preserve_topology(a, tolerance)))
        })
    }

    /// Merge the lines of a lineal geometry at their degree-two nodes
    pub fn merge_lines(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx
            .guard("merge_lines", || Ok(from_geo(&overlay::line_merge(a)?)))
    }

    /// Node the linework of the geometry at every crossing
    pub fn node(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("node", || {
            let noded = noding::node_all(&planar::linework(a));
            if noded.is_empty() && !convert::is_empty_geo(a) {
                return Err(EngineError::NodedGeometryError);
            }
            Ok(from_geo(&GeoGeometry::MultiLineString(geo::MultiLineString::new(noded))))
        })
    }

    /// Faces formed by a set of lineal geometries
    pub fn polygonize(ctx: &Arc<EngineContext>, lines: &[Geometry]) -> Result<Geometry> {
        let linework = lines
            .iter()
            .map(|g| to_native(g, 0.0).map(|n| planar::linework(n.geo())))
            .collect::<Result<Vec<_>>>()?
            .concat();
        ctx.guard("polygonize", || {
            let noded = noding::node_all(&linework);
            let faces = polygonize::polygonize(&noded);
            Ok(from_geo(&GeoGeometry::GeometryCollection(geo::GeometryCollection(
                faces.polygons.into_iter().map(GeoGeometry::Polygon).collect(),
            ))))
        })
    }

    // ─── Metrics ────────────────────────────────────────────────────────

    pub fn area(&self) -> Result<f64> {
        let a = self.base()?;
        self.ctx.guard("area", || Ok(measure::area(a)))
    }

    pub fn length(&self) -> Result<f64> {
        let a = self.base()?;
        self.ctx.guard("length", || Ok(measure::length(a)))
    }

    pub fn centroid(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("centroid", || {
            measure::centroid(a)
                .map(|p| Geometry::Point(Point::new(p.x(), p.y())))
                .ok_or_else(|| EngineError::InvalidBaseGeometry("centroid of an empty geometry".into()))
        })
    }

    pub fn point_on_surface(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("point_on_surface", || {
            measure::point_on_surface(a)
                .map(|p| Geometry::Point(Point::new(p.x(), p.y())))
                .ok_or_else(|| EngineError::InvalidBaseGeometry("point on surface of an empty geometry".into()))
        })
    }

    pub fn envelope(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("envelope", || Ok(from_geo(&measure::envelope(a))))
    }

    pub fn convex_hull(&self) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("convex_hull", || Ok(from_geo(&measure::convex_hull(a))))
    }

    /// Triangles over the vertices, or their edges with `edges_only`
    pub fn delaunay_triangulation(&self, tolerance: f64, edges_only: bool) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("delaunay_triangulation", || {
            Ok(from_geo(&triangulate::delaunay_triangulation(a, tolerance, edges_only)))
        })
    }

    /// Voronoi cells of the vertices, extended to cover `extent` when given
    pub fn voronoi_diagram(&self, extent: Option<&Rectangle>, tolerance: f64, edges_only: bool) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("voronoi_diagram", || {
            Ok(from_geo(&triangulate::voronoi_diagram(a, extent, tolerance, edges_only)))
        })
    }

    pub fn distance(&self, other: &Geometry) -> Result<f64> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("distance", || measure::distance(a, &b))
    }

    /// Point of this geometry nearest to `other`
    pub fn closest_point(&self, other: &Geometry) -> Result<Geometry> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("closest_point", || {
            let p = measure::closest_point(a, &b)?;
            Ok(Geometry::Point(Point::new(p.x(), p.y())))
        })
    }

    /// Shortest segment from this geometry to `other`
    pub fn shortest_line(&self, other: &Geometry) -> Result<Geometry> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("shortest_line", || {
            Ok(from_geo(&GeoGeometry::LineString(measure::shortest_line(a, &b)?)))
        })
    }

    /// Distance along the line to the projection of `point`
    pub fn line_locate_point(&self, point: &Point) -> Result<f64> {
        let a = self.base()?;
        let Some(c) = point.coord else {
            return Err(EngineError::InvalidInput("cannot locate an empty point".into()));
        };
        let p = self.snapped(&c);
        self.ctx.guard("line_locate_point", || measure::line_locate_point(a, p))
    }

    /// Point at `distance` along the line
    pub fn interpolate(&self, distance: f64) -> Result<Geometry> {
        let a = self.base()?;
        self.ctx.guard("interpolate", || {
            let p = measure::interpolate(a, distance)?;
            Ok(Geometry::Point(Point::new(p.x(), p.y())))
        })
    }

    pub fn hausdorff_distance(&self, other: &Geometry) -> Result<f64> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("hausdorff_distance", || measure::hausdorff_distance(a, &b))
    }

    /// Hausdorff distance with every segment densified into pieces of
    /// `fraction` of its length
    pub fn hausdorff_distance_densify(&self, other: &Geometry, fraction: f64) -> Result<f64> {
        let a = self.base()?;
        let b = self.operand(other)?;
        self.ctx.guard("hausdorff_distance_densify", || {
            measure::hausdorff_distance_densify(a, &b, fraction)
        })
    }

    // ─── Validity ───────────────────────────────────────────────────────

    pub fn is_valid(&self) -> Result<bool> {
        Ok(self.validity_error()?.is_none())
    }

    /// The first validity problem found, if any
    pub fn validity_error(&self) -> Result<Option<ValidityError>> {
        let a = self.base()?;
        self.ctx
            .guard("is_valid", || Ok(validity::validate(a).err()))
    }

    pub fn is_simple(&self) -> Result<bool> {
        let a = self.base()?;
        self.ctx.guard("is_simple", || Ok(validity::is_simple(a)))
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

/// Members of a multi geometry or collection as separate geometries
fn planar_parts(geom: &GeoGeometry<f64>) -> Vec<GeoGeometry<f64>> {
    match geom {
        GeoGeometry::MultiPoint(mp) => mp.0.iter().map(|p| GeoGeometry::Point(*p)).collect(),
        GeoGeometry::MultiLineString(ml) => ml.0.iter().cloned().map(GeoGeometry::LineString).collect(),
        GeoGeometry::MultiPolygon(mp) => mp.0.iter().cloned().map(GeoGeometry::Polygon).collect(),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().flat_map(planar_parts).collect(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine(wkt: &str) -> GeometryEngine {
        GeometryEngine::new(EngineContext::init(), Geometry::from_wkt(wkt).unwrap())
    }

    fn wkt(text: &str) -> Geometry {
        Geometry::from_wkt(text).unwrap()
    }

    #[test]
    fn test_overlay_squares() {
        let e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let other = wkt("POLYGON((5 5,15 5,15 15,5 15,5 5))");
        let inter = GeometryEngine::new(e.context().clone(), e.intersection(&other).unwrap());
        assert_relative_eq!(inter.area().unwrap(), 25.0, epsilon = 1e-9);
        let union = GeometryEngine::new(e.context().clone(), e.union(&other).unwrap());
        assert_relative_eq!(union.area().unwrap(), 175.0, epsilon = 1e-9);
        let diff = GeometryEngine::new(e.context().clone(), e.difference(&other).unwrap());
        assert_relative_eq!(diff.area().unwrap(), 75.0, epsilon = 1e-9);
        let sym = GeometryEngine::new(e.context().clone(), e.sym_difference(&other).unwrap());
        assert_relative_eq!(sym.area().unwrap(), 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_merges_lines() {
        let e = engine("LINESTRING(0 0,5 0)");
        let merged = e.union(&wkt("LINESTRING(5 0,10 0)")).unwrap();
        assert_eq!(merged.geometry_type(), topotrace_core::geometry::GeometryType::LineString);
        assert_eq!(merged.num_vertices(), 3);
    }

    #[test]
    fn test_predicates_with_and_without_prepare() {
        let mut e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let inside = wkt("POINT(5 5)");
        let edge = wkt("POLYGON((10 0,20 0,20 10,10 10,10 0))");
        for prepared in [false, true] {
            if prepared {
                e.prepare_geometry().unwrap();
                assert!(e.is_prepared());
            }
            assert!(e.contains(&inside).unwrap());
            assert!(e.intersects(&inside).unwrap());
            assert!(!e.disjoint(&inside).unwrap());
            assert!(e.touches(&edge).unwrap());
            assert!(!e.overlaps(&edge).unwrap());
        }
    }

    #[test]
    fn test_relate_and_pattern() {
        let e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let other = wkt("POLYGON((5 5,15 5,15 15,5 15,5 5))");
        assert_eq!(e.relate(&other).unwrap(), "212101212");
        assert!(e.relate_pattern(&other, "T*T***T**").unwrap());
        assert!(e.relate_pattern(&other, "bad").is_err());
    }

    #[test]
    fn test_is_equal_ignores_vertex_order() {
        let e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        assert!(e.is_equal(&wkt("POLYGON((10 10,0 10,0 0,10 0,10 10))")).unwrap());
        assert!(!e.is_equal(&wkt("POLYGON((0 0,10 0,10 11,0 10,0 0))")).unwrap());
    }

    #[test]
    fn test_set_geometry_drops_caches() {
        let mut e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        e.prepare_geometry().unwrap();
        assert!(e.native().is_ok());
        e.set_geometry(wkt("POLYGON((20 20,30 20,30 30,20 30,20 20))"));
        assert!(!e.is_prepared());
        assert!(!e.contains(&wkt("POINT(5 5)")).unwrap());
        assert!(e.contains(&wkt("POINT(25 25)")).unwrap());
    }

    #[test]
    fn test_precision_snaps_operands() {
        let e = GeometryEngine::with_precision(EngineContext::init(), wkt("POINT(1.04 2.96)"), 0.1);
        assert!(e.is_equal(&wkt("POINT(1 3)")).unwrap());
    }

    #[test]
    fn test_buffer_area() {
        let e = engine("POINT(0 0)");
        let disc = GeometryEngine::new(e.context().clone(), e.buffer(10.0, &BufferParams::with_segments(32)).unwrap());
        let area = disc.area().unwrap();
        assert!((area - std::f64::consts::PI * 100.0).abs() / (std::f64::consts::PI * 100.0) < 0.01);
    }

    #[test]
    fn test_split_reports_nothing_happened_outside() {
        let e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let outcome = e.split_geometry(&LineString::from_xy(&[(20.0, -5.0), (20.0, 15.0)]), false);
        assert_eq!(outcome.result, OperationResult::NothingHappened);
        assert!(outcome.new_geometries.is_empty());
    }

    #[test]
    fn test_split_polygon_in_two() {
        let e = engine("POLYGON((0 0,10 0,10 10,0 10,0 0))");
        let outcome = e.split_geometry(&LineString::from_xy(&[(5.0, -5.0), (5.0, 15.0)]), true);
        assert_eq!(outcome.result, OperationResult::Success);
        assert_eq!(outcome.new_geometries.len(), 2);
        assert!(!outcome.topology_test_points.is_empty());
    }

    #[test]
    fn test_reshape_through_engine() {
        let e = engine("LINESTRING(0 0,10 0)");
        let result = e
            .reshape_geometry(&LineString::from_xy(&[(3.0, -1.0), (3.0, 5.0), (7.0, 5.0), (7.0, -1.0)]))
            .unwrap();
        assert_eq!(result.to_wkt(), "LineString (0 0, 3 0, 3 5, 7 5, 7 0, 10 0)");
    }

    #[test]
    fn test_metrics() {
        let e = engine("LINESTRING(0 0,10 0)");
        assert_relative_eq!(e.length().unwrap(), 10.0);
        assert_relative_eq!(e.line_locate_point(&Point::new(4.0, 3.0)).unwrap(), 4.0);
        assert_eq!(e.interpolate(2.5).unwrap(), Geometry::Point(Point::new(2.5, 0.0)));
        assert_relative_eq!(e.distance(&wkt("POINT(5 5)")).unwrap(), 5.0);
        assert_relative_eq!(e.hausdorff_distance(&wkt("LINESTRING(0 1,10 1)")).unwrap(), 1.0);
    }

    #[test]
    fn test_validity_reason() {
        let e = engine("POLYGON((0 0,10 10,10 0,0 10,0 0))");
        assert!(!e.is_valid().unwrap());
        assert!(e.validity_error().unwrap().is_some());
        assert!(engine("POLYGON((0 0,10 0,10 10,0 10,0 0))").is_valid().unwrap());
    }

    #[test]
    fn test_polygonize_lines() {
        let ctx = EngineContext::init();
        let lines = [
            wkt("LINESTRING(0 0,10 0,10 10)"),
            wkt("LINESTRING(10 10,0 10,0 0)"),
            wkt("LINESTRING(5 -1,5 11)"),
        ];
        let Geometry::GeometryCollection(faces) = GeometryEngine::polygonize(&ctx, &lines).unwrap() else {
            panic!("expected GeometryCollection");
        };
        assert_eq!(faces.geometries.len(), 2);
    }

    #[test]
    fn test_finished_context_fails_operations() {
        let e = engine("POINT(0 0)");
        e.context().finish();
        assert!(matches!(e.area(), Err(EngineError::Engine(_))));
    }
}
