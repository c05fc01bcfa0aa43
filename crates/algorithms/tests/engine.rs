//! Behavioural tests of the geometry engine through its public facade.

use approx::assert_relative_eq;
use std::sync::Arc;
use topotrace_algorithms::engine::{
    BufferParams, EngineContext, GeometryEngine, OperationResult,
};
use topotrace_core::geometry::{CoordDims, Geometry, GeometryType, LineString};

fn wkt(text: &str) -> Geometry {
    Geometry::from_wkt(text).unwrap()
}

fn engine(ctx: &Arc<EngineContext>, text: &str) -> GeometryEngine {
    GeometryEngine::new(ctx.clone(), wkt(text))
}

const POLYGONS: &[&str] = &[
    "POLYGON((0 0,10 0,10 10,0 10,0 0))",
    "POLYGON((0 0,0 10,10 10,10 0,0 0))",
    "POLYGON((0 0,20 0,20 20,0 20,0 0),(5 5,15 5,15 15,5 15,5 5))",
    "POLYGON((0 0,4 1,8 0,7 4,8 8,4 7,0 8,1 4,0 0))",
    "MULTIPOLYGON(((0 0,1 0,1 1,0 1,0 0)),((5 5,6 5,6 6,5 5)))",
];

#[test]
fn test_area_is_non_negative_for_valid_polygons() {
    let ctx = EngineContext::init();
    for text in POLYGONS {
        let e = engine(&ctx, text);
        assert!(e.is_valid().unwrap(), "{} should be valid", text);
        assert!(e.area().unwrap() >= 0.0);
    }
}

#[test]
fn test_intersection_with_envelope_is_identity() {
    let ctx = EngineContext::init();
    for text in POLYGONS {
        let e = engine(&ctx, text);
        let envelope = e.envelope().unwrap();
        let clipped = GeometryEngine::new(ctx.clone(), e.intersection(&envelope).unwrap());
        assert_relative_eq!(clipped.area().unwrap(), e.area().unwrap(), epsilon = 1e-9);
        assert!(clipped.is_equal(e.geometry()).unwrap(), "{}", text);
    }
}

#[test]
fn test_split_outside_polygon_changes_nothing() {
    let ctx = EngineContext::init();
    let e = engine(&ctx, "POLYGON((0 0,10 0,10 10,0 10,0 0))");
    let outcome = e.split_geometry(&LineString::from_xy(&[(-5.0, 20.0), (15.0, 20.0)]), true);
    assert_eq!(outcome.result, OperationResult::NothingHappened);
    assert!(outcome.new_geometries.is_empty());
}

#[test]
fn test_split_line_by_crossing_line() {
    let ctx = EngineContext::init();
    let e = engine(&ctx, "LINESTRING(0 0,10 0)");
    let outcome = e.split_geometry(&LineString::from_xy(&[(5.0, -1.0), (5.0, 1.0)]), false);
    assert_eq!(outcome.result, OperationResult::Success);
    assert_eq!(outcome.new_geometries.len(), 2);
}

#[test]
fn test_subdivide_part_sizes() {
    let ctx = EngineContext::init();
    let ring: Vec<String> = (0..=120)
        .map(|i| {
            let angle = (i % 120) as f64 / 120.0 * std::f64::consts::TAU;
            let r = if i % 2 == 0 { 100.0 } else { 80.0 };
            format!("{} {}", r * angle.cos(), r * angle.sin())
        })
        .collect();
    let e = engine(&ctx, &format!("POLYGON(({}))", ring.join(",")));
    let parts = e.subdivide(16).unwrap();
    assert_eq!(parts.geometry_type(), GeometryType::MultiPolygon);
    let parts = parts.parts();
    assert!(parts.len() > 1);
    for part in &parts {
        assert!(part.num_vertices() < 16, "part with {} vertices", part.num_vertices());
    }
    let total: f64 = parts
        .iter()
        .map(|p| GeometryEngine::new(ctx.clone(), p.clone()).area().unwrap())
        .sum();
    assert_relative_eq!(total, e.area().unwrap(), max_relative = 1e-6);
}

#[test]
fn test_de9im_strings() {
    let ctx = EngineContext::init();
    let square = engine(&ctx, "POLYGON((0 0,10 0,10 10,0 10,0 0))");
    assert_eq!(square.relate(&wkt("POINT(5 5)")).unwrap(), "0F2FF1FF2");
    assert_eq!(
        square.relate(&wkt("POLYGON((20 20,30 20,30 30,20 30,20 20))")).unwrap(),
        "FF2FF1212"
    );

    let diagonal = engine(&ctx, "LINESTRING(0 0,10 10)");
    assert_eq!(diagonal.relate(&wkt("LINESTRING(0 10,10 0)")).unwrap(), "0F1FF0102");
    assert!(diagonal.crosses(&wkt("LINESTRING(0 10,10 0)")).unwrap());
}

#[test]
fn test_buffer_areas_approach_circle() {
    let ctx = EngineContext::init();
    let e = engine(&ctx, "POINT(3 4)");
    for radius in [1.0, 5.0, 25.0] {
        let disc = GeometryEngine::new(ctx.clone(), e.buffer(radius, &BufferParams::with_segments(16)).unwrap());
        let expected = std::f64::consts::PI * radius * radius;
        assert_relative_eq!(disc.area().unwrap(), expected, max_relative = 0.01);
    }
}

#[test]
fn test_delaunay_and_voronoi_counts() {
    let ctx = EngineContext::init();
    let e = engine(&ctx, "MULTIPOINT((0 0),(10 0),(5 8),(5 3))");
    let triangles = e.delaunay_triangulation(0.0, false).unwrap();
    assert_eq!(triangles.parts().len(), 3);
    for t in triangles.parts() {
        assert_eq!(t.geometry_type(), GeometryType::Polygon);
    }

    let cells = e.voronoi_diagram(None, 0.0, false).unwrap();
    assert_eq!(cells.parts().len(), 4);
}

#[test]
fn test_reshape_polygon_bulge() {
    let ctx = EngineContext::init();
    let e = engine(&ctx, "POLYGON((0 0,10 0,10 10,0 10,0 0))");
    let reshaped = e
        .reshape_geometry(&LineString::from_xy(&[(3.0, 8.0), (3.0, 15.0), (7.0, 15.0), (7.0, 8.0)]))
        .unwrap();
    let reshaped = GeometryEngine::new(ctx.clone(), reshaped);
    assert!(reshaped.is_valid().unwrap());
    assert_relative_eq!(reshaped.area().unwrap(), 120.0, epsilon = 1e-9);
}

#[test]
fn test_overlay_buffer_and_simplify_results_are_2d() {
    let ctx = EngineContext::init();
    let square = engine(&ctx, "POLYGON Z ((0 0 1,10 0 1,10 10 1,0 10 1,0 0 1))");
    assert_eq!(square.geometry().dims(), CoordDims::XYZ);

    let clipped = square.intersection(&wkt("POLYGON((5 5,15 5,15 15,5 15,5 5))")).unwrap();
    assert_eq!(clipped.dims(), CoordDims::XY);
    let buffered = square.buffer(1.0, &BufferParams::with_segments(8)).unwrap();
    assert_eq!(buffered.dims(), CoordDims::XY);

    let line = engine(&ctx, "LINESTRING ZM (0 0 1 2,5 0.1 1 2,10 0 1 2)");
    assert_eq!(line.simplify(1.0).unwrap().dims(), CoordDims::XY);
    assert_eq!(line.topology_preserving_simplify(1.0).unwrap().dims(), CoordDims::XY);
}
