//! Tracer scenarios over small in-memory layers.

use approx::assert_relative_eq;
use geo::{Coord, Euclidean, Length, LineString};
use std::sync::Arc;
use topotrace_algorithms::engine::EngineContext;
use topotrace_algorithms::tracer::{PathError, Tracer};
use topotrace_core::crs::WebMercatorTransform;
use topotrace_core::geometry::{Geometry, Rectangle};
use topotrace_core::vector::{FeatureSource, MemoryLayer};
use topotrace_core::{CoordinateTransform, CRS};

/// Nearly a square; one side is shifted so there is exactly one shortest
/// path between opposite corners.
///
/// ```text
/// 0,10 +----+ 20,10
///      |   /
/// 0,0  +--+ 10,0
/// ```
const SIMPLE: &[&str] = &[
    "LINESTRING(0 0,0 10)",
    "LINESTRING(0 0,10 0)",
    "LINESTRING(0 10,20 10)",
    "LINESTRING(10 0,20 10)",
];

fn make_layer(wkts: &[&str], crs: CRS) -> Arc<MemoryLayer> {
    let layer = Arc::new(MemoryLayer::new("x", crs));
    for wkt in wkts {
        layer.add_feature(Some(Geometry::from_wkt(wkt).unwrap()));
    }
    layer
}

fn tracer_for(layer: &Arc<MemoryLayer>) -> Tracer {
    let mut tracer = Tracer::new(EngineContext::init());
    tracer.set_layers(vec![layer.clone() as Arc<dyn FeatureSource>]);
    tracer
}

fn p(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

#[test]
fn test_simple() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);

    let path = tracer.find_shortest_path(p(0.0, 0.0), p(20.0, 10.0));
    assert_eq!(path, vec![p(0.0, 0.0), p(10.0, 0.0), p(20.0, 10.0)]);

    // one joined point
    let path = tracer.find_shortest_path(p(5.0, 10.0), p(0.0, 0.0));
    assert_eq!(path, vec![p(5.0, 10.0), p(0.0, 10.0), p(0.0, 0.0)]);

    // two joined points
    let path = tracer.find_shortest_path(p(0.0, 1.0), p(11.0, 1.0));
    assert_eq!(path, vec![p(0.0, 1.0), p(0.0, 0.0), p(10.0, 0.0), p(11.0, 1.0)]);

    // two joined points on one edge
    let path = tracer.find_shortest_path(p(11.0, 1.0), p(19.0, 9.0));
    assert_eq!(path, vec![p(11.0, 1.0), p(19.0, 9.0)]);

    // (1,1) is not on the graph
    assert!(tracer.find_shortest_path(p(0.0, 0.0), p(1.0, 1.0)).is_empty());
}

#[test]
fn test_polygon() {
    let layer = make_layer(&["POLYGON((0 0,0 10,20 10,10 0,0 0))"], CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    let path = tracer.find_shortest_path(p(1.0, 0.0), p(0.0, 1.0));
    assert_eq!(path, vec![p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)]);
}

#[test]
fn test_butterfly() {
    // The line crosses itself at (5,5) without a vertex there
    let layer = make_layer(&["LINESTRING(0 0,0 10,10 0,10 10,0 0)"], CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    let path = tracer.find_shortest_path(p(0.0, 0.0), p(10.0, 0.0));
    assert_eq!(path.len(), 3);
    assert_eq!(path[0], p(0.0, 0.0));
    assert_relative_eq!(path[1].x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(path[1].y, 5.0, epsilon = 1e-9);
    assert_eq!(path[2], p(10.0, 0.0));
}

#[test]
fn test_layer_updates() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    assert!(tracer.init());

    let path = tracer.find_shortest_path(p(10.0, 0.0), p(10.0, 10.0));
    assert_eq!(path, vec![p(10.0, 0.0), p(20.0, 10.0), p(10.0, 10.0)]);

    // add a shortcut
    let shortcut = layer.add_feature(Some(Geometry::from_wkt("LINESTRING(10 0,10 10)").unwrap()));
    let path = tracer.find_shortest_path(p(10.0, 0.0), p(10.0, 10.0));
    assert_eq!(path, vec![p(10.0, 0.0), p(10.0, 10.0)]);

    // delete it again
    layer.delete_feature(shortcut).unwrap();
    let path = tracer.find_shortest_path(p(10.0, 0.0), p(10.0, 10.0));
    assert_eq!(path, vec![p(10.0, 0.0), p(20.0, 10.0), p(10.0, 10.0)]);

    // turn the bottom line into the shortcut
    layer
        .change_geometry(2, Some(Geometry::from_wkt("LINESTRING(10 0,10 10)").unwrap()))
        .unwrap();
    let path = tracer.find_shortest_path(p(10.0, 0.0), p(10.0, 10.0));
    assert_eq!(path, vec![p(10.0, 0.0), p(10.0, 10.0)]);
    let path = tracer.find_shortest_path(p(0.0, 0.0), p(10.0, 0.0));
    assert_eq!(path, vec![p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0)]);
}

#[test]
fn test_extent() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    tracer.set_extent(Some(Rectangle::new(0.0, 0.0, 5.0, 5.0)));
    assert!(tracer.init());

    let path = tracer.find_shortest_path(p(0.0, 0.0), p(10.0, 0.0));
    assert_eq!(path, vec![p(0.0, 0.0), p(10.0, 0.0)]);
    assert!(tracer.find_shortest_path(p(0.0, 0.0), p(20.0, 10.0)).is_empty());
}

#[test]
fn test_reprojection() {
    let layer = make_layer(&["LINESTRING(1 0,2 0)"], CRS::wgs84());
    let transform = Arc::new(WebMercatorTransform);
    let destination = CRS::from_epsg(3857);
    let p1 = transform.transform(&CRS::wgs84(), &destination, p(1.0, 0.0)).unwrap();
    let p2 = transform.transform(&CRS::wgs84(), &destination, p(2.0, 0.0)).unwrap();

    let mut tracer = tracer_for(&layer);
    tracer.set_destination_crs(Some(destination), transform);
    assert!(tracer.init());
    assert_eq!(tracer.find_shortest_path(p1, p2).len(), 2);
}

#[test]
fn test_curved() {
    // Half of a circle of radius 10
    let layer = make_layer(&["CIRCULARSTRING(0 0,10 10,20 0)"], CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    let path = tracer.find_shortest_path(p(0.0, 0.0), p(10.0, 10.0));
    assert!(!path.is_empty());

    let length = LineString::new(path.clone()).length::<Euclidean>();
    assert_relative_eq!(length, 2.0 * std::f64::consts::PI * 10.0 / 4.0, epsilon = 0.01);
    assert_eq!(path[0], p(0.0, 0.0));
    assert_eq!(path[path.len() - 1], p(10.0, 10.0));
}

#[test]
fn test_max_feature_count() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    tracer.set_max_feature_count(3);
    let (path, error) = tracer.find_shortest_path_with_error(p(0.0, 0.0), p(20.0, 10.0));
    assert!(path.is_empty());
    assert_eq!(error, PathError::TooManyFeatures);
    assert!(tracer.has_too_many_features());

    // the extent leaves only two features
    tracer.set_extent(Some(Rectangle::new(0.0, 0.0, 5.0, 5.0)));
    let (path, error) = tracer.find_shortest_path_with_error(p(0.0, 0.0), p(10.0, 0.0));
    assert_eq!(error, PathError::None);
    assert_eq!(path.len(), 2);
}

#[test]
fn test_offset_path() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    tracer.set_offset(-1.0);
    let path = tracer.find_shortest_path(p(0.0, 5.0), p(0.0, 0.0));
    // heading south, the right side is to the west
    assert!(path.len() >= 2);
    assert!(path.iter().all(|c| (c.x + 1.0).abs() < 1e-9));
}

#[test]
fn test_is_point_snapped() {
    let layer = make_layer(SIMPLE, CRS::web_mercator());
    let mut tracer = tracer_for(&layer);
    assert!(tracer.is_point_snapped(p(0.0, 10.0)));
    assert!(tracer.is_point_snapped(p(15.0, 5.0)));
    assert!(!tracer.is_point_snapped(p(5.0, 5.0)));
    assert!(!tracer.has_topology_problem());
}
