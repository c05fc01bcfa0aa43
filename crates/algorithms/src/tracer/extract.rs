//! Linework extraction from layer features

use geo::{Coord, LineString};
use topotrace_core::geometry::{Geometry, LineString as CoreLine, Rectangle, DEFAULT_ARC_STEP};
use topotrace_core::vector::FeatureSource;
use topotrace_core::{CoordinateTransform, CRS};
use tracing::{debug, warn};

/// Boundary lines of a geometry: lines as they are, polygon rings, nothing
/// for points. Curves are linearized; degenerate lines are dropped.
pub fn boundary_lines(geometry: &Geometry) -> Vec<LineString<f64>> {
    let mut out = Vec::new();
    collect(&geometry.linearize(DEFAULT_ARC_STEP), &mut out);
    out
}

fn push_line(line: &CoreLine, out: &mut Vec<LineString<f64>>) {
    let mut coords: Vec<Coord<f64>> = line.coords.iter().map(|c| c.xy()).collect();
    coords.dedup();
    if coords.len() >= 2 && coords.iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        out.push(LineString::new(coords));
    }
}

fn collect(geometry: &Geometry, out: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => {}
        Geometry::LineString(l) => push_line(l, out),
        Geometry::CircularString(c) => push_line(&c.linearize(DEFAULT_ARC_STEP), out),
        Geometry::Polygon(p) => p.rings().for_each(|r| push_line(r, out)),
        Geometry::MultiLineString(ml) => ml.lines.iter().for_each(|l| push_line(l, out)),
        Geometry::MultiPolygon(mp) => mp
            .polygons
            .iter()
            .flat_map(|p| p.rings())
            .for_each(|r| push_line(r, out)),
        Geometry::GeometryCollection(gc) => gc.geometries.iter().for_each(|g| collect(g, out)),
    }
}

/// Linework of one layer in the working reference system, restricted to
/// features whose bounding box meets `extent`. Returns the lines and the
/// number of features that passed the extent filter.
pub fn layer_lines(
    layer: &dyn FeatureSource,
    destination: Option<&CRS>,
    transform: &dyn CoordinateTransform,
    extent: Option<&Rectangle>,
) -> (Vec<LineString<f64>>, usize) {
    let source_crs = layer.crs();
    let reproject = destination.filter(|dst| !dst.is_equivalent(&source_crs));

    // The extent is in the working system; only pass it down when the
    // layer shares that system
    let features = match reproject {
        Some(_) => layer.features(None),
        None => layer.features(extent),
    };

    let mut lines = Vec::new();
    let mut used = 0;
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref().filter(|g| !g.is_empty()) else {
            continue;
        };
        let geometry = match reproject {
            Some(dst) => match transform.transform_geometry(&source_crs, dst, geometry) {
                Ok(g) => g,
                Err(e) => {
                    warn!(layer = layer.name(), id = feature.id, error = %e, "skipping feature that failed to transform");
                    continue;
                }
            },
            None => geometry.clone(),
        };
        if let Some(extent) = extent {
            if !extent.intersects(&geometry.bounding_box()) {
                continue;
            }
        }
        used += 1;
        lines.extend(boundary_lines(&geometry));
    }
    debug!(layer = layer.name(), features = used, lines = lines.len(), "layer linework extracted");
    (lines, used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topotrace_core::crs::IdentityTransform;
    use topotrace_core::vector::MemoryLayer;

    fn wkt(text: &str) -> Geometry {
        Geometry::from_wkt(text).unwrap()
    }

    #[test]
    fn test_polygon_rings_become_lines() {
        let lines = boundary_lines(&wkt("POLYGON((0 0,10 0,10 10,0 10,0 0),(2 2,3 2,3 3,2 2))"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0.len(), 5);
    }

    #[test]
    fn test_points_and_degenerate_lines_are_skipped() {
        assert!(boundary_lines(&wkt("POINT(1 1)")).is_empty());
        assert!(boundary_lines(&wkt("LINESTRING(1 1,1 1)")).is_empty());
    }

    #[test]
    fn test_curves_are_linearized() {
        let lines = boundary_lines(&wkt("CIRCULARSTRING(0 0,10 10,20 0)"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].0.len() > 100);
    }

    #[test]
    fn test_extent_excludes_features() {
        let layer = MemoryLayer::new("lines", CRS::from_epsg(3857));
        layer.add_feature(Some(wkt("LINESTRING(0 0,10 0)")));
        layer.add_feature(Some(wkt("LINESTRING(0 10,20 10)")));
        layer.add_feature(None);
        let extent = Rectangle::new(0.0, 0.0, 5.0, 5.0);
        let (lines, used) = layer_lines(&layer, None, &IdentityTransform, Some(&extent));
        assert_eq!(used, 1);
        assert_eq!(lines.len(), 1);
    }
}
