//! Network tracer
//!
//! Shortest paths along the boundaries of the features of a set of layers.
//! The linework of every feature is noded into a planar graph, built lazily
//! on the first query and rebuilt in full whenever a layer reports a change
//! or the configuration changes.
//!
//! Layer notifications arrive on channels that are drained at the start of
//! every query, so the graph is only ever touched from the querying thread.

pub mod extract;
pub mod graph;

use std::sync::Arc;

use crossbeam_channel::Receiver;
use geo::{Coord, Geometry as GeoGeometry, LineString};
use serde::{Deserialize, Serialize};
use topotrace_core::crs::IdentityTransform;
use topotrace_core::geometry::Rectangle;
use topotrace_core::vector::{FeatureSource, LayerEvent};
use topotrace_core::{CoordinateTransform, CRS};
use tracing::{debug, info, warn};

use crate::engine::buffer::{offset_curve, BufferParams, JoinStyle};
use crate::engine::noding::node_all;
use crate::engine::EngineContext;

pub use graph::{Graph, SNAP_TOLERANCE, VERTEX_TOLERANCE};

/// Lifecycle of the tracer graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TracerState {
    Uninitialized,
    Built,
    Invalidated,
}

/// Why a shortest path query returned no points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathError {
    None,
    /// The layers hold more features than the configured maximum
    TooManyFeatures,
    /// The start point is not on the graph
    Point1,
    /// The end point is not on the graph
    Point2,
    /// Both points are on the graph but not connected
    NoPath,
}

struct TracedLayer {
    source: Arc<dyn FeatureSource>,
    events: Receiver<LayerEvent>,
}

/// Shortest-path tracer over layer boundaries
pub struct Tracer {
    ctx: Arc<EngineContext>,
    layers: Vec<TracedLayer>,
    extent: Option<Rectangle>,
    destination_crs: Option<CRS>,
    transform: Arc<dyn CoordinateTransform>,
    max_feature_count: usize,
    offset: f64,
    offset_params: BufferParams,
    state: TracerState,
    graph: Option<Graph>,
    too_many_features: bool,
    topology_problem: bool,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("layers", &self.layers.iter().map(|l| l.source.name().to_string()).collect::<Vec<_>>())
            .field("extent", &self.extent)
            .field("destination_crs", &self.destination_crs)
            .field("state", &self.state)
            .finish()
    }
}

impl Tracer {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            ctx,
            layers: Vec::new(),
            extent: None,
            destination_crs: None,
            transform: Arc::new(IdentityTransform),
            max_feature_count: 0,
            offset: 0.0,
            offset_params: BufferParams::default(),
            state: TracerState::Uninitialized,
            graph: None,
            too_many_features: false,
            topology_problem: false,
        }
    }

    /// Replace the traced layers, subscribing to their change notifications
    pub fn set_layers(&mut self, layers: Vec<Arc<dyn FeatureSource>>) {
        self.layers = layers
            .into_iter()
            .map(|source| {
                let events = source.subscribe();
                TracedLayer { source, events }
            })
            .collect();
        self.invalidate_graph();
    }

    pub fn layers(&self) -> Vec<Arc<dyn FeatureSource>> {
        self.layers.iter().map(|l| Arc::clone(&l.source)).collect()
    }

    /// Only features whose bounding box meets `extent` are traced. The
    /// extent is in the working reference system.
    pub fn set_extent(&mut self, extent: Option<Rectangle>) {
        if self.extent == extent {
            return;
        }
        self.extent = extent;
        self.invalidate_graph();
    }

    pub fn extent(&self) -> Option<&Rectangle> {
        self.extent.as_ref()
    }

    /// Work in `crs`, projecting layer geometries with `transform`. `None`
    /// keeps every layer in its own system.
    pub fn set_destination_crs(&mut self, crs: Option<CRS>, transform: Arc<dyn CoordinateTransform>) {
        self.destination_crs = crs;
        self.transform = transform;
        self.invalidate_graph();
    }

    pub fn destination_crs(&self) -> Option<&CRS> {
        self.destination_crs.as_ref()
    }

    /// Refuse to build the graph when the layers hold more than `count`
    /// features inside the extent; 0 disables the limit
    pub fn set_max_feature_count(&mut self, count: usize) {
        self.max_feature_count = count;
        self.invalidate_graph();
    }

    pub fn max_feature_count(&self) -> usize {
        self.max_feature_count
    }

    /// Offset found paths by `distance`, to the left when positive
    pub fn set_offset(&mut self, distance: f64) {
        self.offset = distance;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset_parameters(&mut self, segments: usize, join: JoinStyle, miter_limit: f64) {
        self.offset_params = BufferParams {
            segments,
            join,
            miter_limit,
            ..self.offset_params
        };
    }

    pub fn state(&self) -> TracerState {
        self.state
    }

    pub fn has_too_many_features(&self) -> bool {
        self.too_many_features
    }

    /// Noding failed during the last build and the raw lines were used
    pub fn has_topology_problem(&self) -> bool {
        self.topology_problem
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// Drop the graph; the next query rebuilds it
    pub fn invalidate_graph(&mut self) {
        if self.state == TracerState::Built {
            debug!("tracer graph invalidated");
            self.state = TracerState::Invalidated;
        }
        self.graph = None;
        self.too_many_features = false;
        self.topology_problem = false;
    }

    /// Drain pending layer notifications; any change invalidates the graph
    fn sync_with_layers(&mut self) {
        let mut changed = false;
        for layer in &self.layers {
            for event in layer.events.try_iter() {
                debug!(layer = layer.source.name(), ?event, "layer change");
                changed = true;
            }
        }
        if changed {
            self.invalidate_graph();
        }
    }

    /// Build the graph if it is missing. Returns false when the feature
    /// limit prevents building.
    pub fn init(&mut self) -> bool {
        self.sync_with_layers();
        if self.graph.is_some() {
            return true;
        }
        if self.too_many_features {
            return false;
        }

        let mut lines: Vec<LineString<f64>> = Vec::new();
        let mut feature_count = 0;
        for layer in &self.layers {
            let (layer_lines, used) = extract::layer_lines(
                layer.source.as_ref(),
                self.destination_crs.as_ref(),
                self.transform.as_ref(),
                self.extent.as_ref(),
            );
            feature_count += used;
            if self.max_feature_count != 0 && feature_count > self.max_feature_count {
                info!(feature_count, max = self.max_feature_count, "too many features to trace");
                self.too_many_features = true;
                return false;
            }
            lines.extend(layer_lines);
        }

        let noded = match self.ctx.guard("tracer_noding", || Ok(node_all(&lines))) {
            Ok(noded) => noded,
            Err(e) => {
                warn!(error = %e, "noding failed, tracing over raw lines");
                self.topology_problem = true;
                lines
            }
        };

        let graph = Graph::build(&noded);
        debug!(
            features = feature_count,
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "tracer graph built"
        );
        self.graph = Some(graph);
        self.state = TracerState::Built;
        true
    }

    /// True when `p` coincides with a graph vertex or lies on an edge
    pub fn is_point_snapped(&mut self, p: Coord<f64>) -> bool {
        if !self.init() {
            return false;
        }
        self.graph.as_ref().is_some_and(|g| g.is_snapped(p))
    }

    /// Shortest path from `p1` to `p2` along the graph. Empty when either
    /// point is off the graph or no path connects them.
    pub fn find_shortest_path(&mut self, p1: Coord<f64>, p2: Coord<f64>) -> Vec<Coord<f64>> {
        self.find_shortest_path_with_error(p1, p2).0
    }

    /// [`Self::find_shortest_path`] with the reason for an empty result
    pub fn find_shortest_path_with_error(&mut self, p1: Coord<f64>, p2: Coord<f64>) -> (Vec<Coord<f64>>, PathError) {
        if !self.init() {
            return (Vec::new(), PathError::TooManyFeatures);
        }
        let Some(graph) = self.graph.as_mut() else {
            return (Vec::new(), PathError::TooManyFeatures);
        };

        let Some(v1) = graph.join_vertex(p1) else {
            graph.reset();
            return (Vec::new(), PathError::Point1);
        };
        let Some(v2) = graph.join_vertex(p2) else {
            graph.reset();
            return (Vec::new(), PathError::Point2);
        };
        let path = graph.shortest_path(v1, v2);
        graph.reset();

        let Some(mut points) = path else {
            return (Vec::new(), PathError::NoPath);
        };
        if let Some(first) = points.first_mut() {
            *first = p1;
        }
        if let Some(last) = points.last_mut() {
            *last = p2;
        }

        if self.offset != 0.0 && points.len() >= 2 {
            points = self.offset_path(points);
        }
        (points, PathError::None)
    }

    fn offset_path(&self, points: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
        let line = GeoGeometry::LineString(LineString::new(points.clone()));
        let offset = self
            .ctx
            .guard("tracer_offset", || offset_curve(&line, self.offset, &self.offset_params));
        match offset {
            Ok(GeoGeometry::LineString(l)) if l.0.len() >= 2 => l.0,
            Ok(_) => points,
            Err(e) => {
                warn!(error = %e, "offsetting the traced path failed");
                points
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topotrace_core::geometry::Geometry;
    use topotrace_core::vector::MemoryLayer;

    fn memory_layer(wkts: &[&str]) -> Arc<MemoryLayer> {
        let layer = Arc::new(MemoryLayer::new("lines", CRS::from_epsg(3857)));
        for wkt in wkts {
            layer.add_feature(Some(Geometry::from_wkt(wkt).unwrap()));
        }
        layer
    }

    fn layer(wkts: &[&str]) -> Arc<dyn FeatureSource> {
        memory_layer(wkts)
    }

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn test_state_transitions() {
        let source = memory_layer(&["LINESTRING(0 0,10 0)"]);
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![source.clone() as Arc<dyn FeatureSource>]);
        assert_eq!(tracer.state(), TracerState::Uninitialized);
        assert!(tracer.init());
        assert_eq!(tracer.state(), TracerState::Built);

        source.add_feature(Some(Geometry::from_wkt("LINESTRING(10 0,10 10)").unwrap()));
        assert_eq!(tracer.find_shortest_path(c(0.0, 0.0), c(10.0, 10.0)).len(), 3);
        assert_eq!(tracer.state(), TracerState::Built);

        tracer.set_extent(Some(Rectangle::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(tracer.state(), TracerState::Invalidated);
    }

    #[test]
    fn test_path_errors() {
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![layer(&["LINESTRING(0 0,10 0)", "LINESTRING(20 0,30 0)"])]);
        assert_eq!(tracer.find_shortest_path_with_error(c(5.0, 1.0), c(0.0, 0.0)).1, PathError::Point1);
        assert_eq!(tracer.find_shortest_path_with_error(c(0.0, 0.0), c(5.0, 1.0)).1, PathError::Point2);
        assert_eq!(tracer.find_shortest_path_with_error(c(0.0, 0.0), c(25.0, 0.0)).1, PathError::NoPath);
        let (path, error) = tracer.find_shortest_path_with_error(c(2.0, 0.0), c(8.0, 0.0));
        assert_eq!(error, PathError::None);
        assert_eq!(path, vec![c(2.0, 0.0), c(8.0, 0.0)]);
    }

    #[test]
    fn test_max_feature_count() {
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![layer(&["LINESTRING(0 0,10 0)", "LINESTRING(10 0,20 0)"])]);
        tracer.set_max_feature_count(1);
        assert!(!tracer.init());
        assert!(tracer.has_too_many_features());
        let (path, error) = tracer.find_shortest_path_with_error(c(0.0, 0.0), c(20.0, 0.0));
        assert!(path.is_empty());
        assert_eq!(error, PathError::TooManyFeatures);

        tracer.set_max_feature_count(2);
        assert_eq!(tracer.find_shortest_path(c(0.0, 0.0), c(20.0, 0.0)).len(), 3);
    }

    #[test]
    fn test_offset_path() {
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![layer(&["LINESTRING(0 0,10 0)"])]);
        tracer.set_offset(1.0);
        let path = tracer.find_shortest_path(c(0.0, 0.0), c(10.0, 0.0));
        assert_eq!(path, vec![c(0.0, 1.0), c(10.0, 1.0)]);
    }

    #[test]
    fn test_point_snapping() {
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![layer(&["LINESTRING(0 0,10 0)"])]);
        assert!(tracer.is_point_snapped(c(0.0, 0.0)));
        assert!(tracer.is_point_snapped(c(4.0, 0.0)));
        assert!(!tracer.is_point_snapped(c(4.0, 0.5)));
    }
}
