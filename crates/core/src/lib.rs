//! # topotrace Core
//!
//! Core types shared by the topotrace geometry engine and network tracer.
//!
//! This crate provides:
//! - `Geometry`: abstract geometry tree with Z/M dimensionality flags
//! - `Rectangle`: axis-aligned extents
//! - `CRS` and the `CoordinateTransform` service trait
//! - `FeatureSource`: vector layers with change notifications
//! - WKT reading and writing

pub mod crs;
pub mod error;
pub mod geometry;
pub mod vector;

pub use crs::{CoordinateTransform, CRS};
pub use error::{Error, Result};
pub use geometry::{Coordinate, Geometry, Rectangle};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{CoordinateTransform, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{
        CircularString, CoordDims, Coordinate, Geometry, GeometryCollection, GeometryType,
        LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rectangle,
    };
    pub use crate::vector::{Feature, FeatureId, FeatureSource, LayerEvent, MemoryLayer};
}
