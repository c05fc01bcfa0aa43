//! Vector features and layers

mod layer;

pub use layer::{FeatureSource, LayerEvent, MemoryLayer};

use crate::geometry::Geometry;

/// Identifier of a feature within its layer
pub type FeatureId = u64;

/// A geographic feature. Attributes are out of scope; only the geometry
/// and its identity matter here.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: Geometry) -> Self {
        Self {
            id,
            geometry: Some(geometry),
        }
    }

    /// Feature with no geometry
    pub fn empty(id: FeatureId) -> Self {
        Self { id, geometry: None }
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.as_ref().is_some_and(|g| !g.is_empty())
    }
}
