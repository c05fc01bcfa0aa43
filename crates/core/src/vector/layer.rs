//! Feature sources and change notifications

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use super::{Feature, FeatureId};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::geometry::{Geometry, Rectangle};

/// Change notification emitted by a [`FeatureSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerEvent {
    FeatureAdded(FeatureId),
    FeatureDeleted(FeatureId),
    GeometryChanged(FeatureId),
    AllFeaturesChanged,
}

/// A vector data provider: feature iteration plus change notifications.
pub trait FeatureSource: Send + Sync {
    fn name(&self) -> &str;

    /// Reference system of the stored geometries
    fn crs(&self) -> CRS;

    fn feature_count(&self) -> usize;

    /// Features whose bounding box intersects `filter`, or all features.
    /// Features are returned whole, never clipped.
    fn features(&self, filter: Option<&Rectangle>) -> Vec<Feature>;

    /// Register for change notifications. Each call returns a new receiver.
    fn subscribe(&self) -> Receiver<LayerEvent>;
}

#[derive(Debug, Default)]
struct MemoryLayerInner {
    features: BTreeMap<FeatureId, Feature>,
    next_id: FeatureId,
    subscribers: Vec<Sender<LayerEvent>>,
}

impl MemoryLayerInner {
    fn notify(&mut self, event: LayerEvent) {
        // Drop listeners that went away
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

/// In-memory, thread-safe feature source
#[derive(Debug)]
pub struct MemoryLayer {
    name: String,
    crs: CRS,
    inner: RwLock<MemoryLayerInner>,
}

impl MemoryLayer {
    pub fn new(name: impl Into<String>, crs: CRS) -> Self {
        Self {
            name: name.into(),
            crs,
            inner: RwLock::new(MemoryLayerInner {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryLayerInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryLayerInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a feature and return its new id
    pub fn add_feature(&self, geometry: Option<Geometry>) -> FeatureId {
        let mut inner = self.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.features.insert(id, Feature { id, geometry });
        inner.notify(LayerEvent::FeatureAdded(id));
        debug!(layer = %self.name, id, "feature added");
        id
    }

    pub fn delete_feature(&self, id: FeatureId) -> Result<()> {
        let mut inner = self.write();
        if inner.features.remove(&id).is_none() {
            return Err(Error::UnknownFeature(id));
        }
        inner.notify(LayerEvent::FeatureDeleted(id));
        debug!(layer = %self.name, id, "feature deleted");
        Ok(())
    }

    pub fn change_geometry(&self, id: FeatureId, geometry: Option<Geometry>) -> Result<()> {
        let mut inner = self.write();
        let feature = inner.features.get_mut(&id).ok_or(Error::UnknownFeature(id))?;
        feature.geometry = geometry;
        inner.notify(LayerEvent::GeometryChanged(id));
        debug!(layer = %self.name, id, "geometry changed");
        Ok(())
    }

    /// Replace the whole content of the layer
    pub fn replace_features(&self, geometries: impl IntoIterator<Item = Option<Geometry>>) {
        let mut inner = self.write();
        inner.features.clear();
        for geometry in geometries {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.features.insert(id, Feature { id, geometry });
        }
        inner.notify(LayerEvent::AllFeaturesChanged);
    }

    pub fn feature(&self, id: FeatureId) -> Option<Feature> {
        self.read().features.get(&id).cloned()
    }
}

impl FeatureSource for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn crs(&self) -> CRS {
        self.crs.clone()
    }

    fn feature_count(&self) -> usize {
        self.read().features.len()
    }

    fn features(&self, filter: Option<&Rectangle>) -> Vec<Feature> {
        let inner = self.read();
        inner
            .features
            .values()
            .filter(|f| match (filter, &f.geometry) {
                (None, _) => true,
                (Some(rect), Some(g)) => rect.intersects(&g.bounding_box()),
                (Some(_), None) => false,
            })
            .cloned()
            .collect()
    }

    fn subscribe(&self) -> Receiver<LayerEvent> {
        let (tx, rx) = unbounded();
        self.write().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineString;

    fn line(points: &[(f64, f64)]) -> Option<Geometry> {
        Some(Geometry::LineString(LineString::from_xy(points)))
    }

    #[test]
    fn test_memory_layer_events() {
        let layer = MemoryLayer::new("lines", CRS::wgs84());
        let rx = layer.subscribe();

        let id = layer.add_feature(line(&[(0.0, 0.0), (1.0, 1.0)]));
        layer.change_geometry(id, line(&[(0.0, 0.0), (2.0, 2.0)])).unwrap();
        layer.delete_feature(id).unwrap();

        let events: Vec<LayerEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                LayerEvent::FeatureAdded(id),
                LayerEvent::GeometryChanged(id),
                LayerEvent::FeatureDeleted(id),
            ]
        );
        assert_eq!(layer.feature_count(), 0);
    }

    #[test]
    fn test_memory_layer_unknown_feature() {
        let layer = MemoryLayer::new("lines", CRS::wgs84());
        assert_eq!(layer.delete_feature(42), Err(Error::UnknownFeature(42)));
    }

    #[test]
    fn test_memory_layer_filter() {
        let layer = MemoryLayer::new("lines", CRS::wgs84());
        layer.add_feature(line(&[(0.0, 0.0), (1.0, 1.0)]));
        layer.add_feature(line(&[(10.0, 10.0), (11.0, 11.0)]));
        layer.add_feature(None);

        assert_eq!(layer.features(None).len(), 3);
        let rect = Rectangle::new(0.0, 0.0, 5.0, 5.0);
        assert_eq!(layer.features(Some(&rect)).len(), 1);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let layer = MemoryLayer::new("lines", CRS::wgs84());
        drop(layer.subscribe());
        layer.add_feature(None);
        assert!(layer.read().subscribers.is_empty());
    }
}
