//! Coordinate transform services

use super::CRS;
use crate::error::{Error, Result};
use crate::geometry::{Coordinate, Geometry};
use geo_types::Coord;

/// Transforms planar coordinates between two reference systems.
///
/// Implementations fail with [`Error::Transform`] when a point cannot be
/// projected.
pub trait CoordinateTransform: Send + Sync {
    fn transform(&self, source: &CRS, destination: &CRS, coord: Coord<f64>) -> Result<Coord<f64>>;

    /// Transform every vertex of a geometry, keeping Z and M untouched
    fn transform_geometry(
        &self,
        source: &CRS,
        destination: &CRS,
        geometry: &Geometry,
    ) -> Result<Geometry> {
        if source.is_equivalent(destination) {
            return Ok(geometry.clone());
        }
        geometry.try_map_coordinates(&mut |c: Coordinate| {
            let t = self.transform(source, destination, c.xy())?;
            Ok(Coordinate { x: t.x, y: t.y, ..c })
        })
    }
}

/// Only accepts equivalent reference systems
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn transform(&self, source: &CRS, destination: &CRS, coord: Coord<f64>) -> Result<Coord<f64>> {
        if source.is_equivalent(destination) {
            Ok(coord)
        } else {
            Err(Error::CrsMismatch(source.identifier(), destination.identifier()))
        }
    }
}

/// Spherical Web Mercator radius (meters)
const EARTH_RADIUS: f64 = 6_378_137.0;
/// Latitude limit of the Web Mercator square
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Geographic WGS84 (EPSG:4326) to and from Web Mercator (EPSG:3857)
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercatorTransform;

impl WebMercatorTransform {
    fn forward(coord: Coord<f64>) -> Option<Coord<f64>> {
        if !coord.x.is_finite() || coord.y.abs() > MAX_LATITUDE {
            return None;
        }
        let x = EARTH_RADIUS * coord.x.to_radians();
        let y = EARTH_RADIUS
            * (std::f64::consts::FRAC_PI_4 + coord.y.to_radians() / 2.0)
                .tan()
                .ln();
        Some(Coord { x, y })
    }

    fn inverse(coord: Coord<f64>) -> Option<Coord<f64>> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return None;
        }
        let lon = (coord.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
            .to_degrees();
        Some(Coord { x: lon, y: lat })
    }
}

impl CoordinateTransform for WebMercatorTransform {
    fn transform(&self, source: &CRS, destination: &CRS, coord: Coord<f64>) -> Result<Coord<f64>> {
        if source.is_equivalent(destination) {
            return Ok(coord);
        }
        let result = match (source.epsg(), destination.epsg()) {
            (Some(4326), Some(3857)) => Self::forward(coord),
            (Some(3857), Some(4326)) => Self::inverse(coord),
            _ => {
                return Err(Error::Transform {
                    from: source.identifier(),
                    to: destination.identifier(),
                    reason: "unsupported CRS pair".to_string(),
                })
            }
        };
        result.ok_or_else(|| Error::Transform {
            from: source.identifier(),
            to: destination.identifier(),
            reason: format!("point ({}, {}) outside projection domain", coord.x, coord.y),
        })
    }
}
