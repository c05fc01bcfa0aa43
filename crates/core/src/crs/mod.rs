//! Coordinate Reference System handling
//!
//! CRS definitions are treated as opaque identifiers; the actual math lives
//! behind the [`CoordinateTransform`] service supplied by the caller.

mod transform;

pub use transform::{CoordinateTransform, IdentityTransform, WebMercatorTransform};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// Authority identifier or WKT definition otherwise
    definition: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            definition: None,
        }
    }

    /// Create a CRS from an authority id such as `EPSG:3857`, or any other
    /// definition string kept verbatim
    pub fn from_authid(authid: &str) -> Self {
        let trimmed = authid.trim();
        let code = trimmed
            .split_once(':')
            .filter(|(auth, _)| auth.eq_ignore_ascii_case("EPSG"))
            .and_then(|(_, code)| code.parse::<u32>().ok());
        match code {
            Some(code) => Self::from_epsg(code),
            None => Self {
                epsg: None,
                definition: Some(trimmed.to_string()),
            },
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.definition == other.definition,
            _ => false,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        match &self.definition {
            Some(def) => def.chars().take(50).collect(),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
