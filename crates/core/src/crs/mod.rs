//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation.
///
/// GeoTIFFs produced by the Sentinel-2 pipeline are always tagged with an
/// EPSG code; the citation string from GeoAsciiParams is kept when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    citation: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            citation: None,
        }
    }

    /// Create a CRS known only by its GeoTIFF citation
    pub fn from_citation(citation: impl Into<String>) -> Self {
        Self {
            epsg: None,
            citation: Some(citation.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn citation(&self) -> Option<&str> {
        self.citation.as_deref()
    }

    /// Whether the CRS uses geographic (degree) coordinates
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, Some(4326) | Some(4258) | Some(4269))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        match &self.citation {
            Some(c) => c.clone(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32630);
        assert_eq!(crs.epsg(), Some(32630));
        assert_eq!(crs.identifier(), "EPSG:32630");
        assert!(!crs.is_geographic());
        assert!(CRS::wgs84().is_geographic());
    }
}
