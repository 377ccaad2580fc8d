//! Sentinel-2 L2A band catalogue
//!
//! Band names are the asset keys Earth Search uses for the
//! `sentinel-2-l2a` collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use s2batch_core::{Error, Result};

/// A Sentinel-2 L2A band (or the scene classification layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// B01, 443 nm, 60 m
    Coastal,
    /// B02, 490 nm, 10 m
    Blue,
    /// B03, 560 nm, 10 m
    Green,
    /// B04, 665 nm, 10 m
    Red,
    /// B05, 705 nm, 20 m
    Rededge1,
    /// B06, 740 nm, 20 m
    Rededge2,
    /// B07, 783 nm, 20 m
    Rededge3,
    /// B08, 842 nm, 10 m
    Nir,
    /// B8A, 865 nm, 20 m
    Nir08,
    /// B09, 945 nm, 60 m
    Nir09,
    /// B11, 1610 nm, 20 m
    Swir16,
    /// B12, 2190 nm, 20 m
    Swir22,
    /// Scene classification layer, 20 m
    Scl,
}

impl Band {
    /// Spectral bands in band-number order (SCL excluded)
    pub const SPECTRAL: [Band; 12] = [
        Band::Coastal,
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::Rededge1,
        Band::Rededge2,
        Band::Rededge3,
        Band::Nir,
        Band::Nir08,
        Band::Nir09,
        Band::Swir16,
        Band::Swir22,
    ];

    /// Asset key of the band
    pub fn name(self) -> &'static str {
        match self {
            Band::Coastal => "coastal",
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Rededge1 => "rededge1",
            Band::Rededge2 => "rededge2",
            Band::Rededge3 => "rededge3",
            Band::Nir => "nir",
            Band::Nir08 => "nir08",
            Band::Nir09 => "nir09",
            Band::Swir16 => "swir16",
            Band::Swir22 => "swir22",
            Band::Scl => "scl",
        }
    }

    /// Sentinel-2 band designation (`B04`, `B8A`, ...)
    pub fn designation(self) -> &'static str {
        match self {
            Band::Coastal => "B01",
            Band::Blue => "B02",
            Band::Green => "B03",
            Band::Red => "B04",
            Band::Rededge1 => "B05",
            Band::Rededge2 => "B06",
            Band::Rededge3 => "B07",
            Band::Nir => "B08",
            Band::Nir08 => "B8A",
            Band::Nir09 => "B09",
            Band::Swir16 => "B11",
            Band::Swir22 => "B12",
            Band::Scl => "SCL",
        }
    }

    /// Native ground sample distance in metres
    pub fn resolution(self) -> u32 {
        match self {
            Band::Blue | Band::Green | Band::Red | Band::Nir => 10,
            Band::Coastal | Band::Nir09 => 60,
            _ => 20,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Band {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Band::SPECTRAL
            .iter()
            .chain(std::iter::once(&Band::Scl))
            .copied()
            .find(|b| b.name() == s)
            .ok_or_else(|| Error::Unsupported {
                kind: "band",
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for band in Band::SPECTRAL.iter().chain([Band::Scl].iter()) {
            assert_eq!(band.name().parse::<Band>().unwrap(), *band);
        }
    }

    #[test]
    fn serde_uses_asset_keys() {
        let json = serde_json::to_string(&[Band::Nir08, Band::Rededge1]).unwrap();
        assert_eq!(json, r#"["nir08","rededge1"]"#);
        let band: Band = serde_json::from_str(r#""swir16""#).unwrap();
        assert_eq!(band, Band::Swir16);
    }

    #[test]
    fn unknown_band_is_rejected() {
        let err = "B04".parse::<Band>().unwrap_err();
        assert!(err.to_string().contains("band"));
        assert!(serde_json::from_str::<Band>(r#""thumbnail""#).is_err());
    }

    #[test]
    fn resolutions() {
        assert_eq!(Band::Red.resolution(), 10);
        assert_eq!(Band::Rededge2.resolution(), 20);
        assert_eq!(Band::Nir09.resolution(), 60);
        assert_eq!(Band::Nir08.designation(), "B8A");
    }
}
