//! Multi-band composites

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use s2batch_core::raster::{Raster, RasterStack};
use s2batch_core::{Error, Result};

use crate::bands::Band;

/// Supported composites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Composite {
    /// Red, green, blue
    #[serde(rename = "truecolor", alias = "true-color")]
    TrueColor,
}

impl Composite {
    pub const ALL: [Composite; 1] = [Composite::TrueColor];

    pub fn name(self) -> &'static str {
        match self {
            Composite::TrueColor => "truecolor",
        }
    }

    /// Bands stacked by the composite, in output band order
    pub fn bands(self) -> &'static [Band] {
        match self {
            Composite::TrueColor => &[Band::Red, Band::Green, Band::Blue],
        }
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Composite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "truecolor" | "true-color" => Ok(Composite::TrueColor),
            _ => Err(Error::Unsupported {
                kind: "composite",
                name: s.to_string(),
            }),
        }
    }
}

/// Stack the composite's bands into one multi-band grid.
///
/// No resampling happens: the bands must already share a shape. The first
/// band's (red's) transform and CRS are reused.
pub fn composite(kind: Composite, bands: &HashMap<Band, Raster<f64>>) -> Result<RasterStack> {
    let inputs = kind
        .bands()
        .iter()
        .map(|band| {
            bands.get(band).ok_or_else(|| {
                Error::Algorithm(format!("{kind} needs band {band}, which was not provided"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    RasterStack::from_bands(&inputs)
}
