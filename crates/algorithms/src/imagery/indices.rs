//! Spectral indices over Sentinel-2 bands
//!
//! Every index is a closed enum variant carrying the bands it reads and its
//! per-pixel formula. Inputs are promoted to `f64` and aligned with
//! [`align_bands`] before the formula runs, so the output lives on the grid
//! of the finest input band.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use s2batch_core::raster::Raster;
use s2batch_core::{Error, Result};

use crate::bands::Band;
use crate::imagery::reconcile::align_bands;
use crate::maybe_rayon::*;

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Yellowness Index
    Ndyi,
    /// Normalized Difference Red Edge
    Ndre,
    /// Normalized Difference Snow Index
    Ndsi,
    /// Normalized Green Red Difference Index
    Ngrdi,
    /// Moisture index
    Mois,
    /// Visible Atmospherically Resistant Index
    Vari,
    /// Moisture Stress Index
    Msi,
    /// Enhanced Vegetation Index
    Evi,
    /// Red Edge Inflection Point
    Reip,
    /// Modified Soil Adjusted Vegetation Index
    Msavi,
}

const EVI_SCALE: f64 = 10_000.0;
const EVI_G: f64 = 2.5;
const EVI_C1: f64 = 6.0;
const EVI_C2: f64 = 7.5;
const EVI_L: f64 = 1.0;

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 11] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndyi,
        SpectralIndex::Ndre,
        SpectralIndex::Ndsi,
        SpectralIndex::Ngrdi,
        SpectralIndex::Mois,
        SpectralIndex::Vari,
        SpectralIndex::Msi,
        SpectralIndex::Evi,
        SpectralIndex::Reip,
        SpectralIndex::Msavi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "ndvi",
            SpectralIndex::Ndyi => "ndyi",
            SpectralIndex::Ndre => "ndre",
            SpectralIndex::Ndsi => "ndsi",
            SpectralIndex::Ngrdi => "ngrdi",
            SpectralIndex::Mois => "mois",
            SpectralIndex::Vari => "vari",
            SpectralIndex::Msi => "msi",
            SpectralIndex::Evi => "evi",
            SpectralIndex::Reip => "reip",
            SpectralIndex::Msavi => "msavi",
        }
    }

    /// Bands read by the formula, in argument order
    pub fn bands(self) -> &'static [Band] {
        use Band::*;
        match self {
            SpectralIndex::Ndvi => &[Nir, Red],
            SpectralIndex::Ndyi => &[Green, Blue],
            SpectralIndex::Ndre => &[Nir, Rededge1],
            SpectralIndex::Ndsi => &[Green, Swir16],
            SpectralIndex::Ngrdi => &[Green, Red],
            SpectralIndex::Mois => &[Nir08, Swir16],
            SpectralIndex::Vari => &[Green, Red, Blue],
            SpectralIndex::Msi => &[Swir16, Nir],
            SpectralIndex::Evi => &[Nir, Red, Blue],
            SpectralIndex::Reip => &[Red, Rededge1, Rededge2, Rededge3],
            SpectralIndex::Msavi => &[Nir, Red],
        }
    }

    /// Evaluate the formula for one pixel; `v` follows [`Self::bands`]
    pub fn pixel(self, v: &[f64]) -> f64 {
        match self {
            SpectralIndex::Ndvi
            | SpectralIndex::Ndyi
            | SpectralIndex::Ndre
            | SpectralIndex::Ndsi
            | SpectralIndex::Ngrdi
            | SpectralIndex::Mois => ratio(v[0] - v[1], v[0] + v[1]),
            SpectralIndex::Vari => ratio(v[0] - v[1], v[0] + v[1] - v[2]),
            SpectralIndex::Msi => ratio(v[0], v[1]),
            SpectralIndex::Evi => evi(v[0], v[1], v[2]),
            SpectralIndex::Reip => {
                let (red, re1, re2, re3) = (v[0], v[1], v[2], v[3]);
                if re2 - re1 == 0.0 {
                    return 0.0;
                }
                700.0 + 40.0 * ((red + re3) / 2.0 - re1) / (re2 - re1)
            }
            SpectralIndex::Msavi => msavi(v[0], v[1]),
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SpectralIndex::ALL
            .into_iter()
            .find(|i| i.name() == s)
            .ok_or_else(|| Error::Unsupported {
                kind: "index",
                name: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// `num / den`, with 0 where the denominator is zero
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Enhanced Vegetation Index on reflectances scaled by 1/10000
///
/// `EVI = G * (NIR - Red) / (NIR + C1*Red - C2*Blue + L)`, clipped to [-1, 1]
fn evi(nir: f64, red: f64, blue: f64) -> f64 {
    let (n, r, b) = (nir / EVI_SCALE, red / EVI_SCALE, blue / EVI_SCALE);
    let den = n + EVI_C1 * r - EVI_C2 * b + EVI_L;
    if den == 0.0 {
        return 0.0;
    }
    (EVI_G * (n - r) / den).clamp(-1.0, 1.0)
}

/// `MSAVI = 2*NIR + 1 - sqrt((2*NIR + 1)^2 - 8*(NIR - Red)) / 2`
///
/// The square-root term is halved on its own, unlike the textbook MSAVI2
/// where the whole expression is. Existing outputs depend on this form.
/// A negative radicand gives 0.
fn msavi(nir: f64, red: f64) -> f64 {
    let lead = 2.0 * nir + 1.0;
    let radicand = lead * lead - 8.0 * (nir - red);
    if radicand < 0.0 {
        return 0.0;
    }
    lead - radicand.sqrt() / 2.0
}

// ---------------------------------------------------------------------------
// Raster evaluation
// ---------------------------------------------------------------------------

/// Compute `index` from the bands it needs.
///
/// Missing bands are an error. Output is `f64` on the finest input grid.
pub fn compute_index(index: SpectralIndex, bands: &HashMap<Band, Raster<f64>>) -> Result<Raster<f64>> {
    let inputs = index
        .bands()
        .iter()
        .map(|band| {
            bands.get(band).ok_or_else(|| {
                Error::Algorithm(format!("{index} needs band {band}, which was not provided"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let aligned = align_bands(&inputs)?;
    let (rows, cols) = aligned[0].shape();
    let grids: Vec<&Array2<f64>> = aligned.iter().map(Raster::data).collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut values = vec![0.0; grids.len()];
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                for (v, grid) in values.iter_mut().zip(&grids) {
                    *v = grid[[row, col]];
                }
                row_data.push(index.pixel(&values));
            }
            row_data
        })
        .collect();

    build_output(&aligned[0], rows, cols, data)
}

fn build_output(template: &Raster<f64>, rows: usize, cols: usize, data: Vec<f64>) -> Result<Raster<f64>> {
    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(template.with_data(array))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use s2batch_core::{GeoTransform, CRS};

    fn make_band(rows: usize, cols: usize, value: f64, cell: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(399_960.0, 5_900_040.0, cell, -cell));
        r.set_crs(Some(CRS::from_epsg(32633)));
        r
    }

    fn inputs(pairs: &[(Band, Raster<f64>)]) -> HashMap<Band, Raster<f64>> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn ndvi_basic() {
        let bands = inputs(&[
            (Band::Nir, make_band(3, 3, 0.8, 10.0)),
            (Band::Red, make_band(3, 3, 0.2, 10.0)),
        ]);
        let result = compute_index(SpectralIndex::Ndvi, &bands).unwrap();
        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert_relative_eq!(result.get(1, 1).unwrap(), 0.6, epsilon = 1e-10);
        assert_eq!(result.crs().and_then(CRS::epsg), Some(32633));
    }

    #[test]
    fn zero_denominator_is_zero_for_every_ratio_index() {
        for index in SpectralIndex::ALL {
            if matches!(index, SpectralIndex::Msavi) {
                continue;
            }
            let zeros = vec![0.0; index.bands().len()];
            let value = index.pixel(&zeros);
            assert!(value.is_finite(), "{index} gave {value}");
            assert_eq!(value, 0.0, "{index}");
        }
    }

    #[test]
    fn vari_subtracts_blue_in_denominator() {
        // (0.3 - 0.2) / (0.3 + 0.2 - 0.1) = 0.25
        assert_relative_eq!(SpectralIndex::Vari.pixel(&[0.3, 0.2, 0.1]), 0.25);
        // denominator cancels out
        assert_eq!(SpectralIndex::Vari.pixel(&[0.3, 0.2, 0.5]), 0.0);
    }

    #[test]
    fn msi_is_plain_ratio() {
        assert_relative_eq!(SpectralIndex::Msi.pixel(&[1500.0, 3000.0]), 0.5);
    }

    #[test]
    fn evi_is_scaled_and_clipped() {
        // n=0.4, r=0.1, b=0.05: 2.5*0.3 / (0.4 + 0.6 - 0.375 + 1) = 0.4615...
        let v = SpectralIndex::Evi.pixel(&[4000.0, 1000.0, 500.0]);
        assert_relative_eq!(v, 0.75 / 1.625, epsilon = 1e-12);

        for nir in [0.0, 500.0, 3000.0, 10_000.0, 40_000.0] {
            for red in [0.0, 800.0, 9_000.0] {
                for blue in [0.0, 1_000.0, 20_000.0] {
                    let v = SpectralIndex::Evi.pixel(&[nir, red, blue]);
                    assert!((-1.0..=1.0).contains(&v), "evi {v} for {nir},{red},{blue}");
                }
            }
        }
    }

    #[test]
    fn evi_zero_denominator_is_zero() {
        // 0.5 + 6*0 - 7.5*0.2 + 1 = 0
        assert_eq!(SpectralIndex::Evi.pixel(&[5000.0, 0.0, 2000.0]), 0.0);
    }

    #[test]
    fn reip_formula() {
        // 700 + 40 * ((0.04 + 0.30)/2 - 0.08) / (0.20 - 0.08) = 730
        let v = SpectralIndex::Reip.pixel(&[0.04, 0.08, 0.20, 0.30]);
        assert_relative_eq!(v, 730.0, epsilon = 1e-9);
    }

    #[test]
    fn reip_flat_red_edge_is_zero() {
        let bands = inputs(&[
            (Band::Red, make_band(4, 4, 400.0, 10.0)),
            (Band::Rededge1, make_band(2, 2, 900.0, 20.0)),
            (Band::Rededge2, make_band(2, 2, 900.0, 20.0)),
            (Band::Rededge3, make_band(2, 2, 1500.0, 20.0)),
        ]);
        let result = compute_index(SpectralIndex::Reip, &bands).unwrap();
        assert_eq!(result.shape(), (4, 4));
        assert_eq!(result.get(3, 3).unwrap(), 0.0);
    }

    #[test]
    fn msavi_negative_radicand_is_zero() {
        // (2n+1)^2 - 8(n-r) with n=0.5, r=-1: 4 - 12 = -8
        assert_eq!(SpectralIndex::Msavi.pixel(&[0.5, -1.0]), 0.0);
    }

    #[test]
    fn msavi_keeps_half_sqrt_term() {
        // n=0.5, r=0.1: lead=2, radicand=4-3.2=0.8
        let expected = 2.0 - 0.8f64.sqrt() / 2.0;
        assert_relative_eq!(SpectralIndex::Msavi.pixel(&[0.5, 0.1]), expected);
    }

    #[test]
    fn mixed_resolution_output_uses_finest_grid() {
        let bands = inputs(&[
            (Band::Nir, make_band(10, 11, 0.6, 10.0)),
            (Band::Rededge1, make_band(5, 5, 0.2, 20.0)),
        ]);
        let result = compute_index(SpectralIndex::Ndre, &bands).unwrap();
        assert_eq!(result.shape(), (10, 10));
        assert_eq!(result.cell_size(), 10.0);
        assert_relative_eq!(result.get(9, 9).unwrap(), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn missing_band_is_an_error() {
        let bands = inputs(&[(Band::Nir, make_band(3, 3, 0.8, 10.0))]);
        let err = compute_index(SpectralIndex::Ndvi, &bands).unwrap_err();
        assert!(err.to_string().contains("red"));
    }

    #[test]
    fn unknown_index_is_unsupported() {
        assert_eq!("ndvi".parse::<SpectralIndex>().unwrap(), SpectralIndex::Ndvi);
        let err = "savi".parse::<SpectralIndex>().unwrap_err();
        assert!(matches!(err, Error::Unsupported { kind: "index", .. }));
        assert!(serde_json::from_str::<SpectralIndex>(r#""gndvi""#).is_err());
    }
}
