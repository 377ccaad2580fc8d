//! # s2batch algorithms
//!
//! Derivation steps of the s2batch pipeline:
//!
//! - **bands**: the Sentinel-2 L2A band catalogue
//! - **imagery**: resolution reconciliation, spectral indices, composites
//!   and SCL cloud screening
//!
//! Work is sequential unless the `parallel` feature is enabled.

pub mod bands;
pub mod imagery;
mod maybe_rayon;

pub use bands::Band;
pub use imagery::{
    align_bands, cloud_fraction, composite, compute_index, exceeds_cloud_cover, reconcile,
    Composite, SpectralIndex, OBSTRUCTION_CLASSES,
};
