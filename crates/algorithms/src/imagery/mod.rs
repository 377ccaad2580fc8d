//! Sentinel-2 imagery derivation
//!
//! - Resolution reconciliation between 10 m and 20 m bands
//! - Spectral indices from a fixed formula table
//! - Multi-band composites
//! - Cloud screening from the scene classification layer

pub mod cloud;
pub mod composite;
pub mod indices;
pub mod reconcile;

pub use cloud::{cloud_fraction, exceeds_cloud_cover, OBSTRUCTION_CLASSES};
pub use composite::{composite, Composite};
pub use indices::{compute_index, SpectralIndex};
pub use reconcile::{align_bands, reconcile, upsample2};
