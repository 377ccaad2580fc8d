//! # s2batch cloud
//!
//! Remote raster access and catalog search for s2batch.
//!
//! - [`cog`]: GeoTIFF / Cloud Optimized GeoTIFF datasets, local or over
//!   HTTP Range requests with an LRU block cache
//! - [`subset`]: cut the window of a raster covering a WGS84 bbox
//! - [`reproject`]: WGS84 → UTM bounding-box transformation
//! - [`stac_client`] / [`sync_api`]: STAC Item Search with lazy pagination

pub mod cache;
pub mod cog;
pub mod error;
pub mod http;
pub mod remote;
pub mod reproject;
pub mod source;
pub mod stac_client;
pub mod stac_models;
pub mod subset;
pub mod sync_api;
pub mod window;

pub use cog::{CogDataset, CogSource};
pub use error::{CloudError, Result};
pub use remote::{RemoteFile, RemoteFileOptions};
pub use reproject::transform_bounds;
pub use source::{RasterDataset, RasterSource};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};
pub use subset::{extract_subset, save_subset};
pub use sync_api::{ItemIter, StacClientBlocking};
pub use window::{window_for_bbox, BBox, PixelWindow};
