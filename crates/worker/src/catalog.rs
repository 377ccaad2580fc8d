//! Scene catalog seam
//!
//! The worker only needs an ordered, lazily produced list of scenes with
//! their asset hrefs. [`StacSceneCatalog`] provides it from a STAC API;
//! tests substitute their own [`Catalog`].

use std::collections::HashMap;

use chrono::NaiveDate;
use s2batch_algorithms::Band;
use s2batch_cloud::{StacCatalog, StacClientBlocking, StacClientOptions, StacItem, StacSearchParams};
use tracing::debug;

use crate::config::WorkerConfig;
use crate::error::{JobError, Result};

/// Spatial and temporal filter of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub bbox: [f64; 4],
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One acquisition matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    pub id: String,
    pub date: NaiveDate,
    /// MGRS tile, e.g. `33UUV`
    pub tile: String,
    /// Asset key → href
    pub assets: HashMap<String, String>,
}

impl SceneRecord {
    /// Href of a band's asset.
    pub fn asset(&self, band: Band) -> Result<&str> {
        self.assets.get(band.name()).map(String::as_str).ok_or_else(|| {
            JobError::SourceUnavailable(format!("scene {} has no '{}' asset", self.id, band))
        })
    }
}

/// Search outcome: the matched count when the catalog reports one, and
/// the scenes in catalog order, fetched as they are consumed.
pub struct SceneSearch {
    pub matched: Option<u64>,
    pub scenes: Box<dyn Iterator<Item = Result<SceneRecord>>>,
}

impl SceneSearch {
    pub fn from_records(records: Vec<SceneRecord>) -> Self {
        Self {
            matched: Some(records.len() as u64),
            scenes: Box::new(records.into_iter().map(Ok)),
        }
    }
}

pub trait Catalog: Send + Sync {
    fn search(&self, query: &SceneQuery) -> Result<SceneSearch>;
}

/// Scenes from a STAC API collection.
pub struct StacSceneCatalog {
    client: StacClientBlocking,
    collection: String,
    page_size: u32,
}

impl StacSceneCatalog {
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let catalog = StacCatalog::from_str_or_url(&config.catalog);
        let client = StacClientBlocking::new(catalog, StacClientOptions::default())?;
        Ok(Self {
            client,
            collection: config.collection.clone(),
            page_size: config.page_size,
        })
    }

    fn params(&self, query: &SceneQuery) -> StacSearchParams {
        StacSearchParams::new()
            .bbox(query.bbox)
            .date_range(&query.start.to_string(), &query.end.to_string())
            .collection(&self.collection)
            .limit(self.page_size)
    }
}

impl Catalog for StacSceneCatalog {
    fn search(&self, query: &SceneQuery) -> Result<SceneSearch> {
        let params = self.params(query);
        debug!(url = %self.client.catalog().search_url(), ?params, "searching catalog");

        let items = self.client.items(params)?;
        let matched = items.matched();
        let scenes = items.map(|item| scene_from_item(item?));
        Ok(SceneSearch {
            matched,
            scenes: Box::new(scenes),
        })
    }
}

fn scene_from_item(item: StacItem) -> Result<SceneRecord> {
    let date = item
        .acquisition_date()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .ok_or_else(|| {
            JobError::SourceUnavailable(format!("item {} has no acquisition date", item.id))
        })?;
    let tile = item.mgrs_tile().unwrap_or_else(|| item.id.clone());
    let assets = item
        .assets
        .into_iter()
        .map(|(key, asset)| (key, asset.href))
        .collect();

    Ok(SceneRecord {
        id: item.id,
        date,
        tile,
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(json: serde_json::Value) -> StacItem {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn scene_from_earth_search_item() {
        let scene = scene_from_item(item(serde_json::json!({
            "type": "Feature",
            "id": "S2B_33UUV_20240305_0_L2A",
            "properties": {
                "datetime": "2024-03-05T10:17:46.024000Z",
                "mgrs:utm_zone": 33,
                "mgrs:latitude_band": "U",
                "mgrs:grid_square": "UV"
            },
            "assets": {
                "red": {"href": "https://example.com/B04.tif"},
                "nir": {"href": "https://example.com/B08.tif"}
            }
        })))
        .unwrap();

        assert_eq!(scene.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(scene.tile, "33UUV");
        assert_eq!(scene.asset(Band::Red).unwrap(), "https://example.com/B04.tif");
        assert!(matches!(
            scene.asset(Band::Scl),
            Err(JobError::SourceUnavailable(msg)) if msg.contains("scl")
        ));
    }

    #[test]
    fn item_without_datetime_is_unusable() {
        let result = scene_from_item(item(serde_json::json!({
            "type": "Feature",
            "id": "broken",
            "properties": {},
            "assets": {}
        })));
        assert!(matches!(result, Err(JobError::SourceUnavailable(_))));
    }

    #[test]
    fn search_params_cover_whole_days() {
        let catalog = StacSceneCatalog::new(&WorkerConfig::default()).unwrap();
        let params = catalog.params(&SceneQuery {
            bbox: [13.0, 53.0, 13.1, 53.1],
            start: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 23).unwrap(),
        });
        assert_eq!(
            params.datetime.as_deref(),
            Some("2024-03-05T00:00:00Z/2024-03-23T00:00:00Z")
        );
        assert_eq!(params.collections, Some(vec!["sentinel-2-l2a".to_string()]));
        assert_eq!(params.limit, Some(100));
    }
}
