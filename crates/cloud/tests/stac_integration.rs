//! STAC search against Earth Search.
//!
//! All tests need network access:
//! `cargo test -p s2batch-cloud -- --ignored stac`

use s2batch_cloud::{StacCatalog, StacClient, StacClientBlocking, StacClientOptions, StacSearchParams};

fn params() -> StacSearchParams {
    StacSearchParams::new()
        .bbox([13.18260, 53.81978, 13.286973, 53.840044])
        .date_range("2024-03-05", "2024-03-23")
        .collection("sentinel-2-l2a")
        .limit(2)
}

#[tokio::test]
#[ignore]
async fn stac_earth_search_sentinel2() {
    let client = StacClient::new(StacCatalog::EarthSearch, StacClientOptions::default())
        .expect("client");

    let page = client.search(&params()).await.expect("search");
    println!("matched {:?}, returned {}", page.matched(), page.len());

    assert!(page.matched().unwrap_or(0) > 0);
    for item in &page.features {
        assert!(item.asset("red").is_some(), "{} has no red asset", item.id);
        assert!(item.asset("scl").is_some(), "{} has no scl asset", item.id);
        assert!(item.mgrs_tile().is_some());
        assert!(item.acquisition_date().is_some());
    }
}

#[test]
#[ignore]
fn stac_paginated_items() {
    let client = StacClientBlocking::new(StacCatalog::EarthSearch, StacClientOptions::default())
        .expect("client");

    let items = client.items(params()).expect("search");
    let matched = items.matched();
    let ids: Vec<String> = items.map(|r| r.expect("page").id).collect();

    println!("{} items over pages of 2", ids.len());
    if let Some(matched) = matched {
        assert_eq!(ids.len() as u64, matched);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "pagination repeated items");
}
