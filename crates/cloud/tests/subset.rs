//! Subset extraction against GeoTIFFs written to a scratch directory.
//!
//! The remote test at the bottom needs network access:
//! `cargo test -p s2batch-cloud -- --ignored`

use s2batch_cloud::{extract_subset, save_subset, BBox, CloudError, CogSource};
use s2batch_core::io::read_geotiff;
use s2batch_core::{DataType, GeoTransform, Raster, CRS};

const ORIGIN_X: f64 = 430_000.0;
const ORIGIN_Y: f64 = 4_480_000.0;
const PIXEL: f64 = 20.0;

/// 1000 x 1000 UTM 30N grid around Madrid, each cell `row * 1000 + col`.
fn write_scene(dir: &std::path::Path, crs: Option<CRS>) -> String {
    let n = 1000;
    let data: Vec<i32> = (0..n * n).map(|i| ((i / n) * 1000 + i % n) as i32).collect();
    let mut raster = Raster::from_vec(data, n, n).unwrap();
    raster.set_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, PIXEL, -PIXEL));
    raster.set_crs(crs);

    let path = dir.join("B04.tif");
    s2batch_core::io::write_geotiff(&raster.into(), &path).unwrap();
    path.to_string_lossy().into_owned()
}

fn madrid() -> BBox {
    BBox::new(-3.75, 40.40, -3.70, 40.45)
}

#[test]
fn subset_keeps_native_grid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path(), Some(CRS::from_epsg(32630)));

    let subset = extract_subset(&CogSource::default(), &path, &madrid()).unwrap();
    let (rows, cols) = subset.shape();

    // ~5.5 km x ~4.2 km at 20 m
    assert!((250..310).contains(&rows), "rows = {rows}");
    assert!((190..240).contains(&cols), "cols = {cols}");
    assert_eq!(subset.data_type(), DataType::I32);
    assert_eq!(subset.crs().and_then(CRS::epsg), Some(32630));

    // Window origin sits on the source grid and pixel (0,0) is the cell there
    let gt = subset.transform();
    let col_off = (gt.origin_x - ORIGIN_X) / PIXEL;
    let row_off = (ORIGIN_Y - gt.origin_y) / PIXEL;
    assert_eq!(col_off, col_off.round());
    assert_eq!(row_off, row_off.round());
    assert_eq!(gt.pixel_width, PIXEL);
    assert_eq!(gt.pixel_height, -PIXEL);

    let values = subset.to_f64();
    assert_eq!(values.get(0, 0).unwrap(), row_off * 1000.0 + col_off);
    assert_eq!(
        values.get(rows - 1, cols - 1).unwrap(),
        (row_off + (rows - 1) as f64) * 1000.0 + col_off + (cols - 1) as f64
    );
}

#[test]
fn saved_subset_matches_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path(), Some(CRS::from_epsg(32630)));
    let out = dir.path().join("job").join("out").join("240312-red.tiff");

    let saved = save_subset(&CogSource::default(), &path, &madrid(), &out).unwrap();
    let reread = read_geotiff(&out).unwrap();

    assert_eq!(reread.shape(), saved.shape());
    assert_eq!(reread.data_type(), saved.data_type());
    assert_eq!(reread.transform(), saved.transform());
    assert_eq!(reread.crs().and_then(CRS::epsg), Some(32630));
}

#[test]
fn bbox_outside_raster_is_empty_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path(), Some(CRS::from_epsg(32630)));

    let far = BBox::new(-3.0, 38.0, -2.9, 38.1);
    let err = extract_subset(&CogSource::default(), &path, &far).unwrap_err();
    assert!(matches!(err, CloudError::EmptyWindow));
}

#[test]
fn raster_without_crs_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path(), None);

    let err = extract_subset(&CogSource::default(), &path, &madrid()).unwrap_err();
    assert!(matches!(err, CloudError::MissingCrs));
}

/// Red band of a public Sentinel-2 L2A scene on AWS.
#[test]
#[ignore]
fn remote_sentinel2_subset() {
    let url = "https://sentinel-cogs.s3.us-west-2.amazonaws.com/sentinel-s2-l2a-cogs/33/U/UV/2023/7/S2A_33UUV_20230715_0_L2A/B04.tif";
    let bbox = BBox::new(13.18260, 53.81978, 13.286973, 53.840044);

    let subset = extract_subset(&CogSource::default(), url, &bbox).expect("remote subset");
    let (rows, cols) = subset.shape();
    println!("subset {rows}x{cols}, {:?}", subset.transform());

    assert_eq!(subset.data_type(), DataType::U16);
    assert_eq!(subset.crs().and_then(CRS::epsg), Some(32633));
    assert!(rows > 0 && cols > 0);
}
