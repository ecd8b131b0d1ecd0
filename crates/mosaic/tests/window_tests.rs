//! Tests for selector-to-window resolution through the public API.

use std::rc::Rc;

use mosaic::{Mosaic, MosaicConfig, MosaicError, Selector};
use raster_io::{write_geotiff, WriteImage};
use test_utils::{create_test_grid, init_test_logging, north_up_transform, write_raster, NODATA};

const ORIGIN: (f64, f64) = (500_000.0, 5_000_000.0);
const RES: f64 = 20.0;

fn load_mosaic(dir: &std::path::Path) -> Mosaic {
    let path = dir.join("alpha.tif");
    let data = create_test_grid(60, 60);
    write_raster(&path, 60, 60, ORIGIN, RES, 32633, Some(NODATA), &data).unwrap();
    Mosaic::load(&[path]).unwrap()
}

// Edge must sit on a whole number of pixels from the domain origin.
fn assert_on_grid(value: f64, origin: f64) {
    let steps = (value - origin) / RES;
    assert!(
        (steps - steps.round()).abs() < 1e-9,
        "{value} is not a pixel multiple from {origin}"
    );
}

#[test]
fn test_resolved_edges_are_pixel_aligned_and_contain_the_request() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    let requests = [
        ((500_410.0, 4_999_010.0), (500_890.0, 4_999_490.0)),
        ((500_000.1, 4_998_800.1), (500_001.0, 4_998_801.0)),
        ((500_403.7, 4_999_111.3), (501_199.9, 4_999_999.9)),
        ((500_500.0, 4_999_500.0), (500_500.0, 4_999_500.0)),
    ];

    for (left, right) in requests {
        let window = mosaic.window(&Selector::rectangle(left, right));
        let (rl, rr) = (window.left_edge(), window.right_edge());

        assert_on_grid(rl.0, ORIGIN.0);
        assert_on_grid(rr.0, ORIGIN.0);
        // y snaps against the domain's minimum edge
        assert_on_grid(rl.1, 4_998_800.0);
        assert_on_grid(rr.1, 4_998_800.0);

        // Snapping only ever widens
        assert!(rl.0 <= left.0 && rl.1 <= left.1);
        assert!(rr.0 >= right.0 && rr.1 >= right.1);

        // Window pixel dimensions match the resolved extent
        let cols = ((rr.0 - rl.0) / RES).round() as usize;
        let rows = ((rr.1 - rl.1) / RES).round() as usize;
        assert_eq!(window.shape(), (cols, rows));
    }
}

#[test]
fn test_disk_and_box_share_a_window_when_bounds_agree() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    // A disk's window is its bounding box resolved on the grid
    let disk = Selector::disk((500_600.0, 4_999_200.0), 200.0);
    let window = mosaic.window(&disk);
    assert_eq!(window.left_edge(), (500_400.0, 4_999_000.0));
    assert_eq!(window.right_edge(), (500_800.0, 4_999_400.0));
    assert_eq!(window.shape(), (20, 20));

    // But the selector is preserved, so the two are distinct windows
    let boxed = Selector::rectangle((500_400.0, 4_999_000.0), (500_800.0, 4_999_400.0));
    let box_window = mosaic.window(&boxed);
    assert!(!Rc::ptr_eq(&window, &box_window));
    assert_eq!(box_window.shape(), window.shape());
}

#[test]
fn test_same_shape_reuses_the_cached_window() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    let a = mosaic.window(&Selector::disk((500_600.0, 4_999_200.0), 150.0));
    let b = mosaic.window(&Selector::disk((500_600.0, 4_999_200.0), 150.0));
    assert!(Rc::ptr_eq(&a, &b));

    let stats = mosaic.window_cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_window_cache_capacity_evicts_old_selectors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alpha.tif");
    let data = create_test_grid(60, 60);
    write_raster(&path, 60, 60, ORIGIN, RES, 32633, Some(NODATA), &data).unwrap();

    let config = MosaicConfig {
        window_cache_capacity: 2,
        ..Default::default()
    };
    let mut mosaic = Mosaic::load_with(&[path], config).unwrap();

    let first = Selector::disk((500_600.0, 4_999_200.0), 100.0);
    let _ = mosaic.window(&first);
    let _ = mosaic.window(&Selector::disk((500_600.0, 4_999_200.0), 120.0));
    let _ = mosaic.window(&Selector::disk((500_600.0, 4_999_200.0), 140.0));

    // The first window aged out, so resolving it again is a miss that
    // in turn evicts the next-oldest entry
    let _ = mosaic.window(&first);
    let stats = mosaic.window_cache_stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.hits, 0);
}

#[test]
fn test_window_lists_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    let window = mosaic.window(&Selector::rectangle((500_400.0, 4_999_000.0), (500_900.0, 4_999_500.0)));
    assert_eq!(window.field_names(), vec!["alpha".to_string()]);
    assert_eq!(window.crs().epsg(), Some(32633));
    assert_eq!(window.resolution(), (RES, RES));
}

#[test]
fn test_nodata_override_fills_sources_that_declare_none() {
    let dir = tempfile::tempdir().unwrap();
    let alpha = dir.path().join("alpha.tif");
    write_raster(&alpha, 60, 60, ORIGIN, RES, 32633, Some(NODATA), &create_test_grid(60, 60))
        .unwrap();
    // North-west corner source without a GDAL_NODATA tag
    let bare = dir.path().join("bare.tif");
    write_raster(&bare, 10, 10, ORIGIN, RES, 32633, None, &create_test_grid(10, 10)).unwrap();

    let config = MosaicConfig {
        nodata_override: Some(-7_777.0),
        ..Default::default()
    };
    let mut mosaic = Mosaic::load_with(&[alpha, bare], config).unwrap();

    // Covers bare's south-east quadrant and hangs over both its edges
    let selector = Selector::rectangle((500_100.0, 4_999_700.0), (500_300.0, 4_999_900.0));
    let buffer = mosaic.read(&selector, "bare").unwrap();

    assert_eq!(buffer.shape(), (10, 10));
    assert_eq!(buffer.count_valid(), 25);
    // The overhang carries the override value, not NaN
    assert_eq!(buffer.get(0, 0), Some(-7_777.0));
    assert!(buffer.is_missing(-7_777.0));
}

#[test]
fn test_crs_override_supplies_the_missing_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unref.tif");
    let data = create_test_grid(20, 20);
    let image = WriteImage {
        width: 20,
        height: 20,
        bands: vec![data.as_slice()],
        transform: north_up_transform(ORIGIN, RES),
        epsg: None,
        geographic: false,
        proj_text: None,
        nodata: Some(NODATA),
    };
    write_geotiff(&path, &image).unwrap();

    assert!(matches!(
        Mosaic::load(&[path.clone()]),
        Err(MosaicError::Configuration(_))
    ));

    let config = MosaicConfig {
        crs_override: Some("EPSG:32633".to_string()),
        ..Default::default()
    };
    let mosaic = Mosaic::load_with(&[path], config).unwrap();
    assert_eq!(mosaic.crs().epsg(), Some(32633));
}
