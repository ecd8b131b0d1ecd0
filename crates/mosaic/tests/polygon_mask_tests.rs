//! Polygon selections: rasterized coverage, union repair, GeoJSON
//! loading and ring reprojection.

use geo::{polygon, MultiPolygon};
use geodesy::{Crs, Transformer};
use mosaic::{Mosaic, MosaicError, Selector};
use test_utils::{
    assert_coords_approx_eq, create_test_grid, init_test_logging, write_raster, NODATA,
};

const ORIGIN: (f64, f64) = (500_000.0, 5_000_000.0);

fn load_mosaic(dir: &std::path::Path) -> Mosaic {
    let path = dir.join("alpha.tif");
    write_raster(&path, 60, 60, ORIGIN, 20.0, 32633, Some(NODATA), &create_test_grid(60, 60))
        .unwrap();
    Mosaic::load(&[path]).unwrap()
}

#[test]
fn test_triangle_keeps_fewer_pixels_than_its_bounding_box() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    // Right triangle on pixel-aligned legs, 400 m each
    let region = MultiPolygon::new(vec![polygon![
        (x: 500_400.0, y: 4_999_000.0),
        (x: 500_800.0, y: 4_999_000.0),
        (x: 500_400.0, y: 4_999_400.0),
    ]]);
    let selector = Selector::polygon(region).unwrap();

    let buffer = mosaic.read(&selector, "alpha").unwrap();
    assert_eq!(buffer.shape(), (20, 20));
    // Half the box, minus the centers sitting exactly on the hypotenuse
    assert_eq!(buffer.count_valid(), 190);

    let window = mosaic.window(&selector);
    assert_eq!(mosaic.fill_mask(&window).count(), 190);

    let boxed = Selector::rectangle((500_400.0, 4_999_000.0), (500_800.0, 4_999_400.0));
    let box_count = mosaic.read(&boxed, "alpha").unwrap().count_valid();
    assert_eq!(box_count, 400);
    assert!(buffer.count_valid() < box_count);
}

#[test]
fn test_overlapping_parts_are_unioned_not_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    // Two 200 m squares overlapping by a 100 m square. Without the union
    // an even-odd rasterization would punch the overlap out; with it the
    // count is 100 + 100 - 25
    let region = MultiPolygon::new(vec![
        polygon![
            (x: 500_405.0, y: 4_999_005.0),
            (x: 500_605.0, y: 4_999_005.0),
            (x: 500_605.0, y: 4_999_205.0),
            (x: 500_405.0, y: 4_999_205.0),
        ],
        polygon![
            (x: 500_505.0, y: 4_999_105.0),
            (x: 500_705.0, y: 4_999_105.0),
            (x: 500_705.0, y: 4_999_305.0),
            (x: 500_505.0, y: 4_999_305.0),
        ],
    ]);
    let selector = Selector::polygon(region).unwrap();

    let buffer = mosaic.read(&selector, "alpha").unwrap();
    assert_eq!(buffer.count_valid(), 175);

    let window = mosaic.window(&selector);
    assert_eq!(mosaic.fill_mask(&window).count(), 175);
}

#[test]
fn test_feature_collection_parts_all_select() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    // Two disjoint squares as separate features, in the domain CRS
    let square_a = [
        [500_405.0, 4_999_005.0],
        [500_595.0, 4_999_005.0],
        [500_595.0, 4_999_195.0],
        [500_405.0, 4_999_195.0],
        [500_405.0, 4_999_005.0],
    ];
    let square_b = [
        [500_605.0, 4_999_205.0],
        [500_795.0, 4_999_205.0],
        [500_795.0, 4_999_395.0],
        [500_605.0, 4_999_395.0],
        [500_605.0, 4_999_205.0],
    ];
    let doc = serde_json::json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "EPSG:32633" } },
        "features": [
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Polygon", "coordinates": [square_a] }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Polygon", "coordinates": [square_b] }
            }
        ]
    });
    let path = dir.path().join("squares.json");
    std::fs::write(&path, doc.to_string()).unwrap();

    let selector = mosaic.polygon_selector(&path).unwrap();
    let buffer = mosaic.read(&selector, "alpha").unwrap();
    // 10x10 pixel centers per square
    assert_eq!(buffer.count_valid(), 200);
    assert_eq!(buffer.shape(), (20, 20));
}

#[test]
fn test_wgs84_rings_are_reprojected_onto_the_domain() {
    let dir = tempfile::tempdir().unwrap();
    let mut mosaic = load_mosaic(dir.path());

    // Express a square that is known in domain coordinates in lon/lat,
    // as a GeoJSON file without a crs member would carry it
    let to_wgs = Transformer::new(
        &Crs::from_epsg(32633).unwrap(),
        &Crs::from_epsg(4326).unwrap(),
    )
    .unwrap();
    let corners = [
        (500_405.0, 4_999_005.0),
        (500_795.0, 4_999_005.0),
        (500_795.0, 4_999_395.0),
        (500_405.0, 4_999_395.0),
        (500_405.0, 4_999_005.0),
    ];
    let ring: Vec<[f64; 2]> = corners
        .iter()
        .map(|&(x, y)| {
            let (lon, lat) = to_wgs.transform(x, y).unwrap();
            [lon, lat]
        })
        .collect();
    let doc = serde_json::json!({
        "type": "Feature",
        "properties": {},
        "geometry": { "type": "Polygon", "coordinates": [ring] }
    });
    let path = dir.path().join("region.json");
    std::fs::write(&path, doc.to_string()).unwrap();

    let selector = mosaic.polygon_selector(&path).unwrap();
    let (left, right) = selector.bounding_box();
    assert_coords_approx_eq!((left.0, left.1), (500_405.0, 4_999_005.0), 1e-3);
    assert_coords_approx_eq!((right.0, right.1), (500_795.0, 4_999_395.0), 1e-3);

    let window = mosaic.window(&selector);
    assert_eq!(window.left_edge(), (500_400.0, 4_999_000.0));
    assert_eq!(window.right_edge(), (500_800.0, 4_999_400.0));

    // 5 m of slack on every edge, so the round trip cannot move a center
    let buffer = mosaic.read(&selector, "alpha").unwrap();
    assert_eq!(buffer.count_valid(), 400);
}

#[test]
fn test_degenerate_ring_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mosaic = load_mosaic(dir.path());

    let doc = serde_json::json!({
        "type": "Polygon",
        "coordinates": [[
            [500_400.0, 4_999_000.0],
            [500_500.0, 4_999_100.0],
            [500_400.0, 4_999_000.0]
        ]],
        "crs": { "type": "name", "properties": { "name": "EPSG:32633" } }
    });
    let path = dir.path().join("line.json");
    std::fs::write(&path, doc.to_string()).unwrap();

    let err = mosaic.polygon_selector(&path).unwrap_err();
    assert!(matches!(err, MosaicError::Geometry(_)));
}
