#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::path::{Path, PathBuf};

use clickshape_export::{CPG_ENCODING, WGS84_PRJ};
use clickshape_io::{ClickOutcome, Digitizer, DigitizerOptions, Error};
use clickshape_pipeline::{ContourTracerKind, ExtractConfig, PipelineError};
use shapefile::dbase::{FieldValue, Record};

fn options(config: ExtractConfig) -> DigitizerOptions {
    DigitizerOptions {
        config,
        ..DigitizerOptions::default()
    }
}

fn tolerance(t: f64) -> ExtractConfig {
    ExtractConfig {
        tolerance: t,
        ..ExtractConfig::default()
    }
}

/// The two-block fixture over [0, 10] x [0, 10] with unit pixels.
fn scene(dir: &Path) -> PathBuf {
    let path = dir.join("scene.tif");
    common::write_geotiff(&path, 10, 10, &common::two_blocks(), 0.0, 10.0, 1.0);
    path
}

fn read_features(shp: &Path) -> Vec<(shapefile::Polygon, Record)> {
    shapefile::read_as::<_, shapefile::Polygon, Record>(shp).unwrap()
}

fn assert_bbox(polygon: &shapefile::Polygon, min: (f64, f64), max: (f64, f64)) {
    let bbox = polygon.bbox();
    assert!((bbox.min.x - min.0).abs() < 1e-9, "{bbox:?}");
    assert!((bbox.min.y - min.1).abs() < 1e-9, "{bbox:?}");
    assert!((bbox.max.x - max.0).abs() < 1e-9, "{bbox:?}");
    assert!((bbox.max.y - max.1).abs() < 1e-9, "{bbox:?}");
}

#[test]
fn click_on_block_writes_single_polygon_shapefile() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let digitizer = Digitizer::open(&raster, &options(tolerance(5.0))).unwrap();
    let expected = dir.path().join("scene").join("scene.shp");
    assert_eq!(digitizer.output_path(), expected);

    let outcome = digitizer.click(4.5, 5.5).unwrap();
    let ClickOutcome::Saved { path, extraction } = outcome else {
        panic!("expected a saved polygon");
    };
    assert_eq!(path, expected);
    assert_eq!(extraction.region_pixels, 9);

    for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
        assert!(expected.with_extension(ext).is_file(), "missing .{ext}");
    }
    assert!(!expected.with_extension("geojson").exists());

    let features = read_features(&expected);
    assert_eq!(features.len(), 1);
    let (polygon, record) = &features[0];
    assert_eq!(polygon.rings().len(), 1);
    assert_bbox(polygon, (2.5, 4.5), (5.5, 7.5));
    assert_eq!(record.get("FID"), Some(&FieldValue::Numeric(Some(0.0))));

    let prj = std::fs::read_to_string(expected.with_extension("prj")).unwrap();
    assert_eq!(prj, WGS84_PRJ);
    let cpg = std::fs::read_to_string(expected.with_extension("cpg")).unwrap();
    assert_eq!(cpg, CPG_ENCODING);
}

#[test]
fn out_of_bounds_click_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let digitizer = Digitizer::open(&raster, &options(tolerance(5.0))).unwrap();

    let outcome = digitizer.click(10.0, 5.0).unwrap();
    assert!(matches!(
        outcome,
        ClickOutcome::Skipped(PipelineError::OutOfBounds { col: 10, .. })
    ));
    let outcome = digitizer.click(-3.0, 5.0).unwrap();
    assert!(matches!(
        outcome,
        ClickOutcome::Skipped(PipelineError::OutsideExtent { .. })
    ));

    assert!(dir.path().join("scene").is_dir());
    assert!(!digitizer.output_path().exists());

    // The session keeps going after rejected clicks.
    let outcome = digitizer.click(4.5, 5.5).unwrap();
    assert!(matches!(outcome, ClickOutcome::Saved { .. }));
    assert!(digitizer.output_path().is_file());
    assert_eq!(read_features(digitizer.output_path()).len(), 1);
}

#[test]
fn tiny_regions_are_skipped_and_session_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("specks.tif");
    // A lone corner pixel and a horizontal pair of pixels.
    let data: Vec<f32> = (0..25)
        .map(|i| match i {
            0 => 50.0,
            12 | 13 => 80.0,
            _ => 0.0,
        })
        .collect();
    common::write_geotiff(&path, 5, 5, &data, 0.0, 5.0, 1.0);

    let digitizer = Digitizer::open(&path, &options(tolerance(1.0))).unwrap();
    let outcome = digitizer.click(0.5, 4.5).unwrap();
    assert!(matches!(
        outcome,
        ClickOutcome::Skipped(PipelineError::DegenerateContour { points: 2 })
    ));
    assert!(!digitizer.output_path().exists());

    let border = DigitizerOptions {
        config: ExtractConfig {
            tolerance: 1.0,
            contour_tracer: ContourTracerKind::BorderFollowing,
            ..ExtractConfig::default()
        },
        ..DigitizerOptions::default()
    };
    let digitizer = Digitizer::open(&path, &border).unwrap();
    let outcome = digitizer.click(2.5, 2.5).unwrap();
    assert!(matches!(
        outcome,
        ClickOutcome::Skipped(PipelineError::DegenerateContour { .. })
    ));
    assert!(!digitizer.output_path().exists());

    // The default tracer still saves the pair.
    let digitizer = Digitizer::open(&path, &options(tolerance(1.0))).unwrap();
    let outcome = digitizer.click(2.5, 2.5).unwrap();
    assert!(matches!(outcome, ClickOutcome::Saved { .. }));
}

#[test]
fn second_click_overwrites_first() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let digitizer = Digitizer::open(&raster, &options(tolerance(5.0))).unwrap();

    digitizer.click(4.5, 5.5).unwrap();
    let outcome = digitizer.click(7.5, 2.5).unwrap();
    assert!(matches!(outcome, ClickOutcome::Saved { .. }));

    let features = read_features(digitizer.output_path());
    assert_eq!(features.len(), 1);
    assert_bbox(&features[0].0, (6.5, 1.5), (8.5, 3.5));
}

#[test]
fn short_contour_is_saved_unsmoothed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dot.tif");
    let data: Vec<f32> = (0..25).map(|i| if i == 12 { 50.0 } else { 0.0 }).collect();
    common::write_geotiff(&path, 5, 5, &data, 0.0, 5.0, 1.0);

    let config = ExtractConfig {
        tolerance: 1.0,
        smoothing_window: Some(7),
        ..ExtractConfig::default()
    };
    let digitizer = Digitizer::open(&path, &options(config)).unwrap();
    let ClickOutcome::Saved { extraction, .. } = digitizer.click(2.5, 2.5).unwrap() else {
        panic!("expected a saved polygon");
    };
    assert!(!extraction.smoothed);
    assert_eq!(extraction.contour.len(), 5);

    let features = read_features(digitizer.output_path());
    assert_eq!(features[0].0.rings()[0].points().len(), 5);
}

#[test]
fn smoothing_window_longer_than_contour_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let config = ExtractConfig {
        tolerance: 5.0,
        smoothing_window: Some(101),
        ..ExtractConfig::default()
    };
    let digitizer = Digitizer::open(&raster, &options(config)).unwrap();

    let err = digitizer.click(4.5, 5.5).unwrap_err();
    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::InvalidSmoothingWindow { window: 101, .. })
    ));
    assert!(!digitizer.output_path().exists());
}

#[test]
fn geojson_sidecar_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let options = DigitizerOptions {
        config: tolerance(5.0),
        geojson: true,
        ..DigitizerOptions::default()
    };
    let digitizer = Digitizer::open(&raster, &options).unwrap();
    digitizer.click(4.5, 5.5).unwrap();

    let text =
        std::fs::read_to_string(digitizer.output_path().with_extension("geojson")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["features"].as_array().unwrap().len(), 1);
}

#[test]
fn stale_geojson_is_removed_when_not_requested() {
    let dir = tempfile::tempdir().unwrap();
    let raster = scene(dir.path());
    let with_geojson = DigitizerOptions {
        config: tolerance(5.0),
        geojson: true,
        ..DigitizerOptions::default()
    };
    let digitizer = Digitizer::open(&raster, &with_geojson).unwrap();
    digitizer.click(4.5, 5.5).unwrap();
    let geojson = digitizer.output_path().with_extension("geojson");
    assert!(geojson.is_file());

    let digitizer = Digitizer::open(&raster, &options(tolerance(5.0))).unwrap();
    digitizer.click(7.5, 2.5).unwrap();
    assert!(!geojson.exists());
    assert!(digitizer.output_path().is_file());
}

#[test]
fn plain_image_is_digitized_in_pixel_space() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.png");
    let img = image::GrayImage::from_fn(10, 10, |x, y| {
        if (3..=5).contains(&x) && (3..=5).contains(&y) {
            image::Luma([100])
        } else {
            image::Luma([0])
        }
    });
    img.save(&path).unwrap();

    let digitizer = Digitizer::open(&path, &options(tolerance(5.0))).unwrap();
    assert_eq!(digitizer.output_path(), dir.path().join("scan").join("scan.shp"));
    digitizer.click(4.5, 5.5).unwrap();

    let features = read_features(digitizer.output_path());
    assert_bbox(&features[0].0, (2.5, 4.5), (5.5, 7.5));
}

#[test]
fn missing_raster_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let result = Digitizer::open(&dir.path().join("nope.tif"), &DigitizerOptions::default());
    assert!(matches!(result, Err(Error::Raster(_))));
    assert!(!dir.path().join("nope").exists());
}
