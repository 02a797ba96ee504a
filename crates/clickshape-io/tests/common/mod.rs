//! Fixtures shared by the integration tests.

#![allow(clippy::unwrap_used, dead_code)]

use std::fs::File;
use std::path::Path;

use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

/// 10x10 samples: 0 background, a 3x3 block of 100 at rows/cols 3..=5,
/// and a 2x2 block of 200 at rows/cols 7..=8.
pub fn two_blocks() -> Vec<f32> {
    (0..10u32)
        .flat_map(|row| (0..10u32).map(move |col| (row, col)))
        .map(|(row, col)| {
            if (3..=5).contains(&row) && (3..=5).contains(&col) {
                100.0
            } else if (7..=8).contains(&row) && (7..=8).contains(&col) {
                200.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Write a single-band float GeoTIFF whose top-left corner is at
/// `(west, north)` with square pixels of `pixel` units.
pub fn write_geotiff(path: &Path, width: u32, height: u32, data: &[f32], west: f64, north: f64, pixel: f64) {
    let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(width, height)
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[pixel, pixel, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, west, north, 0.0][..])
        .unwrap();
    image.write_data(data).unwrap();
}

/// Write a float TIFF georeferenced by a model transformation matrix.
pub fn write_matrix_tiff(path: &Path, width: u32, height: u32, data: &[f32], matrix: &[f64; 16]) {
    let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(width, height)
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTransformationTag, &matrix[..])
        .unwrap();
    image.write_data(data).unwrap();
}

/// Write an RGB TIFF with no georeferencing tags.
pub fn write_plain_rgb_tiff(path: &Path, width: u32, height: u32, data: &[u8]) {
    let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
    encoder
        .write_image::<colortype::RGB8>(width, height, data)
        .unwrap();
}
