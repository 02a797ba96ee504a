//! Raster loading: GeoTIFF via `tiff`, other image formats via `image`.
//!
//! Only the first band is read. GeoTIFFs are georeferenced from their
//! model tags; everything else gets a pixel-space transform so that
//! clicks are given in `(column, height - row)` units.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use clickshape_pipeline::{Extent, GeoTransform, Grid, PipelineError, Raster};
use image::DynamicImage;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Errors that can occur while loading a raster.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TIFF decoding failed.
    #[error("TIFF decoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Image decoding failed.
    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The TIFF sample type is not supported.
    #[error("unsupported TIFF sample format")]
    UnsupportedSampleFormat,

    /// Decoded samples do not divide evenly into pixels.
    #[error("{samples} samples do not fit a {width}x{height} image")]
    SampleLayout {
        /// Samples decoded.
        samples: usize,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// A georeferencing tag is present but too short.
    #[error("{tag} has {found} values, expected at least {expected}")]
    GeoTag {
        /// Tag name.
        tag: &'static str,
        /// Values present.
        found: usize,
        /// Values required.
        expected: usize,
    },

    /// The model transformation rotates or shears the grid.
    #[error("rotated or sheared raster transforms are not supported")]
    RotatedTransform,

    /// The grid or extent is invalid.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Load band 1 of the raster at `path`, optionally cropped to `extent`.
///
/// `.tif`/`.tiff` files are read as GeoTIFF; any other extension is
/// handed to `image` and converted to luminance.
///
/// # Errors
///
/// Returns [`RasterError::Io`] if the file cannot be opened, a decoding
/// error if it cannot be read, and [`RasterError::Pipeline`] wrapping
/// [`PipelineError::ExtentOutsideRaster`] if `extent` misses the raster.
pub fn load_raster(path: &Path, extent: Option<&Extent>) -> Result<Raster, RasterError> {
    let raster = if is_tiff(path) {
        load_geotiff(path)?
    } else {
        load_image(path)?
    };
    let dims = raster.dimensions();
    log::info!(
        "loaded {}x{} raster from {}",
        dims.width,
        dims.height,
        path.display()
    );

    match extent {
        Some(extent) => Ok(raster.crop(extent)?),
        None => Ok(raster),
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

fn open(path: &Path) -> Result<File, RasterError> {
    File::open(path).map_err(|source| RasterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// GeoTIFF
// ---------------------------------------------------------------------------

/// Decode a (Geo)TIFF.
///
/// # Errors
///
/// See [`load_raster`].
pub fn load_geotiff(path: &Path) -> Result<Raster, RasterError> {
    let mut decoder = Decoder::new(BufReader::new(open(path)?))?;
    let (width, height) = decoder.dimensions()?;
    let transform = read_geotransform(&mut decoder, height)?;
    let samples = samples_to_f64(decoder.read_image()?)?;
    let grid = first_band(samples, width, height)?;
    Ok(Raster::new(grid, transform)?)
}

/// Read the north-up transform from the GeoTIFF model tags.
///
/// `ModelPixelScaleTag` + `ModelTiepointTag` take precedence over
/// `ModelTransformationTag`. Without either, the pixel-space transform
/// is used.
fn read_geotransform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    height: u32,
) -> Result<GeoTransform, RasterError> {
    let scale = find_f64s(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64s(decoder, Tag::ModelTiepointTag)?;
    let matrix = find_f64s(decoder, Tag::ModelTransformationTag)?;

    match (scale, tiepoint, matrix) {
        (Some(scale), Some(tiepoint), _) => from_tiepoint(&scale, &tiepoint),
        (_, _, Some(matrix)) => from_matrix(&matrix),
        _ => {
            log::warn!("TIFF has no georeferencing tags; using pixel coordinates");
            Ok(GeoTransform::pixel_space(height))
        }
    }
}

fn find_f64s<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<Vec<f64>>, RasterError> {
    Ok(decoder
        .find_tag(tag)?
        .map(tiff::decoder::ifd::Value::into_f64_vec)
        .transpose()?)
}

/// Tiepoint `(i, j, k, x, y, z)` anchors raster pixel `(i, j)` at model
/// `(x, y)`; scale is `(sx, sy, sz)` with `sy` positive for north-up.
fn from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<GeoTransform, RasterError> {
    let [sx, sy, ..] = *scale else {
        return Err(RasterError::GeoTag {
            tag: "ModelPixelScaleTag",
            found: scale.len(),
            expected: 2,
        });
    };
    let [i, j, _, x, y, ..] = *tiepoint else {
        return Err(RasterError::GeoTag {
            tag: "ModelTiepointTag",
            found: tiepoint.len(),
            expected: 6,
        });
    };
    Ok(GeoTransform::new(i.mul_add(-sx, x), j.mul_add(sy, y), sx, sy)?)
}

/// Row-major 4x4 matrix mapping `(col, row, 0, 1)` to model space.
fn from_matrix(matrix: &[f64]) -> Result<GeoTransform, RasterError> {
    if matrix.len() < 16 {
        return Err(RasterError::GeoTag {
            tag: "ModelTransformationTag",
            found: matrix.len(),
            expected: 16,
        });
    }
    let (a, b, c) = (matrix[0], matrix[1], matrix[3]);
    let (d, e, f) = (matrix[4], matrix[5], matrix[7]);
    if b != 0.0 || d != 0.0 {
        return Err(RasterError::RotatedTransform);
    }
    Ok(GeoTransform::new(c, f, a, -e)?)
}

#[allow(clippy::cast_precision_loss)]
fn samples_to_f64(result: DecodingResult) -> Result<Vec<f64>, RasterError> {
    let samples = match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return Err(RasterError::UnsupportedSampleFormat),
    };
    Ok(samples)
}

/// Keep the first sample of each pixel from chunky (interleaved) data.
fn first_band(samples: Vec<f64>, width: u32, height: u32) -> Result<Grid, RasterError> {
    let pixels = width as usize * height as usize;
    if pixels == 0 {
        return Err(PipelineError::EmptyRaster.into());
    }
    if samples.is_empty() || samples.len() % pixels != 0 {
        return Err(RasterError::SampleLayout {
            samples: samples.len(),
            width,
            height,
        });
    }
    let per_pixel = samples.len() / pixels;
    let data = if per_pixel == 1 {
        samples
    } else {
        log::debug!("keeping band 1 of {per_pixel}");
        samples.into_iter().step_by(per_pixel).collect()
    };
    Ok(Grid::new(width, height, data)?)
}

// ---------------------------------------------------------------------------
// Plain images
// ---------------------------------------------------------------------------

/// Decode a PNG/JPEG/BMP/WebP image as luminance in pixel space.
///
/// 16-bit and float images keep their native range; everything else is
/// read as 8-bit.
///
/// # Errors
///
/// See [`load_raster`].
pub fn load_image(path: &Path) -> Result<Raster, RasterError> {
    let reader = image::ImageReader::new(BufReader::new(open(path)?))
        .with_guessed_format()
        .map_err(|source| RasterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let img = reader.decode()?;
    let (width, height) = (img.width(), img.height());

    let data: Vec<f64> = match img {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            img.to_luma16().into_raw().into_iter().map(f64::from).collect()
        }
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            img.to_luma32f().into_raw().into_iter().map(f64::from).collect()
        }
        _ => img.to_luma8().into_raw().into_iter().map(f64::from).collect(),
    };

    log::warn!(
        "{} is not a GeoTIFF; using pixel coordinates",
        path.display()
    );
    Ok(Raster::new(
        Grid::new(width, height, data)?,
        GeoTransform::pixel_space(height),
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tiff_extension_is_case_insensitive() {
        assert!(is_tiff(Path::new("a/b.tif")));
        assert!(is_tiff(Path::new("b.TIFF")));
        assert!(!is_tiff(Path::new("b.png")));
        assert!(!is_tiff(Path::new("tif")));
    }

    #[test]
    fn tiepoint_anchors_top_left() {
        let t = from_tiepoint(&[0.5, 0.25, 0.0], &[0.0, 0.0, 0.0, 100.0, 50.0, 0.0]).unwrap();
        assert_eq!(t, GeoTransform::new(100.0, 50.0, 0.5, 0.25).unwrap());
    }

    #[test]
    fn tiepoint_at_offset_pixel() {
        let t = from_tiepoint(&[2.0, 2.0, 0.0], &[1.0, 2.0, 0.0, 12.0, 16.0, 0.0]).unwrap();
        assert!((t.west - 10.0).abs() < f64::EPSILON);
        assert!((t.north - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_tags_are_rejected() {
        assert!(matches!(
            from_tiepoint(&[1.0], &[0.0; 6]),
            Err(RasterError::GeoTag {
                tag: "ModelPixelScaleTag",
                ..
            })
        ));
        assert!(matches!(
            from_tiepoint(&[1.0, 1.0], &[0.0; 4]),
            Err(RasterError::GeoTag { expected: 6, .. })
        ));
        assert!(from_matrix(&[1.0; 8]).is_err());
    }

    #[test]
    fn south_up_scale_is_rejected() {
        assert!(matches!(
            from_tiepoint(&[1.0, -1.0, 0.0], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            Err(RasterError::Pipeline(PipelineError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn matrix_without_rotation() {
        let mut m = [0.0; 16];
        m[0] = 0.5;
        m[3] = 100.0;
        m[5] = -0.25;
        m[7] = 50.0;
        m[15] = 1.0;
        let t = from_matrix(&m).unwrap();
        assert_eq!(t, GeoTransform::new(100.0, 50.0, 0.5, 0.25).unwrap());
    }

    #[test]
    fn rotated_matrix_is_rejected() {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[1] = 0.1;
        m[5] = -1.0;
        m[15] = 1.0;
        assert!(matches!(from_matrix(&m), Err(RasterError::RotatedTransform)));
    }

    #[test]
    fn first_band_of_interleaved_samples() {
        let samples = vec![1.0, 10.0, 100.0, 2.0, 20.0, 200.0];
        let grid = first_band(samples, 2, 1).unwrap();
        assert_eq!(grid.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn ragged_samples_are_rejected() {
        assert!(matches!(
            first_band(vec![0.0; 5], 2, 2),
            Err(RasterError::SampleLayout { samples: 5, .. })
        ));
        assert!(first_band(vec![], 2, 2).is_err());
    }

    #[test]
    fn signed_and_wide_samples_convert() {
        let v = samples_to_f64(DecodingResult::I16(vec![-3, 7])).unwrap();
        assert_eq!(v, vec![-3.0, 7.0]);
        let v = samples_to_f64(DecodingResult::U64(vec![u64::from(u32::MAX) + 1])).unwrap();
        assert!((v[0] - 4_294_967_296.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_raster(Path::new("/definitely/not/here.tif"), None);
        assert!(matches!(result, Err(RasterError::Io { .. })));
        let result = load_raster(Path::new("/definitely/not/here.png"), None);
        assert!(matches!(result, Err(RasterError::Io { .. })));
    }
}
