//! Shapefile geometry and attribute conversion.
//!
//! The output layer holds exactly one polygon feature with a single
//! numeric `FID` attribute set to 0.

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::PolygonRing;

use crate::ExportError;

/// Name of the only attribute column.
pub const FID_FIELD: &str = "FID";

/// Width of the `FID` column in characters.
const FID_WIDTH: u8 = 10;

/// A closed ring needs three distinct vertices plus the closing one.
pub const MIN_RING_POINTS: usize = 4;

/// Convert a geographic polygon to its shapefile representation.
///
/// `shapefile` closes each ring and rewrites its winding to the ESRI
/// convention (outer rings clockwise, holes counter-clockwise).
///
/// # Errors
///
/// Returns [`ExportError::DegenerateRing`] if any ring has fewer than
/// [`MIN_RING_POINTS`] vertices and [`ExportError::NonFiniteCoordinate`]
/// if any vertex is not finite.
pub fn to_shapefile_polygon(polygon: &geo::Polygon<f64>) -> Result<shapefile::Polygon, ExportError> {
    let mut rings = vec![PolygonRing::Outer(ring_points(polygon.exterior())?)];
    for interior in polygon.interiors() {
        rings.push(PolygonRing::Inner(ring_points(interior)?));
    }
    Ok(shapefile::Polygon::with_rings(rings))
}

fn ring_points(ring: &geo::LineString<f64>) -> Result<Vec<shapefile::Point>, ExportError> {
    if ring.0.len() < MIN_RING_POINTS {
        return Err(ExportError::DegenerateRing {
            points: ring.0.len(),
        });
    }
    ring.coords()
        .map(|c| {
            if c.x.is_finite() && c.y.is_finite() {
                Ok(shapefile::Point::new(c.x, c.y))
            } else {
                Err(ExportError::NonFiniteCoordinate { x: c.x, y: c.y })
            }
        })
        .collect()
}

/// Attribute table layout: one numeric `FID` column.
///
/// # Errors
///
/// Returns [`ExportError::FieldName`] if `dbase` rejects the column
/// name.
pub fn table_builder() -> Result<TableWriterBuilder, ExportError> {
    let name = FieldName::try_from(FID_FIELD).map_err(|e| ExportError::FieldName {
        name: FID_FIELD.to_owned(),
        reason: format!("{e:?}"),
    })?;
    Ok(TableWriterBuilder::new().add_numeric_field(name, FID_WIDTH, 0))
}

/// Attribute record for the feature with identifier `fid`.
#[must_use]
pub fn feature_record(fid: u32) -> Record {
    let mut record = Record::default();
    record.insert(
        FID_FIELD.to_owned(),
        FieldValue::Numeric(Some(f64::from(fid))),
    );
    record
}
