//! GeoJSON export of a single extracted polygon.
//!
//! Produces a `FeatureCollection` with one `Polygon` feature. GeoJSON
//! coordinates are WGS 84 longitude/latitude by definition, matching
//! the shapefile's `.prj`.

use clickshape_pipeline::Extraction;
use serde_json::{Value, json};

use crate::ExportError;

/// Serialize an extraction as a pretty-printed GeoJSON
/// `FeatureCollection`.
///
/// Properties carry the same `FID` as the shapefile record plus the
/// seed pixel and whether smoothing was applied.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn to_geojson(extraction: &Extraction) -> Result<String, ExportError> {
    let polygon = &extraction.polygon;
    let mut rings = vec![ring_coordinates(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coordinates));

    let collection = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "FID": 0,
                "seed_row": extraction.seed.row,
                "seed_col": extraction.seed.col,
                "seed_value": extraction.seed_value,
                "smoothed": extraction.smoothed,
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": rings,
            },
        }],
    });
    Ok(serde_json::to_string_pretty(&collection)?)
}

fn ring_coordinates(ring: &geo::LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}
