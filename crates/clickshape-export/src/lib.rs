//! clickshape-export: Pure vector serializers (sans-IO).
//!
//! Converts extracted polygons into the pieces of an ESRI shapefile
//! (geometry, attribute record, `.prj` and `.cpg` sidecars) and into
//! GeoJSON text. Writing files lives in `clickshape-io`.

pub mod crs;
pub mod geojson;
pub mod shape;

pub use crs::{CPG_ENCODING, EPSG_CODE, WGS84_PRJ};
pub use geojson::to_geojson;
pub use shape::{FID_FIELD, feature_record, table_builder, to_shapefile_polygon};

/// Errors that can occur while serializing a polygon.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A ring has too few vertices to form a polygon.
    #[error("polygon ring needs at least {min} vertices, got {points}", min = shape::MIN_RING_POINTS)]
    DegenerateRing {
        /// Vertices in the ring, including the closing one.
        points: usize,
    },

    /// A vertex is NaN or infinite.
    #[error("non-finite vertex ({x}, {y})")]
    NonFiniteCoordinate {
        /// Vertex x.
        x: f64,
        /// Vertex y.
        y: f64,
    },

    /// The attribute table could not be described.
    #[error("invalid dBASE field name {name:?}: {reason}")]
    FieldName {
        /// Rejected name.
        name: String,
        /// Why `dbase` rejected it.
        reason: String,
    },

    /// JSON serialization failed.
    #[error("failed to serialize GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}
