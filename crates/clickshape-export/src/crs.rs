//! Coordinate reference system sidecars.
//!
//! Output is always tagged as geographic WGS 84 (EPSG:4326), whatever
//! the source raster's CRS. Coordinates are written as computed; no
//! reprojection happens.

/// EPSG code of the output CRS.
pub const EPSG_CODE: u32 = 4326;

/// Contents of the `.prj` file: WGS 84 in the ESRI flavour of WKT1,
/// as GIS packages expect next to a shapefile.
pub const WGS84_PRJ: &str = concat!(
    r#"GEOGCS["GCS_WGS_1984","#,
    r#"DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],"#,
    r#"PRIMEM["Greenwich",0.0],"#,
    r#"UNIT["Degree",0.0174532925199433]]"#,
);

/// Contents of the `.cpg` file: the `.dbf` text encoding.
pub const CPG_ENCODING: &str = "UTF-8";
