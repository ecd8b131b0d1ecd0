//! GeoTIFF tag and key IDs not covered by the tiff crate's tag enum.

/// ModelPixelScaleTag: [ScaleX, ScaleY, ScaleZ].
pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
/// ModelTiepointTag: [I, J, K, X, Y, Z] tuples.
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
/// ModelTransformationTag: full 4x4 row-major matrix, used for rotated rasters.
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
/// GeoKeyDirectoryTag.
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
/// GeoAsciiParamsTag.
pub(crate) const GEO_ASCII_PARAMS: u16 = 34737;
/// GDAL's nodata convention: the value as ASCII text.
pub(crate) const GDAL_NODATA: u16 = 42113;

/// GTModelTypeGeoKey.
pub(crate) const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
/// GTRasterTypeGeoKey.
pub(crate) const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
/// GeographicTypeGeoKey: EPSG code of a geographic CRS.
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
/// ProjectedCSTypeGeoKey: EPSG code of a projected CRS.
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// GTModelTypeGeoKey values.
pub(crate) const MODEL_TYPE_PROJECTED: u16 = 1;
pub(crate) const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
/// GTRasterTypeGeoKey value: pixel represents an area, not a point.
pub(crate) const RASTER_PIXEL_IS_AREA: u16 = 1;
