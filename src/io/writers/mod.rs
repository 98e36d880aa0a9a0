//! GeoTIFF writers for band mosaics and the final stacked raster.
pub mod tiff;
pub use tiff::{BandPlane, write_tiff_multiband_u16, write_tiff_u16};
