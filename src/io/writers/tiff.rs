use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;

use crate::io::gdal::GdalError;

/// One band of pixel data destined for a multi-band output, with the
/// human-readable description attached to that band index.
pub struct BandPlane<'a> {
    pub data: &'a [u16],
    pub description: &'a str,
}

fn creation_options() -> RasterCreationOptions {
    RasterCreationOptions::from_iter(["COMPRESS=LZW", "TILED=YES"])
}

/// Write a single-band UInt16 GeoTIFF (LZW compressed, tiled) carrying the
/// given geotransform and projection.
pub fn write_tiff_u16(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[u16],
    geotransform: [f64; 6],
    projection: &str,
    description: Option<&str>,
) -> Result<Dataset, GdalError> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type_with_options::<u16, _>(
        output,
        cols,
        rows,
        1,
        &creation_options(),
    )?;
    ds.set_geo_transform(&geotransform)?;
    if !projection.is_empty() {
        ds.set_projection(projection)?;
    }

    let mut band = ds.rasterband(1)?;
    let mut buf = Buffer::new((cols, rows), data.to_vec());
    band.write((0, 0), (cols, rows), &mut buf)?;
    if let Some(desc) = description {
        band.set_description(desc)?;
    }
    Ok(ds)
}

/// Write a multi-band UInt16 GeoTIFF (LZW compressed, tiled). Bands are
/// written in plane order; GDAL band indices are 1-based, plane indices
/// 0-based.
pub fn write_tiff_multiband_u16(
    output: &Path,
    cols: usize,
    rows: usize,
    planes: &[BandPlane<'_>],
    geotransform: [f64; 6],
    projection: &str,
) -> Result<Dataset, GdalError> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let ds = driver.create_with_band_type_with_options::<u16, _>(
        output,
        cols,
        rows,
        planes.len(),
        &creation_options(),
    )?;
    ds.set_geo_transform(&geotransform)?;
    if !projection.is_empty() {
        ds.set_projection(projection)?;
    }

    for (idx, plane) in planes.iter().enumerate() {
        let mut band = ds.rasterband(idx + 1)?;
        let mut buf = Buffer::new((cols, rows), plane.data.to_vec());
        band.write((0, 0), (cols, rows), &mut buf)?;
        band.set_description(plane.description)?;
    }

    Ok(ds)
}
