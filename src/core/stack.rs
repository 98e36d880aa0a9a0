//! Band stacking: one multi-band raster from the per-band mosaics.
//!
//! The mosaics all come from the same tiling grid, but that is validated
//! here rather than assumed: silent stacking of misaligned grids would
//! produce a plausible-looking yet wrong artifact.
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};
use tracing::info;

use crate::core::mosaic::BandMosaic;
use crate::error::{Error, Result};
use crate::io::gdal::{GdalError, GdalRasterReader};
use crate::io::writers::tiff::{BandPlane, write_tiff_multiband_u16};

/// Tolerated absolute deviation between mosaic geotransform coefficients.
const GT_EPS: f64 = 1e-6;

/// The final artifact: an N-band UInt16 raster, one band per requested
/// spectral band, in caller-declared order.
#[derive(Debug, Clone)]
pub struct StackedRaster {
    pub path: PathBuf,
    pub bands: usize,
    pub cols: usize,
    pub rows: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
}

fn geotransforms_match(a: &[f64; 6], b: &[f64; 6]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= GT_EPS)
}

/// Stack the mosaics, in the given order, into a multi-band UInt16 GeoTIFF
/// at `output_path`.
///
/// The geotransform and projection are taken from the first mosaic; every
/// other mosaic must match it exactly in dimensions, geotransform, and
/// projection. Band `i` of the output (1-based in the file format) carries
/// the pixels and description of mosaic `i` (0-based here).
pub fn stack(mosaics: &[BandMosaic], output_path: &Path) -> Result<StackedRaster> {
    let first = mosaics
        .first()
        .ok_or_else(|| Error::consistency("cannot stack an empty mosaic list"))?;

    // Validate the shared grid before reading anything into memory.
    for mosaic in &mosaics[1..] {
        if mosaic.cols != first.cols || mosaic.rows != first.rows {
            return Err(Error::Gdal(GdalError::DimensionMismatch(
                first.cols,
                first.rows,
                mosaic.cols,
                mosaic.rows,
            )));
        }
        if !geotransforms_match(&mosaic.geotransform, &first.geotransform) {
            return Err(Error::consistency(format!(
                "mosaic {} geotransform differs from {}",
                mosaic.band, first.band
            )));
        }
        if mosaic.projection != first.projection {
            return Err(Error::consistency(format!(
                "mosaic {} projection differs from {}",
                mosaic.band, first.band
            )));
        }
    }

    // Whole-band reads: each mosaic is loaded fully, so peak memory is the
    // full stack. Bounded by the AOI size the caller chose.
    let mut arrays: Vec<Array2<u16>> = Vec::with_capacity(mosaics.len());
    for mosaic in mosaics {
        let reader = GdalRasterReader::open(&mosaic.path)?;
        let meta = &reader.metadata;
        if meta.size_x != first.cols || meta.size_y != first.rows {
            return Err(Error::Gdal(GdalError::DimensionMismatch(
                first.cols,
                first.rows,
                meta.size_x,
                meta.size_y,
            )));
        }
        arrays.push(reader.read_band(1)?);
    }

    // (band, row, col), caller-declared band order.
    let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
    let stacked: Array3<u16> = ndarray::stack(Axis(0), &views)
        .map_err(|e| Error::consistency(format!("failed to stack band arrays: {}", e)))?;
    let (bands, rows, cols) = stacked.dim();

    let mut planes: Vec<BandPlane<'_>> = Vec::with_capacity(mosaics.len());
    for (idx, mosaic) in mosaics.iter().enumerate() {
        let data = stacked
            .index_axis(Axis(0), idx)
            .to_slice()
            .ok_or_else(|| Error::consistency("band plane is not contiguous"))?;
        planes.push(BandPlane {
            data,
            description: &mosaic.band,
        });
    }

    let ds = write_tiff_multiband_u16(
        output_path,
        cols,
        rows,
        &planes,
        first.geotransform,
        &first.projection,
    )?;
    drop(ds);

    info!(
        "Stacked {} band(s) into {} ({}x{})",
        bands,
        output_path.display(),
        cols,
        rows
    );

    Ok(StackedRaster {
        path: output_path.to_path_buf(),
        bands,
        cols,
        rows,
        geotransform: first.geotransform,
        projection: first.projection.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mosaic(band: &str, cols: usize, rows: usize, gt: [f64; 6]) -> BandMosaic {
        BandMosaic {
            band: band.to_string(),
            path: PathBuf::from(format!("/tmp/{band}.tif")),
            cols,
            rows,
            geotransform: gt,
            projection: "EPSG:32633".to_string(),
        }
    }

    const GT: [f64; 6] = [500_000.0, 10.0, 0.0, 4_600_000.0, 0.0, -10.0];

    #[test]
    fn empty_input_is_fatal() {
        let err = stack(&[], Path::new("/tmp/never.tif")).unwrap_err();
        assert!(matches!(err, Error::RasterConsistency(_)));
    }

    #[test]
    fn mismatched_dimensions_are_fatal() {
        let mosaics = vec![mosaic("B02", 4, 4, GT), mosaic("B03", 4, 5, GT)];
        let err = stack(&mosaics, Path::new("/tmp/never.tif")).unwrap_err();
        assert!(matches!(
            err,
            Error::Gdal(GdalError::DimensionMismatch(4, 4, 4, 5))
        ));
    }

    #[test]
    fn mismatched_geotransforms_are_fatal() {
        let mut other = GT;
        other[0] += 5.0;
        let mosaics = vec![mosaic("B02", 4, 4, GT), mosaic("B03", 4, 4, other)];
        let err = stack(&mosaics, Path::new("/tmp/never.tif")).unwrap_err();
        assert!(matches!(err, Error::RasterConsistency(_)));
    }
}
