//! Per-band mosaicking of tile rasters.
//!
//! All tiles of one band are pasted into a single raster covering their
//! combined footprint. Tiles come from the same tiling grid, so they must
//! agree on pixel size and projection and sit on a shared pixel grid;
//! violations are raster-consistency errors, not warnings.
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::info;

use crate::error::{Error, Result};
use crate::io::gdal::GdalRasterReader;
use crate::io::writers::tiff::write_tiff_u16;
use crate::types::MergeRule;

/// Largest tolerated deviation, in pixel fractions, between a tile origin
/// and the shared pixel grid.
const GRID_EPS: f64 = 1e-3;

/// One band's mosaic on disk, with the grid metadata the stacker needs.
#[derive(Debug, Clone)]
pub struct BandMosaic {
    pub band: String,
    pub path: PathBuf,
    pub cols: usize,
    pub rows: usize,
    pub geotransform: [f64; 6],
    pub projection: String,
}

struct TileGrid {
    path: String,
    cols: usize,
    rows: usize,
    geotransform: [f64; 6],
}

/// Merge all assets of one band into a single UInt16 GeoTIFF at
/// `output_path`.
///
/// Sources are pasted in the given order; under the default
/// [`MergeRule::LastWins`] later sources overwrite earlier ones on overlap,
/// with no blending. An empty source list is fatal, as is any source with
/// more than one raster band.
pub fn mosaic_band(
    band: &str,
    sources: &[String],
    output_path: &Path,
    rule: MergeRule,
) -> Result<BandMosaic> {
    if sources.is_empty() {
        return Err(Error::EmptyBand {
            band: band.to_string(),
        });
    }

    // First pass: collect and validate tile grids.
    let mut tiles = Vec::with_capacity(sources.len());
    let mut projection = String::new();
    let mut pixel: (f64, f64) = (0.0, 0.0);
    for (idx, source) in sources.iter().enumerate() {
        let reader = GdalRasterReader::open(source)?;
        let meta = &reader.metadata;
        if meta.bands != 1 {
            return Err(Error::consistency(format!(
                "tile {} has {} bands; band inputs must be single-band",
                source, meta.bands
            )));
        }
        let gt = meta.geotransform;
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(Error::consistency(format!(
                "tile {} has a rotated geotransform",
                source
            )));
        }
        if idx == 0 {
            projection = meta.projection.clone();
            pixel = (gt[1], gt[5]);
        } else {
            if meta.projection != projection {
                return Err(Error::consistency(format!(
                    "tile {} projection differs from the first tile",
                    source
                )));
            }
            if (gt[1] - pixel.0).abs() > GRID_EPS * pixel.0.abs()
                || (gt[5] - pixel.1).abs() > GRID_EPS * pixel.1.abs()
            {
                return Err(Error::consistency(format!(
                    "tile {} pixel size ({}, {}) differs from ({}, {})",
                    source, gt[1], gt[5], pixel.0, pixel.1
                )));
            }
        }
        tiles.push(TileGrid {
            path: source.clone(),
            cols: meta.size_x,
            rows: meta.size_y,
            geotransform: gt,
        });
    }

    // Union footprint. Pixel height is negative for north-up rasters, so
    // the maximum origin_y is the top edge.
    let (px, py) = pixel;
    let min_x = tiles
        .iter()
        .map(|t| t.geotransform[0])
        .fold(f64::INFINITY, f64::min);
    let max_y = tiles
        .iter()
        .map(|t| t.geotransform[3])
        .fold(f64::NEG_INFINITY, f64::max);
    let max_x = tiles
        .iter()
        .map(|t| t.geotransform[0] + t.cols as f64 * px)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_y = tiles
        .iter()
        .map(|t| t.geotransform[3] + t.rows as f64 * py)
        .fold(f64::INFINITY, f64::min);

    let out_cols = ((max_x - min_x) / px).round() as usize;
    let out_rows = ((min_y - max_y) / py).round() as usize;
    let mut mosaic = vec![0u16; out_cols * out_rows];

    // Paste pass. Reversing the order under FirstWins makes the earliest
    // source the last writer, which is equivalent per pixel because every
    // tile covers its full rectangle.
    let ordered: Vec<&TileGrid> = match rule {
        MergeRule::LastWins => tiles.iter().collect(),
        MergeRule::FirstWins => tiles.iter().rev().collect(),
    };
    for tile in ordered {
        let off_x = (tile.geotransform[0] - min_x) / px;
        let off_y = (tile.geotransform[3] - max_y) / py;
        if (off_x - off_x.round()).abs() > GRID_EPS || (off_y - off_y.round()).abs() > GRID_EPS {
            return Err(Error::consistency(format!(
                "tile {} origin is not aligned to the shared pixel grid",
                tile.path
            )));
        }
        let off_x = off_x.round() as usize;
        let off_y = off_y.round() as usize;

        let reader = GdalRasterReader::open(&tile.path)?;
        let data: Array2<u16> = reader.read_band(1)?;
        for (row_idx, row) in data.outer_iter().enumerate() {
            let dest_row = off_y + row_idx;
            let dest_start = dest_row * out_cols + off_x;
            let dest = &mut mosaic[dest_start..dest_start + tile.cols];
            for (d, s) in dest.iter_mut().zip(row.iter()) {
                *d = *s;
            }
        }
    }

    let geotransform = [min_x, px, 0.0, max_y, 0.0, py];
    let ds = write_tiff_u16(
        output_path,
        out_cols,
        out_rows,
        &mosaic,
        geotransform,
        &projection,
        Some(band),
    )?;
    drop(ds);

    info!(
        "Mosaicked band {} from {} tile(s) into {} ({}x{})",
        band,
        sources.len(),
        output_path.display(),
        out_cols,
        out_rows
    );

    Ok(BandMosaic {
        band: band.to_string(),
        path: output_path.to_path_buf(),
        cols: out_cols,
        rows: out_rows,
        geotransform,
        projection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_list_is_fatal() {
        let err = mosaic_band("B02", &[], Path::new("/tmp/never.tif"), MergeRule::LastWins)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyBand { .. }));
    }
}
