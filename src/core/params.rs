use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{MergeRule, MosaickingOrder};

/// Remote batch processing service endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the batch processing API, e.g. `https://services.example.com/api/v1/batch`.
    pub base_url: String,
    /// OAuth2 token endpoint used to obtain a bearer token.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Object storage bucket receiving the job's tile outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket_name: String,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

/// Tiling grid the service splits the AOI into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TilingGridConfig {
    pub id: u32,
    /// Output resolution in grid units (meters for the built-in grids).
    pub resolution: f64,
    /// Buffer in pixels applied on each axis: `[x, y]`.
    pub buffer: [u32; 2],
}

fn default_analysis_poll_secs() -> u64 {
    5
}

fn default_tile_poll_secs() -> u64 {
    120
}

fn default_simplify_tolerance() -> f64 {
    0.004
}

fn default_max_vertex_count() -> usize {
    1500
}

/// Full configuration for one acquisition run, loaded from a JSON file and
/// passed by value into the pipeline components. No component reads ambient
/// process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,

    /// Data collection identifier understood by the service, e.g. `sentinel-2-l1c`.
    pub data_collection: String,
    /// Free-text description attached to the batch request.
    #[serde(default)]
    pub description: String,

    /// GeoJSON file containing exactly one polygon in a geographic CRS.
    pub aoi_path: PathBuf,
    /// Prefix inside the bucket where the job writes per-tile outputs.
    pub tiles_path: String,
    /// Local directory receiving band mosaics and the stacked raster.
    pub output_dir: PathBuf,
    /// File name of the final stacked raster, created inside `output_dir`.
    pub stacked_file: String,

    /// Acquisition time interval `(start, end)`. Ordering is the caller's
    /// responsibility and is not validated here.
    pub time_interval: (NaiveDate, NaiveDate),
    /// Spectral bands to request, mosaic, and stack, in output band order.
    pub bands: Vec<String>,
    /// Additional single-band outputs requested from the service but not
    /// stacked (e.g. `dataMask`, `CLP`).
    #[serde(default)]
    pub auxiliary_outputs: Vec<String>,

    /// Maximum permitted cloud-cover fraction in [0, 1].
    pub max_cloud_cover: f64,
    pub mosaicking_order: MosaickingOrder,
    pub grid: TilingGridConfig,

    /// Optional evalscript file; when absent a per-band pass-through script
    /// is rendered from `bands` and `auxiliary_outputs`.
    #[serde(default)]
    pub evalscript_path: Option<PathBuf>,

    #[serde(default)]
    pub merge_rule: MergeRule,

    /// Poll interval while the job is still being analysed.
    #[serde(default = "default_analysis_poll_secs")]
    pub analysis_poll_secs: u64,
    /// Poll interval once per-tile progress is available.
    #[serde(default = "default_tile_poll_secs")]
    pub tile_poll_secs: u64,
    /// Optional upper bound on total monitoring time.
    #[serde(default)]
    pub max_wait_secs: Option<u64>,

    /// Simplification tolerance applied when the AOI exceeds the vertex cap.
    #[serde(default = "default_simplify_tolerance")]
    pub simplify_tolerance: f64,
    /// Vertex ceiling imposed by the service on submitted geometries.
    #[serde(default = "default_max_vertex_count")]
    pub max_vertex_count: usize,
}

impl AcquisitionConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Path of the final stacked raster.
    pub fn stacked_path(&self) -> PathBuf {
        self.output_dir.join(&self.stacked_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "service": {
                "base_url": "https://services.example.com/api/v1/batch",
                "token_url": "https://services.example.com/oauth/token",
                "client_id": "id",
                "client_secret": "secret"
            },
            "storage": {
                "bucket_name": "imagery",
                "aws_region": "eu-central-1",
                "aws_access_key_id": "key",
                "aws_secret_access_key": "secret"
            },
            "data_collection": "sentinel-2-l1c",
            "aoi_path": "aoi.geojson",
            "tiles_path": "imagery/test_Jan01_2019",
            "output_dir": "/tmp/out",
            "stacked_file": "stacked.tif",
            "time_interval": ["2019-01-02", "2019-01-16"],
            "bands": ["B02", "B03", "B04", "B08", "B11"],
            "auxiliary_outputs": ["dataMask", "CLP"],
            "max_cloud_cover": 0.99,
            "mosaicking_order": "leastRecent",
            "grid": { "id": 1, "resolution": 10.0, "buffer": [50, 50] }
        }"#
    }

    #[test]
    fn config_parses_with_defaults() {
        let cfg: AcquisitionConfig = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(cfg.bands.len(), 5);
        assert_eq!(cfg.analysis_poll_secs, 5);
        assert_eq!(cfg.tile_poll_secs, 120);
        assert_eq!(cfg.max_wait_secs, None);
        assert_eq!(cfg.max_vertex_count, 1500);
        assert_eq!(cfg.merge_rule, MergeRule::LastWins);
        assert_eq!(
            cfg.time_interval.0,
            NaiveDate::from_ymd_opt(2019, 1, 2).unwrap()
        );
        assert_eq!(cfg.stacked_path(), PathBuf::from("/tmp/out/stacked.tif"));
    }
}
