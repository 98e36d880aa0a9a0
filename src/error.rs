//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, geometry, remote-service, storage, and GDAL errors,
//! and provides semantic variants for configuration and raster-consistency
//! failures.
use thiserror::Error;

use crate::types::TileStatusCounts;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] crate::core::geometry::GeometryError),

    #[error("Batch service error: {0}")]
    Batch(#[from] crate::io::batch::BatchError),

    #[error("Object storage error: {0}")]
    Storage(#[from] crate::io::storage::StorageError),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::gdal::GdalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No assets found for band {band} under the job output prefix")]
    EmptyBand { band: String },

    #[error("Batch job failed for {failed} of {total} tiles ({counts})")]
    JobFailed {
        failed: u64,
        total: u64,
        counts: TileStatusCounts,
    },

    #[error("Batch job did not finish within {waited_secs} s ({finished} of {total} tiles done)")]
    JobTimedOut {
        waited_secs: u64,
        finished: u64,
        total: u64,
    },

    #[error("Monitoring was cancelled before the batch job finished")]
    JobCancelled,

    #[error("Raster consistency error: {0}")]
    RasterConsistency(String),
}

impl Error {
    pub fn consistency<S: Into<String>>(msg: S) -> Self {
        Error::RasterConsistency(msg.into())
    }
}
