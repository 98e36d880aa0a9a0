//! High-level, ergonomic library API: prepare an AOI, submit and monitor a
//! batch job, then mosaic and stack its outputs. `run_acquisition` drives
//! the whole pipeline; the individual stage functions are public for
//! callers that need finer control (for example a custom retry policy on
//! the monitor verdict).
use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::core::assets::{BandAsset, group_band_assets};
use crate::core::geometry::{self, Aoi};
use crate::core::job::{JobHandle, JobMonitor, JobSpec, MonitorOptions, MonitorVerdict};
use crate::core::mosaic::{BandMosaic, mosaic_band};
use crate::core::params::AcquisitionConfig;
use crate::core::stack::{StackedRaster, stack};
use crate::error::Result;
use crate::io::batch::BatchService;
use crate::io::storage::ObjectStore;
use crate::types::{MergeRule, TileStatusCounts};

/// Summary of one completed acquisition run.
#[derive(Debug, Clone)]
pub struct AcquisitionReport {
    pub job_id: String,
    pub total_tiles: u64,
    pub tile_counts: TileStatusCounts,
    pub mosaics: Vec<BandMosaic>,
    pub stacked: StackedRaster,
}

/// Load the AOI and reduce its vertex count below the service ceiling.
/// A declared non-geographic CRS fails here, before anything is submitted.
pub fn prepare_aoi(config: &AcquisitionConfig) -> Result<Aoi> {
    let aoi = Aoi::from_geojson_file(&config.aoi_path)?;
    Ok(geometry::simplify(
        aoi,
        config.simplify_tolerance,
        config.max_vertex_count,
    ))
}

/// Create the batch job and request processing start. A single remote call
/// each; any rejection propagates immediately as fatal.
pub fn submit<S: BatchService + ?Sized>(
    service: &S,
    spec: &JobSpec,
    aoi: &Aoi,
) -> Result<JobHandle> {
    let handle = service.create(spec, aoi)?;
    info!("Created batch job {} ({})", handle.id, handle.status);
    service.start(&handle.id)?;
    info!("Requested processing start for job {}", handle.id);
    Ok(handle)
}

/// Block until the job is terminal, cancelled, or past the configured
/// deadline.
pub fn monitor<S: BatchService + ?Sized>(
    service: &S,
    handle: &JobHandle,
    options: MonitorOptions,
) -> Result<MonitorVerdict> {
    JobMonitor::new(service, options).wait(handle)
}

/// List the job's output prefix and group raster objects by band token.
pub fn locate_band_assets<O: ObjectStore + ?Sized>(
    store: &O,
    prefix: &str,
    bands: &[String],
) -> Result<BTreeMap<String, Vec<BandAsset>>> {
    let objects = store.list(prefix)?;
    info!(
        "Listed {} object(s) under {}",
        objects.len(),
        prefix
    );
    Ok(group_band_assets(&objects, bands))
}

/// Mosaic every requested band, in declared order, into `output_dir`.
/// A band with no assets is fatal.
pub fn mosaic_bands<O: ObjectStore + ?Sized>(
    store: &O,
    assets: &BTreeMap<String, Vec<BandAsset>>,
    bands: &[String],
    output_dir: &Path,
    rule: MergeRule,
) -> Result<Vec<BandMosaic>> {
    std::fs::create_dir_all(output_dir)?;

    let mut mosaics = Vec::with_capacity(bands.len());
    for band in bands {
        let sources: Vec<String> = assets
            .get(band)
            .map(|group| group.iter().map(|a| store.raster_path(&a.key)).collect())
            .unwrap_or_default();
        let output_path = output_dir.join(format!("mosaic_{band}.tif"));
        mosaics.push(mosaic_band(band, &sources, &output_path, rule)?);
    }
    Ok(mosaics)
}

/// Stack the band mosaics into the final multi-band raster.
pub fn stack_mosaics(mosaics: &[BandMosaic], output_path: &Path) -> Result<StackedRaster> {
    stack(mosaics, output_path)
}

/// Run the full pipeline: AOI preparation, submission, monitoring, asset
/// location, per-band mosaicking, and stacking. Strict stage order; every
/// failure halts the run at the stage where it was detected.
pub fn run_acquisition<S, O>(
    config: &AcquisitionConfig,
    service: &S,
    store: &O,
) -> Result<AcquisitionReport>
where
    S: BatchService + ?Sized,
    O: ObjectStore + ?Sized,
{
    let aoi = prepare_aoi(config)?;
    let spec = JobSpec::from_config(config)?;
    let handle = submit(service, &spec, &aoi)?;

    let options = MonitorOptions {
        analysis_poll: std::time::Duration::from_secs(config.analysis_poll_secs),
        tile_poll: std::time::Duration::from_secs(config.tile_poll_secs),
        max_wait: config.max_wait_secs.map(std::time::Duration::from_secs),
        cancel: None,
    };
    let tile_counts = monitor(service, &handle, options)?.into_result()?;
    let total_tiles = tile_counts.total();
    info!(
        "Batch job {} finished: all {} tiles processed",
        handle.id, total_tiles
    );

    let assets = locate_band_assets(store, &config.tiles_path, &config.bands)?;
    let mosaics = mosaic_bands(
        store,
        &assets,
        &config.bands,
        &config.output_dir,
        config.merge_rule,
    )?;
    let stacked = stack_mosaics(&mosaics, &config.stacked_path())?;

    Ok(AcquisitionReport {
        job_id: handle.id,
        total_tiles,
        tile_counts,
        mosaics,
        stacked,
    })
}
