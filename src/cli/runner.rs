use tracing::info;

use s2mosaic::api::run_acquisition;
use s2mosaic::core::params::AcquisitionConfig;
use s2mosaic::io::batch::HttpBatchService;
use s2mosaic::io::storage::VsiObjectStore;

use super::args::CliArgs;
use super::errors::AppError;

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let mut config =
        AcquisitionConfig::from_json_file(&args.config).map_err(|e| AppError::Config {
            path: args.config.display().to_string(),
            source: e,
        })?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(stacked_file) = args.stacked_file {
        config.stacked_file = stacked_file;
    }
    if let Some(max_wait_secs) = args.max_wait_secs {
        config.max_wait_secs = Some(max_wait_secs);
    }

    info!(
        "Acquiring {} band(s) over {} into {}",
        config.bands.len(),
        config.aoi_path.display(),
        config.output_dir.display()
    );

    let service = HttpBatchService::new(&config.service).map_err(s2mosaic::Error::from)?;
    let store = VsiObjectStore::for_s3(&config.storage).map_err(s2mosaic::Error::from)?;

    let report = run_acquisition(&config, &service, &store).map_err(AppError::from)?;

    info!(
        "Job {} complete: {} tiles, {} band mosaic(s), stacked raster at {}",
        report.job_id,
        report.total_tiles,
        report.mosaics.len(),
        report.stacked.path.display()
    );

    Ok(())
}
