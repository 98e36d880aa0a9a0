#![doc = r#"
S2MOSAIC — batch satellite-imagery acquisition and mosaicking.

This crate submits an asynchronous batch-processing job for an area of
interest (AOI), monitors the job to completion while tolerating partial tile
failures only as an explicit, reported outcome, then merges the resulting
per-tile, per-band GeoTIFFs into per-band mosaics and stacks them into a
single multi-band raster. It powers the `s2mosaic` CLI and can be embedded
in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.

Add dependency
--------------
```toml
[dependencies]
s2mosaic = "0.1"
```

Quick start: run the full pipeline
----------------------------------
```rust,no_run
use s2mosaic::{AcquisitionConfig, HttpBatchService, VsiObjectStore};
use s2mosaic::api::run_acquisition;

fn main() -> s2mosaic::Result<()> {
    let config = AcquisitionConfig::from_json_file("acquisition.json")?;
    let service = HttpBatchService::new(&config.service)?;
    let store = VsiObjectStore::for_s3(&config.storage)?;

    let report = run_acquisition(&config, &service, &store)?;
    println!(
        "job {} finished: {} tiles, {} bands stacked into {}",
        report.job_id,
        report.total_tiles,
        report.stacked.bands,
        report.stacked.path.display()
    );
    Ok(())
}
```

Stage-by-stage control
----------------------
Each pipeline stage is public for callers that need their own policy, for
example to retry on a partial failure instead of aborting:

```rust,no_run
use s2mosaic::api::{monitor, prepare_aoi, submit};
use s2mosaic::{AcquisitionConfig, HttpBatchService, JobSpec, MonitorOptions, MonitorVerdict};

fn main() -> s2mosaic::Result<()> {
    let config = AcquisitionConfig::from_json_file("acquisition.json")?;
    let service = HttpBatchService::new(&config.service)?;

    let aoi = prepare_aoi(&config)?;
    let spec = JobSpec::from_config(&config)?;
    let handle = submit(&service, &spec, &aoi)?;

    match monitor(&service, &handle, MonitorOptions::default())? {
        MonitorVerdict::AllProcessed { total, .. } => println!("{total} tiles processed"),
        MonitorVerdict::PartialFailure { failed, total, counts } => {
            eprintln!("{failed} of {total} tiles failed ({counts})");
        }
        other => eprintln!("job did not finish: {other:?}"),
    }
    Ok(())
}
```

Error handling
--------------
All public functions return `s2mosaic::Result<T>`; match on `s2mosaic::Error`
to handle specific cases, e.g. remote-service or raster-consistency errors.

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`types`] — enums and core types (e.g. `BatchJobStatus`, `MosaickingOrder`).
- [`core`] — AOI preparation, job spec/monitor, mosaicking, stacking.
- [`io`] — batch service client, object storage, GDAL readers/writers.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::params::{
    AcquisitionConfig, ServiceConfig, StorageConfig, TilingGridConfig,
};
pub use error::{Error, Result};
pub use types::{BatchJobStatus, MergeRule, MosaickingOrder, TileState, TileStatusCounts};

// Pipeline building blocks
pub use crate::core::assets::{BandAsset, group_band_assets};
pub use crate::core::geometry::{Aoi, GeometryError};
pub use crate::core::job::{
    JobHandle, JobMonitor, JobSpec, MonitorOptions, MonitorVerdict,
};
pub use crate::core::mosaic::BandMosaic;
pub use crate::core::stack::StackedRaster;

// I/O boundary
pub use io::batch::{BatchError, BatchService, HttpBatchService};
pub use io::gdal::{GdalError, GdalRasterReader, RasterMetadata};
pub use io::storage::{LocalObjectStore, ObjectStore, StorageError, StoredObject, VsiObjectStore};

// High-level API re-exports
pub use api::{
    AcquisitionReport, locate_band_assets, monitor, mosaic_bands, prepare_aoi, run_acquisition,
    stack_mosaics, submit,
};
