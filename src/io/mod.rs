//! I/O layer: the remote batch service client, the object-storage boundary,
//! GDAL-backed raster reading, and GeoTIFF writers.
pub mod batch;
pub use batch::{BatchError, BatchService, HttpBatchService};

pub mod storage;
pub use storage::{LocalObjectStore, ObjectStore, StorageError, StoredObject, VsiObjectStore};

pub mod gdal;
pub use gdal::{GdalError, GdalRasterReader, RasterMetadata};

pub mod writers;
