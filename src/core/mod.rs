//! Core pipeline building blocks: configuration, AOI preparation, the batch
//! job specification and monitor, asset classification, mosaicking, and
//! stacking. These are the primitives consumed by the high-level `api`
//! module.
pub mod assets;
pub mod geometry;
pub mod job;
pub mod mosaic;
pub mod params;
pub mod stack;
