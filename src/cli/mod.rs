//! Command Line Interface (CLI) layer for S2MOSAIC.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for acquisition runs. It wires
//! user-provided options to the underlying library functionality exposed
//! via `s2mosaic::api`.
//!
//! If you are embedding S2MOSAIC into another application, prefer using
//! the high-level `s2mosaic::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
