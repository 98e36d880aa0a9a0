//! Remote batch job handling: the job handle, the job specification sent at
//! submission, and the polling monitor that tracks a job to a terminal state.
pub mod monitor;
pub mod spec;

pub use monitor::{JobMonitor, MonitorOptions, MonitorVerdict};
pub use spec::JobSpec;

use serde::{Deserialize, Serialize};

use crate::types::BatchJobStatus;

/// Handle to a submitted batch job.
///
/// The id is opaque. Status and tile count are a reflection of remote truth:
/// they are only ever updated by re-reading the job from the service, never
/// written locally. The tile count is unknown until the job leaves its
/// analysis phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub status: BatchJobStatus,
    #[serde(default, rename = "tileCount")]
    pub tile_count: Option<u64>,
}
