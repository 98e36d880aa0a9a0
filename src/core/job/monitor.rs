//! Polling state machine that tracks a submitted batch job to a terminal
//! state.
//!
//! The job passes through an analysis phase of unknown duration (no tile
//! count yet), polled at a short interval, then a tracked phase where
//! per-tile status counts are re-queried at a longer interval. Progress is
//! reported as the delta of finished tiles between polls. The monitor never
//! writes job state; it only reads what the service reports.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::core::job::JobHandle;
use crate::error::{Error, Result};
use crate::io::batch::BatchService;
use crate::types::{TileState, TileStatusCounts};

/// Knobs for one monitoring run.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Poll interval while the job is in its analysis phase.
    pub analysis_poll: Duration,
    /// Poll interval once per-tile progress is available.
    pub tile_poll: Duration,
    /// Optional bound on total monitoring time. `None` polls indefinitely.
    pub max_wait: Option<Duration>,
    /// Cooperative cancellation token, checked between sleeps.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            analysis_poll: Duration::from_secs(5),
            tile_poll: Duration::from_secs(120),
            max_wait: None,
            cancel: None,
        }
    }
}

/// Terminal outcome of a monitoring run.
///
/// Partial failure is a value, not an error: callers that want a retry
/// policy can act on the breakdown. [`MonitorVerdict::into_result`] applies
/// the default policy where anything but full success is fatal for the run.
#[derive(Debug, Clone)]
pub enum MonitorVerdict {
    /// Every tile reached `Processed`.
    AllProcessed {
        total: u64,
        counts: TileStatusCounts,
    },
    /// All tiles are terminal but some failed.
    PartialFailure {
        failed: u64,
        total: u64,
        counts: TileStatusCounts,
    },
    /// The `max_wait` deadline passed before the job finished.
    TimedOut {
        waited: Duration,
        finished: u64,
        total: u64,
    },
    /// The cancellation token was set.
    Cancelled,
}

impl MonitorVerdict {
    /// Default policy: only a fully processed job lets the pipeline proceed.
    pub fn into_result(self) -> Result<TileStatusCounts> {
        match self {
            MonitorVerdict::AllProcessed { counts, .. } => Ok(counts),
            MonitorVerdict::PartialFailure {
                failed,
                total,
                counts,
            } => Err(Error::JobFailed {
                failed,
                total,
                counts,
            }),
            MonitorVerdict::TimedOut {
                waited,
                finished,
                total,
            } => Err(Error::JobTimedOut {
                waited_secs: waited.as_secs(),
                finished,
                total,
            }),
            MonitorVerdict::Cancelled => Err(Error::JobCancelled),
        }
    }
}

/// Tracks one batch job through its state machine by polling the service.
pub struct JobMonitor<'a, S: BatchService + ?Sized> {
    service: &'a S,
    options: MonitorOptions,
}

impl<'a, S: BatchService + ?Sized> JobMonitor<'a, S> {
    pub fn new(service: &'a S, options: MonitorOptions) -> Self {
        JobMonitor { service, options }
    }

    /// Block until the job is terminal, cancelled, or past the deadline.
    pub fn wait(&self, handle: &JobHandle) -> Result<MonitorVerdict> {
        let started = Instant::now();

        // Analysis phase: unknown duration, unknown tile count.
        let mut handle = self.service.get_status(&handle.id)?;
        while handle.status.is_analysing() {
            if self.cancelled() {
                return Ok(MonitorVerdict::Cancelled);
            }
            if let Some(verdict) = self.deadline_verdict(started, 0, handle.tile_count.unwrap_or(0))
            {
                return Ok(verdict);
            }
            self.sleep(self.options.analysis_poll);
            handle = self.service.get_status(&handle.id)?;
        }

        let total = handle.tile_count.unwrap_or(0);
        info!(
            "Batch job {} entered {} with {} tiles",
            handle.id, handle.status, total
        );

        // Tracked phase: re-query per-tile status counts each cycle and
        // report the finished delta (never negative, even if the service
        // momentarily reports fewer terminal tiles than before).
        let mut finished = 0u64;
        loop {
            if self.cancelled() {
                return Ok(MonitorVerdict::Cancelled);
            }

            let counts = self.service.tile_status_counts(&handle.id)?;
            let new_finished = counts.finished();
            let delta = new_finished.saturating_sub(finished);
            finished = finished.max(new_finished);

            let all = counts.total();
            info!(
                "Batch job {}: {}/{} tiles finished (+{})",
                handle.id, finished, all, delta
            );

            if finished == all {
                let processed = counts.count(TileState::Processed);
                if processed < all {
                    warn!("Some tiles failed: {}", counts);
                    return Ok(MonitorVerdict::PartialFailure {
                        failed: all - processed,
                        total: all,
                        counts,
                    });
                }
                return Ok(MonitorVerdict::AllProcessed { total: all, counts });
            }

            if let Some(verdict) = self.deadline_verdict(started, finished, all.max(total)) {
                return Ok(verdict);
            }
            self.sleep(self.options.tile_poll);
        }
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .map(|token| token.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn deadline_verdict(
        &self,
        started: Instant,
        finished: u64,
        total: u64,
    ) -> Option<MonitorVerdict> {
        let max_wait = self.options.max_wait?;
        let waited = started.elapsed();
        (waited >= max_wait).then(|| MonitorVerdict::TimedOut {
            waited,
            finished,
            total,
        })
    }

    /// Sleep in short slices so a cancellation token set mid-interval is
    /// honored without waiting out the full poll period.
    fn sleep(&self, duration: Duration) {
        let slice = Duration::from_millis(250);
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.cancelled() {
                return;
            }
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::core::geometry::Aoi;
    use crate::core::job::JobSpec;
    use crate::io::batch::BatchError;
    use crate::types::BatchJobStatus;

    /// Service double replaying scripted status and tile-count sequences.
    struct ScriptedService {
        statuses: RefCell<VecDeque<(BatchJobStatus, Option<u64>)>>,
        tile_polls: RefCell<VecDeque<Vec<(TileState, u64)>>>,
    }

    impl ScriptedService {
        fn new(
            statuses: Vec<(BatchJobStatus, Option<u64>)>,
            tile_polls: Vec<Vec<(TileState, u64)>>,
        ) -> Self {
            ScriptedService {
                statuses: RefCell::new(statuses.into()),
                tile_polls: RefCell::new(tile_polls.into()),
            }
        }
    }

    impl BatchService for ScriptedService {
        fn create(&self, _spec: &JobSpec, _aoi: &Aoi) -> std::result::Result<JobHandle, BatchError> {
            unimplemented!("not used by monitor tests")
        }

        fn start(&self, _job_id: &str) -> std::result::Result<(), BatchError> {
            unimplemented!("not used by monitor tests")
        }

        fn get_status(&self, job_id: &str) -> std::result::Result<JobHandle, BatchError> {
            let mut statuses = self.statuses.borrow_mut();
            let (status, tile_count) = statuses
                .pop_front()
                .unwrap_or((BatchJobStatus::Processing, Some(0)));
            Ok(JobHandle {
                id: job_id.to_string(),
                status,
                tile_count,
            })
        }

        fn tile_status_counts(
            &self,
            _job_id: &str,
        ) -> std::result::Result<TileStatusCounts, BatchError> {
            let mut polls = self.tile_polls.borrow_mut();
            let states = polls.pop_front().expect("tile poll past end of script");
            let mut counts = TileStatusCounts::default();
            for (state, n) in states {
                counts.0.insert(state, n);
            }
            Ok(counts)
        }
    }

    fn fast_options() -> MonitorOptions {
        MonitorOptions {
            analysis_poll: Duration::from_millis(1),
            tile_poll: Duration::from_millis(1),
            max_wait: None,
            cancel: None,
        }
    }

    fn handle() -> JobHandle {
        JobHandle {
            id: "job-1".to_string(),
            status: BatchJobStatus::Created,
            tile_count: None,
        }
    }

    #[test]
    fn all_processed_is_success() {
        let service = ScriptedService::new(
            vec![
                (BatchJobStatus::Created, None),
                (BatchJobStatus::Analysing, None),
                (BatchJobStatus::Processing, Some(100)),
            ],
            vec![
                vec![(TileState::Processed, 40), (TileState::Processing, 60)],
                vec![(TileState::Processed, 100)],
            ],
        );
        let monitor = JobMonitor::new(&service, fast_options());
        match monitor.wait(&handle()).unwrap() {
            MonitorVerdict::AllProcessed { total, counts } => {
                assert_eq!(total, 100);
                assert_eq!(counts.count(TileState::Processed), 100);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn failed_tiles_surface_as_partial_failure() {
        let service = ScriptedService::new(
            vec![(BatchJobStatus::Processing, Some(100))],
            vec![vec![(TileState::Processed, 98), (TileState::Failed, 2)]],
        );
        let monitor = JobMonitor::new(&service, fast_options());
        match monitor.wait(&handle()).unwrap() {
            MonitorVerdict::PartialFailure {
                failed,
                total,
                counts,
            } => {
                assert_eq!(failed, 2);
                assert_eq!(total, 100);
                assert_eq!(counts.count(TileState::Failed), 2);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    #[test]
    fn partial_failure_maps_to_fatal_error() {
        let verdict = MonitorVerdict::PartialFailure {
            failed: 2,
            total: 100,
            counts: TileStatusCounts::default(),
        };
        let err = verdict.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 of 100 tiles"), "unexpected message: {msg}");
    }

    #[test]
    fn finished_count_never_regresses() {
        // The second poll reports fewer terminal tiles; the retained count
        // must not go down and the run must still converge.
        let service = ScriptedService::new(
            vec![(BatchJobStatus::Processing, Some(10))],
            vec![
                vec![(TileState::Processed, 6), (TileState::Processing, 4)],
                vec![(TileState::Processed, 4), (TileState::Processing, 6)],
                vec![(TileState::Processed, 10)],
            ],
        );
        let monitor = JobMonitor::new(&service, fast_options());
        match monitor.wait(&handle()).unwrap() {
            MonitorVerdict::AllProcessed { total, .. } => assert_eq!(total, 10),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn deadline_yields_timed_out() {
        let service = ScriptedService::new(
            vec![(BatchJobStatus::Processing, Some(10))],
            vec![
                vec![(TileState::Processed, 5), (TileState::Processing, 5)];
                64
            ],
        );
        let mut options = fast_options();
        options.max_wait = Some(Duration::from_millis(5));
        let monitor = JobMonitor::new(&service, options);
        match monitor.wait(&handle()).unwrap() {
            MonitorVerdict::TimedOut {
                finished, total, ..
            } => {
                assert_eq!(finished, 5);
                assert_eq!(total, 10);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn cancellation_token_stops_monitoring() {
        let service = ScriptedService::new(
            vec![(BatchJobStatus::Created, None); 64],
            vec![],
        );
        let token = Arc::new(AtomicBool::new(false));
        let mut options = fast_options();
        options.cancel = Some(token.clone());
        token.store(true, Ordering::Relaxed);

        let monitor = JobMonitor::new(&service, options);
        match monitor.wait(&handle()).unwrap() {
            MonitorVerdict::Cancelled => {}
            other => panic!("expected cancellation, got {:?}", other),
        }
    }
}
