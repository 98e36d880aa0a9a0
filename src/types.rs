//! Shared types and enums used across S2MOSAIC.
//! Includes the remote job and tile status enums (`BatchJobStatus`,
//! `TileState`), tile status counting, `MosaickingOrder`, and the overlap
//! `MergeRule` used by the mosaicker.
use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Status of a remote batch job as reported by the processing service.
///
/// The service moves a job through `Created -> Analysing -> AnalysisDone ->
/// Processing` before a terminal state. Processing progress itself is
/// tracked per tile, not through this enum.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchJobStatus {
    Created,
    Analysing,
    AnalysisDone,
    Processing,
    Done,
    Failed,
    PartiallySucceeded,
    Canceled,
}

impl BatchJobStatus {
    /// True while the job has not yet exposed a tile count.
    pub fn is_analysing(&self) -> bool {
        matches!(self, BatchJobStatus::Created | BatchJobStatus::Analysing)
    }
}

impl std::fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchJobStatus::Created => "CREATED",
            BatchJobStatus::Analysing => "ANALYSING",
            BatchJobStatus::AnalysisDone => "ANALYSIS_DONE",
            BatchJobStatus::Processing => "PROCESSING",
            BatchJobStatus::Done => "DONE",
            BatchJobStatus::Failed => "FAILED",
            BatchJobStatus::PartiallySucceeded => "PARTIALLY_SUCCEEDED",
            BatchJobStatus::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

/// Per-tile processing state. Jobs are monitored as a multiset of these,
/// not as individual tile identities.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileState {
    Queued,
    Processing,
    Processed,
    Failed,
    /// Any state the service reports that this client does not know about.
    #[serde(other)]
    Other,
}

impl std::fmt::Display for TileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TileState::Queued => "QUEUED",
            TileState::Processing => "PROCESSING",
            TileState::Processed => "PROCESSED",
            TileState::Failed => "FAILED",
            TileState::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

/// Counts of tiles per state for one job, from a single status poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileStatusCounts(pub BTreeMap<TileState, u64>);

impl TileStatusCounts {
    pub fn count(&self, state: TileState) -> u64 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    /// Tiles in a terminal state, successful or not.
    pub fn finished(&self) -> u64 {
        self.count(TileState::Processed) + self.count(TileState::Failed)
    }

    /// All tiles the service reported, regardless of state.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn record(&mut self, state: TileState) {
        *self.0.entry(state).or_insert(0) += 1;
    }
}

impl std::fmt::Display for TileStatusCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (state, count) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", state, count)?;
            first = false;
        }
        Ok(())
    }
}

/// Tie-break rule for selecting which acquisition contributes a pixel when
/// multiple scenes overlap in time.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum MosaickingOrder {
    #[serde(rename = "leastRecent")]
    LeastRecent,
    #[serde(rename = "mostRecent")]
    MostRecent,
    #[serde(rename = "leastCC")]
    LeastCloudCover,
}

impl MosaickingOrder {
    /// Name used on the service wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MosaickingOrder::LeastRecent => "leastRecent",
            MosaickingOrder::MostRecent => "mostRecent",
            MosaickingOrder::LeastCloudCover => "leastCC",
        }
    }
}

impl std::fmt::Display for MosaickingOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overlap resolution when pasting tiles into a band mosaic. No blending is
/// performed either way.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Later assets (lexicographic key order) overwrite earlier ones.
    LastWins,
    /// Earlier assets keep their pixels; later overlaps are ignored.
    FirstWins,
}

impl Default for MergeRule {
    fn default() -> Self {
        MergeRule::LastWins
    }
}

impl std::fmt::Display for MergeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MergeRule::LastWins => "last_wins",
            MergeRule::FirstWins => "first_wins",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_counts_finished_and_total() {
        let mut counts = TileStatusCounts::default();
        for _ in 0..98 {
            counts.record(TileState::Processed);
        }
        counts.record(TileState::Failed);
        counts.record(TileState::Failed);
        counts.record(TileState::Processing);

        assert_eq!(counts.finished(), 100);
        assert_eq!(counts.total(), 101);
        assert_eq!(counts.count(TileState::Failed), 2);
    }

    #[test]
    fn tile_state_parses_wire_names() {
        let state: TileState = serde_json::from_str("\"PROCESSED\"").unwrap();
        assert_eq!(state, TileState::Processed);
        let state: TileState = serde_json::from_str("\"RESCHEDULED\"").unwrap();
        assert_eq!(state, TileState::Other);
    }

    #[test]
    fn mosaicking_order_wire_names() {
        assert_eq!(
            serde_json::to_string(&MosaickingOrder::LeastRecent).unwrap(),
            "\"leastRecent\""
        );
        assert_eq!(
            serde_json::to_string(&MosaickingOrder::LeastCloudCover).unwrap(),
            "\"leastCC\""
        );
    }
}
