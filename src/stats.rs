// =============================================================================
// Pipeline Stats — shared run counters and stage lifecycle tracking
// =============================================================================
//
// One instance per pipeline run, shared across all stage tasks via
// `Arc<PipelineStats>`.
//
// Thread safety:
//   - Atomic counters with Relaxed ordering for the per-item tallies.
//   - parking_lot::RwLock per stage for the lifecycle state.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::types::{Stage, StageState};

/// Counters and stage states for one pipeline run.
pub struct PipelineStats {
    points_fetched: AtomicU64,
    fetch_errors: AtomicU64,
    points_transformed: AtomicU64,
    malformed_dropped: AtomicU64,
    points_delivered: AtomicU64,

    acquisition_state: RwLock<StageState>,
    transform_state: RwLock<StageState>,
    storage_state: RwLock<StageState>,
}

/// Point-in-time copy of the counters, for the end-of-run summary and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub points_fetched: u64,
    pub fetch_errors: u64,
    pub points_transformed: u64,
    pub malformed_dropped: u64,
    pub points_delivered: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            points_fetched: AtomicU64::new(0),
            fetch_errors: AtomicU64::new(0),
            points_transformed: AtomicU64::new(0),
            malformed_dropped: AtomicU64::new(0),
            points_delivered: AtomicU64::new(0),
            acquisition_state: RwLock::new(StageState::Init),
            transform_state: RwLock::new(StageState::Init),
            storage_state: RwLock::new(StageState::Init),
        }
    }

    // -------------------------------------------------------------------------
    // Stage lifecycle
    // -------------------------------------------------------------------------

    /// Move `stage` to `next`, logging the transition.
    ///
    /// Transitions are one-directional; an attempt to move backwards (or to
    /// the current state) is ignored with a warning.
    pub fn transition(&self, stage: Stage, next: StageState) {
        let slot = self.state_slot(stage);
        let mut current = slot.write();

        if next <= *current {
            warn!(
                stage = %stage,
                from = %*current,
                to = %next,
                "ignoring non-forward stage transition"
            );
            return;
        }

        info!(stage = %stage, from = %*current, to = %next, "stage transition");
        *current = next;
    }

    /// Current lifecycle state of `stage`.
    pub fn stage_state(&self, stage: Stage) -> StageState {
        *self.state_slot(stage).read()
    }

    fn state_slot(&self, stage: Stage) -> &RwLock<StageState> {
        match stage {
            Stage::Acquisition => &self.acquisition_state,
            Stage::Transform => &self.transform_state,
            Stage::Storage => &self.storage_state,
        }
    }

    // -------------------------------------------------------------------------
    // Counters
    // -------------------------------------------------------------------------

    pub fn record_fetched(&self) {
        self.points_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transformed(&self) {
        self.points_transformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.points_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            points_fetched: self.points_fetched.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            points_transformed: self.points_transformed.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            points_delivered: self.points_delivered.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_start_at_init_and_zero() {
        let stats = PipelineStats::new();
        assert_eq!(stats.stage_state(Stage::Acquisition), StageState::Init);
        assert_eq!(stats.stage_state(Stage::Transform), StageState::Init);
        assert_eq!(stats.stage_state(Stage::Storage), StageState::Init);
        assert_eq!(stats.snapshot().points_fetched, 0);
    }

    #[test]
    fn counters_accumulate() {
        let stats = PipelineStats::new();
        stats.record_fetched();
        stats.record_fetched();
        stats.record_fetch_error();
        stats.record_transformed();
        stats.record_malformed();
        stats.record_delivered();

        let snap = stats.snapshot();
        assert_eq!(snap.points_fetched, 2);
        assert_eq!(snap.fetch_errors, 1);
        assert_eq!(snap.points_transformed, 1);
        assert_eq!(snap.malformed_dropped, 1);
        assert_eq!(snap.points_delivered, 1);
    }

    #[test]
    fn transitions_move_forward() {
        let stats = PipelineStats::new();
        stats.transition(Stage::Transform, StageState::Running);
        stats.transition(Stage::Transform, StageState::Draining);
        stats.transition(Stage::Transform, StageState::Terminated);
        assert_eq!(stats.stage_state(Stage::Transform), StageState::Terminated);
    }

    #[test]
    fn backwards_transition_is_ignored() {
        let stats = PipelineStats::new();
        stats.transition(Stage::Storage, StageState::Running);
        stats.transition(Stage::Storage, StageState::Init);
        assert_eq!(stats.stage_state(Stage::Storage), StageState::Running);
    }

    #[test]
    fn stages_may_skip_draining() {
        let stats = PipelineStats::new();
        stats.transition(Stage::Acquisition, StageState::Running);
        stats.transition(Stage::Acquisition, StageState::Terminated);
        assert_eq!(
            stats.stage_state(Stage::Acquisition),
            StageState::Terminated
        );
    }

    #[test]
    fn stage_states_are_independent() {
        let stats = PipelineStats::new();
        stats.transition(Stage::Acquisition, StageState::Running);
        assert_eq!(stats.stage_state(Stage::Transform), StageState::Init);
        assert_eq!(stats.stage_state(Stage::Storage), StageState::Init);
    }
}
