use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum QualityState {
    #[default]
    AllHigh,
    PartialLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameObservation {
    pub timestamp_ms: u64,
    pub pts: u64,
    pub all_required_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTransition {
    DroppedToLow,
    RecoveredToHigh { switch_time_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityDecision {
    pub pts: u64,
    pub state: QualityState,
    pub transition: Option<QualityTransition>,
}

/// Tracks whether every tile the viewport needs is available in the main
/// quality, and how long it takes to get back there after a drop.
#[derive(Debug, Clone, Default)]
pub struct QualityMonitor {
    state: QualityState,
    low_since_ms: Option<u64>,
    total_changed_ms: u64,
    changed_count: u64,
    transitions: u64,
}

impl QualityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> QualityState {
        self.state
    }

    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Number of completed low-to-high recoveries.
    pub fn changed_count(&self) -> u64 {
        self.changed_count
    }

    /// Mean recovery time over completed recoveries, zero before the first.
    pub fn avg_changed_time_ms(&self) -> f64 {
        if self.changed_count == 0 {
            return 0.0;
        }
        self.total_changed_ms as f64 / self.changed_count as f64
    }

    pub fn observe_frame(&mut self, input: FrameObservation) -> QualityDecision {
        let transition = match (self.state, input.all_required_present) {
            (QualityState::AllHigh, false) => {
                self.state = QualityState::PartialLow;
                self.low_since_ms = Some(input.timestamp_ms);
                info!(pts = input.pts, "quality dropped to partial low");
                Some(QualityTransition::DroppedToLow)
            }
            (QualityState::PartialLow, true) => {
                self.state = QualityState::AllHigh;
                let start = self.low_since_ms.take().unwrap_or(input.timestamp_ms);
                let switch_time_ms = input.timestamp_ms.saturating_sub(start);
                self.total_changed_ms += switch_time_ms;
                self.changed_count += 1;
                info!(
                    pts = input.pts,
                    switch_time_ms,
                    avg_changed_time_ms = self.avg_changed_time_ms(),
                    "quality recovered to all high"
                );
                Some(QualityTransition::RecoveredToHigh { switch_time_ms })
            }
            _ => None,
        };
        if transition.is_some() {
            self.transitions += 1;
        }
        QualityDecision {
            pts: input.pts,
            state: self.state,
            transition,
        }
    }
}
