use crate::stroke::AppendOutcome;
use serde::{Deserialize, Serialize};

/// Counters describing a drawing session, serializable for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTelemetry {
    pub frames: u64,
    pub strokes_started: u64,
    pub points_appended: u64,
    pub segments_emitted: u64,
    pub degenerate_points: u64,
    pub capped_points: u64,
    pub resets: u64,
    pub average_frame_ms: f32,
    pub max_frame_ms: f32,
    pub frames_over_budget: u64,
}

impl SessionTelemetry {
    /// Returns true when the frame exceeded `budget_ms`.
    pub fn record_frame(&mut self, frame_ms: f32, budget_ms: f32) -> bool {
        self.frames = self.frames.saturating_add(1);
        let delta = frame_ms - self.average_frame_ms;
        self.average_frame_ms += delta / self.frames as f32;
        self.max_frame_ms = self.max_frame_ms.max(frame_ms);

        let over_budget = frame_ms > budget_ms;
        if over_budget {
            self.frames_over_budget = self.frames_over_budget.saturating_add(1);
        }
        over_budget
    }

    pub fn record_append(&mut self, outcome: AppendOutcome) {
        match outcome {
            AppendOutcome::Started => self.points_appended += 1,
            AppendOutcome::Extended => {
                self.points_appended += 1;
                self.segments_emitted += 1;
            }
            AppendOutcome::Degenerate => {
                self.points_appended += 1;
                self.degenerate_points += 1;
            }
            AppendOutcome::Capped => self.capped_points += 1,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
