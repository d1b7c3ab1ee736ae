use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::services::outcome::determine_outcome;
use crate::types::{LearningItem, Outcome};

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;
const DEFAULT_DIFFICULTY: f64 = 5.0;
const DIFFICULTY_STEP: f64 = 0.5;
pub const DEFAULT_BASELINE_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    pub current_difficulty: f64,
    pub min_difficulty: f64,
    pub max_difficulty: f64,
}

impl DifficultyState {
    fn starting_at(difficulty: f64) -> Self {
        let start = if difficulty.is_finite() {
            difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
        } else {
            DEFAULT_DIFFICULTY
        };
        Self {
            current_difficulty: start,
            min_difficulty: MIN_DIFFICULTY,
            max_difficulty: MAX_DIFFICULTY,
        }
    }

    /// One half step up on a correct answer, one half step down otherwise.
    pub fn step(self, is_correct: bool) -> Self {
        let current_difficulty = if is_correct {
            (self.current_difficulty + DIFFICULTY_STEP).min(self.max_difficulty)
        } else {
            (self.current_difficulty - DIFFICULTY_STEP).max(self.min_difficulty)
        };
        Self {
            current_difficulty,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseData {
    pub is_correct: bool,
    pub latency_ms: i64,
    pub baseline_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyUpdate {
    pub updated_difficulty: f64,
    pub outcome: Outcome,
}

/// Per-item difficulty and latency baseline, kept for the lifetime of a session.
#[derive(Debug, Default)]
pub struct AdaptiveDifficultyEngine {
    states: HashMap<String, DifficultyState>,
    baseline_latencies: HashMap<String, f64>,
}

impl AdaptiveDifficultyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn difficulty_state(&mut self, item_id: &str, initial_difficulty: f64) -> DifficultyState {
        *self
            .states
            .entry(item_id.to_string())
            .or_insert_with(|| DifficultyState::starting_at(initial_difficulty))
    }

    pub fn baseline(&self, item_id: &str) -> Option<f64> {
        self.baseline_latencies.get(item_id).copied()
    }

    pub fn record_response(
        &mut self,
        item_id: &str,
        item: &LearningItem,
        response: ResponseData,
    ) -> DifficultyUpdate {
        let state = self
            .difficulty_state(item_id, item.difficulty)
            .step(response.is_correct);
        self.states.insert(item_id.to_string(), state);

        // With no stored or supplied baseline the answer is measured against
        // itself, which carries no speed penalty.
        let stored = self.baseline(item_id);
        let baseline = stored.or(response.baseline_latency_ms);

        if response.is_correct && stored.is_none() && response.latency_ms > 0 {
            self.baseline_latencies
                .insert(item_id.to_string(), response.latency_ms as f64);
        }

        let outcome = determine_outcome(response.is_correct, response.latency_ms, baseline);

        tracing::debug!(
            item_id,
            difficulty = state.current_difficulty,
            ?outcome,
            "recorded response"
        );

        DifficultyUpdate {
            updated_difficulty: state.current_difficulty,
            outcome,
        }
    }

    /// Exponential smoothing of the stored baseline.
    pub fn update_baseline(&mut self, item_id: &str, latency_ms: i64, alpha: f64) -> f64 {
        let alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            DEFAULT_BASELINE_ALPHA
        };
        let latest = latency_ms.max(0) as f64;
        let current = self.baseline(item_id).unwrap_or(latest);
        let updated = current * (1.0 - alpha) + latest * alpha;
        self.baseline_latencies.insert(item_id.to_string(), updated);
        updated
    }

    pub fn reset(&mut self) {
        self.states.clear();
        self.baseline_latencies.clear();
    }
}
