use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::services::adaptive_difficulty::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::types::DifficultyRange;

const ERROR_THRESHOLD: u32 = 3;
const DELAY_THRESHOLD: u32 = 3;
const RESTORE_AFTER_SECS: i64 = 5;
const REDUCED_BAND_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveLoadState {
    pub consecutive_errors: u32,
    pub consecutive_delays: u32,
    pub difficulty_reduced: bool,
    pub animation_reduced: bool,
}

/// Detects streaks of wrong or slow answers and asks the session to ease off.
#[derive(Debug, Default)]
pub struct CognitiveLoadManager {
    state: CognitiveLoadState,
    restore_at: Option<DateTime<Utc>>,
}

impl CognitiveLoadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self) {
        self.state.consecutive_errors += 1;
        self.state.consecutive_delays = 0;
        self.restore_at = None;
        if self.state.consecutive_errors >= ERROR_THRESHOLD {
            self.trigger_reduction();
        }
    }

    pub fn record_delay(&mut self) {
        self.state.consecutive_delays += 1;
        self.state.consecutive_errors = 0;
        self.restore_at = None;
        if self.state.consecutive_delays >= DELAY_THRESHOLD {
            self.trigger_reduction();
        }
    }

    pub fn record_correct(&mut self, now: DateTime<Utc>) {
        self.state.consecutive_errors = 0;
        self.state.consecutive_delays = 0;
        if self.is_reduced() && self.restore_at.is_none() {
            self.restore_at = Some(now + Duration::seconds(RESTORE_AFTER_SECS));
        }
    }

    /// Lifts the reduction once the restore deadline passed without a new streak.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let Some(deadline) = self.restore_at else {
            return;
        };
        if now >= deadline
            && self.state.consecutive_errors == 0
            && self.state.consecutive_delays == 0
        {
            self.state.difficulty_reduced = false;
            self.state.animation_reduced = false;
            self.restore_at = None;
            tracing::debug!("cognitive load reduction lifted");
        }
    }

    pub fn state(&self) -> CognitiveLoadState {
        self.state
    }

    pub fn should_reduce_difficulty(&self) -> bool {
        self.state.difficulty_reduced
    }

    pub fn should_reduce_animation(&self) -> bool {
        self.state.animation_reduced
    }

    /// Band to draw from next; below the current level while reduced.
    pub fn suggested_difficulty_range(&self, current: f64) -> DifficultyRange {
        let current = if current.is_finite() {
            current.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
        } else {
            (MIN_DIFFICULTY + MAX_DIFFICULTY) / 2.0
        };
        if self.should_reduce_difficulty() {
            DifficultyRange::new((current - REDUCED_BAND_WIDTH).max(MIN_DIFFICULTY), current)
        } else {
            DifficultyRange::new(
                (current - 1.0).max(MIN_DIFFICULTY),
                (current + 1.0).min(MAX_DIFFICULTY),
            )
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_reduced(&self) -> bool {
        self.state.difficulty_reduced || self.state.animation_reduced
    }

    fn trigger_reduction(&mut self) {
        if !self.is_reduced() {
            tracing::debug!(
                errors = self.state.consecutive_errors,
                delays = self.state.consecutive_delays,
                "cognitive load reduction triggered"
            );
        }
        self.state.difficulty_reduced = true;
        self.state.animation_reduced = true;
    }
}
