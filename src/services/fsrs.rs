use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Outcome;

const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const MASTERED_STABILITY_DAYS: f64 = 21.0;
const MASTERED_MAX_LAPSES: i32 = 2;
/// Upper bound for the relearn step after a lapse.
pub const MAX_RELEARN_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FSRSParams {
    pub w: [f64; 17],
}

impl Default for FSRSParams {
    fn default() -> Self {
        Self {
            w: [
                0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability
                4.93, 0.94, 0.86, 0.01, 1.49, // w4-w8
                0.14, 0.94, 2.18, 0.05, 0.34, // w9-w13
                1.26, 0.29, 2.61, // w14-w16
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl From<Outcome> for Rating {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Again => Self::Again,
            Outcome::Hard => Self::Hard,
            Outcome::Good => Self::Good,
            Outcome::Easy => Self::Easy,
        }
    }
}

/// Scheduler-internal memory state persisted inside a review record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    pub stability: f64,
    pub difficulty: f64,
    pub elapsed_days: f64,
    pub scheduled_days: f64,
    pub reps: i32,
    pub lapses: i32,
    pub due: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
}

impl MemoryState {
    pub fn is_new(&self) -> bool {
        self.reps == 0
    }

    /// Long-term mastery; tolerates up to two lapses.
    pub fn is_mastered(&self) -> bool {
        self.stability >= MASTERED_STABILITY_DAYS && self.lapses <= MASTERED_MAX_LAPSES
    }

    pub fn retrievability_at(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = self
            .last_review
            .map(|last| days_between(last, now))
            .unwrap_or(0.0);
        fsrs_retrievability(self.stability, elapsed)
    }
}

/// Pluggable memory model: given the prior state and a rating, produce the next state.
pub trait MemoryModel: Send + Sync {
    fn schedule(&self, prior: Option<&MemoryState>, rating: Rating, now: DateTime<Utc>)
        -> MemoryState;
}

#[derive(Debug, Clone)]
pub struct FsrsModel {
    params: FSRSParams,
    desired_retention: f64,
    relearn_minutes: i64,
}

impl Default for FsrsModel {
    fn default() -> Self {
        Self::new(FSRSParams::default(), 0.9, 10)
    }
}

impl FsrsModel {
    pub fn new(params: FSRSParams, desired_retention: f64, relearn_minutes: i64) -> Self {
        Self {
            params,
            desired_retention: desired_retention.clamp(0.7, 0.97),
            relearn_minutes: relearn_minutes.clamp(1, MAX_RELEARN_MINUTES),
        }
    }
}

impl MemoryModel for FsrsModel {
    fn schedule(
        &self,
        prior: Option<&MemoryState>,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> MemoryState {
        let elapsed_days = prior
            .and_then(|state| state.last_review)
            .map(|last| days_between(last, now))
            .unwrap_or(0.0);

        let current = match prior {
            Some(state) if !state.is_new() => FsrsCore {
                stability: state.stability,
                difficulty: state.difficulty,
                elapsed_days,
                reps: state.reps,
                lapses: state.lapses,
            },
            _ => FsrsCore::default(),
        };

        let next = next_core(&current, rating, self.desired_retention, &self.params);

        // Lapses go back to a short relearning step instead of a day-scale interval.
        let (due, scheduled_days) = if rating == Rating::Again {
            let minutes = self.relearn_minutes;
            (
                now + Duration::minutes(minutes),
                minutes as f64 / (24.0 * 60.0),
            )
        } else {
            let seconds = (next.interval_days * SECONDS_PER_DAY).round() as i64;
            (now + Duration::seconds(seconds), next.interval_days)
        };

        MemoryState {
            stability: next.stability,
            difficulty: next.difficulty,
            elapsed_days,
            scheduled_days,
            reps: next.reps,
            lapses: next.lapses,
            due,
            last_review: Some(now),
        }
    }
}

#[derive(Debug, Clone)]
struct FsrsCore {
    stability: f64,
    difficulty: f64,
    elapsed_days: f64,
    reps: i32,
    lapses: i32,
}

impl Default for FsrsCore {
    fn default() -> Self {
        Self {
            stability: 1.0,
            difficulty: 0.3,
            elapsed_days: 0.0,
            reps: 0,
            lapses: 0,
        }
    }
}

struct CoreResult {
    stability: f64,
    difficulty: f64,
    reps: i32,
    lapses: i32,
    interval_days: f64,
}

pub fn fsrs_retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    let safe_elapsed = elapsed_days.max(0.0);
    (1.0 + FACTOR * safe_elapsed / stability).powf(DECAY)
}

fn next_core(state: &FsrsCore, rating: Rating, desired_retention: f64, params: &FSRSParams) -> CoreResult {
    let w = &params.w;
    let rating_val = rating as i32;

    if state.reps == 0 {
        let stability = initial_stability(w, rating_val);
        return CoreResult {
            stability,
            difficulty: initial_difficulty(w, rating_val),
            reps: 1,
            lapses: if rating == Rating::Again { 1 } else { 0 },
            interval_days: next_interval(stability, desired_retention),
        };
    }

    let retrievability = fsrs_retrievability(state.stability, state.elapsed_days);
    let difficulty = next_difficulty(w, state.difficulty, rating_val);

    let (stability, lapses) = if rating == Rating::Again {
        let s = next_forget_stability(w, state.difficulty, state.stability, retrievability);
        (s, state.lapses + 1)
    } else {
        let s = next_recall_stability(
            w,
            state.difficulty,
            state.stability,
            retrievability,
            rating_val,
        );
        (s, state.lapses)
    };

    CoreResult {
        stability,
        difficulty,
        reps: state.reps + 1,
        lapses,
        interval_days: next_interval(stability, desired_retention),
    }
}

fn initial_stability(w: &[f64; 17], rating: i32) -> f64 {
    w[(rating - 1) as usize].max(0.1)
}

fn initial_difficulty(w: &[f64; 17], rating: i32) -> f64 {
    let d = w[4] - (rating - 3) as f64 * w[5];
    d.clamp(1.0, 10.0) / 10.0
}

fn next_difficulty(w: &[f64; 17], d: f64, rating: i32) -> f64 {
    let d_10 = d * 10.0;
    let delta = -(rating - 3) as f64;
    let d_new = d_10 + w[6] * delta;
    let d_mean = w[7] * (w[4] - 3.0 * w[5]) + (1.0 - w[7]) * d_new;
    (d_mean.clamp(1.0, 10.0)) / 10.0
}

fn next_recall_stability(w: &[f64; 17], d: f64, s: f64, r: f64, rating: i32) -> f64 {
    let d_10 = d * 10.0;
    let hard_penalty = if rating == 2 { w[15] } else { 1.0 };
    let easy_bonus = if rating == 4 { w[16] } else { 1.0 };

    let new_s = s
        * (1.0
            + w[8].exp()
                * (11.0 - d_10)
                * s.powf(-w[9])
                * ((1.0 - r) * w[10]).exp_m1()
                * hard_penalty
                * easy_bonus);
    // A successful recall never shortens the interval.
    new_s.max(s).max(0.1)
}

fn next_forget_stability(w: &[f64; 17], d: f64, s: f64, r: f64) -> f64 {
    let d_10 = d * 10.0;
    let new_s =
        w[11] * d_10.powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * (1.0 - r).powf(w[14]).exp();
    new_s.clamp(0.1, s.max(0.1))
}

fn next_interval(stability: f64, desired_retention: f64) -> f64 {
    let safe_retention = desired_retention.clamp(0.0001, 0.9999);
    let interval = stability / FACTOR * (safe_retention.powf(1.0 / DECAY) - 1.0);
    interval.clamp(1.0, 36500.0)
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_outcome_maps_in_order() {
        assert_eq!(Rating::from(Outcome::Again) as i32, 1);
        assert_eq!(Rating::from(Outcome::Hard) as i32, 2);
        assert_eq!(Rating::from(Outcome::Good) as i32, 3);
        assert_eq!(Rating::from(Outcome::Easy) as i32, 4);
    }

    #[test]
    fn test_new_item_good_rating() {
        let model = FsrsModel::default();
        let state = model.schedule(None, Rating::Good, now());
        assert_eq!(state.reps, 1);
        assert!(state.scheduled_days >= 1.0);
        assert!(state.stability > 1.0);
        assert!(state.due > now());
        assert_eq!(state.last_review, Some(now()));
    }

    #[test]
    fn test_retrievability_decay() {
        let r_0 = fsrs_retrievability(10.0, 0.0);
        let r_5 = fsrs_retrievability(10.0, 5.0);
        let r_10 = fsrs_retrievability(10.0, 10.0);
        assert!(r_0 > r_5);
        assert!(r_5 > r_10);
        assert!((r_0 - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_repeated_good_never_shrinks_interval() {
        let model = FsrsModel::default();
        let mut at = now();
        let mut state = model.schedule(None, Rating::Good, at);
        let mut previous = state.scheduled_days;
        for _ in 0..6 {
            at = state.due;
            state = model.schedule(Some(&state), Rating::Good, at);
            assert!(state.scheduled_days >= previous);
            previous = state.scheduled_days;
        }
        assert!(previous > 1.0);
    }

    #[test]
    fn test_again_collapses_interval() {
        let model = FsrsModel::default();
        let mut at = now();
        let mut state = model.schedule(None, Rating::Good, at);
        for _ in 0..3 {
            at = state.due;
            state = model.schedule(Some(&state), Rating::Easy, at);
        }
        let before = state.scheduled_days;
        let lapsed = model.schedule(Some(&state), Rating::Again, state.due);
        assert!(lapsed.scheduled_days < before);
        assert!(lapsed.scheduled_days < 1.0);
        assert_eq!(lapsed.lapses, state.lapses + 1);
        assert!(lapsed.stability <= state.stability);
    }

    #[test]
    fn test_memory_state_json_is_lossless() {
        let model = FsrsModel::default();
        let state = model.schedule(None, Rating::Hard, now());
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: MemoryState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_relearn_step_is_capped() {
        let model = FsrsModel::new(FSRSParams::default(), 0.9, 9_999_999_999_999);
        let lapsed = model.schedule(None, Rating::Again, now());
        assert_eq!(lapsed.due - now(), Duration::minutes(MAX_RELEARN_MINUTES));
        assert_eq!(lapsed.scheduled_days, 1.0);

        let floor = FsrsModel::new(FSRSParams::default(), 0.9, -5);
        let lapsed = floor.schedule(None, Rating::Again, now());
        assert_eq!(lapsed.due - now(), Duration::minutes(1));
    }

    #[test]
    fn test_retrievability_at_falls_with_time() {
        let state = FsrsModel::default().schedule(None, Rating::Good, now());
        assert!((state.retrievability_at(now()) - 1.0).abs() < 1e-9);
        assert!(state.retrievability_at(now() + Duration::days(30)) < 0.9);
    }

    #[test]
    fn test_mastery() {
        let mut state = FsrsModel::default().schedule(None, Rating::Good, now());
        state.stability = 30.0;
        state.lapses = 0;
        assert!(state.is_mastered());
        state.stability = 10.0;
        assert!(!state.is_mastered());
    }
}
