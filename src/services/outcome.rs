use crate::types::Outcome;

/// Correct answers slower than this fraction of the baseline count as effortful.
pub const SLOW_CORRECT_RATIO: f64 = 0.8;
/// Wrong answers faster than this fraction of the baseline count as guesses.
pub const FAST_WRONG_RATIO: f64 = 0.5;

pub fn is_slow_correct(latency_ms: i64, baseline_latency_ms: f64) -> bool {
    latency_ms as f64 > baseline_latency_ms * SLOW_CORRECT_RATIO
}

/// Maps a raw answer observation to a review quality, applying speed correction.
///
/// `Easy` is never produced here; it is reserved for explicit self-report.
pub fn determine_outcome(
    is_correct: bool,
    latency_ms: i64,
    baseline_latency_ms: Option<f64>,
) -> Outcome {
    let baseline = baseline_latency_ms.filter(|b| b.is_finite() && *b > 0.0);

    if !is_correct {
        return match baseline {
            Some(b) if (latency_ms as f64) < b * FAST_WRONG_RATIO => Outcome::Again,
            _ => Outcome::Hard,
        };
    }

    match baseline {
        Some(b) if is_slow_correct(latency_ms, b) => Outcome::Hard,
        _ => Outcome::Good,
    }
}
