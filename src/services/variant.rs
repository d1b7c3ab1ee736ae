use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::types::LearningItem;

pub const DEFAULT_REWARD_PROBABILITY: f64 = 0.1;
const REWARD_STEP_PER_CORRECT: f64 = 0.05;
const MAX_REWARD_PROBABILITY: f64 = 0.5;

/// Chance of an intermittent reward after a correct streak, capped at one half.
pub fn reward_probability(consecutive_correct: u32, base_probability: f64) -> f64 {
    let base = if base_probability.is_finite() {
        base_probability.max(0.0)
    } else {
        DEFAULT_REWARD_PROBABILITY
    };
    (base + consecutive_correct as f64 * REWARD_STEP_PER_CORRECT).min(MAX_REWARD_PROBABILITY)
}

/// Re-presents a missed concept in a different form (format, skin or sentence).
pub struct VariantSystem {
    rng: Mutex<StdRng>,
}

impl Default for VariantSystem {
    fn default() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }
}

impl VariantSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// The item re-keyed as `<id>-<variant>`; `None` when the item has no such variant.
    pub fn get_variant(&self, item: &LearningItem, variant_id: &str) -> Option<LearningItem> {
        if !item.variants.iter().any(|v| v == variant_id) {
            return None;
        }
        Some(LearningItem {
            id: format!("{}-{}", item.id, variant_id),
            ..item.clone()
        })
    }

    pub fn select_random_variant(&self, item: &LearningItem) -> Option<String> {
        item.variants.choose(&mut *self.rng.lock()).cloned()
    }

    /// Picks a random variant and resolves it in one step.
    pub fn random_variant_of(&self, item: &LearningItem) -> Option<LearningItem> {
        let variant_id = self.select_random_variant(item)?;
        self.get_variant(item, &variant_id)
    }

    pub fn should_show_intermittent_reward(&self, consecutive_correct: u32, base_probability: f64) -> bool {
        let probability = reward_probability(consecutive_correct, base_probability);
        let draw: f64 = self.rng.lock().random();
        draw < probability
    }
}
