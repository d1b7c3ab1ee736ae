use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::content::ContentPool;
use crate::services::review::ReviewScheduler;
use crate::services::ServiceResult;
use crate::types::{DifficultyRange, GradeBand, LearningItem, Subject, UserProfile};

const NEW_LEARNER_WEAKNESS_WEIGHT: f64 = 0.6;
const SETTLED_WEAKNESS_WEIGHT: f64 = 0.4;
const ESTABLISHED_WEAKNESS_WEIGHT: f64 = 0.4;
const NEW_LEARNER_DAYS: i64 = 14;
const SETTLED_LEARNER_DAYS: i64 = 28;
const NORMALIZATION_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectDistribution {
    pub math: f64,
    pub english: f64,
    pub science: f64,
    pub social: f64,
}

impl Default for SubjectDistribution {
    fn default() -> Self {
        Self {
            math: 0.40,
            english: 0.30,
            science: 0.15,
            social: 0.15,
        }
    }
}

impl SubjectDistribution {
    pub fn weight(&self, subject: Subject) -> f64 {
        match subject {
            Subject::Math => self.math,
            Subject::English => self.english,
            Subject::Science => self.science,
            Subject::Social => self.social,
        }
    }

    fn weight_mut(&mut self, subject: Subject) -> &mut f64 {
        match subject {
            Subject::Math => &mut self.math,
            Subject::English => &mut self.english,
            Subject::Science => &mut self.science,
            Subject::Social => &mut self.social,
        }
    }

    pub fn total(&self) -> f64 {
        Subject::ALL.iter().map(|s| self.weight(*s)).sum()
    }

    /// Walks subjects in enumeration order; falls back to the first subject on float drift.
    pub fn sample(&self, draw: f64) -> Subject {
        let mut cumulative = 0.0;
        for subject in Subject::ALL {
            cumulative += self.weight(subject);
            if draw <= cumulative {
                return subject;
            }
        }
        Subject::ALL[0]
    }
}

/// Blends the base distribution toward the subjects the learner is weak in.
pub fn adjust_distribution_for_weakness(
    base: &SubjectDistribution,
    weak_tags: &[String],
    weakness_weight: f64,
) -> SubjectDistribution {
    if weak_tags.is_empty() {
        return *base;
    }

    let mut counts = [0usize; 4];
    for tag in weak_tags {
        if let Some(subject) = Subject::from_tag(tag) {
            counts[subject_index(subject)] += 1;
        }
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return *base;
    }

    let w = if weakness_weight.is_finite() {
        weakness_weight.clamp(0.0, 1.0)
    } else {
        NEW_LEARNER_WEAKNESS_WEIGHT
    };

    let mut adjusted = *base;
    for subject in Subject::ALL {
        let weak_share = counts[subject_index(subject)] as f64 / total as f64;
        let base_weight = base.weight(subject).max(0.0);
        *adjusted.weight_mut(subject) = base_weight * (1.0 - w) + weak_share * w;
    }

    let sum = adjusted.total();
    if !sum.is_finite() || sum <= NORMALIZATION_EPSILON {
        return *base;
    }
    for subject in Subject::ALL {
        *adjusted.weight_mut(subject) /= sum;
    }
    adjusted
}

fn subject_index(subject: Subject) -> usize {
    match subject {
        Subject::Math => 0,
        Subject::English => 1,
        Subject::Science => 2,
        Subject::Social => 3,
    }
}

/// Weak-tag emphasis fades once the learner has been around for two weeks.
pub fn weakness_weight_for(first_session: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(first) = first_session else {
        return NEW_LEARNER_WEAKNESS_WEIGHT;
    };
    let days = (now - first).num_days();
    if days < NEW_LEARNER_DAYS {
        NEW_LEARNER_WEAKNESS_WEIGHT
    } else if days < SETTLED_LEARNER_DAYS {
        SETTLED_WEAKNESS_WEIGHT
    } else {
        ESTABLISHED_WEAKNESS_WEIGHT
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub grade_band: Option<GradeBand>,
    #[serde(default)]
    pub weak_tags: Vec<String>,
    pub distribution: Option<SubjectDistribution>,
    pub weakness_weight: Option<f64>,
    pub first_session_date: Option<DateTime<Utc>>,
}

impl SchedulerConfig {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            grade_band: profile.grade_band,
            weak_tags: profile.weak_tags.clone(),
            distribution: None,
            weakness_weight: None,
            first_session_date: profile.first_session_date,
        }
    }
}

/// Chooses the next batch: due reviews first, then distribution-weighted subject picks.
///
/// Built once per profile; rebuild it when the profile changes.
pub struct PersonalizedScheduler {
    grade_band: Option<GradeBand>,
    weak_tags: Vec<String>,
    distribution: SubjectDistribution,
    weakness_weight: f64,
    reviews: ReviewScheduler,
    pool: Arc<ContentPool>,
    rng: Mutex<StdRng>,
}

impl PersonalizedScheduler {
    pub fn new(config: SchedulerConfig, reviews: ReviewScheduler, pool: Arc<ContentPool>) -> Self {
        Self::with_rng(config, reviews, pool, StdRng::from_rng(&mut rand::rng()), Utc::now())
    }

    pub fn seeded(
        config: SchedulerConfig,
        reviews: ReviewScheduler,
        pool: Arc<ContentPool>,
        seed: u64,
    ) -> Self {
        Self::with_rng(config, reviews, pool, StdRng::seed_from_u64(seed), Utc::now())
    }

    pub fn with_rng(
        config: SchedulerConfig,
        reviews: ReviewScheduler,
        pool: Arc<ContentPool>,
        rng: StdRng,
        now: DateTime<Utc>,
    ) -> Self {
        let weakness_weight = config
            .weakness_weight
            .unwrap_or_else(|| weakness_weight_for(config.first_session_date, now));
        let base = config.distribution.unwrap_or_default();
        let distribution = adjust_distribution_for_weakness(&base, &config.weak_tags, weakness_weight);

        tracing::debug!(
            weakness_weight,
            weak_tags = config.weak_tags.len(),
            ?distribution,
            "personalized scheduler built"
        );

        Self {
            grade_band: config.grade_band,
            weak_tags: config.weak_tags,
            distribution,
            weakness_weight,
            reviews,
            pool,
            rng: Mutex::new(rng),
        }
    }

    pub fn distribution(&self) -> &SubjectDistribution {
        &self.distribution
    }

    pub fn weakness_weight(&self) -> f64 {
        self.weakness_weight
    }

    pub fn select_next_subject(&self) -> Subject {
        let draw: f64 = self.rng.lock().random();
        self.distribution.sample(draw)
    }

    pub async fn select_items(
        &self,
        subject: Subject,
        count: usize,
        difficulty_range: Option<DifficultyRange>,
    ) -> ServiceResult<Vec<LearningItem>> {
        self.select_items_excluding(subject, count, difficulty_range, &HashSet::new())
            .await
    }

    async fn select_items_excluding(
        &self,
        subject: Subject,
        count: usize,
        difficulty_range: Option<DifficultyRange>,
        exclude: &HashSet<String>,
    ) -> ServiceResult<Vec<LearningItem>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.pool.by_subject(subject, self.grade_band).await?;
        let weak: HashSet<&str> = self.weak_tags.iter().map(String::as_str).collect();

        let (mut prioritized, mut others): (Vec<LearningItem>, Vec<LearningItem>) = candidates
            .into_iter()
            .filter(|item| !exclude.contains(&item.id))
            .filter(|item| difficulty_range.map_or(true, |range| item.in_difficulty_range(&range)))
            .partition(|item| item.has_any_tag(&weak));

        prioritized.truncate(count);
        let remaining = count - prioritized.len();
        if remaining > 0 {
            others.shuffle(&mut *self.rng.lock());
            others.truncate(remaining);
            prioritized.extend(others);
        }

        tracing::debug!(%subject, requested = count, selected = prioritized.len(), "items selected");
        Ok(prioritized)
    }

    pub async fn select_items_for_round(
        &self,
        count: usize,
        include_due: bool,
    ) -> ServiceResult<Vec<LearningItem>> {
        let mut selected = Vec::with_capacity(count);

        if include_due && count > 0 {
            let due_ids = self.reviews.get_due_items(count).await?;
            if !due_ids.is_empty() {
                selected.extend(self.pool.by_ids(&due_ids).await?);
            }
        }

        if selected.len() < count {
            let subject = self.select_next_subject();
            let taken: HashSet<String> = selected.iter().map(|item| item.id.clone()).collect();
            let additional = self
                .select_items_excluding(subject, count - selected.len(), None, &taken)
                .await?;
            selected.extend(additional);
        }

        selected.truncate(count);
        Ok(selected)
    }
}
