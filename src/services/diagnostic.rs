use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::content::{ContentError, ContentPool};
use crate::services::adaptive_difficulty::{AdaptiveDifficultyEngine, ResponseData};
use crate::types::{GradeBand, LearningItem, Subject, UserProfile};

const ITEMS_PER_BAND: usize = 4;
const MAX_DIAGNOSTIC_ITEMS: usize = 12;
const DEFAULT_ESTIMATED_DIFFICULTY: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject: Subject,
    pub correct: usize,
    pub total: usize,
    pub avg_reaction_time: f64,
    pub weak_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticResult {
    pub grade_band: GradeBand,
    pub weak_tags: Vec<String>,
    pub estimated_difficulty: f64,
    pub subject_results: Vec<SubjectResult>,
}

impl DiagnosticResult {
    pub fn apply_to(&self, profile: &mut UserProfile) {
        profile.grade_band = Some(self.grade_band);
        profile.merge_weak_tags(self.weak_tags.iter().cloned());
    }
}

#[derive(Debug, Clone, Copy)]
struct DiagnosticAnswer {
    correct: bool,
    reaction_ms: i64,
}

/// Placement test: twelve items per subject spread over three difficulty bands.
pub struct DiagnosticEngine {
    pool: Arc<ContentPool>,
    adaptive: AdaptiveDifficultyEngine,
    results: HashMap<String, DiagnosticAnswer>,
}

impl DiagnosticEngine {
    pub fn new(pool: Arc<ContentPool>) -> Self {
        Self {
            pool,
            adaptive: AdaptiveDifficultyEngine::new(),
            results: HashMap::new(),
        }
    }

    pub async fn select_diagnostic_items(
        &self,
        subject: Subject,
        grade_band: Option<GradeBand>,
    ) -> Result<Vec<LearningItem>, ContentError> {
        let items = self.pool.by_subject(subject, grade_band).await?;

        let easy = items.iter().filter(|i| i.difficulty <= 3.0).take(ITEMS_PER_BAND);
        let medium = items
            .iter()
            .filter(|i| i.difficulty >= 4.0 && i.difficulty <= 6.0)
            .take(ITEMS_PER_BAND);
        let hard = items.iter().filter(|i| i.difficulty >= 7.0).take(ITEMS_PER_BAND);

        Ok(easy
            .chain(medium)
            .chain(hard)
            .take(MAX_DIAGNOSTIC_ITEMS)
            .cloned()
            .collect())
    }

    pub fn record_response(&mut self, item: &LearningItem, is_correct: bool, reaction_ms: i64) {
        self.adaptive.record_response(
            &item.id,
            item,
            ResponseData {
                is_correct,
                latency_ms: reaction_ms,
                baseline_latency_ms: None,
            },
        );
        self.results.insert(
            item.id.clone(),
            DiagnosticAnswer {
                correct: is_correct,
                reaction_ms,
            },
        );
    }

    pub fn analyze_results(&mut self, items: &[LearningItem]) -> DiagnosticResult {
        let mut by_subject: BTreeMap<usize, (Subject, Vec<&LearningItem>)> = BTreeMap::new();
        for item in items {
            let order = Subject::ALL
                .iter()
                .position(|s| *s == item.subject)
                .unwrap_or(0);
            by_subject
                .entry(order)
                .or_insert_with(|| (item.subject, Vec::new()))
                .1
                .push(item);
        }

        let mut subject_results = Vec::with_capacity(by_subject.len());
        let mut all_weak_tags: Vec<String> = Vec::new();
        let mut total_difficulty = 0.0;
        let mut answered = 0usize;

        for (_, (subject, subject_items)) in by_subject {
            let mut correct = 0;
            let mut total_reaction = 0i64;
            let mut weak_tags: Vec<String> = Vec::new();

            for item in &subject_items {
                let Some(answer) = self.results.get(&item.id).copied() else {
                    continue;
                };
                if answer.correct {
                    correct += 1;
                } else {
                    for tag in &item.concept_tag {
                        if !weak_tags.contains(tag) {
                            weak_tags.push(tag.clone());
                        }
                    }
                }
                total_reaction += answer.reaction_ms;
                total_difficulty += self
                    .adaptive
                    .difficulty_state(&item.id, item.difficulty)
                    .current_difficulty;
                answered += 1;
            }

            for tag in &weak_tags {
                if !all_weak_tags.contains(tag) {
                    all_weak_tags.push(tag.clone());
                }
            }

            let avg_reaction_time = if subject_items.is_empty() {
                0.0
            } else {
                total_reaction as f64 / subject_items.len() as f64
            };

            subject_results.push(SubjectResult {
                subject,
                correct,
                total: subject_items.len(),
                avg_reaction_time,
                weak_tags,
            });
        }

        let estimated_difficulty = if answered > 0 {
            total_difficulty / answered as f64
        } else {
            DEFAULT_ESTIMATED_DIFFICULTY
        };
        let grade_band = estimate_grade_band(estimated_difficulty, &subject_results);

        tracing::info!(
            ?grade_band,
            estimated_difficulty,
            weak_tags = all_weak_tags.len(),
            "diagnostic analysed"
        );

        DiagnosticResult {
            grade_band,
            weak_tags: all_weak_tags,
            estimated_difficulty,
            subject_results,
        }
    }

    pub fn reset(&mut self) {
        self.results.clear();
        self.adaptive.reset();
    }
}

pub fn estimate_grade_band(avg_difficulty: f64, subject_results: &[SubjectResult]) -> GradeBand {
    let total_correct: usize = subject_results.iter().map(|r| r.correct).sum();
    let total_items: usize = subject_results.iter().map(|r| r.total).sum();
    let accuracy = if total_items > 0 {
        total_correct as f64 / total_items as f64
    } else {
        0.0
    };

    if avg_difficulty <= 3.0 && accuracy >= 0.8 {
        GradeBand::ES12
    } else if avg_difficulty <= 5.0 && accuracy >= 0.6 {
        GradeBand::ES34
    } else if avg_difficulty <= 6.0 && accuracy >= 0.5 {
        GradeBand::ES56
    } else if avg_difficulty <= 8.0 && accuracy >= 0.4 {
        GradeBand::MS1
    } else {
        GradeBand::MS23
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, subject: Subject, tag: &str, difficulty: f64) -> LearningItem {
        LearningItem {
            id: id.to_string(),
            subject,
            area: String::new(),
            grade_band: vec![GradeBand::ES34],
            concept_tag: vec![tag.to_string()],
            difficulty,
            variants: Vec::new(),
            payload: Default::default(),
        }
    }

    fn result(correct: usize, total: usize) -> SubjectResult {
        SubjectResult {
            subject: Subject::Math,
            correct,
            total,
            avg_reaction_time: 0.0,
            weak_tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_selects_four_per_band() {
        let mut items = Vec::new();
        for i in 0..20 {
            items.push(item(&format!("m-{i}"), Subject::Math, "math.x", (i % 10 + 1) as f64));
        }
        items.push(item("e-1", Subject::English, "english.x", 2.0));
        let engine = DiagnosticEngine::new(Arc::new(ContentPool::from_items(items)));

        let selected = engine.select_diagnostic_items(Subject::Math, None).await.unwrap();
        assert_eq!(selected.len(), 12);
        assert_eq!(selected.iter().filter(|i| i.difficulty <= 3.0).count(), 4);
        assert_eq!(selected.iter().filter(|i| i.difficulty >= 7.0).count(), 4);
        assert!(selected.iter().all(|i| i.subject == Subject::Math));
    }

    #[test]
    fn test_analyze_collects_weak_tags() {
        let pool = Arc::new(ContentPool::from_items(Vec::new()));
        let mut engine = DiagnosticEngine::new(pool);
        let items = vec![
            item("m-1", Subject::Math, "math.fractions", 4.0),
            item("m-2", Subject::Math, "math.fractions", 4.0),
            item("s-1", Subject::Science, "science.plants", 4.0),
        ];
        engine.record_response(&items[0], false, 3000);
        engine.record_response(&items[1], false, 1000);
        engine.record_response(&items[2], true, 2000);

        let result = engine.analyze_results(&items);
        assert_eq!(result.weak_tags, vec!["math.fractions"]);
        assert_eq!(result.subject_results.len(), 2);
        assert_eq!(result.subject_results[0].subject, Subject::Math);
        assert_eq!(result.subject_results[0].avg_reaction_time, 2000.0);
        assert!((result.estimated_difficulty - (3.5 + 3.5 + 4.5) / 3.0).abs() < 1e-9);

        let mut profile = UserProfile::default();
        result.apply_to(&mut profile);
        assert_eq!(profile.grade_band, Some(result.grade_band));
        assert_eq!(profile.weak_tags, vec!["math.fractions"]);
    }

    #[test]
    fn test_grade_band_thresholds() {
        assert_eq!(estimate_grade_band(2.5, &[result(9, 10)]), GradeBand::ES12);
        assert_eq!(estimate_grade_band(4.5, &[result(7, 10)]), GradeBand::ES34);
        assert_eq!(estimate_grade_band(6.0, &[result(5, 10)]), GradeBand::ES56);
        assert_eq!(estimate_grade_band(7.5, &[result(4, 10)]), GradeBand::MS1);
        assert_eq!(estimate_grade_band(9.0, &[result(9, 10)]), GradeBand::MS23);
        assert_eq!(estimate_grade_band(5.0, &[]), GradeBand::MS23);
    }

    #[test]
    fn test_reset() {
        let mut engine = DiagnosticEngine::new(Arc::new(ContentPool::from_items(Vec::new())));
        let items = vec![item("m-1", Subject::Math, "math.x", 4.0)];
        engine.record_response(&items[0], false, 1000);
        engine.reset();
        let result = engine.analyze_results(&items);
        assert!(result.weak_tags.is_empty());
        assert_eq!(result.estimated_difficulty, 5.0);
    }
}
