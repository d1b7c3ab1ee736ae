use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::content::ContentError;
use crate::types::LearningItem;

const RECOMMENDED_MIN_AVG_DIFFICULTY: f64 = 3.0;
const RECOMMENDED_MAX_AVG_DIFFICULTY: f64 = 5.0;
const MIN_ITEMS_PER_CONCEPT: usize = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub valid: bool,
    pub warnings: Vec<String>,
}

/// Rejects items the scheduler cannot work with; every problem is reported, not just the first.
pub fn validate_learning_items(items: Vec<LearningItem>) -> Result<Vec<LearningItem>, ContentError> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for (idx, item) in items.iter().enumerate() {
        let label = if item.id.trim().is_empty() {
            problems.push(format!("[{idx}].id - must not be empty"));
            format!("[{idx}]")
        } else {
            item.id.clone()
        };

        if !seen.insert(item.id.as_str()) && !item.id.is_empty() {
            problems.push(format!("{label} - duplicate id"));
        }
        if !(1.0..=10.0).contains(&item.difficulty) {
            problems.push(format!(
                "{label}.difficulty - {} is outside 1..=10",
                item.difficulty
            ));
        }
        if item.grade_band.is_empty() {
            problems.push(format!("{label}.gradeBand - at least one band required"));
        }
        if item.concept_tag.is_empty() {
            problems.push(format!("{label}.conceptTag - at least one tag required"));
        }
    }

    if problems.is_empty() {
        Ok(items)
    } else {
        Err(ContentError::Validation(problems))
    }
}

pub fn check_content_quality(items: &[LearningItem]) -> QualityReport {
    let mut warnings = Vec::new();

    if !items.is_empty() {
        let avg = items.iter().map(|item| item.difficulty).sum::<f64>() / items.len() as f64;
        if !(RECOMMENDED_MIN_AVG_DIFFICULTY..=RECOMMENDED_MAX_AVG_DIFFICULTY).contains(&avg) {
            warnings.push(format!(
                "average difficulty {avg:.1} (recommended {RECOMMENDED_MIN_AVG_DIFFICULTY}-{RECOMMENDED_MAX_AVG_DIFFICULTY})"
            ));
        }
    }

    let mut per_concept: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        for tag in &item.concept_tag {
            *per_concept.entry(tag.as_str()).or_default() += 1;
        }
    }
    for (concept, count) in per_concept {
        if count < MIN_ITEMS_PER_CONCEPT {
            warnings.push(format!(
                "concept \"{concept}\" has {count} items (recommended at least {MIN_ITEMS_PER_CONCEPT})"
            ));
        }
    }

    if items.iter().all(|item| item.grade_band.is_empty()) {
        warnings.push("no grade band information".to_string());
    }

    QualityReport {
        valid: warnings.is_empty(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GradeBand, Subject};

    fn item(id: &str, tag: &str, difficulty: f64) -> LearningItem {
        LearningItem {
            id: id.to_string(),
            subject: Subject::Science,
            area: String::new(),
            grade_band: vec![GradeBand::ES56],
            concept_tag: vec![tag.to_string()],
            difficulty,
            variants: Vec::new(),
            payload: Default::default(),
        }
    }

    #[test]
    fn test_collects_all_problems() {
        let mut broken = item("", "science.plants", 0.0);
        broken.concept_tag.clear();
        let items = vec![item("s-1", "science.plants", 4.0), broken, item("s-1", "x", 4.0)];
        match validate_learning_items(items) {
            Err(ContentError::Validation(problems)) => {
                assert_eq!(problems.len(), 4);
                assert!(problems.iter().any(|p| p.contains("duplicate id")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_quality_flags_thin_concepts_and_hard_pool() {
        let items = vec![
            item("s-1", "science.plants", 8.0),
            item("s-2", "science.plants", 9.0),
        ];
        let report = check_content_quality(&items);
        assert!(!report.valid);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_quality_passes_balanced_pool() {
        let items: Vec<_> = (0..3)
            .map(|i| item(&format!("s-{i}"), "science.plants", 4.0))
            .collect();
        assert!(check_content_quality(&items).valid);
    }
}
