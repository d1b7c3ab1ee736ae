use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::services::fsrs::MemoryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    English,
    Science,
    Social,
}

impl Subject {
    /// Fixed enumeration order used for cumulative sampling.
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::English,
        Subject::Science,
        Subject::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::English => "english",
            Self::Science => "science",
            Self::Social => "social",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "math" => Some(Self::Math),
            "english" => Some(Self::English),
            "science" => Some(Self::Science),
            "social" => Some(Self::Social),
            _ => None,
        }
    }

    /// Subject owning a concept tag such as `math.fractions`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let (prefix, rest) = tag.split_once('.')?;
        if rest.is_empty() {
            return None;
        }
        Self::parse(prefix)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeBand {
    ES12,
    ES34,
    ES56,
    MS1,
    MS23,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningItem {
    pub id: String,
    pub subject: Subject,
    #[serde(default)]
    pub area: String,
    pub grade_band: Vec<GradeBand>,
    pub concept_tag: Vec<String>,
    pub difficulty: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    /// Presentation payload (stem, choices, answer, hints) carried through untouched.
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl LearningItem {
    pub fn has_any_tag(&self, tags: &HashSet<&str>) -> bool {
        self.concept_tag.iter().any(|tag| tags.contains(tag.as_str()))
    }

    pub fn in_grade_band(&self, band: GradeBand) -> bool {
        self.grade_band.contains(&band)
    }

    pub fn in_difficulty_range(&self, range: &DifficultyRange) -> bool {
        self.difficulty >= range.min && self.difficulty <= range.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRange {
    pub min: f64,
    pub max: f64,
}

impl DifficultyRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

/// Quality signal fed to the spaced-repetition scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Again,
    Hard,
    Good,
    Easy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub item_id: String,
    #[serde(default, deserialize_with = "lenient_memory_state")]
    pub memory: Option<MemoryState>,
    pub last_outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_latency_ms: Option<i64>,
}

impl ReviewState {
    /// Never-reviewed items are treated as maximally overdue.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match &self.memory {
            Some(memory) => memory.due <= now,
            None => true,
        }
    }
}

fn lenient_memory_state<'de, D>(deserializer: D) -> Result<Option<MemoryState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value::<MemoryState>(value) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable memory state");
            None
        }
    }))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_band: Option<GradeBand>,
    #[serde(default)]
    pub weak_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_session_date: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Appends tags not already tracked, keeping first-seen order.
    pub fn merge_weak_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !self.weak_tags.contains(&tag) {
                self.weak_tags.push(tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_from_tag() {
        assert_eq!(Subject::from_tag("math.fractions"), Some(Subject::Math));
        assert_eq!(Subject::from_tag("english.past-tense"), Some(Subject::English));
        assert_eq!(Subject::from_tag("fractions"), None);
        assert_eq!(Subject::from_tag("math."), None);
        assert_eq!(Subject::from_tag("history.war"), None);
    }

    #[test]
    fn test_learning_item_keeps_payload() {
        let raw = serde_json::json!({
            "id": "m-001",
            "subject": "math",
            "area": "math.numbers",
            "gradeBand": ["ES34"],
            "conceptTag": ["math.fractions"],
            "difficulty": 4.5,
            "stem": { "type": "text", "payload": "1/2 + 1/4 = ?" },
            "answer": { "kind": "short", "value": "3/4" }
        });
        let item: LearningItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.subject, Subject::Math);
        assert!(item.payload.contains_key("stem"));
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_corrupt_memory_state_is_dropped() {
        let raw = serde_json::json!({
            "itemId": "m-001",
            "memory": { "stability": "not a number" },
            "lastOutcome": "good"
        });
        let state: ReviewState = serde_json::from_value(raw).unwrap();
        assert!(state.memory.is_none());
        assert!(state.is_due(Utc::now()));
    }

    #[test]
    fn test_merge_weak_tags_dedupes() {
        let mut profile = UserProfile {
            weak_tags: vec!["math.fractions".to_string()],
            ..Default::default()
        };
        profile.merge_weak_tags(["math.fractions", "science.plants"]);
        assert_eq!(profile.weak_tags, vec!["math.fractions", "science.plants"]);
    }
}
