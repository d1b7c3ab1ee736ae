use std::path::PathBuf;

use crate::services::fsrs::MAX_RELEARN_MINUTES;

const DEFAULT_STORE_PATH: &str = "./data/review-store.json";
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub file_logs: bool,
    pub log_dir: PathBuf,
    pub content_path: Option<PathBuf>,
    pub store_path: PathBuf,
    pub desired_retention: f64,
    pub relearn_minutes: i64,
    pub round_size: usize,
    pub recall_limit: usize,
    pub scheduler_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            content_path: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            desired_retention: 0.9,
            relearn_minutes: 10,
            round_size: 10,
            recall_limit: 10,
            scheduler_seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);
        let file_logs = lookup("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.file_logs);
        let log_dir = lookup("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);
        let content_path = lookup("CONTENT_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let store_path = lookup("STORE_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);
        let desired_retention = lookup("DESIRED_RETENTION")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.7, 0.97))
            .unwrap_or(defaults.desired_retention);
        let relearn_minutes = lookup("RELEARN_MINUTES")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map(|v| v.min(MAX_RELEARN_MINUTES))
            .unwrap_or(defaults.relearn_minutes);
        let round_size = lookup("ROUND_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.round_size);
        let recall_limit = lookup("RECALL_LIMIT")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.recall_limit);
        let scheduler_seed = lookup("SCHEDULER_SEED").and_then(|v| v.parse::<u64>().ok());

        Self {
            log_level,
            file_logs,
            log_dir,
            content_path,
            store_path,
            desired_retention,
            relearn_minutes,
            round_size,
            recall_limit,
            scheduler_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.round_size, 10);
        assert!(config.content_path.is_none());
        assert!(config.scheduler_seed.is_none());
    }

    #[test]
    fn test_parses_and_clamps() {
        let config = Config::from_lookup(lookup_from(&[
            ("ENABLE_FILE_LOGS", "1"),
            ("CONTENT_PATH", "/srv/content"),
            ("DESIRED_RETENTION", "0.99"),
            ("RELEARN_MINUTES", "-3"),
            ("ROUND_SIZE", "6"),
            ("SCHEDULER_SEED", "42"),
        ]));
        assert!(config.file_logs);
        assert_eq!(config.content_path, Some(PathBuf::from("/srv/content")));
        assert_eq!(config.desired_retention, 0.97);
        assert_eq!(config.relearn_minutes, 10);
        assert_eq!(config.round_size, 6);
        assert_eq!(config.scheduler_seed, Some(42));
    }

    #[test]
    fn test_huge_relearn_minutes_is_capped() {
        let config = Config::from_lookup(lookup_from(&[("RELEARN_MINUTES", "9999999999999")]));
        assert_eq!(config.relearn_minutes, MAX_RELEARN_MINUTES);
    }
}
