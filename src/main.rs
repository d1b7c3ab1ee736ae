use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use jihoo_review::config::Config;
use jihoo_review::content::{ContentPool, JsonContentLoader};
use jihoo_review::db::{JsonFileStore, RecordStore};
use jihoo_review::logging::init_tracing;
use jihoo_review::services::fsrs::{FSRSParams, FsrsModel};
use jihoo_review::services::personalized::{PersonalizedScheduler, SchedulerConfig};
use jihoo_review::services::recall_boss::RecallBoss;
use jihoo_review::services::review::{ReviewScheduler, ReviewStats};
use jihoo_review::types::{LearningItem, Subject, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Plan,
    Recall,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedItem<'a> {
    id: &'a str,
    subject: Subject,
    difficulty: f64,
    concept_tag: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput<'a> {
    mode: &'static str,
    stats: ReviewStats,
    items: Vec<PlannedItem<'a>>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let command = match std::env::args().nth(1).as_deref() {
        None | Some("plan") => Command::Plan,
        Some("recall") => Command::Recall,
        Some(other) => {
            tracing::error!(command = other, "unknown command, expected `plan` or `recall`");
            return ExitCode::from(2);
        }
    };

    match run(&config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "planner failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let Some(content_path) = config.content_path.clone() else {
        return Err("CONTENT_PATH is not set".into());
    };

    let store: Arc<dyn RecordStore> = Arc::new(JsonFileStore::open(&config.store_path).await?);
    let pool = Arc::new(ContentPool::new(Arc::new(JsonContentLoader::new(content_path))));
    let model = FsrsModel::new(
        FSRSParams::default(),
        config.desired_retention,
        config.relearn_minutes,
    );
    let reviews = ReviewScheduler::new(Arc::clone(&store), Arc::new(model));

    let profile = ensure_profile(store.as_ref()).await?;
    let stats = reviews.stats(Utc::now()).await?;

    let (mode, items) = match command {
        Command::Plan => {
            let scheduler_config = SchedulerConfig::from_profile(&profile);
            let scheduler = match config.scheduler_seed {
                Some(seed) => PersonalizedScheduler::seeded(
                    scheduler_config,
                    reviews.clone(),
                    Arc::clone(&pool),
                    seed,
                ),
                None => PersonalizedScheduler::new(scheduler_config, reviews.clone(), Arc::clone(&pool)),
            };
            let items = scheduler
                .select_items_for_round(config.round_size, true)
                .await?;
            ("plan", items)
        }
        Command::Recall => {
            let boss = RecallBoss::new(reviews.clone(), Arc::clone(&pool));
            let items = boss
                .select_recall_items(&[], &profile.weak_tags, config.recall_limit)
                .await?;
            ("recall", items)
        }
    };

    print_plan(mode, stats, &items)?;
    Ok(())
}

async fn ensure_profile(store: &dyn RecordStore) -> Result<UserProfile, Box<dyn std::error::Error>> {
    if let Some(profile) = store.get_profile().await? {
        return Ok(profile);
    }
    let profile = UserProfile {
        first_session_date: Some(Utc::now()),
        ..Default::default()
    };
    store.put_profile(profile.clone()).await?;
    tracing::info!("created learner profile");
    Ok(profile)
}

fn print_plan(
    mode: &'static str,
    stats: ReviewStats,
    items: &[LearningItem],
) -> Result<(), serde_json::Error> {
    let output = PlanOutput {
        mode,
        stats,
        items: items
            .iter()
            .map(|item| PlannedItem {
                id: &item.id,
                subject: item.subject,
                difficulty: item.difficulty,
                concept_tag: &item.concept_tag,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
