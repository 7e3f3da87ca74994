// src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dsa_tracker::catalog::build_dataset;
use dsa_tracker::models::{Dataset, Difficulty, Identity, Priority, ProblemFilter, ProblemStatus};
use dsa_tracker::{FileRemoteStore, ProgressStore, TrackerConfig};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON config file; flags below override it.
    #[arg(long, env = "DSA_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "DSA_TRACKER_CACHE")]
    cache: Option<PathBuf>,

    /// Root of the remote document store. Omit to run offline.
    #[arg(long, env = "DSA_TRACKER_REMOTE")]
    remote: Option<PathBuf>,

    #[arg(long, env = "DSA_TRACKER_FALLBACK")]
    fallback: Option<PathBuf>,

    /// Quiet period before local changes are pushed.
    #[arg(long, env = "DSA_TRACKER_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,

    /// Sign in as this user before running the command.
    #[arg(long, env = "DSA_TRACKER_USER")]
    user: Option<String>,

    #[arg(long, env = "DSA_TRACKER_EMAIL")]
    email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solved counts, streak and study-plan progress.
    Stats,
    /// List problems matching all given filters.
    List {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        status: Option<ProblemStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Flip a problem between solved and unsolved.
    Toggle { id: i64 },
    /// Replace a problem's notes.
    Note { id: i64, text: String },
    /// Flip a study-plan day between pending and completed.
    Plan { index: usize },
    /// Most recent solves.
    Recent { limit: Option<usize> },
    /// Write a backup to a file, or stdout.
    Export { file: Option<PathBuf> },
    /// Restore a backup.
    Import { file: PathBuf },
    /// Publish a catalog JSON file to the remote store.
    Upload { file: PathBuf },
    /// Switch between dark and light.
    Theme,
}

fn build_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(cache) = &args.cache {
        config.cache_path = cache.clone();
    }
    if let Some(remote) = &args.remote {
        config.remote_dir = Some(remote.clone());
    }
    if let Some(fallback) = &args.fallback {
        config.fallback_path = Some(fallback.clone());
    }
    if let Some(ms) = args.debounce_ms {
        config.debounce_ms = ms;
    }
    Ok(config)
}

fn upload(config: &TrackerConfig, file: &Path) -> Result<()> {
    let Some(remote_dir) = &config.remote_dir else {
        bail!("upload needs --remote");
    };
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let mut dataset: Dataset = serde_json::from_str(&raw).context("parsing catalog")?;
    if dataset.metadata.total_problems == 0 || dataset.topic_summary.is_empty() {
        debug!("Catalog has no summaries, deriving them");
        dataset = build_dataset(dataset.problems, dataset.study_plan);
    }
    let chunks = FileRemoteStore::new(remote_dir).upload_base_catalog(&dataset)?;
    println!(
        "Uploaded {} problems in {} chunks",
        dataset.problems.len(),
        chunks
    );
    Ok(())
}

async fn run(store: &mut ProgressStore, command: Command, config: &TrackerConfig) -> Result<()> {
    match command {
        Command::Stats => {
            let by_diff = store.solved_by_difficulty();
            let meta = store.metadata();
            println!(
                "Solved {}/{}  (Easy {}/{}, Medium {}/{}, Hard {}/{})",
                store.solved_count(),
                store.problems().len(),
                by_diff.easy,
                meta.total_easy,
                by_diff.medium,
                meta.total_medium,
                by_diff.hard,
                meta.total_hard
            );
            println!("Streak: {} day(s)", store.streak());
            let (done, total) = store.study_plan_progress();
            println!("Study plan: {}/{} sessions", done, total);
            for row in store.topic_summary() {
                println!(
                    "  {:<28} {:>3}/{:<3}",
                    row.topic,
                    store.solved_by_topic(&row.topic),
                    store.total_by_topic(&row.topic)
                );
            }
        }
        Command::List {
            topic,
            difficulty,
            status,
            priority,
            pattern,
            search,
        } => {
            let filter = ProblemFilter {
                topic,
                difficulty,
                status,
                priority,
                pattern,
                search,
            };
            for p in store.filtered_problems(&filter) {
                println!(
                    "[{}] {:>4}  LC {:<5} {:<6} {:<40} {}",
                    if p.is_solved() { "x" } else { " " },
                    p.id,
                    p.lc_number,
                    p.difficulty.as_str(),
                    p.name,
                    p.link
                );
            }
        }
        Command::Toggle { id } => match store.toggle_status(id) {
            Some(p) => println!("{} is now {}", p.name, p.status.as_str()),
            None => bail!("no problem with id {}", id),
        },
        Command::Note { id, text } => {
            if store.update_notes(id, text).is_none() {
                bail!("no problem with id {}", id);
            }
        }
        Command::Plan { index } => match store.toggle_study_plan_status(index) {
            Some(entry) => println!("{} {}: {:?}", entry.week, entry.day, entry.status),
            None => bail!("no study-plan entry at index {}", index),
        },
        Command::Recent { limit } => {
            for p in store.recent_activity(limit.unwrap_or(config.recent_limit)) {
                let date = p.date_solved.map(|d| d.to_string()).unwrap_or_default();
                println!("{}  {}", date, p.name);
            }
        }
        Command::Export { file } => {
            let json = store.export_progress()?;
            match file {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            store.import_progress(&json).await?;
            println!("Imported {}", file.display());
        }
        Command::Theme => println!("Theme: {}", store.toggle_theme()),
        Command::Upload { file } => upload(config, &file)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    debug!("Starting DSA tracker...");
    let config = build_config(&args)?;
    info!("Cache path: {:?}", config.cache_path);

    // Publishing a catalog needs no local cache or sign-in
    if let Command::Upload { file } = args.command {
        return upload(&config, &file);
    }

    let mut store = ProgressStore::from_config(&config)?;
    store.init().await.context("loading catalog")?;

    if let Some(uid) = &args.user {
        let mut identity = Identity::new(uid.as_str());
        if let Some(email) = &args.email {
            identity = identity.with_email(email.as_str());
        }
        let outcome = store.sign_in(identity).await?;
        info!("Sync complete: {}", outcome);
    }

    run(&mut store, args.command, &config).await?;

    // The process is about to exit; don't leave a push on the timer
    store.flush_sync().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsa_tracker::bootstrap::BUNDLED_CATALOG;
    use dsa_tracker::{LocalCache, MemoryRemoteStore, RemoteStore};
    use std::sync::Arc;

    fn idle_store() -> ProgressStore {
        ProgressStore::new(LocalCache::in_memory().unwrap(), Arc::new(MemoryRemoteStore::new()))
    }

    #[tokio::test]
    async fn upload_command_publishes_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catalog.json");
        fs::write(&file, BUNDLED_CATALOG).unwrap();
        let config = TrackerConfig {
            remote_dir: Some(dir.path().join("remote")),
            ..TrackerConfig::default()
        };

        run(&mut idle_store(), Command::Upload { file }, &config)
            .await
            .unwrap();

        let published = FileRemoteStore::new(dir.path().join("remote"))
            .fetch_base_catalog()
            .await
            .unwrap()
            .unwrap();
        let bundled: Dataset = serde_json::from_str(BUNDLED_CATALOG).unwrap();
        assert_eq!(published.problems, bundled.problems);
    }

    #[tokio::test]
    async fn upload_command_without_remote_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("catalog.json");
        fs::write(&file, BUNDLED_CATALOG).unwrap();

        let result = run(&mut idle_store(), Command::Upload { file }, &TrackerConfig::default()).await;
        assert!(result.is_err());
    }
}
