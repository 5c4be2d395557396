//! CLI interface for learnpath

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::progress::{
    practice_suggestions, CategoryStatUpdate, MemoryStorage, ProgressSnapshot, ProgressStore, SnapshotStorage,
    SqliteStorage, SystemClock,
};
use crate::recommend::Recommender;
use crate::speech;
use crate::types::{ActivityCategory, ActivityFamily, OutcomeInput};

#[derive(Parser)]
#[command(name = "learnpath")]
#[command(about = "Learner progress tracking and spoken answer checking", long_about = None)]
#[command(version)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep progress in memory only (nothing is read or written on disk)
    #[arg(short, long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current progress snapshot
    Show {
        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a completed activity
    Record {
        /// Category tag, e.g. flashcards-letters, puzzles, activities-memory, camera-gestures
        tag: String,
        #[arg(short, long, default_value = "0")]
        score: u32,
        /// Accuracy percentage (0-100)
        #[arg(short, long, default_value = "0")]
        accuracy: u8,
        /// Seconds spent on the activity
        #[arg(short, long, default_value = "0")]
        time: u32,
    },
    /// Update the stats of one category
    Update {
        /// flashcards, puzzles, activities or camera
        family: String,
        /// Subcategory (set, activity type or camera mode); omit for puzzles
        #[arg(long)]
        sub: Option<String>,
        #[arg(long)]
        completed: Option<u32>,
        #[arg(long)]
        accuracy: Option<u8>,
        #[arg(long)]
        best_time: Option<u32>,
    },
    /// Unlock a badge
    Badge {
        name: String,
    },
    /// Discard all progress
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Recommend the next activity family
    Recommend,
    /// Check a spoken answer against the expected one
    Verify {
        spoken: String,
        expected: String,
    },
    /// Configuration
    Config {
        /// Display current configuration
        #[arg(long)]
        show: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Show { json } => {
            let store = open_store(&config, cli.memory)?;
            let snapshot = store.load().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_summary(&snapshot);
            }
        }
        Commands::Record {
            tag,
            score,
            accuracy,
            time,
        } => {
            let category = ActivityCategory::parse(&tag)?;
            let store = open_store(&config, cli.memory)?;
            let snapshot = store
                .record_outcome(OutcomeInput::new(category, score, accuracy, time))
                .await?;
            println!(
                "Recorded {}. Streak: {} day(s), level {}.",
                tag,
                snapshot.streak().current,
                snapshot.current_level()
            );
        }
        Commands::Update {
            family,
            sub,
            completed,
            accuracy,
            best_time,
        } => {
            let family = ActivityFamily::parse(&family)
                .with_context(|| format!("Unknown activity family '{}'", family))?;
            let update = CategoryStatUpdate {
                completed_count: completed,
                accuracy,
                last_played_at: Some(chrono::Utc::now()),
                best_time_seconds: best_time,
            };
            let store = open_store(&config, cli.memory)?;
            let snapshot = store.update_category_stat(family, sub.as_deref(), update).await?;
            if let Some(stat) = snapshot.stat(family, sub.as_deref()) {
                println!(
                    "{} {}: {}/{} completed, accuracy {}%",
                    family,
                    sub.as_deref().unwrap_or(""),
                    stat.completed_count(),
                    stat.total_target(),
                    stat.accuracy()
                );
            }
        }
        Commands::Badge { name } => {
            let store = open_store(&config, cli.memory)?;
            let before = store.load().await.badges().len();
            let snapshot = store.unlock_badge(&name).await?;
            if snapshot.badges().len() > before {
                println!("Unlocked badge '{}'.", name.trim());
            } else {
                println!("Badge '{}' was already unlocked.", name.trim());
            }
        }
        Commands::Reset { yes } => {
            if !yes && !confirm("Discard all progress?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let store = open_store(&config, cli.memory)?;
            store.reset().await?;
            println!("Progress reset.");
        }
        Commands::Recommend => {
            let store = open_store(&config, cli.memory)?;
            let snapshot = store.load().await;
            let recommender = Recommender::from_config(&config.advice);
            if !recommender.has_advisor() {
                println!("Advice service not configured (set {}), using progress scores.", config.advice.api_key_env);
            }
            let recommendation = recommender.recommend(&snapshot).await;
            println!("Next: {} ({})", recommendation.family, recommendation.source);
            if let Some(reason) = recommendation.reason {
                println!("Why: {}", reason);
            }
        }
        Commands::Verify { spoken, expected } => {
            let result = speech::verify(&spoken, &expected);
            if result.is_match {
                println!("Match (confidence {:.1}, {:?})", result.confidence, result.kind);
            } else {
                println!("No match");
            }
        }
        Commands::Config { show } => {
            if show {
                println!("{}", toml::to_string_pretty(&config)?);
            } else {
                match &cli.config {
                    Some(path) => println!("Config file: {}", path.display()),
                    None => println!("Config file: {}", crate::config::config_path()?.display()),
                }
                println!("Database:    {}", config.database_path()?.display());
                println!();
                println!("Options:");
                println!("  --show    Display current configuration");
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config, memory: bool) -> Result<ProgressStore> {
    let storage: Arc<dyn SnapshotStorage> = if memory {
        Arc::new(MemoryStorage::new())
    } else {
        let path = config.database_path()?;
        Arc::new(
            SqliteStorage::open(&path)
                .with_context(|| format!("Failed to open progress database {}", path.display()))?,
        )
    };
    Ok(ProgressStore::open(storage, Arc::new(SystemClock), config.store_options()?))
}

fn print_summary(snapshot: &ProgressSnapshot) {
    println!("Level {}  |  Overall {}%", snapshot.current_level(), snapshot.overall_progress_percent());
    println!(
        "Streak: {} day(s) (longest {})",
        snapshot.streak().current,
        snapshot.streak().longest
    );
    println!("Time spent: {} min", snapshot.total_time_spent_seconds() / 60);
    println!();

    for family in ActivityFamily::all() {
        println!("{}:", family);
        for (name, stat) in snapshot.family_stats(*family) {
            println!(
                "  {:<20} {:>3}/{:<3} accuracy {:>3}%",
                name,
                stat.completed_count(),
                stat.total_target(),
                stat.accuracy()
            );
        }
    }

    if !snapshot.badges().is_empty() {
        println!();
        let badges: Vec<&str> = snapshot.badges().iter().map(String::as_str).collect();
        println!("Badges: {}", badges.join(", "));
    }

    let recent = snapshot.recent_history(5);
    if !recent.is_empty() {
        println!();
        println!("Recent:");
        for outcome in recent {
            println!(
                "  {}  {:<22} score {:>4}  accuracy {:>3}%",
                outcome.timestamp.format("%Y-%m-%d %H:%M"),
                outcome.category.to_string(),
                outcome.score,
                outcome.accuracy
            );
        }
    }

    let suggestions = practice_suggestions(snapshot);
    if !suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in suggestions {
            println!("  - {}", suggestion);
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
