//! learnpath - progress and mastery tracking for a children's learning app
//!
//! - Progress store with streaks, levels, badges and bounded activity history
//! - Next-activity recommendation with an optional advice service
//! - Spoken answer verification against expected answers
//!
//! # Example
//!
//! ```ignore
//! use learnpath::{ActivityCategory, OutcomeInput, ProgressStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ProgressStore::in_memory();
//!     let outcome = OutcomeInput::new(ActivityCategory::parse("puzzles")?, 120, 90, 45);
//!     let snapshot = store.record_outcome(outcome).await?;
//!     println!("level {}", snapshot.current_level());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod types;
pub mod config;
pub mod progress;
pub mod speech;
pub mod recommend;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{ActivityCategory, ActivityFamily, ActivityOutcome, MalformedTag, OutcomeInput};

pub use config::Config;

pub use progress::{
    practice_suggestions,
    CategoryStat,
    CategoryStatUpdate,
    ProgressError,
    ProgressSnapshot,
    ProgressStore,
    StreakState,
};

pub use recommend::{recommend, Recommendation, RecommendationSource, Recommender};

pub use speech::{normalize, variations_of, verify, Verification};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Learner Progress Library", NAME, VERSION)
}
