//! Learner progress tracking
//!
//! - [`ProgressSnapshot`]: the persisted aggregate
//! - [`ProgressStore`]: serialized load-modify-persist over a [`SnapshotStorage`]
//! - [`streak`] and [`leveling`]: pure rules applied on every recorded outcome

pub mod clock;
pub mod error;
pub mod insights;
pub mod leveling;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod streak;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ProgressError;
pub use insights::practice_suggestions;
pub use leveling::{level_for, LEVELING_FAMILIES};
pub use snapshot::{CategoryStat, CategoryStatUpdate, ProgressSnapshot, HISTORY_CAPACITY};
pub use storage::{MemoryStorage, SnapshotStorage, SqliteStorage, StorageError};
pub use store::{ProgressStore, StoreOptions, DEFAULT_STORAGE_KEY};
pub use streak::StreakState;
