//! Progress Store - the only writer of the learner's snapshot
//!
//! Every mutation runs load-modify-persist under one lock: the candidate
//! snapshot is built on a copy, validated, written to storage, and only then
//! swapped in. A rejected or failed mutation leaves both the in-memory and the
//! persisted snapshot untouched.

use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::error::ProgressError;
use super::leveling;
use super::snapshot::{CategoryStatUpdate, ProgressSnapshot, SNAPSHOT_VERSION};
use super::storage::{MemoryStorage, SnapshotStorage};
use super::streak;
use crate::types::{ActivityFamily, ActivityOutcome, OutcomeInput};

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "learning-progress";

/// Store settings
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Key the serialized snapshot is stored under
    pub key: String,
    /// Offset used to turn outcome instants into calendar dates for streaks
    pub utc_offset: FixedOffset,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            utc_offset: Utc.fix(),
        }
    }
}

/// Read the snapshot under `key`, falling back to the default on any problem
pub fn read_snapshot(storage: &dyn SnapshotStorage, key: &str) -> ProgressSnapshot {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!("No saved progress under '{}', starting fresh", key);
            return ProgressSnapshot::default();
        }
        Err(e) => {
            warn!("Failed to read saved progress: {}. Starting fresh.", e);
            return ProgressSnapshot::default();
        }
    };

    match serde_json::from_str::<ProgressSnapshot>(&raw) {
        Ok(snapshot) if snapshot.version() > SNAPSHOT_VERSION => {
            warn!(
                "Saved progress has unsupported version {} (expected <= {}). Starting fresh.",
                snapshot.version(),
                SNAPSHOT_VERSION
            );
            ProgressSnapshot::default()
        }
        Ok(snapshot) => {
            debug!("Loaded saved progress (level {})", snapshot.current_level());
            snapshot.repair()
        }
        Err(e) => {
            warn!("Saved progress is corrupt: {}. Starting fresh.", e);
            ProgressSnapshot::default()
        }
    }
}

/// Durable, serialized owner of one learner's [`ProgressSnapshot`]
pub struct ProgressStore {
    storage: Arc<dyn SnapshotStorage>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
    snapshot: Mutex<ProgressSnapshot>,
}

impl ProgressStore {
    /// Open the store over `storage`, reading any saved snapshot. Never fails.
    pub fn open(storage: Arc<dyn SnapshotStorage>, clock: Arc<dyn Clock>, options: StoreOptions) -> Self {
        let snapshot = read_snapshot(storage.as_ref(), &options.key);
        Self {
            storage,
            clock,
            options,
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Store with process-local storage and the system clock
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()), Arc::new(SystemClock), StoreOptions::default())
    }

    /// Current snapshot: the persisted one, or the default if nothing was saved
    pub async fn load(&self) -> ProgressSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Merge `update` into one category stat.
    ///
    /// `subcategory` must be given for subdivided families and omitted for
    /// puzzles. Accuracy must be a percentage and the completed count may not
    /// go down.
    pub async fn update_category_stat(
        &self,
        family: ActivityFamily,
        subcategory: Option<&str>,
        update: CategoryStatUpdate,
    ) -> Result<ProgressSnapshot, ProgressError> {
        self.mutate(|snapshot| {
            let stat = match (family.is_subdivided(), subcategory) {
                (true, None) => return Err(ProgressError::MissingSubcategory(family)),
                (false, Some(_)) => return Err(ProgressError::UnexpectedSubcategory(family)),
                _ => snapshot.stat_mut(family, subcategory).ok_or_else(|| {
                    ProgressError::UnknownSubcategory {
                        family,
                        name: subcategory.unwrap_or_default().to_string(),
                    }
                })?,
            };

            if let Some(accuracy) = update.accuracy {
                if accuracy > 100 {
                    return Err(ProgressError::AccuracyOutOfRange(accuracy));
                }
            }
            if let Some(requested) = update.completed_count {
                let current = stat.completed_count();
                if requested < current {
                    return Err(ProgressError::CompletedCountDecreased { current, requested });
                }
            }

            if update.is_empty() {
                return Ok(false);
            }
            stat.merge(&update);
            debug!("Updated {} {:?}: {:?}", family, subcategory, update);
            Ok(true)
        })
        .await
    }

    /// Record a completed activity.
    ///
    /// Stamps the outcome with the store clock, prepends it to the bounded
    /// history, advances the streak, recomputes the level from the current
    /// completed totals and adds the time spent, all in one persisted step.
    pub async fn record_outcome(&self, input: OutcomeInput) -> Result<ProgressSnapshot, ProgressError> {
        if input.accuracy > 100 {
            return Err(ProgressError::AccuracyOutOfRange(input.accuracy));
        }
        input.category.validate()?;

        self.mutate(|snapshot| {
            let outcome = ActivityOutcome::stamp(input, self.clock.now());
            let today = outcome.timestamp.with_timezone(&self.options.utc_offset).date_naive();
            let time_spent = outcome.time_spent_seconds;
            let category = outcome.category.to_string();

            snapshot.push_outcome(outcome);

            let streak = streak::advance(snapshot.streak(), today);
            snapshot.set_streak(streak);

            let previous_level = snapshot.current_level();
            let level = leveling::recompute_level(snapshot);
            snapshot.set_current_level(level);
            if level > previous_level {
                info!("Level up: {} -> {}", previous_level, level);
            }

            snapshot.add_time_spent(time_spent);

            info!(
                "Recorded {} (streak {}, longest {}, level {})",
                category, streak.current, streak.longest, level
            );
            Ok(true)
        })
        .await
    }

    /// Unlock a badge. Unlocking an already unlocked badge changes nothing.
    pub async fn unlock_badge(&self, name: &str) -> Result<ProgressSnapshot, ProgressError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProgressError::EmptyBadgeName);
        }

        self.mutate(|snapshot| {
            let added = snapshot.insert_badge(name.to_string());
            if added {
                info!("Unlocked badge '{}'", name);
            }
            Ok(added)
        })
        .await
    }

    /// Discard all progress and persist a fresh default snapshot
    pub async fn reset(&self) -> Result<ProgressSnapshot, ProgressError> {
        self.mutate(|snapshot| {
            *snapshot = ProgressSnapshot::default();
            info!("Progress reset");
            Ok(true)
        })
        .await
    }

    /// Apply `change` to a copy of the snapshot, persist it, then publish it.
    /// `change` returns whether anything changed; unchanged snapshots are not rewritten.
    async fn mutate<F>(&self, change: F) -> Result<ProgressSnapshot, ProgressError>
    where
        F: FnOnce(&mut ProgressSnapshot) -> Result<bool, ProgressError>,
    {
        let mut current = self.snapshot.lock().await;
        let mut next = current.clone();

        if !change(&mut next)? {
            return Ok(next);
        }

        self.persist(&next)?;
        *current = next.clone();
        Ok(next)
    }

    fn persist(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressError> {
        let json = serde_json::to_string(snapshot).map_err(super::storage::StorageError::from)?;
        self.storage.write(&self.options.key, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::clock::FixedClock;
    use crate::progress::storage::StorageError;
    use crate::types::ActivityCategory;
    use chrono::{Duration, TimeZone, Utc};

    fn store_at(y: i32, m: u32, d: u32) -> (ProgressStore, Arc<FixedClock>, Arc<MemoryStorage>) {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()));
        let storage = Arc::new(MemoryStorage::new());
        let store = ProgressStore::open(storage.clone(), clock.clone(), StoreOptions::default());
        (store, clock, storage)
    }

    fn puzzle(time: u32) -> OutcomeInput {
        OutcomeInput::new(ActivityCategory::Puzzles, 100, 90, time)
    }

    struct FailingStorage;

    impl SnapshotStorage for FailingStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }
        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_record_outcome_updates_everything() {
        let (store, clock, storage) = store_at(2024, 1, 1);

        let snap = store.record_outcome(puzzle(45)).await.unwrap();
        assert_eq!(snap.activity_history().len(), 1);
        assert_eq!(snap.activity_history()[0].timestamp, clock.now());
        assert_eq!(snap.streak().current, 1);
        assert_eq!(snap.total_time_spent_seconds(), 45);

        let persisted = read_snapshot(storage.as_ref(), DEFAULT_STORAGE_KEY);
        assert_eq!(persisted, snap);
    }

    #[tokio::test]
    async fn test_streak_scenario() {
        let (store, clock, _) = store_at(2024, 1, 1);
        store.record_outcome(puzzle(0)).await.unwrap();

        clock.advance(Duration::days(1));
        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(snap.streak().current, 2);

        clock.advance(Duration::hours(3));
        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(snap.streak().current, 2);

        clock.set(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap());
        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(snap.streak().current, 1);
        assert_eq!(snap.streak().longest, 2);
    }

    #[tokio::test]
    async fn test_utc_offset_decides_calendar_day() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap()));
        let options = StoreOptions {
            utc_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
            ..StoreOptions::default()
        };
        let store = ProgressStore::open(Arc::new(MemoryStorage::new()), clock, options);

        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(
            snap.streak().last_activity_date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[tokio::test]
    async fn test_level_uses_prior_stat_update() {
        let (store, _, _) = store_at(2024, 1, 1);

        store
            .update_category_stat(ActivityFamily::Flashcards, Some("numbers"), CategoryStatUpdate::default().completed(9))
            .await
            .unwrap();
        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(snap.current_level(), 1);

        store
            .update_category_stat(ActivityFamily::Puzzles, None, CategoryStatUpdate::default().completed(1))
            .await
            .unwrap();
        let snap = store.record_outcome(puzzle(0)).await.unwrap();
        assert_eq!(snap.current_level(), 2);
    }

    #[tokio::test]
    async fn test_invalid_updates_leave_snapshot_untouched() {
        let (store, _, _) = store_at(2024, 1, 1);
        store
            .update_category_stat(ActivityFamily::Activities, Some("memory"), CategoryStatUpdate::default().completed(4))
            .await
            .unwrap();
        let before = store.load().await;

        let err = store
            .update_category_stat(ActivityFamily::Activities, Some("memory"), CategoryStatUpdate::default().completed(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CompletedCountDecreased { current: 4, requested: 2 }));

        let err = store
            .update_category_stat(ActivityFamily::Activities, Some("memory"), CategoryStatUpdate::default().completed(8).accuracy(120))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::AccuracyOutOfRange(120)));

        let err = store
            .update_category_stat(ActivityFamily::Activities, None, CategoryStatUpdate::default().accuracy(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::MissingSubcategory(ActivityFamily::Activities)));

        let err = store
            .update_category_stat(ActivityFamily::Puzzles, Some("hard"), CategoryStatUpdate::default().accuracy(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnexpectedSubcategory(ActivityFamily::Puzzles)));

        let err = store
            .update_category_stat(ActivityFamily::Flashcards, Some("animals"), CategoryStatUpdate::default().accuracy(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownSubcategory { .. }));

        let err = store
            .record_outcome(OutcomeInput::new(ActivityCategory::Puzzles, 1, 101, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::AccuracyOutOfRange(101)));

        assert_eq!(store.load().await, before);
    }

    #[tokio::test]
    async fn test_unstorable_category_is_rejected() {
        let (store, clock, storage) = store_at(2024, 1, 1);
        store.unlock_badge("keep-me").await.unwrap();
        let before = store.load().await;

        for category in [
            ActivityCategory::Flashcards("two words".to_string()),
            ActivityCategory::Other(String::new()),
            ActivityCategory::Other("flashcards-letters".to_string()),
        ] {
            let err = store
                .record_outcome(OutcomeInput::new(category, 1, 50, 5))
                .await
                .unwrap_err();
            assert!(matches!(err, ProgressError::MalformedCategory(_)));
        }
        assert_eq!(store.load().await, before);

        let reopened = ProgressStore::open(storage, clock, StoreOptions::default());
        let snap = reopened.load().await;
        assert!(snap.badges().contains("keep-me"));
        assert!(snap.activity_history().is_empty());
    }

    #[tokio::test]
    async fn test_unlock_badge_idempotent() {
        let (store, _, _) = store_at(2024, 1, 1);
        let first = store.unlock_badge("first-puzzle").await.unwrap();
        let second = store.unlock_badge("first-puzzle").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.badges().len(), 1);

        assert!(matches!(store.unlock_badge("  ").await, Err(ProgressError::EmptyBadgeName)));
    }

    #[tokio::test]
    async fn test_reset_restores_default_and_persists() {
        let (store, _, storage) = store_at(2024, 1, 1);
        store.record_outcome(puzzle(30)).await.unwrap();
        store.unlock_badge("star").await.unwrap();

        let snap = store.reset().await.unwrap();
        assert_eq!(snap, ProgressSnapshot::default());
        assert_eq!(read_snapshot(storage.as_ref(), DEFAULT_STORAGE_KEY), ProgressSnapshot::default());
    }

    #[tokio::test]
    async fn test_reopen_reads_persisted_snapshot() {
        let (store, clock, storage) = store_at(2024, 1, 1);
        store.record_outcome(puzzle(12)).await.unwrap();
        let saved = store.load().await;

        let reopened = ProgressStore::open(storage, clock, StoreOptions::default());
        assert_eq!(reopened.load().await, saved);
    }

    #[tokio::test]
    async fn test_corrupt_record_yields_default() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(DEFAULT_STORAGE_KEY, "{not json").unwrap();
        let store = ProgressStore::open(storage.clone(), Arc::new(SystemClock), StoreOptions::default());
        assert_eq!(store.load().await, ProgressSnapshot::default());

        storage.write(DEFAULT_STORAGE_KEY, r#"{"version": 99}"#).unwrap();
        assert_eq!(read_snapshot(storage.as_ref(), DEFAULT_STORAGE_KEY), ProgressSnapshot::default());
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_snapshot() {
        let store = ProgressStore::open(Arc::new(FailingStorage), Arc::new(SystemClock), StoreOptions::default());
        assert_eq!(store.load().await, ProgressSnapshot::default());

        let err = store.record_outcome(puzzle(10)).await.unwrap_err();
        assert!(matches!(err, ProgressError::Storage(_)));
        assert!(store.load().await.activity_history().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let store = Arc::new(ProgressStore::in_memory());
        let mut handles = Vec::new();
        for i in 0..20u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record_outcome(puzzle(i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snap = store.load().await;
        assert_eq!(snap.activity_history().len(), 20);
        assert_eq!(snap.total_time_spent_seconds(), (0..20u64).sum::<u64>());
    }
}
