//! Level computation from completed-item totals

use super::snapshot::ProgressSnapshot;
use crate::types::ActivityFamily;

/// Completed items needed per level
pub const ITEMS_PER_LEVEL: u64 = 10;

/// Families whose completions count towards leveling.
///
/// Camera games are left out on purpose even though the overall progress
/// percentage includes them.
pub const LEVELING_FAMILIES: [ActivityFamily; 3] = [
    ActivityFamily::Flashcards,
    ActivityFamily::Puzzles,
    ActivityFamily::Activities,
];

/// Sum of completed counts across [`LEVELING_FAMILIES`]
pub fn total_completed(snapshot: &ProgressSnapshot) -> u64 {
    LEVELING_FAMILIES
        .iter()
        .flat_map(|family| snapshot.family_stats(*family))
        .map(|(_, stat)| u64::from(stat.completed_count()))
        .sum()
}

/// Level reached with `total_completed` items: `floor(total / 10) + 1`
pub fn level_for(total_completed: u64) -> u32 {
    let level = total_completed / ITEMS_PER_LEVEL + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// New level for `snapshot`; never lower than its current level
pub fn recompute_level(snapshot: &ProgressSnapshot) -> u32 {
    snapshot.current_level().max(level_for(total_completed(snapshot)))
}
