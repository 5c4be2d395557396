//! Daily activity streaks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Consecutive-day activity streak
///
/// `longest >= current` holds for every value produced by [`advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    /// Calendar date of the last recorded activity (time of day discarded)
    pub last_activity_date: Option<NaiveDate>,
}

/// Streak after an activity on `today`.
///
/// Same day leaves the count alone, the next day extends it, anything else
/// (first activity, a gap, or a date earlier than the last one) restarts at 1.
pub fn advance(state: &StreakState, today: NaiveDate) -> StreakState {
    let current = match state.last_activity_date {
        Some(last) if last == today => state.current,
        Some(last) if last.succ_opt() == Some(today) => state.current.saturating_add(1),
        _ => 1,
    };

    StreakState {
        current,
        longest: state.longest.max(current),
        last_activity_date: Some(today),
    }
}
