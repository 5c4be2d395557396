//! Parent-facing practice hints derived from a snapshot

use super::snapshot::ProgressSnapshot;

/// Puzzles a learner should have finished before the puzzle hint goes away
pub const PUZZLE_PRACTICE_GOAL: u32 = 5;

/// Streak length at which the streak hint goes away
pub const STREAK_GOAL: u32 = 3;

/// Ordered list of practice hints; empty when nothing needs attention
pub fn practice_suggestions(snapshot: &ProgressSnapshot) -> Vec<String> {
    let mut suggestions = Vec::new();

    let letters_incomplete = snapshot
        .flashcards()
        .get("letters")
        .map(|stat| stat.completed_count() < stat.total_target())
        .unwrap_or(true);
    if letters_incomplete {
        suggestions.push("Continue practicing letters flashcards".to_string());
    }

    if snapshot.puzzles().completed_count() < PUZZLE_PRACTICE_GOAL {
        suggestions.push("Try more puzzle games to build logic skills".to_string());
    }

    if snapshot.streak().current < STREAK_GOAL {
        suggestions.push("Maintain a daily learning streak".to_string());
    }

    suggestions
}
