//! Errors surfaced by the progress store

use thiserror::Error;

use super::storage::StorageError;
use crate::types::{ActivityFamily, MalformedTag};

/// Why a progress mutation was rejected
///
/// Validation variants are raised before anything is merged, so the stored
/// snapshot is unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("accuracy must be a percentage in 0..=100, got {0}")]
    AccuracyOutOfRange(u8),

    #[error(transparent)]
    MalformedCategory(#[from] MalformedTag),

    #[error("{family} has no subcategory named {name:?}")]
    UnknownSubcategory { family: ActivityFamily, name: String },

    #[error("{0} is split into subcategories; one must be named")]
    MissingSubcategory(ActivityFamily),

    #[error("{0} is tracked as a single stat and takes no subcategory")]
    UnexpectedSubcategory(ActivityFamily),

    #[error("completed count cannot decrease ({current} -> {requested})")]
    CompletedCountDecreased { current: u32, requested: u32 },

    #[error("badge name must not be empty")]
    EmptyBadgeName,

    #[error("failed to persist progress: {0}")]
    Storage(#[from] StorageError),
}
