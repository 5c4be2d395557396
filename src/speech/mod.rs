//! Spoken-answer verification
//!
//! Decides whether a (noisy) speech-to-text transcript matches the answer a
//! flashcard or game expects:
//! - Canonicalizes both strings (case, punctuation, whitespace)
//! - Generates acceptable phrasings of the expected answer
//! - Grades the match with a confidence in 0.0..=1.0

pub mod normalize;
pub mod variations;
pub mod verifier;

pub use normalize::normalize;
pub use variations::{number_to_word, variations_of, word_to_number};
pub use verifier::{verify, MatchKind, Verification};
