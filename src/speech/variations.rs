//! Acceptable phrasings of an expected answer
//!
//! Children answer "five" to a card showing "5" and "a circle" to one
//! labelled "This is a Circle". The generator expands a canonical expected
//! answer into the phrasings that should count as the same answer.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^letter\s+([a-z])$").expect("letter pattern is valid"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^number\s+([0-9]+)$").expect("number pattern is valid"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("digits pattern is valid"));
static NAMED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:this is a|the)\s+(.+)$").expect("item pattern is valid"));

const NUMBER_WORDS: [&str; 11] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// Spelled-out word for 0..=10
pub fn number_to_word(n: u64) -> Option<&'static str> {
    usize::try_from(n).ok().and_then(|i| NUMBER_WORDS.get(i).copied())
}

/// Digit value of a number word in 0..=10
pub fn word_to_number(word: &str) -> Option<u64> {
    let word = word.to_lowercase();
    NUMBER_WORDS.iter().position(|w| *w == word).map(|i| i as u64)
}

/// All acceptable phrasings of `canonical_expected`, the input itself first.
///
/// The input should already be normalized; the patterns only recognise
/// lowercase, single-spaced text.
pub fn variations_of(canonical_expected: &str) -> IndexSet<String> {
    let text = canonical_expected;
    let mut variations = IndexSet::new();
    variations.insert(text.to_string());

    // "letter a" -> "a", "the letter a"
    if let Some(caps) = LETTER.captures(text) {
        let letter = &caps[1];
        variations.insert(letter.to_string());
        variations.insert(format!("the letter {}", letter));
    }

    // "number 5" -> "5", "five", "the number five", "number five"
    if let Some(caps) = NUMBER.captures(text) {
        let digits = &caps[1];
        variations.insert(digits.to_string());
        if let Some(word) = digits.parse::<u64>().ok().and_then(number_to_word) {
            variations.insert(word.to_string());
            variations.insert(format!("the number {}", word));
            variations.insert(format!("number {}", word));
        }
    }

    // "5" -> "five", "number five"
    if DIGITS.is_match(text) {
        if let Some(word) = text.parse::<u64>().ok().and_then(number_to_word) {
            variations.insert(word.to_string());
            variations.insert(format!("number {}", word));
        }
    }

    // "five" -> "5", "number 5"
    if let Some(n) = word_to_number(text) {
        variations.insert(n.to_string());
        variations.insert(format!("number {}", n));
    }

    // "this is a circle" -> "circle", "a circle", "the circle", "it's a circle", "it is a circle"
    if let Some(caps) = NAMED_ITEM.captures(text) {
        let item = &caps[1];
        variations.insert(item.to_string());
        variations.insert(format!("a {}", item));
        variations.insert(format!("the {}", item));
        variations.insert(format!("it's a {}", item));
        variations.insert(format!("it is a {}", item));
    }

    variations
}
