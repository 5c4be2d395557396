//! Text canonicalization for transcript comparison

/// Canonical form of free-form text.
///
/// Lowercases, drops every character that is neither a word character
/// (alphanumeric or `_`) nor whitespace, then trims and collapses whitespace
/// runs to a single space. Idempotent.
pub fn normalize(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  The, CAT!! "), "the cat");
        assert_eq!(normalize("It's a\tcircle."), "its a circle");
        assert_eq!(normalize("Number 5"), "number 5");
    }

    #[test]
    fn test_normalize_keeps_underscore_and_unicode_letters() {
        assert_eq!(normalize("snake_case"), "snake_case");
        assert_eq!(normalize("Café!"), "café");
    }

    #[test]
    fn test_punctuation_between_words_does_not_leave_gaps() {
        assert_eq!(normalize("hello !"), "hello");
        assert_eq!(normalize("a - b"), "a b");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "",
            "   ",
            "  The, CAT!! ",
            "hello !",
            "İstanbul",
            "ß and ẞ",
            "tab\tand\nnewline",
            "it's a DOG...",
            "number   10",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
