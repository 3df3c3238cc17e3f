//! Suffix-stripping stemmer.
//!
//! Not a full Porter stemmer; it only needs to fold common inflections
//! together so that TF-IDF treats "meeting"/"meetings" as one term.

/// Suffixes ordered longest-first so the most specific match wins.
const SUFFIXES: &[&str] = &[
    "ization", "ational", "iveness", "fulness", "ousness", "ation", "ement", "ment", "able",
    "ible", "ness", "ical", "ings", "ing", "ies", "ive", "ful", "ous", "ity", "ed", "ly", "er",
    "es", "s",
];

/// Strip the longest matching suffix, keeping at least three leading characters.
pub fn stem_word(word: &str) -> String {
    let w = word.to_lowercase();

    for suffix in SUFFIXES {
        if w.len() > suffix.len() + 2 && w.ends_with(suffix) {
            return w[..w.len() - suffix.len()].to_string();
        }
    }

    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_common_suffixes() {
        assert_eq!(stem_word("meetings"), "meet");
        assert_eq!(stem_word("running"), "runn");
        assert_eq!(stem_word("organization"), "organ");
        assert_eq!(stem_word("replied"), "repli");
    }

    #[test]
    fn test_short_words_untouched() {
        assert_eq!(stem_word("is"), "is");
        assert_eq!(stem_word("bus"), "bus");
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(stem_word("Kickoff"), "kickoff");
    }
}
